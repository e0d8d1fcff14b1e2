#![allow(dead_code)]
#![allow(unused_imports)]
//! Shared integration test utilities.
//!
//! Import with:
//! ```
//! mod common;
//! use common::*;
//! ```

use parking_lot::{Condvar, Mutex};
use proptest::prelude::ProptestConfig;
use proptest::test_runner::RngSeed;
use reflux::{Completion, Error, Observer, UnhandledErrorSink};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::{Duration, Instant};

static INIT_LOGGING: Once = Once::new();

/// Default seed for property tests when running under CI.
pub const DEFAULT_PROPTEST_SEED: u64 = 0x5EED_5EED;

const PROPTEST_SEED_ENV: &str = "REFLUX_PROPTEST_SEED";

/// Build a ProptestConfig with deterministic seed support for CI.
#[must_use]
pub fn test_proptest_config(cases: u32) -> ProptestConfig {
    let mut config = ProptestConfig::with_cases(cases);
    // Honor existing PROPTEST_RNG_SEED, otherwise apply our own.
    if matches!(config.rng_seed, RngSeed::Random) {
        if let Some(seed) = read_proptest_seed() {
            config.rng_seed = RngSeed::Fixed(seed);
        }
    }
    config
}

fn read_proptest_seed() -> Option<u64> {
    if let Ok(value) = std::env::var(PROPTEST_SEED_ENV) {
        return value.parse::<u64>().ok();
    }
    if std::env::var("CI").is_ok() {
        return Some(DEFAULT_PROPTEST_SEED);
    }
    None
}

/// Initialize test logging with trace-level output.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .with_thread_ids(true)
            .with_ansi(false)
            .try_init();
    });
}

/// Log a test phase transition with a visual separator.
#[macro_export]
macro_rules! test_phase {
    ($name:expr) => {
        tracing::info!(phase = %$name, "========================================");
        tracing::info!(phase = %$name, "TEST PHASE: {}", $name);
        tracing::info!(phase = %$name, "========================================");
    };
}

/// Log a section within a test phase.
#[macro_export]
macro_rules! test_section {
    ($name:expr) => {
        tracing::debug!(section = %$name, "--- {} ---", $name);
    };
}

/// Log test completion.
#[macro_export]
macro_rules! test_complete {
    ($name:expr) => {
        tracing::info!(test = %$name, "test completed successfully: {}", $name);
    };
}

/// Observer that records deliveries and flags overlapping callbacks.
pub struct Recorder<T> {
    values: Mutex<Vec<T>>,
    resumes: Mutex<Vec<Error>>,
    completion: Mutex<Option<Completion>>,
    completions: AtomicUsize,
    in_flight: AtomicBool,
    overlapped: AtomicBool,
    threads: Mutex<Vec<std::thread::ThreadId>>,
    done: Condvar,
}

impl<T: Clone + Send + 'static> Recorder<T> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            values: Mutex::new(Vec::new()),
            resumes: Mutex::new(Vec::new()),
            completion: Mutex::new(None),
            completions: AtomicUsize::new(0),
            in_flight: AtomicBool::new(false),
            overlapped: AtomicBool::new(false),
            threads: Mutex::new(Vec::new()),
            done: Condvar::new(),
        })
    }

    pub fn values(&self) -> Vec<T> {
        self.values.lock().clone()
    }

    pub fn resumes(&self) -> Vec<Error> {
        self.resumes.lock().clone()
    }

    pub fn completion(&self) -> Option<Completion> {
        self.completion.lock().clone()
    }

    pub fn completions(&self) -> usize {
        self.completions.load(Ordering::SeqCst)
    }

    pub fn is_completed(&self) -> bool {
        self.completions() > 0
    }

    /// True if two callbacks ever ran at the same time.
    pub fn overlapped(&self) -> bool {
        self.overlapped.load(Ordering::SeqCst)
    }

    /// Distinct threads that delivered callbacks.
    pub fn delivery_threads(&self) -> Vec<std::thread::ThreadId> {
        let mut threads = self.threads.lock().clone();
        threads.dedup();
        threads
    }

    pub fn wait_for_completion(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut completion = self.completion.lock();
        while completion.is_none() {
            if self.done.wait_until(&mut completion, deadline).timed_out() {
                return completion.is_some();
            }
        }
        true
    }

    fn enter(&self) {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.overlapped.store(true, Ordering::SeqCst);
        }
        self.threads.lock().push(std::thread::current().id());
    }

    fn exit(&self) {
        self.in_flight.store(false, Ordering::SeqCst);
    }
}

impl<T: Clone + Send + 'static> Observer<T> for Recorder<T> {
    fn on_next(&self, value: T) {
        self.enter();
        self.values.lock().push(value);
        self.exit();
    }

    fn on_error_resume(&self, error: Error) {
        self.enter();
        self.resumes.lock().push(error);
        self.exit();
    }

    fn on_completed(&self, completion: Completion) {
        self.enter();
        self.completions.fetch_add(1, Ordering::SeqCst);
        *self.completion.lock() = Some(completion);
        self.done.notify_all();
        self.exit();
    }
}

/// Sink that counts and keeps unhandled errors.
#[derive(Default)]
pub struct CountingSink {
    errors: Mutex<Vec<Error>>,
}

impl CountingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn errors(&self) -> Vec<Error> {
        self.errors.lock().clone()
    }
}

impl UnhandledErrorSink for CountingSink {
    fn handle(&self, error: &Error) {
        self.errors.lock().push(error.clone());
    }
}

struct ThreadWaker(std::thread::Thread);

impl std::task::Wake for ThreadWaker {
    fn wake(self: Arc<Self>) {
        self.0.unpark();
    }
}

/// Drives a future to completion on the current thread.
pub fn block_on<F: std::future::Future>(future: F) -> F::Output {
    let waker = std::task::Waker::from(Arc::new(ThreadWaker(std::thread::current())));
    let mut cx = std::task::Context::from_waker(&waker);
    let mut future = std::pin::pin!(future);
    loop {
        if let std::task::Poll::Ready(out) = future.as_mut().poll(&mut cx) {
            return out;
        }
        std::thread::park();
    }
}
