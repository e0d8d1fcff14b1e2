//! Test utilities for reflux.
//!
//! Shared helpers for unit tests:
//! - Consistent tracing-based logging initialization
//! - Phase/section macros for readable test output
//! - Recording observers and collecting sinks
//! - A queued task pool for deterministic thread-pool tests
//! - A minimal `block_on` for awaiting outcome futures

use crate::error::Error;
use crate::notification::Completion;
use crate::observable::Observer;
use crate::scheduler::{TaskPool, Work};
use crate::unhandled::UnhandledErrorSink;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::pin;
use std::sync::{Arc, Once};
use std::task::{Context, Poll, Wake, Waker};
use std::thread::{self, Thread};
use std::time::{Duration, Instant};

static INIT_LOGGING: Once = Once::new();
static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// Initialize test logging with trace-level output.
///
/// Safe to call multiple times; only initializes once.
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

/// Acquire the global environment lock for tests that mutate env vars.
pub(crate) fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
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

/// A sink that keeps every error it receives.
#[derive(Default)]
pub struct CollectingSink {
    errors: Mutex<Vec<Error>>,
}

impl CollectingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn errors(&self) -> Vec<Error> {
        self.errors.lock().clone()
    }

    /// Messages of the collected errors, falling back to their display form.
    pub fn messages(&self) -> Vec<String> {
        self.errors
            .lock()
            .iter()
            .map(|e| e.message().map_or_else(|| e.to_string(), str::to_string))
            .collect()
    }
}

impl UnhandledErrorSink for CollectingSink {
    fn handle(&self, error: &Error) {
        self.errors.lock().push(error.clone());
    }
}

/// A task pool that queues work until [`QueuedPool::run_all`] is called.
#[derive(Default)]
pub struct QueuedPool {
    queue: Mutex<VecDeque<Work>>,
}

impl QueuedPool {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Runs queued work, including work queued while running. Returns the count.
    pub fn run_all(&self) -> usize {
        let mut ran = 0;
        loop {
            let next = self.queue.lock().pop_front();
            let Some(work) = next else { return ran };
            work();
            ran += 1;
        }
    }
}

impl TaskPool for QueuedPool {
    fn execute(&self, work: Work) -> crate::error::Result<()> {
        self.queue.lock().push_back(work);
        Ok(())
    }
}

/// One observed notification.
#[derive(Debug, Clone)]
pub enum Event<T> {
    Next(T),
    ErrorResume(Error),
    Completed(Completion),
}

type PanicPredicate<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

/// An observer that records everything it sees.
pub struct RecordingObserver<T> {
    events: Mutex<Vec<Event<T>>>,
    completed: Condvar,
    auto_dispose: bool,
    panic_on: Option<PanicPredicate<T>>,
}

impl<T: Send + 'static> RecordingObserver<T> {
    fn build(auto_dispose: bool, panic_on: Option<PanicPredicate<T>>) -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
            completed: Condvar::new(),
            auto_dispose,
            panic_on,
        })
    }

    pub fn new() -> Arc<Self> {
        Self::build(true, None)
    }

    /// A recorder that asks not to be disposed on completion.
    pub fn opted_out() -> Arc<Self> {
        Self::build(false, None)
    }

    /// A recorder whose `on_next` panics for values matching `pred`.
    pub fn panicking_on(pred: impl Fn(&T) -> bool + Send + Sync + 'static) -> Arc<Self> {
        Self::build(true, Some(Box::new(pred)))
    }

    pub fn completions(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| matches!(e, Event::Completed(_)))
            .count()
    }

    pub fn failures(&self) -> Vec<Error> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Event::Completed(Completion::Failure(err)) => Some(err.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn error_resumes(&self) -> Vec<Error> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Event::ErrorResume(err) => Some(err.clone()),
                _ => None,
            })
            .collect()
    }

    /// Blocks until a completion is recorded or `timeout` elapses.
    pub fn wait_for_completion(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut events = self.events.lock();
        loop {
            if events.iter().any(|e| matches!(e, Event::Completed(_))) {
                return true;
            }
            if self.completed.wait_until(&mut events, deadline).timed_out() {
                return events.iter().any(|e| matches!(e, Event::Completed(_)));
            }
        }
    }
}

impl<T: Clone + Send + 'static> RecordingObserver<T> {
    pub fn events(&self) -> Vec<Event<T>> {
        self.events.lock().clone()
    }

    pub fn values(&self) -> Vec<T> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Event::Next(v) => Some(v.clone()),
                _ => None,
            })
            .collect()
    }
}

impl<T: Send + 'static> Observer<T> for RecordingObserver<T> {
    fn on_next(&self, value: T) {
        if let Some(pred) = &self.panic_on {
            assert!(!pred(&value), "recording observer told to panic");
        }
        self.events.lock().push(Event::Next(value));
    }

    fn on_error_resume(&self, error: Error) {
        self.events.lock().push(Event::ErrorResume(error));
    }

    fn on_completed(&self, completion: Completion) {
        self.events.lock().push(Event::Completed(completion));
        self.completed.notify_all();
    }

    fn auto_dispose_on_completed(&self) -> bool {
        self.auto_dispose
    }
}

struct ThreadWaker(Thread);

impl Wake for ThreadWaker {
    fn wake(self: Arc<Self>) {
        self.0.unpark();
    }
}

/// Drives a future to completion on the current thread.
pub fn block_on<F: Future>(future: F) -> F::Output {
    let waker = Waker::from(Arc::new(ThreadWaker(thread::current())));
    let mut cx = Context::from_waker(&waker);
    let mut future = pin!(future);
    loop {
        if let Poll::Ready(out) = future.as_mut().poll(&mut cx) {
            return out;
        }
        thread::park();
    }
}
