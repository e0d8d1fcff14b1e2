//! Frame-tick scheduling.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::{ScheduleHandle, Scheduler, Timing, Work};
use crate::error::{Error, Result};
use crate::tracing_compat::trace;
use crate::unhandled::{self, SharedSink};

/// Whether a frame callback wants the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameControl {
    /// Invoke again on the next tick.
    Continue,
    /// Unregister after this tick.
    Stop,
}

/// Callback invoked once per tick with the current frame number.
pub type FrameCallback = Box<dyn FnMut(u64) -> FrameControl + Send>;

/// Source of externally driven frame ticks.
pub trait FrameProvider: Send + Sync {
    /// Registers `callback` to run on every tick from the next one on.
    ///
    /// The callback stops when it returns [`FrameControl::Stop`] or the
    /// returned handle is disposed.
    fn register(&self, callback: FrameCallback) -> Result<ScheduleHandle>;

    /// Number of ticks delivered so far.
    fn frame_count(&self) -> u64;
}

struct Registered {
    handle: ScheduleHandle,
    callback: FrameCallback,
}

/// Frame provider ticked by hand, typically from a render loop or a test.
pub struct ManualFrameProvider {
    frame: AtomicU64,
    callbacks: Mutex<Vec<Registered>>,
    tick_lock: Mutex<()>,
    sink: Option<SharedSink>,
}

impl ManualFrameProvider {
    /// Creates a provider at frame zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            frame: AtomicU64::new(0),
            callbacks: Mutex::new(Vec::new()),
            tick_lock: Mutex::new(()),
            sink: None,
        }
    }

    /// Reports panicking callbacks to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Advances one frame and runs every live callback.
    ///
    /// Callbacks registered during this tick first run on the next one. A
    /// panicking callback is reported and unregistered. Returns the new
    /// frame number.
    pub fn tick(&self) -> u64 {
        let _serial = self.tick_lock.lock();
        let frame = self.frame.fetch_add(1, Ordering::AcqRel) + 1;
        let current = std::mem::take(&mut *self.callbacks.lock());

        let mut kept = Vec::with_capacity(current.len());
        for mut entry in current {
            if !entry.handle.try_begin() {
                continue;
            }
            match catch_unwind(AssertUnwindSafe(|| (entry.callback)(frame))) {
                Ok(FrameControl::Continue) => kept.push(entry),
                Ok(FrameControl::Stop) => {}
                Err(payload) => {
                    unhandled::report(self.sink.as_ref(), &Error::from_panic(payload.as_ref()));
                }
            }
        }

        let mut callbacks = self.callbacks.lock();
        kept.append(&mut callbacks);
        *callbacks = kept;
        frame
    }

    /// Ticks `n` times.
    pub fn tick_n(&self, n: u64) {
        for _ in 0..n {
            self.tick();
        }
    }

    /// Number of callbacks currently registered.
    #[must_use]
    pub fn registered(&self) -> usize {
        self.callbacks.lock().len()
    }
}

impl Default for ManualFrameProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameProvider for ManualFrameProvider {
    fn register(&self, callback: FrameCallback) -> Result<ScheduleHandle> {
        let handle = ScheduleHandle::new();
        self.callbacks.lock().push(Registered {
            handle: handle.clone(),
            callback,
        });
        trace!(frame = self.frame_count(), "frame callback registered");
        Ok(handle)
    }

    fn frame_count(&self) -> u64 {
        self.frame.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for ManualFrameProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualFrameProvider")
            .field("frame", &self.frame_count())
            .field("registered", &self.registered())
            .finish()
    }
}

/// Runs work after a number of frame ticks.
///
/// `Now` and `Frames(0)` mean the next tick.
#[derive(Clone)]
pub struct FrameScheduler {
    provider: Arc<dyn FrameProvider>,
    sink: Option<SharedSink>,
}

impl FrameScheduler {
    /// Creates a scheduler driven by `provider`.
    #[must_use]
    pub fn new(provider: Arc<dyn FrameProvider>) -> Self {
        Self {
            provider,
            sink: None,
        }
    }

    /// Reports panics from scheduled work to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sink = Some(sink);
        self
    }
}

impl Scheduler for FrameScheduler {
    fn schedule(&self, work: Work, timing: Timing) -> Result<ScheduleHandle> {
        let frames = match timing {
            Timing::Now => 1,
            Timing::Frames(n) => n.max(1),
            Timing::Delay(_) | Timing::Priority(_) => {
                return Err(Error::unsupported_timing(self.name(), timing));
            }
        };

        let sink = self.sink.clone();
        let mut remaining = frames;
        let mut work = Some(work);
        self.provider.register(Box::new(move |_frame| {
            remaining -= 1;
            if remaining > 0 {
                return FrameControl::Continue;
            }
            if let Some(work) = work.take() {
                unhandled::run_guarded(sink.as_ref(), work);
            }
            FrameControl::Stop
        }))
    }

    fn name(&self) -> &'static str {
        "FrameScheduler"
    }
}

impl std::fmt::Debug for FrameScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameScheduler")
            .field("frame", &self.provider.frame_count())
            .finish_non_exhaustive()
    }
}
