//! Cancellation handle for scheduled work.

use core::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::disposable::Disposable;

const PENDING: u8 = 0;
const RUNNING: u8 = 1;
const CANCELLED: u8 = 2;

type CancelHook = Box<dyn FnOnce() + Send>;

struct HandleState {
    phase: AtomicU8,
    disposed: AtomicBool,
    on_cancel: Mutex<Option<CancelHook>>,
}

/// Handle to a scheduled callback.
///
/// The fire site calls [`try_begin`](Self::try_begin) before running the
/// callback, and disposal moves a pending handle to cancelled. Both go
/// through one atomic, so either disposal wins and the callback never runs,
/// or the callback has started and disposal only stops further repeats.
#[derive(Clone)]
pub struct ScheduleHandle {
    state: Arc<HandleState>,
}

impl ScheduleHandle {
    /// Creates a pending handle.
    #[must_use]
    pub fn new() -> Self {
        Self::build(PENDING, None)
    }

    /// Creates a pending handle that runs `hook` if cancelled before firing.
    ///
    /// Used by providers that can release resources early (drop a pending timer,
    /// drop a queued entry).
    #[must_use]
    pub fn with_cancel_hook(hook: impl FnOnce() + Send + 'static) -> Self {
        Self::build(PENDING, Some(Box::new(hook)))
    }

    /// Creates a handle for work that already ran synchronously.
    #[must_use]
    pub fn completed() -> Self {
        Self::build(RUNNING, None)
    }

    fn build(phase: u8, hook: Option<CancelHook>) -> Self {
        Self {
            state: Arc::new(HandleState {
                phase: AtomicU8::new(phase),
                disposed: AtomicBool::new(false),
                on_cancel: Mutex::new(hook),
            }),
        }
    }

    /// Claims the right to run the callback.
    ///
    /// Returns true on the first call for a pending handle, and on repeat
    /// calls while the handle stays undisposed (periodic callbacks). Returns
    /// false once cancelled or disposed.
    pub fn try_begin(&self) -> bool {
        match self.state.phase.compare_exchange(
            PENDING,
            RUNNING,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {
                self.state.on_cancel.lock().take();
                true
            }
            Err(RUNNING) => !self.state.disposed.load(Ordering::Acquire),
            Err(_) => false,
        }
    }

    /// Returns true if disposal won before the callback started.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state.phase.load(Ordering::Acquire) == CANCELLED
    }

    /// Returns true once the callback has started.
    #[must_use]
    pub fn has_started(&self) -> bool {
        self.state.phase.load(Ordering::Acquire) == RUNNING
    }
}

impl Default for ScheduleHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl Disposable for ScheduleHandle {
    fn dispose(&self) {
        if self.state.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let cancelled = self
            .state
            .phase
            .compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if cancelled {
            let hook = self.state.on_cancel.lock().take();
            if let Some(hook) = hook {
                hook();
            }
        }
    }

    fn is_disposed(&self) -> bool {
        self.state.disposed.load(Ordering::Acquire)
    }
}

impl fmt::Debug for ScheduleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self.state.phase.load(Ordering::Acquire) {
            PENDING => "pending",
            RUNNING => "running",
            _ => "cancelled",
        };
        f.debug_struct("ScheduleHandle")
            .field("phase", &phase)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
