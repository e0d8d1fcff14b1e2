//! Scheduler that runs work on the calling thread.

use std::time::Duration;

use super::{ScheduleHandle, Scheduler, Timing, Work};
use crate::error::{Error, Result};
use crate::unhandled::{self, SharedSink};

/// Runs work synchronously inside [`Scheduler::schedule`].
///
/// There is no cancellation window: the returned handle has already started.
#[derive(Default, Clone)]
pub struct ImmediateScheduler {
    sink: Option<SharedSink>,
}

impl ImmediateScheduler {
    /// Creates a scheduler that reports panics to the process-wide sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports panics from scheduled work to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sink = Some(sink);
        self
    }
}

impl Scheduler for ImmediateScheduler {
    fn schedule(&self, work: Work, timing: Timing) -> Result<ScheduleHandle> {
        match timing {
            Timing::Now | Timing::Priority(_) => {}
            Timing::Delay(d) if d == Duration::ZERO => {}
            Timing::Delay(_) | Timing::Frames(_) => {
                return Err(Error::unsupported_timing(self.name(), timing));
            }
        }
        unhandled::run_guarded(self.sink.as_ref(), work);
        Ok(ScheduleHandle::completed())
    }

    fn name(&self) -> &'static str {
        "ImmediateScheduler"
    }
}

impl std::fmt::Debug for ImmediateScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImmediateScheduler").finish_non_exhaustive()
    }
}
