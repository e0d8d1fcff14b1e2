//! One-shot delayed scheduler over a [`TimeProvider`].

use std::sync::Arc;
use std::time::Duration;

use super::{ScheduleHandle, Scheduler, Timing, Work};
use crate::error::{Error, Result};
use crate::time::TimeProvider;
use crate::tracing_compat::trace;
use crate::unhandled::{self, SharedSink};

/// Fires work once after a delay measured by the injected clock.
#[derive(Clone)]
pub struct TimerScheduler {
    clock: Arc<dyn TimeProvider>,
    sink: Option<SharedSink>,
}

impl TimerScheduler {
    /// Creates a scheduler driven by `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn TimeProvider>) -> Self {
        Self { clock, sink: None }
    }

    /// Reports panics from timer callbacks to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// The clock behind this scheduler.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn TimeProvider> {
        &self.clock
    }
}

impl Scheduler for TimerScheduler {
    fn schedule(&self, work: Work, timing: Timing) -> Result<ScheduleHandle> {
        let delay = match timing {
            Timing::Now => Duration::ZERO,
            Timing::Delay(d) => d,
            Timing::Frames(_) | Timing::Priority(_) => {
                return Err(Error::unsupported_timing(self.name(), timing));
            }
        };
        let sink = self.sink.clone();
        trace!(delay_ms = delay.as_millis() as u64, "timer scheduled");
        self.clock.start_timer(
            delay,
            Box::new(move || {
                unhandled::run_guarded(sink.as_ref(), work);
            }),
        )
    }

    fn name(&self) -> &'static str {
        "TimerScheduler"
    }
}

impl std::fmt::Debug for TimerScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerScheduler")
            .field("now", &self.clock.now())
            .finish_non_exhaustive()
    }
}
