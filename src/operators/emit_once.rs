//! A single value followed by completion, now or after a delay.

use std::sync::Arc;
use std::time::Duration;

use crate::defaults;
use crate::disposable::{Disposable, SingleAssignmentDisposable, Subscription};
use crate::error::Result;
use crate::notification::Completion;
use crate::observable::{Observable, Observer};
use crate::scheduler::{Scheduler, TimerScheduler, Timing};
use crate::time::TimeProvider;
use crate::unhandled::{self, SharedSink};

/// Emits one value then [`Completion::Success`].
///
/// - Without a clock, delivery happens synchronously inside subscribe.
/// - With a wall clock and no delay, delivery is queued on the process-wide
///   thread-pool scheduler so the subscriber is not blocked.
/// - Otherwise a one-shot timer on the clock delivers after the delay and
///   then releases itself.
///
/// A panicking observer is reported to the configured sink, or the
/// process-wide one.
pub struct EmitOnce<T> {
    value: T,
    due: Duration,
    clock: Option<Arc<dyn TimeProvider>>,
    sink: Option<SharedSink>,
}

/// Emits `value` and completes, synchronously on subscribe.
pub fn emit_once<T>(value: T) -> EmitOnce<T>
where
    T: Clone + Send + Sync + 'static,
{
    EmitOnce {
        value,
        due: Duration::ZERO,
        clock: None,
        sink: None,
    }
}

/// Emits `value` and completes once `due` has elapsed on the process-wide
/// time provider ([`defaults::time_provider`]).
pub fn emit_once_after<T>(value: T, due: Duration) -> EmitOnce<T>
where
    T: Clone + Send + Sync + 'static,
{
    emit_once_after_on(value, due, defaults::time_provider())
}

/// Emits `value` and completes once `due` has elapsed on `clock`.
pub fn emit_once_after_on<T>(value: T, due: Duration, clock: Arc<dyn TimeProvider>) -> EmitOnce<T>
where
    T: Clone + Send + Sync + 'static,
{
    EmitOnce {
        value,
        due,
        clock: Some(clock),
        sink: None,
    }
}

impl<T> EmitOnce<T> {
    /// Reports observer panics to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sink = Some(sink);
        self
    }
}

fn deliver<T>(observer: &dyn Observer<T>, value: T) {
    observer.on_next(value);
    observer.on_completed(Completion::Success);
}

impl<T> Observable<T> for EmitOnce<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn subscribe_core(&self, observer: Arc<dyn Observer<T>>) -> Result<Subscription> {
        let value = self.value.clone();
        let sink = self.sink.clone();

        let Some(clock) = &self.clock else {
            unhandled::run_guarded(sink.as_ref(), || deliver(observer.as_ref(), value));
            return Ok(Subscription::empty());
        };

        if self.due.is_zero() && clock.is_wall_clock() {
            let handle = defaults::current().thread_pool().schedule_now(Box::new(move || {
                unhandled::run_guarded(sink.as_ref(), || deliver(observer.as_ref(), value));
            }))?;
            return Ok(Subscription::new(handle));
        }

        let slot = Arc::new(SingleAssignmentDisposable::new());
        let own_timer = Arc::clone(&slot);
        let timer = TimerScheduler::new(Arc::clone(clock));
        let handle = timer.schedule(
            Box::new(move || {
                unhandled::run_guarded(sink.as_ref(), || deliver(observer.as_ref(), value));
                own_timer.dispose();
            }),
            Timing::Delay(self.due),
        )?;
        slot.set(Subscription::new(handle))?;
        Ok(Subscription::from_arc(slot))
    }
}
