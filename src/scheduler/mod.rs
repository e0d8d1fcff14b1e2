//! Schedulers: where and when observer work runs.
//!
//! A [`Scheduler`] accepts a unit of [`Work`] plus a [`Timing`] and returns a
//! [`ScheduleHandle`]. Disposing the handle before the work starts guarantees
//! it never runs. Realizations differ only in which timings they honour:
//!
//! | Scheduler | `Now` | `Delay(d)` | `Frames(n)` | `Priority(p)` |
//! |-----------|-------|------------|-------------|---------------|
//! | [`ImmediateScheduler`] | sync | `d == 0` only | no | sync |
//! | [`ThreadPoolScheduler`] | pool | no | no | pool |
//! | [`TimerScheduler`] | zero delay | yes | no | no |
//! | [`FrameScheduler`] | next tick | no | yes | no |
//! | [`DispatcherScheduler`] | `Normal` | no | no | yes |
//!
//! Timings a realization cannot honour are rejected with
//! [`ErrorKind::UnsupportedTiming`](crate::error::ErrorKind::UnsupportedTiming).

mod dispatcher;
mod frame;
mod handle;
mod immediate;
mod thread_pool;
mod timer;

pub use dispatcher::{DispatchPriority, Dispatcher, DispatcherScheduler};
pub use frame::{FrameCallback, FrameControl, FrameProvider, FrameScheduler, ManualFrameProvider};
pub use handle::ScheduleHandle;
pub use immediate::ImmediateScheduler;
pub use thread_pool::{PoolOptions, TaskPool, ThreadPoolScheduler, WorkerPool};
pub use timer::TimerScheduler;

use std::time::Duration;

use crate::error::Result;

/// A unit of work handed to a scheduler.
pub type Work = Box<dyn FnOnce() + Send + 'static>;

/// When scheduled work should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timing {
    /// As soon as the scheduler's context allows.
    Now,
    /// After a wall-clock (or virtual-clock) delay.
    Delay(Duration),
    /// After the given number of frame ticks.
    Frames(u64),
    /// As soon as possible, ordered by dispatcher priority.
    Priority(DispatchPriority),
}

/// Executes work on a particular execution context.
pub trait Scheduler: Send + Sync {
    /// Schedules `work` according to `timing`.
    fn schedule(&self, work: Work, timing: Timing) -> Result<ScheduleHandle>;

    /// Schedules `work` with [`Timing::Now`].
    fn schedule_now(&self, work: Work) -> Result<ScheduleHandle> {
        self.schedule(work, Timing::Now)
    }

    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;
}
