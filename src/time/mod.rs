//! Clocks and one-shot timers.
//!
//! A [`TimeProvider`] tells the time and fires one-shot timers. Timed
//! operators never sleep themselves; they ask a provider.
//!
//! - [`SystemTimeProvider`]: wall clock, one timer thread over a deadline heap
//! - [`VirtualTimeProvider`]: manual clock for deterministic tests; timers
//!   fire from [`advance`](VirtualTimeProvider::advance)

mod system;
mod virtual_clock;

pub use system::SystemTimeProvider;
pub use virtual_clock::VirtualTimeProvider;

use std::time::Duration;

use crate::error::Result;
use crate::scheduler::{ScheduleHandle, Work};
use crate::types::Time;

/// Source of time and one-shot timers.
pub trait TimeProvider: Send + Sync {
    /// Current time relative to the provider's epoch.
    fn now(&self) -> Time;

    /// Runs `work` once, no earlier than `delay` from now.
    ///
    /// Disposing the returned handle before the deadline cancels the timer.
    fn start_timer(&self, delay: Duration, work: Work) -> Result<ScheduleHandle>;

    /// Returns true if this provider follows the wall clock.
    fn is_wall_clock(&self) -> bool {
        false
    }
}
