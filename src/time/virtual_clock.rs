//! Manually advanced time provider for deterministic tests.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Duration;

use parking_lot::Mutex;

use super::TimeProvider;
use crate::error::Result;
use crate::scheduler::{ScheduleHandle, Work};
use crate::tracing_compat::trace;
use crate::types::Time;

struct TimerEntry {
    deadline: Time,
    seq: u64,
    handle: ScheduleHandle,
    work: Work,
}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Eq for TimerEntry {}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap: earliest deadline, then registration order.
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct ClockState {
    now: Time,
    next_seq: u64,
    heap: BinaryHeap<TimerEntry>,
}

/// A clock that only moves when told to.
///
/// Timers fire from [`advance`](Self::advance) and
/// [`advance_to`](Self::advance_to), on the calling thread, in deadline
/// order and then registration order. While a timer runs, [`now`] reports
/// that timer's deadline. Cancelled timers are skipped lazily.
///
/// [`now`]: TimeProvider::now
pub struct VirtualTimeProvider {
    state: Mutex<ClockState>,
}

impl VirtualTimeProvider {
    /// Creates a clock at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(Time::ZERO)
    }

    /// Creates a clock at `time`.
    #[must_use]
    pub fn starting_at(time: Time) -> Self {
        Self {
            state: Mutex::new(ClockState {
                now: time,
                next_seq: 0,
                heap: BinaryHeap::new(),
            }),
        }
    }

    /// Advances the clock by `by`, firing every timer that comes due.
    ///
    /// Returns the number of timers fired.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.state.lock().now + by;
        self.advance_to(target)
    }

    /// Advances the clock to `target`, firing every timer that comes due.
    ///
    /// A target in the past only fires timers already due.
    pub fn advance_to(&self, target: Time) -> usize {
        let mut fired = 0;
        loop {
            let entry = {
                let mut state = self.state.lock();
                let due = state
                    .heap
                    .peek()
                    .is_some_and(|next| next.deadline <= target.max(state.now));
                if !due {
                    if target > state.now {
                        state.now = target;
                    }
                    break;
                }
                let Some(entry) = state.heap.pop() else {
                    break;
                };
                if entry.deadline > state.now {
                    state.now = entry.deadline;
                }
                entry
            };
            // Fired outside the lock; timers may schedule more timers.
            if entry.handle.try_begin() {
                (entry.work)();
                fired += 1;
            }
        }
        trace!(fired, "virtual clock advanced");
        fired
    }

    /// Number of timers still queued, including lazily cancelled ones.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.state.lock().heap.len()
    }

    /// Deadline of the earliest queued timer.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Time> {
        self.state.lock().heap.peek().map(|e| e.deadline)
    }
}

impl Default for VirtualTimeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeProvider for VirtualTimeProvider {
    fn now(&self) -> Time {
        self.state.lock().now
    }

    fn start_timer(&self, delay: Duration, work: Work) -> Result<ScheduleHandle> {
        let handle = ScheduleHandle::new();
        let mut state = self.state.lock();
        let deadline = state.now + delay;
        let seq = state.next_seq;
        state.next_seq += 1;
        state.heap.push(TimerEntry {
            deadline,
            seq,
            handle: handle.clone(),
            work,
        });
        trace!(%deadline, seq, "virtual timer registered");
        Ok(handle)
    }
}

impl std::fmt::Debug for VirtualTimeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("VirtualTimeProvider")
            .field("now", &state.now)
            .field("pending", &state.heap.len())
            .finish()
    }
}
