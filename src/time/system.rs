//! Wall-clock time provider.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::TimeProvider;
use crate::error::{Result, ResultExt};
use crate::scheduler::{ScheduleHandle, Work};
use crate::tracing_compat::trace;
use crate::types::Time;
use crate::unhandled;

/// How long the timer thread lingers with an empty heap before exiting.
const TIMER_IDLE: Duration = Duration::from_secs(5);

struct Pending {
    deadline: Instant,
    seq: u64,
    handle: ScheduleHandle,
    work: Work,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct Wheel {
    heap: BinaryHeap<Pending>,
    next_seq: u64,
    running: bool,
}

struct TimerThread {
    wheel: Mutex<Wheel>,
    wake: Condvar,
}

impl TimerThread {
    fn run(&self) {
        let mut wheel = self.wheel.lock();
        loop {
            let Some(next) = wheel.heap.peek().map(|p| p.deadline) else {
                let idle = self.wake.wait_for(&mut wheel, TIMER_IDLE).timed_out();
                if idle && wheel.heap.is_empty() {
                    wheel.running = false;
                    break;
                }
                continue;
            };
            if next > Instant::now() {
                self.wake.wait_until(&mut wheel, next);
                continue;
            }
            let Some(due) = wheel.heap.pop() else {
                continue;
            };
            parking_lot::MutexGuard::unlocked(&mut wheel, || {
                if due.handle.try_begin() {
                    unhandled::run_guarded(None, due.work);
                }
            });
        }
        trace!("system timer thread idle, exiting");
    }

    fn cancel(&self, seq: u64) {
        let removed = {
            let mut wheel = self.wheel.lock();
            let before = wheel.heap.len();
            let mut kept = Vec::with_capacity(before);
            let mut removed = None;
            for entry in std::mem::take(&mut wheel.heap) {
                if entry.seq == seq {
                    removed = Some(entry);
                } else {
                    kept.push(entry);
                }
            }
            wheel.heap = BinaryHeap::from(kept);
            self.wake.notify_one();
            removed
        };
        // The work is dropped outside the lock; its captures may re-enter.
        drop(removed);
    }
}

/// Wall-clock provider.
///
/// All timers of a provider (and its clones) share one timer thread that
/// sleeps until the earliest deadline. The thread starts on the first timer
/// and exits after sitting idle. Cancelling a timer removes it from the heap
/// immediately.
#[derive(Clone)]
pub struct SystemTimeProvider {
    epoch: Instant,
    timers: Arc<TimerThread>,
}

impl SystemTimeProvider {
    /// Creates a provider whose epoch is now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            timers: Arc::new(TimerThread {
                wheel: Mutex::new(Wheel {
                    heap: BinaryHeap::new(),
                    next_seq: 0,
                    running: false,
                }),
                wake: Condvar::new(),
            }),
        }
    }

    /// Number of timers waiting to fire.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.timers.wheel.lock().heap.len()
    }
}

impl Default for SystemTimeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SystemTimeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemTimeProvider")
            .field("pending", &self.pending_timers())
            .finish_non_exhaustive()
    }
}

impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> Time {
        let nanos = u64::try_from(self.epoch.elapsed().as_nanos()).unwrap_or(u64::MAX);
        Time::from_nanos(nanos)
    }

    fn start_timer(&self, delay: Duration, work: Work) -> Result<ScheduleHandle> {
        let deadline = Instant::now() + delay;
        let mut wheel = self.timers.wheel.lock();
        let seq = wheel.next_seq;
        wheel.next_seq += 1;

        let timers: Weak<TimerThread> = Arc::downgrade(&self.timers);
        let handle = ScheduleHandle::with_cancel_hook(move || {
            if let Some(timers) = timers.upgrade() {
                timers.cancel(seq);
            }
        });

        if !wheel.running {
            let runner = Arc::clone(&self.timers);
            std::thread::Builder::new()
                .name("reflux-timer".to_string())
                .spawn(move || runner.run())
                .context("spawning timer thread")?;
            wheel.running = true;
        }
        wheel.heap.push(Pending {
            deadline,
            seq,
            handle: handle.clone(),
            work,
        });
        self.timers.wake.notify_one();
        drop(wheel);

        trace!(delay_ms = delay.as_millis() as u64, seq, "system timer started");
        Ok(handle)
    }

    fn is_wall_clock(&self) -> bool {
        true
    }
}
