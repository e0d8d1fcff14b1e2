//! Priority-ordered dispatcher queue: one logical execution context.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::{ScheduleHandle, Scheduler, Timing, Work};
use crate::disposable::Disposable;
use crate::error::{Error, ErrorKind, Result};
use crate::tracing_compat::{debug, trace};
use crate::unhandled::{self, SharedSink};

/// Dispatcher priority. Higher runs first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum DispatchPriority {
    /// Idle-time work.
    Background,
    /// Ordinary work.
    #[default]
    Normal,
    /// Layout and rendering.
    Render,
    /// User input handling.
    Input,
}

struct Entry {
    id: u64,
    priority: DispatchPriority,
    handle: ScheduleHandle,
    work: Work,
}

fn insert_by_priority(queue: &mut VecDeque<Entry>, entry: Entry) {
    // Higher priority first; stable for equal priority.
    let pos = queue
        .iter()
        .position(|e| entry.priority > e.priority)
        .unwrap_or(queue.len());
    queue.insert(pos, entry);
}

type Queue = Mutex<VecDeque<Entry>>;

fn remove_entry(queue: &Weak<Queue>, id: u64) {
    let Some(queue) = queue.upgrade() else {
        return;
    };
    let removed = {
        let mut queue = queue.lock();
        queue
            .iter()
            .position(|e| e.id == id)
            .and_then(|pos| queue.remove(pos))
    };
    // Dropped outside the lock; the work's captures may post again.
    drop(removed);
}

/// A serialized work queue pumped by its owner.
///
/// Work posted from any thread runs on whichever thread calls
/// [`run_pending`](Self::run_pending) or [`run_until`](Self::run_until),
/// one item at a time, highest priority first and FIFO within a priority.
/// Disposing a handle before its item runs removes the item from the queue.
pub struct Dispatcher {
    queue: Arc<Queue>,
    next_id: AtomicU64,
    posted: Condvar,
    shutdown: AtomicBool,
    sink: Option<SharedSink>,
}

impl Dispatcher {
    /// Creates an empty dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: Arc::new(Mutex::new(VecDeque::new())),
            next_id: AtomicU64::new(0),
            posted: Condvar::new(),
            shutdown: AtomicBool::new(false),
            sink: None,
        }
    }

    /// Reports panics from dispatched work to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Queues `work` at `priority`.
    pub fn post(&self, work: Work, priority: DispatchPriority) -> Result<ScheduleHandle> {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(Error::new(ErrorKind::SchedulerShutdown)
                .with_message("dispatcher has shut down"));
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let queue = Arc::downgrade(&self.queue);
        let handle = ScheduleHandle::with_cancel_hook(move || remove_entry(&queue, id));
        insert_by_priority(
            &mut self.queue.lock(),
            Entry {
                id,
                priority,
                handle: handle.clone(),
                work,
            },
        );
        self.posted.notify_all();
        trace!(?priority, "work posted to dispatcher");
        Ok(handle)
    }

    /// Runs the highest-priority queued item. Returns false if none was queued.
    pub fn run_one(&self) -> bool {
        let Some(entry) = self.queue.lock().pop_front() else {
            return false;
        };
        if entry.handle.try_begin() {
            unhandled::run_guarded(self.sink.as_ref(), entry.work);
        }
        true
    }

    /// Runs queued work until the queue is empty, including work posted by
    /// the items being run. Returns the number of items taken off the queue.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while self.run_one() {
            ran += 1;
        }
        ran
    }

    /// Pumps the queue until `done` returns true or `timeout` elapses.
    ///
    /// Blocks waiting for posts while the queue is empty. Returns the final
    /// value of `done`.
    pub fn run_until(&self, timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.run_pending();
            if done() {
                return true;
            }
            let mut queue = self.queue.lock();
            if queue.is_empty() && self.posted.wait_until(&mut queue, deadline).timed_out() {
                drop(queue);
                self.run_pending();
                return done();
            }
        }
    }

    /// Number of queued items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Returns true if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rejects further posts and drops queued work without running it.
    ///
    /// Every dropped item's handle is cancelled, so owners polling
    /// [`ScheduleHandle::is_cancelled`] learn the work will never run. The
    /// loss is reported to the sink as [`ErrorKind::SchedulerShutdown`].
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }
        let dropped = std::mem::take(&mut *self.queue.lock());
        self.posted.notify_all();
        debug!(dropped = dropped.len(), "dispatcher shut down");
        if dropped.is_empty() {
            return;
        }
        let count = dropped.len();
        for entry in dropped {
            entry.handle.dispose();
        }
        unhandled::report(
            self.sink.as_ref(),
            &Error::new(ErrorKind::SchedulerShutdown)
                .with_message(format!("dispatcher shut down with {count} queued items dropped")),
        );
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("queued", &self.len())
            .field("shutdown", &self.shutdown.load(Ordering::Acquire))
            .finish()
    }
}

/// Scheduler that posts onto a [`Dispatcher`].
///
/// `Now` posts at [`DispatchPriority::Normal`].
#[derive(Clone, Debug)]
pub struct DispatcherScheduler {
    dispatcher: Arc<Dispatcher>,
}

impl DispatcherScheduler {
    /// Creates a scheduler posting to `dispatcher`.
    #[must_use]
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// The dispatcher behind this scheduler.
    #[must_use]
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }
}

impl Scheduler for DispatcherScheduler {
    fn schedule(&self, work: Work, timing: Timing) -> Result<ScheduleHandle> {
        let priority = match timing {
            Timing::Now => DispatchPriority::Normal,
            Timing::Priority(p) => p,
            Timing::Delay(_) | Timing::Frames(_) => {
                return Err(Error::unsupported_timing(self.name(), timing));
            }
        };
        self.dispatcher.post(work, priority)
    }

    fn name(&self) -> &'static str {
        "DispatcherScheduler"
    }
}
