//! Scheduler marshalling with a batching drain loop.
//!
//! Producers on any thread append notifications to a [`SwapListCore`] under
//! one mutex. The first append into an idle observer schedules a drain; the
//! drain swaps the whole batch out and delivers it in order without the
//! lock held. If more arrived meanwhile, it hands a new drain back to the
//! scheduler instead of looping inline. At most one drain is active or
//! scheduled per observer.
//!
//! A posted drain the scheduler later cancels (a dispatcher shutting down)
//! no longer counts as running: the next push posts again, and a scheduler
//! that refuses the post is reported to the sink with the pending batch
//! discarded.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::defaults;
use crate::disposable::{Disposable, SingleAssignmentDisposable, Subscription};
use crate::error::{Error, Result};
use crate::notification::{Completion, Notification};
use crate::observable::{Observable, ObservableExt, Observer};
use crate::scheduler::{ScheduleHandle, Scheduler};
use crate::swap_list::SwapListCore;
use crate::tracing_compat::trace;
use crate::unhandled::{self, SharedSink};

/// Re-delivers every notification on a scheduler.
pub struct ObserveOn<S> {
    source: S,
    scheduler: Arc<dyn Scheduler>,
    sink: Option<SharedSink>,
    capacity: Option<usize>,
}

impl<S> ObserveOn<S> {
    pub(crate) fn new(source: S, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            source,
            scheduler,
            sink: None,
            capacity: None,
        }
    }

    /// Reports panics from downstream delivery to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Overrides the initial swap-list capacity.
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }
}

impl<S, T> Observable<T> for ObserveOn<S>
where
    S: Observable<T>,
    T: Send + 'static,
{
    fn subscribe_core(&self, observer: Arc<dyn Observer<T>>) -> Result<Subscription> {
        let capacity = self
            .capacity
            .unwrap_or_else(|| defaults::current().swap_list_capacity());
        let marshal = Arc::new(ObserveOnObserver {
            drain: Arc::new(DrainShared {
                state: Mutex::new(DrainState {
                    list: SwapListCore::with_capacity(capacity),
                    running: false,
                    ticket: 0,
                    posted: None,
                }),
                disposed: AtomicBool::new(false),
                downstream: observer,
                scheduler: Arc::clone(&self.scheduler),
                sink: self.sink.clone(),
            }),
            upstream: SingleAssignmentDisposable::new(),
        });

        let upstream = self.source.subscribe(marshal.clone())?;
        marshal.upstream.set(upstream)?;
        Ok(Subscription::from_arc(marshal))
    }
}

struct DrainState<T> {
    list: SwapListCore<Notification<T>>,
    running: bool,
    /// Bumped on every post so a late handle is only kept for the current one.
    ticket: u64,
    posted: Option<ScheduleHandle>,
}

impl<T> DrainState<T> {
    /// Claims the drain slot. False if a live drain is already pending.
    fn try_claim(&mut self) -> Option<u64> {
        if self.running && !self.posted.as_ref().is_some_and(ScheduleHandle::is_cancelled) {
            return None;
        }
        self.running = true;
        self.ticket += 1;
        self.posted = None;
        Some(self.ticket)
    }

    fn release(&mut self) {
        self.running = false;
        self.posted = None;
    }
}

struct DrainShared<T> {
    state: Mutex<DrainState<T>>,
    disposed: AtomicBool,
    downstream: Arc<dyn Observer<T>>,
    scheduler: Arc<dyn Scheduler>,
    sink: Option<SharedSink>,
}

impl<T: Send + 'static> DrainShared<T> {
    fn enqueue(self: &Arc<Self>, notification: Notification<T>) {
        let ticket = {
            let mut state = self.state.lock();
            if !state.list.add(notification) {
                return;
            }
            match state.try_claim() {
                Some(ticket) => ticket,
                None => return,
            }
        };
        trace!(scheduler = self.scheduler.name(), "drain scheduled");
        self.post_drain(ticket);
    }

    /// Hands a drain to the scheduler. The slot must already be claimed.
    fn post_drain(self: &Arc<Self>, ticket: u64) {
        let this = Arc::clone(self);
        match self.scheduler.schedule_now(Box::new(move || this.drain())) {
            Ok(handle) => {
                let mut state = self.state.lock();
                if state.running && state.ticket == ticket {
                    state.posted = Some(handle);
                }
            }
            Err(err) => {
                let discarded = {
                    let mut state = self.state.lock();
                    state.release();
                    let batch = state.list.swap();
                    let discarded = batch.len();
                    state.list.clear(batch);
                    discarded
                };
                trace!(discarded, "drain could not be scheduled");
                let _ = discarded;
                unhandled::report(self.sink.as_ref(), &err);
            }
        }
    }

    fn drain(self: &Arc<Self>) {
        let mut batch = {
            let mut state = self.state.lock();
            if state.list.is_disposed() {
                state.release();
                return;
            }
            state.list.swap()
        };

        for notification in batch.drain(..) {
            if self.disposed.load(Ordering::Acquire) {
                break;
            }
            let downstream = self.downstream.as_ref();
            unhandled::run_guarded(self.sink.as_ref(), || notification.accept(downstream));
        }

        let repost = {
            let mut state = self.state.lock();
            state.list.clear(batch);
            if state.list.is_disposed() || state.list.is_empty() {
                state.release();
                None
            } else {
                state.ticket += 1;
                state.posted = None;
                Some(state.ticket)
            }
        };
        if let Some(ticket) = repost {
            trace!(scheduler = self.scheduler.name(), "drain re-posted");
            self.post_drain(ticket);
        }
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.state.lock().list.dispose();
    }
}

/// Upstream-facing observer of [`ObserveOn`].
///
/// Opts out of auto-dispose so a completion from upstream does not tear
/// down the chain while buffered items are still waiting to flush.
struct ObserveOnObserver<T> {
    drain: Arc<DrainShared<T>>,
    upstream: SingleAssignmentDisposable,
}

impl<T: Send + 'static> Observer<T> for ObserveOnObserver<T> {
    fn on_next(&self, value: T) {
        self.drain.enqueue(Notification::Next(value));
    }

    fn on_error_resume(&self, error: Error) {
        self.drain.enqueue(Notification::ErrorResume(error));
    }

    fn on_completed(&self, completion: Completion) {
        self.drain.enqueue(Notification::Completed(completion));
    }

    fn auto_dispose_on_completed(&self) -> bool {
        false
    }
}

impl<T: Send + 'static> Disposable for ObserveOnObserver<T> {
    fn dispose(&self) {
        self.drain.dispose();
        self.upstream.dispose();
    }

    fn is_disposed(&self) -> bool {
        self.drain.disposed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::observable::{from_iter, FnObserver, Subject};
    use crate::scheduler::{
        DispatchPriority, Dispatcher, DispatcherScheduler, ImmediateScheduler, ScheduleHandle,
        Timing, Work,
    };
    use crate::test_utils::{CollectingSink, RecordingObserver};

    fn dispatcher() -> (Arc<Dispatcher>, Arc<dyn Scheduler>) {
        let d = Arc::new(Dispatcher::new());
        let s: Arc<dyn Scheduler> = Arc::new(DispatcherScheduler::new(Arc::clone(&d)));
        (d, s)
    }

    #[test]
    fn nothing_delivered_until_scheduler_runs() {
        let (d, scheduler) = dispatcher();
        let rec = RecordingObserver::new();
        from_iter(vec![1, 2, 3])
            .observe_on(scheduler)
            .subscribe(rec.clone())
            .expect("subscribe");

        assert!(rec.events().is_empty());
        assert_eq!(d.len(), 1, "exactly one drain posted for the burst");
        d.run_pending();
        assert_eq!(rec.values(), vec![1, 2, 3]);
        assert_eq!(rec.completions(), 1);
    }

    #[test]
    fn items_arriving_mid_drain_are_reposted() {
        let (d, scheduler) = dispatcher();
        let subject = Subject::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (feedback, log) = (subject.clone(), Arc::clone(&seen));
        subject
            .clone()
            .observe_on(scheduler)
            .subscribe(Arc::new(FnObserver::new(move |v: u32| {
                log.lock().push(v);
                if v == 1 {
                    feedback.on_next(2);
                }
            })))
            .expect("subscribe");

        subject.on_next(1);
        assert!(d.run_one());
        assert_eq!(*seen.lock(), vec![1]);
        assert_eq!(d.len(), 1, "follow-up drain handed back to the scheduler");
        d.run_pending();
        assert_eq!(*seen.lock(), vec![1, 2]);
    }

    #[test]
    fn dispose_before_drain_suppresses_delivery() {
        let (d, scheduler) = dispatcher();
        let rec = RecordingObserver::new();
        let sub = from_iter(vec!['a', 'b'])
            .observe_on(scheduler)
            .subscribe(rec.clone())
            .expect("subscribe");
        sub.dispose();
        d.run_pending();
        assert!(rec.events().is_empty());
    }

    #[test]
    fn panicking_observer_does_not_stop_the_batch() {
        let (d, scheduler) = dispatcher();
        let sink = CollectingSink::new();
        let rec = RecordingObserver::panicking_on(|v: &i32| *v == 2);
        from_iter(vec![1, 2, 3])
            .observe_on(scheduler)
            .with_sink(sink.clone())
            .subscribe(rec.clone())
            .expect("subscribe");
        d.run_pending();

        assert_eq!(rec.values(), vec![1, 3]);
        assert_eq!(rec.completions(), 1);
        assert_eq!(sink.errors()[0].kind(), ErrorKind::ObserverPanicked);
    }

    #[test]
    fn immediate_scheduler_delivers_inline() {
        let rec = RecordingObserver::new();
        from_iter(vec![5, 6])
            .observe_on(Arc::new(ImmediateScheduler::new()))
            .subscribe(rec.clone())
            .expect("subscribe");
        assert_eq!(rec.values(), vec![5, 6]);
        assert_eq!(rec.completions(), 1);
    }

    #[test]
    fn completion_flushes_buffer_then_disposes_chain() {
        let (d, scheduler) = dispatcher();
        let subject = Subject::new();
        let rec = RecordingObserver::new();
        let sub = subject
            .clone()
            .observe_on(scheduler)
            .subscribe(rec.clone())
            .expect("subscribe");

        subject.on_next(10);
        subject.on_completed(Completion::Success);
        assert_eq!(subject.observer_count(), 0);
        assert!(!sub.is_disposed(), "buffer still pending");

        d.run_pending();
        assert_eq!(rec.values(), vec![10]);
        assert_eq!(rec.completions(), 1);
        assert!(sub.is_disposed());
    }

    struct RefusingScheduler;

    impl Scheduler for RefusingScheduler {
        fn schedule(&self, _work: Work, _timing: Timing) -> Result<ScheduleHandle> {
            Err(Error::new(ErrorKind::SchedulerShutdown))
        }

        fn name(&self) -> &'static str {
            "RefusingScheduler"
        }
    }

    #[test]
    fn schedule_failure_goes_to_sink_and_clears_running() {
        let sink = CollectingSink::new();
        let subject = Subject::new();
        let rec = RecordingObserver::<u8>::new();
        subject
            .clone()
            .observe_on(Arc::new(RefusingScheduler))
            .with_sink(sink.clone())
            .subscribe(rec.clone())
            .expect("subscribe");

        subject.on_next(1);
        subject.on_next(2);
        // Each push found the observer idle and tried again.
        assert_eq!(sink.errors().len(), 2);
        assert!(sink
            .errors()
            .iter()
            .all(|e| e.kind() == ErrorKind::SchedulerShutdown));
        assert!(rec.events().is_empty());
    }

    #[test]
    fn dispatcher_shutdown_with_queued_drain_is_reported() {
        let sink = CollectingSink::new();
        let d = Arc::new(Dispatcher::new().with_sink(sink.clone()));
        let scheduler: Arc<dyn Scheduler> = Arc::new(DispatcherScheduler::new(Arc::clone(&d)));
        let subject = Subject::new();
        let rec = RecordingObserver::<u32>::new();
        subject
            .clone()
            .observe_on(scheduler)
            .with_sink(sink.clone())
            .subscribe(rec.clone())
            .expect("subscribe");

        subject.on_next(1);
        assert_eq!(d.len(), 1);
        d.shutdown();
        for v in 2..10 {
            subject.on_next(v);
        }
        subject.on_completed(Completion::Success);

        assert!(rec.events().is_empty());
        let errors = sink.errors();
        // One from the dispatcher, then one per refused post.
        assert_eq!(errors.len(), 1 + 8 + 1);
        assert!(errors
            .iter()
            .all(|e| e.kind() == ErrorKind::SchedulerShutdown));
    }

    #[test]
    fn drains_post_at_normal_priority() {
        let (d, scheduler) = dispatcher();
        let rec = RecordingObserver::new();
        from_iter(vec![1])
            .observe_on(scheduler)
            .subscribe(rec.clone())
            .expect("subscribe");
        let log = Arc::new(Mutex::new(Vec::new()));
        let l = Arc::clone(&log);
        d.post(
            Box::new(move || l.lock().push("input")),
            DispatchPriority::Input,
        )
        .expect("post");
        d.run_one();
        assert_eq!(*log.lock(), vec!["input"]);
        assert!(rec.values().is_empty());
        d.run_pending();
        assert_eq!(rec.values(), vec![1]);
    }
}
