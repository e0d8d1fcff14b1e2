//! Auto-dispose layer inserted by `subscribe`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::Observer;
use crate::disposable::{Disposable, SingleAssignmentDisposable, Subscription};
use crate::error::{Error, Result};
use crate::notification::Completion;

/// Wraps the subscriber's observer and owns the upstream subscription.
///
/// Once stopped (completed or disposed) every call is dropped. Completion is
/// forwarded at most once and then releases upstream, unless the wrapped
/// observer opted out via [`Observer::auto_dispose_on_completed`].
pub(crate) struct AutoDisposeObserver<T> {
    downstream: Arc<dyn Observer<T>>,
    upstream: SingleAssignmentDisposable,
    stopped: AtomicBool,
    disposed: AtomicBool,
}

impl<T> AutoDisposeObserver<T> {
    pub(crate) fn new(downstream: Arc<dyn Observer<T>>) -> Self {
        Self {
            downstream,
            upstream: SingleAssignmentDisposable::new(),
            stopped: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
        }
    }

    /// Stores the upstream subscription. Disposes it at once if this layer
    /// was already disposed, e.g. by a source that completed synchronously.
    pub(crate) fn set_upstream(&self, upstream: Subscription) -> Result<()> {
        self.upstream.set(upstream)
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire) || self.disposed.load(Ordering::Acquire)
    }
}

impl<T> Observer<T> for AutoDisposeObserver<T> {
    fn on_next(&self, value: T) {
        if self.is_stopped() {
            return;
        }
        self.downstream.on_next(value);
    }

    fn on_error_resume(&self, error: Error) {
        if self.is_stopped() {
            return;
        }
        self.downstream.on_error_resume(error);
    }

    fn on_completed(&self, completion: Completion) {
        if self.disposed.load(Ordering::Acquire) || self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        self.downstream.on_completed(completion);
        if self.downstream.auto_dispose_on_completed() {
            self.dispose();
        }
    }
}

impl<T> Disposable for AutoDisposeObserver<T> {
    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.stopped.store(true, Ordering::Release);
        self.upstream.dispose();
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::RecordingObserver;

    #[test]
    fn completion_delivered_once_then_disposes_upstream() {
        let rec = RecordingObserver::<i32>::new();
        let layer = AutoDisposeObserver::new(rec.clone());
        let upstream = Subscription::empty();
        layer.set_upstream(upstream.clone()).expect("assign");

        layer.on_next(1);
        layer.on_completed(Completion::Success);
        layer.on_completed(Completion::Success);
        layer.on_next(2);

        assert_eq!(rec.values(), vec![1]);
        assert_eq!(rec.completions(), 1);
        assert!(upstream.is_disposed());
        assert!(layer.is_disposed());
    }

    #[test]
    fn opt_out_keeps_upstream_alive() {
        let rec = RecordingObserver::<i32>::opted_out();
        let layer = AutoDisposeObserver::new(rec.clone());
        let upstream = Subscription::empty();
        layer.set_upstream(upstream.clone()).expect("assign");

        layer.on_completed(Completion::Success);
        assert!(!upstream.is_disposed());
        assert!(!layer.is_disposed());

        layer.on_next(5);
        assert!(rec.values().is_empty(), "stopped layer drops values");
    }

    #[test]
    fn dispose_silences_everything() {
        let rec = RecordingObserver::<i32>::new();
        let layer = AutoDisposeObserver::new(rec.clone());
        layer.dispose();

        layer.on_next(1);
        layer.on_error_resume(Error::user("late"));
        layer.on_completed(Completion::Success);
        assert!(rec.events().is_empty());

        let upstream = Subscription::empty();
        layer.set_upstream(upstream.clone()).expect("assign after dispose");
        assert!(upstream.is_disposed());
    }
}
