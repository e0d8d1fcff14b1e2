//! The subscription engine.
//!
//! An [`Observable`] is a stateless factory: each subscription builds a fresh
//! chain of observers, each stage owning an `Arc` to the next. An
//! [`Observer`] receives any number of `on_next` and `on_error_resume` calls
//! followed by at most one `on_completed`.
//!
//! [`ObservableExt::subscribe`] is the only supported way to attach an
//! observer. It wraps the observer in an auto-dispose layer that drops calls
//! after completion or disposal and releases the upstream subscription once
//! the sequence completes.

mod auto_dispose;
mod create;
mod observer_fn;
mod subject;

pub use create::{create, from_iter, Create, FromIter};
pub use observer_fn::FnObserver;
pub use subject::Subject;

pub(crate) use auto_dispose::AutoDisposeObserver;

use std::sync::Arc;

use crate::cancel::CancelToken;
use crate::disposable::Subscription;
use crate::error::{Error, Result};
use crate::future::OutcomeFuture;
use crate::notification::Completion;
use crate::operators::{
    aggregate, Filter, Map, ObserveOn, SubscribeOn, ThrottleFirstByTick,
};
use crate::scheduler::{FrameProvider, Scheduler};

/// Receiver of a push sequence.
///
/// Methods take `&self` and may be called from any thread; implementations
/// synchronize their own state.
pub trait Observer<T>: Send + Sync {
    /// Receives a value.
    fn on_next(&self, value: T);

    /// Receives a recoverable error. The sequence continues.
    fn on_error_resume(&self, error: Error);

    /// Receives the terminal signal.
    fn on_completed(&self, completion: Completion);

    /// Whether the auto-dispose layer releases upstream after completion.
    fn auto_dispose_on_completed(&self) -> bool {
        true
    }
}

impl<T, O: Observer<T> + ?Sized> Observer<T> for Arc<O> {
    fn on_next(&self, value: T) {
        (**self).on_next(value);
    }

    fn on_error_resume(&self, error: Error) {
        (**self).on_error_resume(error);
    }

    fn on_completed(&self, completion: Completion) {
        (**self).on_completed(completion);
    }

    fn auto_dispose_on_completed(&self) -> bool {
        (**self).auto_dispose_on_completed()
    }
}

/// Source of a push sequence.
pub trait Observable<T>: Send + Sync + 'static {
    /// Attaches `observer` and starts producing.
    ///
    /// Called by [`ObservableExt::subscribe`]; `observer` is already wrapped
    /// in the auto-dispose layer.
    fn subscribe_core(&self, observer: Arc<dyn Observer<T>>) -> Result<Subscription>;
}

impl<T, O: Observable<T> + ?Sized> Observable<T> for Arc<O> {
    fn subscribe_core(&self, observer: Arc<dyn Observer<T>>) -> Result<Subscription> {
        (**self).subscribe_core(observer)
    }
}

/// Subscription entry point and operator surface.
pub trait ObservableExt<T>: Observable<T> + Sized {
    /// Subscribes `observer` through the auto-dispose layer.
    ///
    /// Disposing the returned subscription stops delivery and releases the
    /// whole upstream chain.
    fn subscribe(&self, observer: Arc<dyn Observer<T>>) -> Result<Subscription>
    where
        T: 'static,
    {
        let layer = Arc::new(AutoDisposeObserver::new(observer));
        let upstream = self.subscribe_core(layer.clone())?;
        layer.set_upstream(upstream)?;
        Ok(Subscription::from_arc(layer))
    }

    /// Subscribes a closure receiving each value.
    ///
    /// Recoverable errors and failed completions go to the process-wide
    /// unhandled-error sink.
    fn subscribe_with<F>(&self, on_next: F) -> Result<Subscription>
    where
        T: 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        self.subscribe(Arc::new(FnObserver::new(on_next)))
    }

    /// Transforms each value.
    fn map<U, F>(self, f: F) -> Map<Self, F, T>
    where
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        Map::new(self, f)
    }

    /// Keeps values matching `predicate`.
    fn filter<P>(self, predicate: P) -> Filter<Self, P>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Filter::new(self, predicate)
    }

    /// Delivers every notification on `scheduler`, in order, one drain at a time.
    fn observe_on(self, scheduler: Arc<dyn Scheduler>) -> ObserveOn<Self> {
        ObserveOn::new(self, scheduler)
    }

    /// Performs the act of subscribing on `scheduler`.
    fn subscribe_on(self, scheduler: Arc<dyn Scheduler>) -> SubscribeOn<Self> {
        SubscribeOn::new(self, scheduler)
    }

    /// Emits the first value of each window of `count` ticks of the
    /// process-wide frame provider ([`defaults::frame_provider`]).
    ///
    /// [`defaults::frame_provider`]: crate::defaults::frame_provider
    fn throttle_first_by_tick(self, count: u64) -> Result<ThrottleFirstByTick<Self>> {
        ThrottleFirstByTick::new(self, count, crate::defaults::frame_provider())
    }

    /// Emits the first value of each window of `count` ticks of `provider`.
    fn throttle_first_by_tick_on(
        self,
        count: u64,
        provider: Arc<dyn FrameProvider>,
    ) -> Result<ThrottleFirstByTick<Self>> {
        ThrottleFirstByTick::new(self, count, provider)
    }

    /// Folds the sequence into a future.
    ///
    /// `select` maps the final accumulator to the result. See
    /// [`aggregate::aggregate_async`] for error and cancellation rules.
    fn aggregate_async<A, R, F, S>(
        &self,
        seed: A,
        fold: F,
        select: S,
        token: &CancelToken,
    ) -> OutcomeFuture<R>
    where
        T: Send + 'static,
        A: Send + 'static,
        R: Send + 'static,
        F: Fn(A, T) -> A + Send + Sync + 'static,
        S: FnOnce(A) -> Result<R> + Send + 'static,
    {
        aggregate::aggregate_async(self, seed, fold, select, token)
    }

    /// Collects every value into a vector.
    fn to_vec_async(&self, token: &CancelToken) -> OutcomeFuture<Vec<T>>
    where
        T: Send + 'static,
    {
        aggregate::to_vec_async(self, token)
    }

    /// Resolves with the last value, or [`ErrorKind::NoElements`] if none.
    ///
    /// [`ErrorKind::NoElements`]: crate::error::ErrorKind::NoElements
    fn last_async(&self, token: &CancelToken) -> OutcomeFuture<T>
    where
        T: Send + 'static,
    {
        aggregate::last_async(self, token)
    }
}

impl<T, O: Observable<T>> ObservableExt<T> for O {}
