//! Per-value transforms.

use std::marker::PhantomData;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::disposable::Subscription;
use crate::error::{Error, Result};
use crate::notification::Completion;
use crate::observable::{Observable, ObservableExt, Observer};

/// Applies a function to every value.
///
/// A panicking function is reported downstream through `on_error_resume`
/// and the sequence continues.
pub struct Map<S, F, T> {
    source: S,
    f: Arc<F>,
    _marker: PhantomData<fn(T)>,
}

impl<S, F, T> Map<S, F, T> {
    pub(crate) fn new(source: S, f: F) -> Self {
        Self {
            source,
            f: Arc::new(f),
            _marker: PhantomData,
        }
    }
}

impl<S, F, T, U> Observable<U> for Map<S, F, T>
where
    S: Observable<T>,
    T: 'static,
    U: 'static,
    F: Fn(T) -> U + Send + Sync + 'static,
{
    fn subscribe_core(&self, observer: Arc<dyn Observer<U>>) -> Result<Subscription> {
        self.source.subscribe(Arc::new(MapObserver {
            downstream: observer,
            f: Arc::clone(&self.f),
            _marker: PhantomData::<fn(T)>,
        }))
    }
}

struct MapObserver<T, U, F> {
    downstream: Arc<dyn Observer<U>>,
    f: Arc<F>,
    _marker: PhantomData<fn(T)>,
}

impl<T, U, F> Observer<T> for MapObserver<T, U, F>
where
    F: Fn(T) -> U + Send + Sync,
{
    fn on_next(&self, value: T) {
        match catch_unwind(AssertUnwindSafe(|| (self.f)(value))) {
            Ok(mapped) => self.downstream.on_next(mapped),
            Err(payload) => self
                .downstream
                .on_error_resume(Error::from_panic(payload.as_ref())),
        }
    }

    fn on_error_resume(&self, error: Error) {
        self.downstream.on_error_resume(error);
    }

    fn on_completed(&self, completion: Completion) {
        self.downstream.on_completed(completion);
    }
}

/// Forwards values that satisfy a predicate.
///
/// A panicking predicate is reported downstream through `on_error_resume`.
pub struct Filter<S, P> {
    source: S,
    predicate: Arc<P>,
}

impl<S, P> Filter<S, P> {
    pub(crate) fn new(source: S, predicate: P) -> Self {
        Self {
            source,
            predicate: Arc::new(predicate),
        }
    }
}

impl<S, P, T> Observable<T> for Filter<S, P>
where
    S: Observable<T>,
    T: 'static,
    P: Fn(&T) -> bool + Send + Sync + 'static,
{
    fn subscribe_core(&self, observer: Arc<dyn Observer<T>>) -> Result<Subscription> {
        self.source.subscribe(Arc::new(FilterObserver {
            downstream: observer,
            predicate: Arc::clone(&self.predicate),
        }))
    }
}

struct FilterObserver<T, P> {
    downstream: Arc<dyn Observer<T>>,
    predicate: Arc<P>,
}

impl<T, P> Observer<T> for FilterObserver<T, P>
where
    P: Fn(&T) -> bool + Send + Sync,
{
    fn on_next(&self, value: T) {
        match catch_unwind(AssertUnwindSafe(|| (self.predicate)(&value))) {
            Ok(true) => self.downstream.on_next(value),
            Ok(false) => {}
            Err(payload) => self
                .downstream
                .on_error_resume(Error::from_panic(payload.as_ref())),
        }
    }

    fn on_error_resume(&self, error: Error) {
        self.downstream.on_error_resume(error);
    }

    fn on_completed(&self, completion: Completion) {
        self.downstream.on_completed(completion);
    }
}
