//! Cold sources built from closures and iterators.

use std::marker::PhantomData;
use std::sync::Arc;

use super::{Observable, Observer};
use crate::disposable::Subscription;
use crate::error::Result;
use crate::notification::Completion;

/// Source that runs a closure for every subscription.
pub struct Create<T, F> {
    subscribe: F,
    _marker: PhantomData<fn() -> T>,
}

/// Builds an observable from a subscribe function.
///
/// `subscribe` receives the observer and returns whatever must be released
/// when the subscriber disposes.
pub fn create<T, F>(subscribe: F) -> Create<T, F>
where
    F: Fn(Arc<dyn Observer<T>>) -> Result<Subscription> + Send + Sync + 'static,
{
    Create {
        subscribe,
        _marker: PhantomData,
    }
}

impl<T: 'static, F> Observable<T> for Create<T, F>
where
    F: Fn(Arc<dyn Observer<T>>) -> Result<Subscription> + Send + Sync + 'static,
{
    fn subscribe_core(&self, observer: Arc<dyn Observer<T>>) -> Result<Subscription> {
        (self.subscribe)(observer)
    }
}

/// Source that replays an iterable synchronously, then completes.
#[derive(Debug, Clone)]
pub struct FromIter<I> {
    items: I,
}

/// Builds an observable emitting every item of `items` on subscribe.
pub fn from_iter<I>(items: I) -> FromIter<I>
where
    I: IntoIterator + Clone + Send + Sync + 'static,
{
    FromIter { items }
}

impl<I> Observable<I::Item> for FromIter<I>
where
    I: IntoIterator + Clone + Send + Sync + 'static,
{
    fn subscribe_core(&self, observer: Arc<dyn Observer<I::Item>>) -> Result<Subscription> {
        for item in self.items.clone() {
            observer.on_next(item);
        }
        observer.on_completed(Completion::Success);
        Ok(Subscription::empty())
    }
}
