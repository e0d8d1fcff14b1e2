//! Moves the act of subscribing onto a scheduler.

use std::sync::Arc;

use crate::disposable::{CompositeDisposable, SingleAssignmentDisposable, Subscription};
use crate::error::Result;
use crate::notification::Completion;
use crate::observable::{Observable, ObservableExt, Observer};
use crate::scheduler::Scheduler;

/// Subscribes to the source from inside scheduled work.
///
/// The subscription returned to the caller exists immediately. Disposing it
/// before the work runs cancels the work; a source subscription produced
/// after disposal is disposed as soon as it is assigned. A subscribe failure
/// inside the work reaches the observer as `on_completed(Failure)`.
pub struct SubscribeOn<S> {
    source: Arc<S>,
    scheduler: Arc<dyn Scheduler>,
}

impl<S> SubscribeOn<S> {
    pub(crate) fn new(source: S, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            source: Arc::new(source),
            scheduler,
        }
    }
}

impl<S, T> Observable<T> for SubscribeOn<S>
where
    S: Observable<T>,
    T: 'static,
{
    fn subscribe_core(&self, observer: Arc<dyn Observer<T>>) -> Result<Subscription> {
        let slot = Arc::new(SingleAssignmentDisposable::new());
        let source = Arc::clone(&self.source);
        let target = Arc::clone(&slot);

        let handle = self.scheduler.schedule_now(Box::new(move || {
            match source.subscribe(Arc::clone(&observer)) {
                Ok(subscription) => {
                    let _ = target.set(subscription);
                }
                Err(error) => observer.on_completed(Completion::Failure(error)),
            }
        }))?;

        let group = CompositeDisposable::new();
        group.add(Subscription::new(handle));
        group.add(Subscription::from_arc(slot));
        Ok(Subscription::new(group))
    }
}
