//! Hot multicast source.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use smallvec::SmallVec;

use super::{Observable, Observer};
use crate::disposable::Subscription;
use crate::error::{Error, Result};
use crate::notification::Completion;

type Observers<T> = SmallVec<[(u64, Arc<dyn Observer<T>>); 2]>;

struct Members<T> {
    observers: Observers<T>,
    terminal: Option<Completion>,
}

struct SubjectState<T> {
    /// One lock for both, so a subscriber is either listed before the
    /// terminal is taken or sees the terminal on arrival.
    members: Mutex<Members<T>>,
    next_id: AtomicU64,
}

/// An observer that is also an observable.
///
/// Calls to [`Observer`] methods are multicast to every current subscriber.
/// Delivery happens outside the subject's lock on the calling thread.
/// Subscribers arriving after completion receive the terminal signal
/// immediately.
pub struct Subject<T> {
    state: Arc<SubjectState<T>>,
}

impl<T> Subject<T> {
    /// Creates a subject with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(SubjectState {
                members: Mutex::new(Members {
                    observers: SmallVec::new(),
                    terminal: None,
                }),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.state.members.lock().observers.len()
    }

    /// Returns true once the subject completed.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.state.members.lock().terminal.is_some()
    }

    /// Current subscribers, or `None` once completed.
    fn snapshot(&self) -> Option<Observers<T>> {
        let members = self.state.members.lock();
        if members.terminal.is_some() {
            return None;
        }
        Some(members.observers.clone())
    }
}

impl<T> Default for Subject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T: Clone + Send + 'static> Observer<T> for Subject<T> {
    fn on_next(&self, value: T) {
        let Some(observers) = self.snapshot() else {
            return;
        };
        for (_, observer) in observers {
            observer.on_next(value.clone());
        }
    }

    fn on_error_resume(&self, error: Error) {
        let Some(observers) = self.snapshot() else {
            return;
        };
        for (_, observer) in observers {
            observer.on_error_resume(error.clone());
        }
    }

    fn on_completed(&self, completion: Completion) {
        let observers = {
            let mut members = self.state.members.lock();
            if members.terminal.is_some() {
                return;
            }
            members.terminal = Some(completion.clone());
            std::mem::take(&mut members.observers)
        };
        for (_, observer) in observers {
            observer.on_completed(completion.clone());
        }
    }
}

impl<T: Clone + Send + 'static> Observable<T> for Subject<T> {
    fn subscribe_core(&self, observer: Arc<dyn Observer<T>>) -> Result<Subscription> {
        let id = self.state.next_id.fetch_add(1, Ordering::Relaxed);
        let terminal = {
            let mut members = self.state.members.lock();
            match members.terminal.clone() {
                Some(completion) => Some(completion),
                None => {
                    members.observers.push((id, Arc::clone(&observer)));
                    None
                }
            }
        };
        if let Some(completion) = terminal {
            observer.on_completed(completion);
            return Ok(Subscription::empty());
        }

        let weak: Weak<SubjectState<T>> = Arc::downgrade(&self.state);
        Ok(Subscription::from_fn(move || {
            if let Some(state) = weak.upgrade() {
                state
                    .members
                    .lock()
                    .observers
                    .retain(|(other, _)| *other != id);
            }
        }))
    }
}

impl<T> std::fmt::Debug for Subject<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subject")
            .field("observers", &self.observer_count())
            .field("completed", &self.is_completed())
            .finish()
    }
}
