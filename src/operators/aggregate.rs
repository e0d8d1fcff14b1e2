//! Push-to-future bridge: fold a sequence into an [`OutcomeFuture`].
//!
//! | Event | Result |
//! |-------|--------|
//! | `on_next` | folded into the accumulator |
//! | `on_next` during a fold | queued, folded in arrival order by the folding call |
//! | fold panics | failed with [`ErrorKind::ObserverPanicked`], subscription disposed |
//! | `on_error_resume(e)` | failed with `e` (first error wins), subscription disposed |
//! | `on_completed(Success)` | `select(acc)`; its `Err` or panic fails the future |
//! | `on_completed(Failure(e))` | failed with `e` |
//! | token cancelled | `Cancelled`, subscription disposed |
//!
//! With a token that is already cancelled the bridge resolves before the
//! source is attached. The source is still subscribed, but its subscription
//! is disposed as soon as it is assigned and no fold or select runs.
//!
//! `fold` and `select` run without any internal lock held, so a fold may push
//! back into its own source. A completion arriving mid-fold is applied once
//! the queued values are folded.

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::cancel::CancelToken;
use crate::disposable::{Disposable, SingleAssignmentDisposable, Subscription};
use crate::error::{Error, ErrorKind, Result};
use crate::future::{OutcomeFuture, ResultSlot};
use crate::notification::Completion;
use crate::observable::{Observable, ObservableExt, Observer};
use crate::tracing_compat::trace;
use crate::types::CancelReason;

/// Fold bookkeeping. The fold itself always runs with this unlocked.
struct FoldState<T, A, S> {
    /// `None` while a fold is in flight.
    acc: Option<A>,
    select: Option<S>,
    /// Values that arrived while another call was folding.
    backlog: VecDeque<T>,
    /// A completion that arrived while another call was folding.
    completion: Option<Completion>,
    folding: bool,
    resolved: bool,
}

impl<T, A, S> FoldState<T, A, S> {
    /// Marks the bridge resolved. Only the first caller gets true.
    fn claim(&mut self) -> bool {
        if self.resolved {
            return false;
        }
        self.resolved = true;
        self.backlog.clear();
        true
    }
}

struct AggregateObserver<T, A, R, F, S> {
    state: Mutex<FoldState<T, A, S>>,
    fold: F,
    slot: ResultSlot<R>,
    upstream: SingleAssignmentDisposable,
    registration: SingleAssignmentDisposable,
}

impl<T, A, R, F, S> AggregateObserver<T, A, R, F, S>
where
    T: Send,
    A: Send,
    R: Send,
    F: Fn(A, T) -> A + Send + Sync,
    S: FnOnce(A) -> Result<R> + Send,
{
    fn release(&self) {
        self.upstream.dispose();
        self.registration.dispose();
    }

    fn fail(&self, error: Error) {
        self.slot.set_err(error);
        self.release();
    }

    fn cancel(&self, reason: CancelReason) {
        let won = self.state.lock().claim();
        if won {
            trace!(%reason, "aggregate cancelled");
            self.slot.set_cancelled(reason);
        }
        self.release();
    }

    /// Folds queued values until the backlog is empty. Only the caller that
    /// set `folding` runs this, so values are folded in arrival order.
    fn pump(&self) {
        loop {
            let (acc, value) = {
                let mut state = self.state.lock();
                if state.resolved {
                    state.folding = false;
                    return;
                }
                let Some(value) = state.backlog.pop_front() else {
                    state.folding = false;
                    let deferred = state.completion.take();
                    drop(state);
                    if let Some(completion) = deferred {
                        self.finish(completion);
                    }
                    return;
                };
                let Some(acc) = state.acc.take() else {
                    state.folding = false;
                    return;
                };
                (acc, value)
            };

            match catch_unwind(AssertUnwindSafe(|| (self.fold)(acc, value))) {
                Ok(acc) => self.state.lock().acc = Some(acc),
                Err(payload) => {
                    let won = {
                        let mut state = self.state.lock();
                        state.folding = false;
                        state.claim()
                    };
                    if won {
                        self.fail(Error::from_panic(payload.as_ref()));
                    }
                    return;
                }
            }
        }
    }

    fn finish(&self, completion: Completion) {
        let parts = {
            let mut state = self.state.lock();
            if !state.claim() {
                return;
            }
            (state.acc.take(), state.select.take())
        };
        match completion {
            Completion::Success => {
                let (Some(acc), Some(select)) = parts else {
                    return;
                };
                let result = match catch_unwind(AssertUnwindSafe(|| select(acc))) {
                    Ok(result) => result,
                    Err(payload) => Err(Error::from_panic(payload.as_ref())),
                };
                self.slot.set_result(result);
                self.release();
            }
            Completion::Failure(error) => self.fail(error),
        }
    }
}

impl<T, A, R, F, S> Observer<T> for AggregateObserver<T, A, R, F, S>
where
    T: Send,
    A: Send,
    R: Send,
    F: Fn(A, T) -> A + Send + Sync,
    S: FnOnce(A) -> Result<R> + Send,
{
    fn on_next(&self, value: T) {
        {
            let mut state = self.state.lock();
            if state.resolved {
                return;
            }
            state.backlog.push_back(value);
            if state.folding {
                return;
            }
            state.folding = true;
        }
        self.pump();
    }

    fn on_error_resume(&self, error: Error) {
        let won = self.state.lock().claim();
        if won {
            self.fail(error);
        }
    }

    fn on_completed(&self, completion: Completion) {
        {
            let mut state = self.state.lock();
            if state.resolved {
                return;
            }
            if state.folding {
                // The folding call finishes once its backlog is empty.
                if state.completion.is_none() {
                    state.completion = Some(completion);
                }
                return;
            }
        }
        self.finish(completion);
    }
}

/// Folds `source` with `fold` from `seed`, then maps the accumulator with
/// `select`.
pub fn aggregate_async<O, T, A, R, F, S>(
    source: &O,
    seed: A,
    fold: F,
    select: S,
    token: &CancelToken,
) -> OutcomeFuture<R>
where
    O: Observable<T>,
    T: Send + 'static,
    A: Send + 'static,
    R: Send + 'static,
    F: Fn(A, T) -> A + Send + Sync + 'static,
    S: FnOnce(A) -> Result<R> + Send + 'static,
{
    let slot = ResultSlot::new();
    let future = slot.future();
    let observer = Arc::new(AggregateObserver {
        state: Mutex::new(FoldState {
            acc: Some(seed),
            select: Some(select),
            backlog: VecDeque::new(),
            completion: None,
            folding: false,
            resolved: false,
        }),
        fold,
        slot,
        upstream: SingleAssignmentDisposable::new(),
        registration: SingleAssignmentDisposable::new(),
    });

    if token.is_cancel_requested() {
        observer.cancel(token.reason().unwrap_or_default());
    } else {
        let weak = Arc::downgrade(&observer);
        let registration = token.on_cancel(move |reason: &CancelReason| {
            if let Some(observer) = weak.upgrade() {
                observer.cancel(reason.clone());
            }
        });
        // A registration that fires inline has already disposed the slot,
        // so this assignment releases it at once.
        let _ = observer.registration.set(Subscription::new(registration));
    }

    match source.subscribe(observer.clone()) {
        Ok(subscription) => {
            let _ = observer.upstream.set(subscription);
        }
        Err(error) => {
            let won = observer.state.lock().claim();
            if won {
                observer.fail(error);
            }
        }
    }
    future
}

/// Collects every value into a vector.
pub fn to_vec_async<O, T>(source: &O, token: &CancelToken) -> OutcomeFuture<Vec<T>>
where
    O: Observable<T>,
    T: Send + 'static,
{
    aggregate_async(
        source,
        Vec::new(),
        |mut acc: Vec<T>, value| {
            acc.push(value);
            acc
        },
        Ok,
        token,
    )
}

/// Resolves with the last value; an empty sequence fails with
/// [`ErrorKind::NoElements`].
pub fn last_async<O, T>(source: &O, token: &CancelToken) -> OutcomeFuture<T>
where
    O: Observable<T>,
    T: Send + 'static,
{
    aggregate_async(
        source,
        None,
        |_, value| Some(value),
        |last: Option<T>| {
            last.ok_or_else(|| {
                Error::new(ErrorKind::NoElements).with_message("sequence completed without values")
            })
        },
        token,
    )
}
