//! Single-resolution result slot and the future that awaits it.
//!
//! [`ResultSlot`] is written once by the push side (an observer reacting to
//! completion, failure or cancellation). [`OutcomeFuture`] reads it, either
//! as a [`Future`] from async code or by blocking with
//! [`wait`](OutcomeFuture::wait) / [`wait_timeout`](OutcomeFuture::wait_timeout).

use core::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::{Error, Result};
use crate::types::{CancelReason, Outcome};

enum SlotState<R> {
    Empty,
    Ready(Outcome<R, Error>),
    Taken,
}

struct Shared<R> {
    state: Mutex<(SlotState<R>, Option<Waker>)>,
    ready: Condvar,
}

/// Write side of a single-resolution result.
///
/// The first `set*` call wins; later ones return false and are ignored.
pub struct ResultSlot<R> {
    shared: Arc<Shared<R>>,
}

impl<R> ResultSlot<R> {
    /// Creates an unresolved slot.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new((SlotState::Empty, None)),
                ready: Condvar::new(),
            }),
        }
    }

    /// Returns a future resolving with this slot's outcome.
    ///
    /// Intended to be called once; every future shares the same single value.
    #[must_use]
    pub fn future(&self) -> OutcomeFuture<R> {
        OutcomeFuture {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Resolves the slot. Returns false if it was already resolved.
    pub fn set(&self, outcome: Outcome<R, Error>) -> bool {
        let waker = {
            let mut guard = self.shared.state.lock();
            if !matches!(guard.0, SlotState::Empty) {
                return false;
            }
            guard.0 = SlotState::Ready(outcome);
            guard.1.take()
        };
        self.shared.ready.notify_all();
        if let Some(waker) = waker {
            waker.wake();
        }
        true
    }

    /// Resolves with a value.
    pub fn set_ok(&self, value: R) -> bool {
        self.set(Outcome::Ok(value))
    }

    /// Resolves with a failure.
    pub fn set_err(&self, error: Error) -> bool {
        self.set(Outcome::Err(error))
    }

    /// Resolves as cancelled.
    pub fn set_cancelled(&self, reason: CancelReason) -> bool {
        self.set(Outcome::Cancelled(reason))
    }

    /// Resolves from a `Result`.
    pub fn set_result(&self, result: Result<R>) -> bool {
        self.set(Outcome::from(result))
    }

    /// Returns true once resolved.
    #[must_use]
    pub fn is_set(&self) -> bool {
        !matches!(self.shared.state.lock().0, SlotState::Empty)
    }
}

impl<R> Default for ResultSlot<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Clone for ResultSlot<R> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<R> fmt::Debug for ResultSlot<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultSlot")
            .field("set", &self.is_set())
            .finish()
    }
}

/// Read side of a [`ResultSlot`].
#[must_use = "futures do nothing unless awaited or waited on"]
pub struct OutcomeFuture<R> {
    shared: Arc<Shared<R>>,
}

impl<R> OutcomeFuture<R> {
    /// Returns true if the outcome is available.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self.shared.state.lock().0, SlotState::Ready(_))
    }

    /// Takes the outcome if available, without blocking.
    pub fn try_take(&self) -> Option<Outcome<R, Error>> {
        let mut guard = self.shared.state.lock();
        take_ready(&mut guard.0)
    }

    /// Blocks the current thread until the outcome is available.
    pub fn wait(self) -> Outcome<R, Error> {
        let mut guard = self.shared.state.lock();
        loop {
            if let Some(outcome) = take_ready(&mut guard.0) {
                return outcome;
            }
            if matches!(guard.0, SlotState::Taken) {
                return already_taken();
            }
            self.shared.ready.wait(&mut guard);
        }
    }

    /// Blocks for at most `timeout`. Hands the future back on timeout.
    pub fn wait_timeout(self, timeout: Duration) -> core::result::Result<Outcome<R, Error>, Self> {
        let deadline = Instant::now() + timeout;
        {
            let mut guard = self.shared.state.lock();
            loop {
                if let Some(outcome) = take_ready(&mut guard.0) {
                    return Ok(outcome);
                }
                if matches!(guard.0, SlotState::Taken) {
                    return Ok(already_taken());
                }
                if self.shared.ready.wait_until(&mut guard, deadline).timed_out() {
                    if let Some(outcome) = take_ready(&mut guard.0) {
                        return Ok(outcome);
                    }
                    break;
                }
            }
        }
        Err(self)
    }
}

fn take_ready<R>(state: &mut SlotState<R>) -> Option<Outcome<R, Error>> {
    match std::mem::replace(state, SlotState::Taken) {
        SlotState::Ready(outcome) => Some(outcome),
        other => {
            *state = other;
            None
        }
    }
}

fn already_taken<R>() -> Outcome<R, Error> {
    Outcome::Err(Error::internal("outcome already taken"))
}

impl<R> Future for OutcomeFuture<R> {
    type Output = Outcome<R, Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut guard = self.shared.state.lock();
        if let Some(outcome) = take_ready(&mut guard.0) {
            return Poll::Ready(outcome);
        }
        if matches!(guard.0, SlotState::Taken) {
            return Poll::Ready(already_taken());
        }
        match &guard.1 {
            Some(waker) if waker.will_wake(cx.waker()) => {}
            _ => guard.1 = Some(cx.waker().clone()),
        }
        Poll::Pending
    }
}

impl<R> fmt::Debug for OutcomeFuture<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutcomeFuture")
            .field("ready", &self.is_ready())
            .finish()
    }
}
