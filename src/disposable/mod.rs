//! Disposal primitives.
//!
//! Every subscription, scheduled callback and cancel registration is released
//! through [`Disposable::dispose`]. Disposal is idempotent and callable from
//! any thread; the first call releases, later calls are no-ops.
//!
//! [`Subscription`] is the type-erased, cloneable handle handed back to
//! callers. Dropping it does not dispose anything.

mod action;
mod composite;
mod single_assignment;

pub use action::ActionDisposable;
pub use composite::CompositeDisposable;
pub use single_assignment::SingleAssignmentDisposable;

use core::fmt;
use std::sync::Arc;

/// A resource that can be released exactly once.
pub trait Disposable: Send + Sync {
    /// Releases the resource. Calls after the first are no-ops.
    fn dispose(&self);

    /// Returns true once [`dispose`](Self::dispose) has been called.
    fn is_disposed(&self) -> bool;
}

impl<D: Disposable + ?Sized> Disposable for Arc<D> {
    fn dispose(&self) {
        (**self).dispose();
    }

    fn is_disposed(&self) -> bool {
        (**self).is_disposed()
    }
}

/// Cloneable handle to a disposable resource.
#[derive(Clone)]
pub struct Subscription {
    inner: Arc<dyn Disposable>,
}

impl Subscription {
    /// Wraps a disposable.
    #[must_use]
    pub fn new(disposable: impl Disposable + 'static) -> Self {
        Self {
            inner: Arc::new(disposable),
        }
    }

    /// Wraps an already shared disposable without re-boxing it.
    #[must_use]
    pub fn from_arc(inner: Arc<dyn Disposable>) -> Self {
        Self { inner }
    }

    /// A subscription that owns nothing. It still tracks its own disposed flag.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(ActionDisposable::noop())
    }

    /// A subscription that runs `f` once on first dispose.
    #[must_use]
    pub fn from_fn(f: impl FnOnce() + Send + 'static) -> Self {
        Self::new(ActionDisposable::new(f))
    }

    /// Disposes the underlying resource.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    /// Returns true if the underlying resource is disposed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }
}

impl Disposable for Subscription {
    fn dispose(&self) {
        self.inner.dispose();
    }

    fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
