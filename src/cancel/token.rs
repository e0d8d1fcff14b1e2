//! Cancellation token with listener registration.

use core::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::disposable::Disposable;
use crate::types::CancelReason;

// ============================================================================
// Cancel Listener
// ============================================================================

/// Trait for cancellation listeners.
pub trait CancelListener: Send + Sync {
    /// Called when cancellation is requested.
    fn on_cancel(&self, reason: &CancelReason);
}

impl<F> CancelListener for F
where
    F: Fn(&CancelReason) + Send + Sync,
{
    fn on_cancel(&self, reason: &CancelReason) {
        self(reason);
    }
}

// ============================================================================
// CancelToken
// ============================================================================

struct TokenState {
    cancelled: AtomicBool,
    reason: Mutex<Option<CancelReason>>,
    next_listener_id: AtomicU64,
    listeners: Mutex<Vec<(u64, Arc<dyn CancelListener>)>>,
    children: Mutex<Vec<CancelToken>>,
}

/// A cloneable cancellation token.
///
/// Cancellation is one-way and first-caller-wins. Clones observe the same
/// state.
#[derive(Clone)]
pub struct CancelToken {
    state: Arc<TokenState>,
}

impl CancelToken {
    /// Creates a new, not-yet-cancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(TokenState {
                cancelled: AtomicBool::new(false),
                reason: Mutex::new(None),
                next_listener_id: AtomicU64::new(0),
                listeners: Mutex::new(Vec::new()),
                children: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Creates a token that is already cancelled with `reason`.
    #[must_use]
    pub fn cancelled(reason: CancelReason) -> Self {
        let token = Self::new();
        token.cancel(reason);
        token
    }

    /// Returns true if cancellation has been requested.
    #[must_use]
    pub fn is_cancel_requested(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    /// Returns the cancellation reason, if cancelled.
    #[must_use]
    pub fn reason(&self) -> Option<CancelReason> {
        self.state.reason.lock().clone()
    }

    /// Requests cancellation with the given reason.
    ///
    /// Returns true if this call triggered the cancellation (first caller wins).
    #[allow(clippy::must_use_candidate)]
    pub fn cancel(&self, reason: CancelReason) -> bool {
        {
            // Held across the flag flip so readers that see the flag also see the reason.
            let mut stored = self.state.reason.lock();
            if self
                .state
                .cancelled
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                return false;
            }
            *stored = Some(reason.clone());
        }

        let listeners = std::mem::take(&mut *self.state.listeners.lock());
        // Listeners run without the lock held; they may re-enter the token.
        for (_, listener) in listeners {
            listener.on_cancel(&reason);
        }

        let children = std::mem::take(&mut *self.state.children.lock());
        let parent_reason = CancelReason::parent_cancelled();
        for child in children {
            child.cancel(parent_reason.clone());
        }

        true
    }

    /// Registers a listener, invoked once when cancellation is requested.
    ///
    /// If the token is already cancelled the listener runs immediately on the
    /// calling thread. The returned registration removes the listener when
    /// disposed.
    pub fn on_cancel(&self, listener: impl CancelListener + 'static) -> CancelRegistration {
        let id = self.state.next_listener_id.fetch_add(1, Ordering::Relaxed);
        let listener: Arc<dyn CancelListener> = Arc::new(listener);

        // The cancelled check happens under the listeners lock: cancel() sets
        // the flag before draining, so a listener pushed here is always seen.
        let mut listeners = self.state.listeners.lock();
        if self.is_cancel_requested() {
            drop(listeners);
            let reason = self.reason().unwrap_or_default();
            listener.on_cancel(&reason);
            return CancelRegistration::detached();
        }
        listeners.push((id, listener));
        drop(listeners);

        CancelRegistration {
            id,
            state: Arc::downgrade(&self.state),
            disposed: AtomicBool::new(false),
        }
    }

    /// Creates a child token cancelled whenever this one is.
    #[must_use]
    pub fn child(&self) -> Self {
        let child = Self::new();
        let mut children = self.state.children.lock();
        if self.is_cancel_requested() {
            drop(children);
            child.cancel(CancelReason::parent_cancelled());
        } else {
            children.push(child.clone());
        }
        child
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancel_requested())
            .field("reason", &self.reason())
            .finish()
    }
}

// ============================================================================
// CancelRegistration
// ============================================================================

/// Handle to a registered cancel listener.
///
/// Disposing it unregisters the listener. Dropping it leaves the listener in
/// place.
pub struct CancelRegistration {
    id: u64,
    state: Weak<TokenState>,
    disposed: AtomicBool,
}

impl CancelRegistration {
    fn detached() -> Self {
        Self {
            id: u64::MAX,
            state: Weak::new(),
            disposed: AtomicBool::new(true),
        }
    }
}

impl Disposable for CancelRegistration {
    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(state) = self.state.upgrade() {
            state.listeners.lock().retain(|(id, _)| *id != self.id);
        }
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

impl fmt::Debug for CancelRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelRegistration")
            .field("id", &self.id)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
