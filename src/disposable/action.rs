//! Disposable that runs a closure once.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use super::Disposable;

type Action = Box<dyn FnOnce() + Send>;

/// Runs its action on the first call to [`dispose`](Disposable::dispose).
pub struct ActionDisposable {
    disposed: AtomicBool,
    action: Mutex<Option<Action>>,
}

impl ActionDisposable {
    /// Creates a disposable that runs `action` on first dispose.
    #[must_use]
    pub fn new(action: impl FnOnce() + Send + 'static) -> Self {
        Self {
            disposed: AtomicBool::new(false),
            action: Mutex::new(Some(Box::new(action))),
        }
    }

    /// Creates a disposable with no action.
    #[must_use]
    pub fn noop() -> Self {
        Self {
            disposed: AtomicBool::new(false),
            action: Mutex::new(None),
        }
    }
}

impl Disposable for ActionDisposable {
    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let action = self.action.lock().take();
        if let Some(action) = action {
            action();
        }
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for ActionDisposable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionDisposable")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
