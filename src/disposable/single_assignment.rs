//! Single-assignment disposable slot.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use super::{Disposable, Subscription};
use crate::error::{Error, ErrorKind, Result};

/// A slot that receives one subscription, possibly after it was disposed.
///
/// - Assigning after dispose disposes the assigned subscription immediately.
/// - Disposing after assign disposes the assigned subscription exactly once.
/// - Assigning twice is an [`ErrorKind::AlreadyAssigned`] error; the second
///   subscription is left untouched.
#[derive(Default)]
pub struct SingleAssignmentDisposable {
    disposed: AtomicBool,
    slot: Mutex<SlotState>,
}

#[derive(Default)]
enum SlotState {
    #[default]
    Empty,
    Assigned(Subscription),
    Released,
}

impl SingleAssignmentDisposable {
    /// Creates an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `subscription` in the slot.
    pub fn set(&self, subscription: Subscription) -> Result<()> {
        let mut slot = self.slot.lock();
        match &*slot {
            SlotState::Empty if self.disposed.load(Ordering::Acquire) => {
                *slot = SlotState::Released;
                drop(slot);
                subscription.dispose();
                Ok(())
            }
            SlotState::Empty => {
                *slot = SlotState::Assigned(subscription);
                Ok(())
            }
            SlotState::Assigned(_) | SlotState::Released => Err(Error::new(
                ErrorKind::AlreadyAssigned,
            )
            .with_message("single-assignment slot already holds a subscription")),
        }
    }

    /// Returns true once a subscription has been stored.
    #[must_use]
    pub fn is_assigned(&self) -> bool {
        !matches!(&*self.slot.lock(), SlotState::Empty)
    }
}

impl Disposable for SingleAssignmentDisposable {
    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let previous = {
            let mut slot = self.slot.lock();
            match std::mem::take(&mut *slot) {
                SlotState::Assigned(sub) => {
                    *slot = SlotState::Released;
                    Some(sub)
                }
                other => {
                    *slot = other;
                    None
                }
            }
        };
        if let Some(sub) = previous {
            sub.dispose();
        }
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for SingleAssignmentDisposable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleAssignmentDisposable")
            .field("disposed", &self.is_disposed())
            .field("assigned", &self.is_assigned())
            .finish()
    }
}
