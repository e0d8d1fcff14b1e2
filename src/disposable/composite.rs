//! Group of disposables released together.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use smallvec::SmallVec;

use super::{Disposable, Subscription};

/// Disposes every member when disposed.
///
/// Adding to a disposed group disposes the new member immediately.
#[derive(Default)]
pub struct CompositeDisposable {
    disposed: AtomicBool,
    members: Mutex<SmallVec<[Subscription; 4]>>,
}

impl CompositeDisposable {
    /// Creates an empty group.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `subscription` to the group.
    pub fn add(&self, subscription: Subscription) {
        let mut members = self.members.lock();
        if self.disposed.load(Ordering::Acquire) {
            drop(members);
            subscription.dispose();
            return;
        }
        members.push(subscription);
    }

    /// Number of members currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.lock().len()
    }

    /// Returns true if no members are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Disposable for CompositeDisposable {
    fn dispose(&self) {
        let members = {
            let mut members = self.members.lock();
            if self.disposed.swap(true, Ordering::AcqRel) {
                return;
            }
            std::mem::take(&mut *members)
        };
        for member in members {
            member.dispose();
        }
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for CompositeDisposable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeDisposable")
            .field("disposed", &self.is_disposed())
            .field("members", &self.len())
            .finish()
    }
}
