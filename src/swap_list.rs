//! Double-buffered append list for the drain loop.
//!
//! [`SwapListCore`] does no locking of its own. The owner keeps it inside the
//! same mutex as its `running` flag so enqueue and scheduling decisions are
//! made atomically. Producers append to the live buffer; the drainer swaps
//! the whole batch out, delivers it without the lock and hands the spent
//! storage back through [`SwapListCore::clear`].

/// Two vectors that trade places between producers and the drainer.
#[derive(Debug)]
pub struct SwapListCore<T> {
    live: Vec<T>,
    spare: Vec<T>,
    disposed: bool,
}

impl<T> SwapListCore<T> {
    /// Creates a list whose buffers start with `capacity` slots each.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            live: Vec::with_capacity(capacity),
            spare: Vec::with_capacity(capacity),
            disposed: false,
        }
    }

    /// Appends `item`. Returns false (dropping the item) once disposed.
    pub fn add(&mut self, item: T) -> bool {
        if self.disposed {
            return false;
        }
        self.live.push(item);
        true
    }

    /// Takes every pending item, installing the spare buffer as the live one.
    ///
    /// The returned batch must be handed back via [`clear`](Self::clear) to
    /// keep its allocation in circulation.
    pub fn swap(&mut self) -> Vec<T> {
        std::mem::swap(&mut self.live, &mut self.spare);
        std::mem::take(&mut self.spare)
    }

    /// Returns a drained batch's storage for reuse.
    pub fn clear(&mut self, mut batch: Vec<T>) {
        batch.clear();
        if !self.disposed && batch.capacity() > self.spare.capacity() {
            self.spare = batch;
        }
    }

    /// Number of items waiting in the live buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Returns true if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Returns true once [`dispose`](Self::dispose) ran.
    #[must_use]
    pub const fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Drops pending items and rejects further adds.
    pub fn dispose(&mut self) {
        self.disposed = true;
        self.live = Vec::new();
        self.spare = Vec::new();
    }
}

impl<T> Default for SwapListCore<T> {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_hands_out_batch_in_order() {
        let mut list = SwapListCore::with_capacity(4);
        assert!(list.add(1));
        assert!(list.add(2));
        assert!(list.add(3));

        let batch = list.swap();
        assert_eq!(batch, vec![1, 2, 3]);
        assert!(list.is_empty());
    }

    #[test]
    fn buffers_are_recycled() {
        let mut list = SwapListCore::with_capacity(8);
        list.add(1);
        let batch = list.swap();
        assert!(batch.capacity() >= 8);
        list.clear(batch);

        list.add(2);
        let second = list.swap();
        list.clear(second);
        list.add(3);
        let third = list.swap();
        assert_eq!(third, vec![3]);
        assert!(third.capacity() >= 8);
    }

    #[test]
    fn items_added_during_drain_wait_for_next_swap() {
        let mut list = SwapListCore::with_capacity(2);
        list.add('a');
        let batch = list.swap();
        list.add('b');
        assert_eq!(batch, vec!['a']);
        list.clear(batch);
        assert_eq!(list.swap(), vec!['b']);
    }

    #[test]
    fn dispose_rejects_adds() {
        let mut list = SwapListCore::with_capacity(2);
        list.add(1);
        list.dispose();
        assert!(list.is_disposed());
        assert!(!list.add(2));
        assert!(list.swap().is_empty());
    }
}
