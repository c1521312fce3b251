//! Single-reader alert buffers.
//!
//! A [`Mailbox`] is a thread-safe, unbounded bag of updates. Producers append
//! and a single consumer drains. Draining is snapshot-and-clear under one
//! lock, so an update is returned by at most one drain. There is no
//! expiration logic here: owners that need deadlines track them elsewhere.

use parking_lot::Mutex;

/// Correlation id of a page-scoped queue (the id of the displayed object).
pub type ObjectId = events::Id;

#[derive(Debug)]
pub struct Mailbox<T> {
    items: Mutex<Vec<T>>,
}

impl<T> Mailbox<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
        }
    }

    /// Add an update at the tail. Never blocks for longer than the push.
    pub fn append(&self, item: T) {
        self.items.lock().push(item);
    }

    /// Remove and return every update, in insertion order.
    pub fn drain(&self) -> Vec<T> {
        std::mem::take(&mut *self.items.lock())
    }

    /// Remove and return only the updates matching `predicate`.
    ///
    /// Non-matching updates stay queued in their original relative order.
    pub fn drain_matching<F>(&self, mut predicate: F) -> Vec<T>
    where
        F: FnMut(&T) -> bool,
    {
        let mut items = self.items.lock();
        let (matched, kept): (Vec<T>, Vec<T>) =
            items.drain(..).partition(|item| predicate(item));
        *items = kept;
        matched
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Mailbox bound to one page-scoped object.
///
/// Created when a page registers interest in updates about `object_id`;
/// producers append only updates about that object.
#[derive(Debug)]
pub struct PersonalAlertQueue<T> {
    object_id: ObjectId,
    mailbox: Mailbox<T>,
}

impl<T> PersonalAlertQueue<T> {
    pub fn new(object_id: ObjectId) -> Self {
        Self {
            object_id,
            mailbox: Mailbox::new(),
        }
    }

    pub fn object_id(&self) -> ObjectId {
        self.object_id
    }

    pub fn append(&self, update: T) {
        self.mailbox.append(update);
    }

    pub fn drain(&self) -> Vec<T> {
        self.mailbox.drain()
    }

    pub fn drain_matching<F>(&self, predicate: F) -> Vec<T>
    where
        F: FnMut(&T) -> bool,
    {
        self.mailbox.drain_matching(predicate)
    }

    pub fn len(&self) -> usize {
        self.mailbox.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mailbox.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_drain_returns_in_insertion_order_and_clears() {
        let mailbox = Mailbox::new();
        mailbox.append("a");
        mailbox.append("b");
        mailbox.append("a");

        assert_eq!(mailbox.drain(), vec!["a", "b", "a"]);
        assert!(mailbox.is_empty());
        assert!(mailbox.drain().is_empty());
    }

    #[test]
    fn test_drain_matching_keeps_the_rest_in_order() {
        let mailbox = Mailbox::new();
        for n in 1..=6 {
            mailbox.append(n);
        }

        assert_eq!(mailbox.drain_matching(|n| n % 2 == 0), vec![2, 4, 6]);
        assert_eq!(mailbox.len(), 3);
        assert_eq!(mailbox.drain(), vec![1, 3, 5]);
    }

    #[test]
    fn test_drain_matching_with_no_match_leaves_mailbox_untouched() {
        let mailbox = Mailbox::new();
        mailbox.append(1);
        mailbox.append(2);

        assert!(mailbox.drain_matching(|n| *n > 10).is_empty());
        assert_eq!(mailbox.drain(), vec![1, 2]);
    }

    #[test]
    fn test_personal_queue_reports_its_object_id() {
        let queue = PersonalAlertQueue::new(42);
        queue.append("refresh");
        assert_eq!(queue.object_id(), 42);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.drain(), vec!["refresh"]);
    }

    #[test]
    fn test_concurrent_drains_never_return_an_item_twice() {
        let mailbox = Arc::new(Mailbox::new());
        for n in 0..10_000 {
            mailbox.append(n);
        }

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let mailbox = Arc::clone(&mailbox);
                std::thread::spawn(move || {
                    let mut seen = Vec::new();
                    for _ in 0..50 {
                        seen.extend(mailbox.drain_matching(|n| n % 3 == 0));
                        seen.extend(mailbox.drain());
                    }
                    seen
                })
            })
            .collect();

        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.join().unwrap());
        }
        let unique: HashSet<_> = all.iter().copied().collect();
        assert_eq!(all.len(), 10_000);
        assert_eq!(unique.len(), 10_000);
    }
}
