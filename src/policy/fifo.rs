//! FIFO Policy Module
//!
//! Evicts the entry that was inserted (or last overwritten) first.

use std::hash::Hash;

use super::{EvictionPolicy, OrderTracker};

// == FIFO Policy ==
/// First-in, first-out eviction. Reads never change the order.
#[derive(Debug)]
pub struct FifoPolicy<K> {
    insertions: OrderTracker<K>,
}

impl<K: Clone + Eq + Hash> FifoPolicy<K> {
    pub fn new() -> Self {
        Self {
            insertions: OrderTracker::new(),
        }
    }
}

impl<K: Clone + Eq + Hash> Default for FifoPolicy<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> EvictionPolicy<K> for FifoPolicy<K>
where
    K: Clone + Eq + Hash + Send,
{
    fn name(&self) -> &str {
        "fifo"
    }

    /// An overwrite re-enters the queue at the back.
    fn on_insert(&mut self, key: &K) {
        self.insertions.touch(key);
    }

    fn on_access(&mut self, _key: &K) {}

    fn on_remove(&mut self, key: &K) {
        self.insertions.remove(key);
    }

    fn select_victim(&mut self) -> Option<K> {
        self.insertions.peek_oldest().cloned()
    }

    fn clear(&mut self) {
        self.insertions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_empty_has_no_victim() {
        let mut policy: FifoPolicy<String> = FifoPolicy::new();
        assert_eq!(policy.select_victim(), None);
    }

    #[test]
    fn test_fifo_ignores_access() {
        let mut policy = FifoPolicy::new();
        policy.on_insert(&"a");
        policy.on_insert(&"b");
        policy.on_access(&"a");

        assert_eq!(policy.select_victim(), Some("a"));
    }

    #[test]
    fn test_fifo_reinsert_moves_to_back() {
        let mut policy = FifoPolicy::new();
        policy.on_insert(&"a");
        policy.on_insert(&"b");
        policy.on_insert(&"a");

        assert_eq!(policy.select_victim(), Some("b"));
    }

    #[test]
    fn test_fifo_remove_skips_key() {
        let mut policy = FifoPolicy::new();
        policy.on_insert(&"a");
        policy.on_insert(&"b");
        policy.on_remove(&"a");

        assert_eq!(policy.select_victim(), Some("b"));
        policy.on_remove(&"b");
        assert_eq!(policy.select_victim(), None);
    }
}
