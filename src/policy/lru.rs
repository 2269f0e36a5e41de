//! LRU Policy Module
//!
//! Implements Least Recently Used eviction on top of the order tracker.

use std::hash::Hash;

use super::{EvictionPolicy, OrderTracker};

// == LRU Policy ==
/// Least-recently-used eviction. Inserts and reads both count as a use.
#[derive(Debug)]
pub struct LruPolicy<K> {
    recency: OrderTracker<K>,
}

impl<K: Clone + Eq + Hash> LruPolicy<K> {
    pub fn new() -> Self {
        Self {
            recency: OrderTracker::new(),
        }
    }
}

impl<K: Clone + Eq + Hash> Default for LruPolicy<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> EvictionPolicy<K> for LruPolicy<K>
where
    K: Clone + Eq + Hash + Send,
{
    fn name(&self) -> &str {
        "lru"
    }

    fn on_insert(&mut self, key: &K) {
        self.recency.touch(key);
    }

    fn on_access(&mut self, key: &K) {
        // Reads of keys the policy never saw must not start tracking them.
        if self.recency.contains(key) {
            self.recency.touch(key);
        }
    }

    fn on_remove(&mut self, key: &K) {
        self.recency.remove(key);
    }

    fn select_victim(&mut self) -> Option<K> {
        self.recency.peek_oldest().cloned()
    }

    fn clear(&mut self) {
        self.recency.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lru_empty_has_no_victim() {
        let mut policy: LruPolicy<u32> = LruPolicy::new();
        assert_eq!(policy.select_victim(), None);
    }

    #[test]
    fn test_lru_access_protects_key() {
        let mut policy = LruPolicy::new();
        policy.on_insert(&"a");
        policy.on_insert(&"b");
        policy.on_access(&"a");

        assert_eq!(policy.select_victim(), Some("b"));
    }

    #[test]
    fn test_lru_access_unknown_key_is_ignored() {
        let mut policy = LruPolicy::new();
        policy.on_insert(&"a");
        policy.on_access(&"ghost");

        assert_eq!(policy.select_victim(), Some("a"));
        policy.on_remove(&"a");
        assert_eq!(policy.select_victim(), None);
    }

    #[test]
    fn test_lru_victim_order_after_accesses() {
        let mut policy = LruPolicy::new();
        for key in ["a", "b", "c"] {
            policy.on_insert(&key);
        }
        policy.on_access(&"a");
        policy.on_access(&"b");

        assert_eq!(policy.select_victim(), Some("c"));
        policy.on_remove(&"c");
        assert_eq!(policy.select_victim(), Some("a"));
    }
}
