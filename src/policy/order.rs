//! Order Tracker Module
//!
//! Sequence-indexed key ordering shared by the built-in eviction policies.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

// == Order Tracker ==
/// Tracks keys by the logical sequence number of their last touch.
///
/// Keys are stored in a BTreeMap keyed by sequence number where:
/// - First = Oldest touch
/// - Last = Most recent touch
///
/// Sequence numbers are unique and strictly increasing, so ties between keys
/// touched "at the same time" are always broken by touch order, never by key.
#[derive(Debug)]
pub struct OrderTracker<K> {
    /// Keys by touch sequence
    order: BTreeMap<u64, K>,
    /// Current sequence of each tracked key
    positions: HashMap<K, u64>,
    /// Next sequence number to hand out
    next_seq: u64,
}

impl<K> Default for OrderTracker<K> {
    fn default() -> Self {
        Self {
            order: BTreeMap::new(),
            positions: HashMap::new(),
            next_seq: 0,
        }
    }
}

impl<K: Clone + Eq + Hash> OrderTracker<K> {
    // == Constructor ==
    /// Creates a new empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a key as the most recent (moves it to the back of the order).
    ///
    /// If the key is already tracked its previous position is dropped first.
    pub fn touch(&mut self, key: &K) {
        if let Some(seq) = self.positions.remove(key) {
            self.order.remove(&seq);
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, key.clone());
        self.positions.insert(key.clone(), seq);
    }

    // == Remove ==
    /// Removes a key from the tracker. Returns whether it was tracked.
    pub fn remove(&mut self, key: &K) -> bool {
        match self.positions.remove(key) {
            Some(seq) => {
                self.order.remove(&seq);
                true
            }
            None => false,
        }
    }

    // == Peek Oldest ==
    /// Returns the key with the oldest touch without removing it.
    pub fn peek_oldest(&self) -> Option<&K> {
        self.order.values().next()
    }

    /// Iterates keys from oldest to most recent touch.
    pub fn iter(&self) -> impl Iterator<Item = &K> {
        self.order.values()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.positions.contains_key(key)
    }

    /// Forgets every key. Sequence numbers keep increasing.
    pub fn clear(&mut self) {
        self.order.clear();
        self.positions.clear();
    }
}
