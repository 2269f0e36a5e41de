//! Entry Store Module
//!
//! Bounded key-to-entry map holding the raw state eviction policies operate on.

use std::collections::HashMap;
use std::hash::Hash;

use crate::cache::CacheEntry;

// == Entry Store ==
/// Bounded mapping from key to [`CacheEntry`].
///
/// The store does not evict and does not synchronize. The cache core enforces
/// capacity and wraps the store in its lock.
#[derive(Debug)]
pub struct EntryStore<K, V> {
    /// Key-value storage
    entries: HashMap<K, CacheEntry<V>>,
    /// Maximum number of entries allowed
    capacity: usize,
    /// Logical clock for insert stamps
    next_seq: u64,
}

impl<K, V> EntryStore<K, V>
where
    K: Eq + Hash,
{
    // == Constructor ==
    /// Creates an empty store bounded at `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            capacity,
            next_seq: 0,
        }
    }

    fn tick(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    // == Get ==
    /// Looks up an entry without changing any ordering metadata.
    pub fn get(&self, key: &K) -> Option<&CacheEntry<V>> {
        self.entries.get(key)
    }

    // == Put ==
    /// Inserts or overwrites `key`.
    ///
    /// An overwrite is stamped as a fresh insert, so the most recent put wins
    /// any ordering tie. Returns the previous value, if any.
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        let seq = self.tick();
        self.entries
            .insert(key, CacheEntry::new(value, seq))
            .map(|old| old.value)
    }

    // == Remove ==
    /// Deletes `key` if present and returns its entry.
    pub fn remove(&mut self, key: &K) -> Option<CacheEntry<V>> {
        self.entries.remove(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    // == Length ==
    /// Returns the current number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns true when another new key would exceed capacity.
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// Iterates over the stored keys in arbitrary order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    // == Keys By Insertion ==
    /// Returns the stored keys ordered from oldest to newest insert.
    pub fn keys_by_insertion(&self) -> Vec<&K> {
        let mut stamped: Vec<(u64, &K)> = self
            .entries
            .iter()
            .map(|(key, entry)| (entry.inserted_at, key))
            .collect();
        stamped.sort_unstable_by_key(|(seq, _)| *seq);
        stamped.into_iter().map(|(_, key)| key).collect()
    }

    // == Clear ==
    /// Removes every entry and returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }
}
