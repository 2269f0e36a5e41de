//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the cache against simple reference models.

use proptest::prelude::*;
use std::collections::{HashMap, VecDeque};

use crate::cache::Cache;
use crate::error::CacheError;
use crate::policy::{FifoPolicy, LruPolicy, PolicyKind};

// == Strategies ==
/// Generates keys from a small alphabet so operations collide often
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-h]{1,2}".prop_map(|s| s)
}

fn value_strategy() -> impl Strategy<Value = u32> {
    any::<u32>()
}

fn capacity_strategy() -> impl Strategy<Value = usize> {
    1usize..8
}

/// Generates a sequence of cache operations for testing
#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: u32 },
    Get { key: String },
    Delete { key: String },
    SwapPolicy { kind: PolicyKind },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        4 => (key_strategy(), value_strategy())
            .prop_map(|(key, value)| CacheOp::Set { key, value }),
        3 => key_strategy().prop_map(|key| CacheOp::Get { key }),
        2 => key_strategy().prop_map(|key| CacheOp::Delete { key }),
        1 => prop_oneof![Just(PolicyKind::Fifo), Just(PolicyKind::Lru)]
            .prop_map(|kind| CacheOp::SwapPolicy { kind }),
    ]
}

/// Reference FIFO model: queue of keys in insertion order plus values.
#[derive(Default)]
struct FifoModel {
    queue: VecDeque<String>,
    values: HashMap<String, u32>,
    capacity: usize,
}

impl FifoModel {
    fn set(&mut self, key: String, value: u32) {
        if self.values.contains_key(&key) {
            self.queue.retain(|k| k != &key);
        } else if self.values.len() >= self.capacity {
            if let Some(victim) = self.queue.pop_front() {
                self.values.remove(&victim);
            }
        }
        self.queue.push_back(key.clone());
        self.values.insert(key, value);
    }

    fn delete(&mut self, key: &str) {
        if self.values.remove(key).is_some() {
            self.queue.retain(|k| k != key);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Capacity invariant: whatever the operations and policy swaps, the cache
    // never holds more than its capacity.
    #[test]
    fn prop_capacity_enforcement(
        capacity in capacity_strategy(),
        overwrite_counts in any::<bool>(),
        ops in prop::collection::vec(cache_op_strategy(), 1..120)
    ) {
        let cache: Cache<String, u32> = Cache::new(capacity, Box::new(LruPolicy::new()))
            .unwrap()
            .with_overwrite_counts_as_insert(overwrite_counts);

        for op in ops {
            match op {
                CacheOp::Set { key, value } => cache.set(key, value).unwrap(),
                CacheOp::Get { key } => { cache.get_cached(&key); }
                CacheOp::Delete { key } => { cache.delete(&key); }
                CacheOp::SwapPolicy { kind } => cache.set_policy(kind.build()),
            }
            let stats = cache.stats();
            prop_assert!(
                stats.size <= capacity,
                "Cache size {} exceeds capacity {}",
                stats.size,
                capacity
            );
            prop_assert_eq!(stats.size, cache.len());
        }
    }

    // Statistics accuracy: hits and misses reflect exactly what lookups saw.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let cache: Cache<String, u32> = Cache::new(4, Box::new(FifoPolicy::new())).unwrap();
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Set { key, value } => cache.set(key, value).unwrap(),
                CacheOp::Get { key } => match cache.get_cached(&key) {
                    Some(_) => expected_hits += 1,
                    None => expected_misses += 1,
                },
                CacheOp::Delete { key } => { cache.delete(&key); }
                CacheOp::SwapPolicy { .. } => {}
            }
        }

        let stats = cache.stats();
        prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
    }

    // FIFO matches the reference queue model, including overwrites moving a
    // key to the back and deletes freeing slots.
    #[test]
    fn prop_fifo_matches_model(
        capacity in capacity_strategy(),
        ops in prop::collection::vec(cache_op_strategy(), 1..80)
    ) {
        let cache: Cache<String, u32> = Cache::new(capacity, Box::new(FifoPolicy::new())).unwrap();
        let mut model = FifoModel { capacity, ..FifoModel::default() };

        for op in ops {
            match op {
                CacheOp::Set { key, value } => {
                    cache.set(key.clone(), value).unwrap();
                    model.set(key, value);
                }
                CacheOp::Get { key } => {
                    prop_assert_eq!(cache.get_cached(&key), model.values.get(&key).copied());
                }
                CacheOp::Delete { key } => {
                    prop_assert_eq!(cache.delete(&key), model.values.contains_key(&key));
                    model.delete(&key);
                }
                CacheOp::SwapPolicy { .. } => {}
            }
        }

        prop_assert_eq!(cache.len(), model.values.len());
        for (key, value) in &model.values {
            prop_assert_eq!(cache.peek(key), Some(*value));
        }
    }

    // Swapping policies never drops an entry.
    #[test]
    fn prop_policy_swap_preserves_entries(
        entries in prop::collection::vec((key_strategy(), value_strategy()), 1..20),
        kind in prop_oneof![Just(PolicyKind::Fifo), Just(PolicyKind::Lru)]
    ) {
        let cache: Cache<String, u32> = Cache::new(64, Box::new(FifoPolicy::new())).unwrap();
        for (key, value) in &entries {
            cache.set(key.clone(), *value).unwrap();
        }
        let before: Vec<(String, Option<u32>)> = entries
            .iter()
            .map(|(key, _)| (key.clone(), cache.peek(key)))
            .collect();

        cache.set_policy(kind.build());

        prop_assert_eq!(cache.policy_name(), kind.as_str());
        for (key, value) in before {
            prop_assert_eq!(cache.peek(&key), value);
        }
    }
}

// Separate block with fewer cases for tests that drive the async loader
proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    // A failed load never populates the cache and is surfaced as a load error.
    #[test]
    fn prop_failed_loads_leave_no_entry(keys in prop::collection::vec(key_strategy(), 1..10)) {
        let cache: Cache<String, u32> = Cache::new(8, Box::new(LruPolicy::new()))
            .unwrap()
            .with_loader(|key: String| async move {
                Err::<u32, _>(anyhow::anyhow!("no record for {}", key))
            });

        for key in &keys {
            let result = tokio_test::block_on(cache.get(key));
            prop_assert!(matches!(result, Err(CacheError::Load { .. })), "expected CacheError::Load");
            prop_assert!(!cache.contains(key));
        }
        prop_assert_eq!(cache.stats().load_failures, keys.len() as u64);
        prop_assert_eq!(cache.pending_loads(), 0);
    }

    // Loaded values are cached and served from memory afterwards.
    #[test]
    fn prop_loaded_values_are_cached(keys in prop::collection::hash_set(key_strategy(), 1..8)) {
        let cache: Cache<String, usize> = Cache::new(8, Box::new(LruPolicy::new()))
            .unwrap()
            .with_loader(|key: String| async move { Ok::<_, anyhow::Error>(key.len()) });

        for key in &keys {
            prop_assert_eq!(tokio_test::block_on(cache.get(key)).unwrap(), Some(key.len()));
        }
        for key in &keys {
            prop_assert_eq!(cache.get_cached(key), Some(key.len()));
        }
        prop_assert_eq!(cache.stats().loads, keys.len() as u64);
    }
}
