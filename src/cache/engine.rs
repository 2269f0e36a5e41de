//! Cache Engine Module
//!
//! Main cache combining the entry store, the active eviction policy and
//! single-flight loading behind one lock.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::cache::{CacheStats, EntryStore, Loader};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::policy::EvictionPolicy;

/// Value broadcast to everyone waiting on one load. `None` until it finishes.
type LoadOutcome<V> = Option<Result<V>>;

// == Pending Load ==
/// In-flight load for one key. At most one exists per key.
struct PendingLoad<V> {
    /// Distinguishes successive loads of the same key
    id: u64,
    /// Shared result channel for waiters
    outcome: watch::Receiver<LoadOutcome<V>>,
    /// Set when a write stored a value for the key during the load
    superseded: bool,
}

// == Cache State ==
/// Everything guarded by the cache lock.
struct CacheState<K, V> {
    store: EntryStore<K, V>,
    policy: Box<dyn EvictionPolicy<K>>,
    pending: HashMap<K, PendingLoad<V>>,
    stats: CacheStats,
    next_load_id: u64,
}

impl<K, V> CacheState<K, V>
where
    K: Clone + Eq + Hash + fmt::Debug,
    V: Clone,
{
    // == Lookup ==
    /// Returns a hit and records it, or records a miss.
    fn lookup(&mut self, key: &K) -> Option<V> {
        let value = self.store.get(key).map(|entry| entry.value.clone());
        match value {
            Some(value) => {
                self.policy.on_access(key);
                self.stats.record_hit();
                Some(value)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Insert ==
    /// Writes `key`, evicting first if the write needs a slot the store lacks.
    ///
    /// Eviction and insert happen under the same lock, so no observer ever
    /// sees the store above capacity.
    fn insert(&mut self, key: K, value: V, overwrite_counts_as_insert: bool) -> Result<()> {
        let needs_slot = overwrite_counts_as_insert || !self.store.contains(&key);
        if needs_slot && self.store.is_full() {
            self.evict_one()?;
        }

        self.store.put(key.clone(), value);
        self.policy.on_insert(&key);
        Ok(())
    }

    // == Evict One ==
    fn evict_one(&mut self) -> Result<()> {
        let victim = self.policy.select_victim().ok_or_else(|| {
            CacheError::PolicyViolation(format!(
                "policy '{}' returned no victim while the cache holds {} of {} entries",
                self.policy.name(),
                self.store.len(),
                self.store.capacity()
            ))
        })?;

        if self.store.remove(&victim).is_none() {
            return Err(CacheError::PolicyViolation(format!(
                "policy '{}' selected {:?}, which is not in the cache",
                self.policy.name(),
                victim
            )));
        }

        self.policy.on_remove(&victim);
        self.stats.record_eviction();
        debug!(key = ?victim, policy = self.policy.name(), "Evicted entry");
        Ok(())
    }

    // == Remove ==
    /// Drops `key` from store and policy. Returns whether it was cached.
    fn remove(&mut self, key: &K) -> bool {
        self.detach_pending(key);
        if self.store.remove(key).is_some() {
            self.policy.on_remove(key);
            self.stats.record_invalidations(1);
            true
        } else {
            false
        }
    }

    fn supersede_pending(&mut self, key: &K) {
        if let Some(pending) = self.pending.get_mut(key) {
            pending.superseded = true;
        }
    }

    /// Forgets the in-flight load for `key`. Its leader still answers the
    /// callers already waiting, but later misses start a fresh load and the
    /// detached result is never stored.
    fn detach_pending(&mut self, key: &K) {
        if self.pending.remove(key).is_some() {
            debug!(key = ?key, "Detached in-flight load");
        }
    }

    // == Finish Pending ==
    /// Removes this load's pending entry. Returns whether the result may be
    /// stored: the load was not detached and no write landed meanwhile.
    fn finish_pending(&mut self, key: &K, id: u64) -> bool {
        match self.pending.get(key) {
            Some(pending) if pending.id == id => {
                let superseded = pending.superseded;
                self.pending.remove(key);
                !superseded
            }
            _ => false,
        }
    }

    fn snapshot(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.size = self.store.len();
        stats.capacity = self.store.capacity();
        stats
    }
}

// == Load Guard ==
/// Held by the caller running a load. If that caller is dropped before the
/// load finishes, the pending entry is cleared and waiters are released with
/// an "abandoned" error so they can retry.
struct LoadGuard<'a, K, V>
where
    K: Clone + Eq + Hash + fmt::Debug,
    V: Clone,
{
    state: &'a Mutex<CacheState<K, V>>,
    key: K,
    id: u64,
    outcome: watch::Sender<LoadOutcome<V>>,
    finished: bool,
}

impl<K, V> Drop for LoadGuard<'_, K, V>
where
    K: Clone + Eq + Hash + fmt::Debug,
    V: Clone,
{
    fn drop(&mut self) {
        if !self.finished {
            self.state.lock().finish_pending(&self.key, self.id);
            warn!(key = ?self.key, "Load abandoned before completion");
        }
    }
}

/// What a missing-key caller does next.
enum MissRole<V> {
    Lead(u64, watch::Sender<LoadOutcome<V>>),
    Wait(watch::Receiver<LoadOutcome<V>>),
}

// == Cache ==
/// Bounded, thread-safe cache with a swappable eviction policy and
/// single-flight loading of missing keys.
///
/// All state sits behind one mutex. The lock is never held while a loader
/// runs, so a slow load only delays callers of the same key.
pub struct Cache<K, V> {
    state: Mutex<CacheState<K, V>>,
    loader: Option<Arc<dyn Loader<K, V>>>,
    overwrite_counts_as_insert: bool,
}

impl<K, V> Cache<K, V>
where
    K: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates an empty cache holding at most `capacity` entries.
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of entries, must be positive
    /// * `policy` - Eviction policy; any order state it carries is discarded
    pub fn new(capacity: usize, mut policy: Box<dyn EvictionPolicy<K>>) -> Result<Self> {
        if capacity == 0 {
            return Err(CacheError::InvalidConfig(
                "Cache capacity must be greater than 0".to_string(),
            ));
        }
        policy.clear();

        Ok(Self {
            state: Mutex::new(CacheState {
                store: EntryStore::new(capacity),
                policy,
                pending: HashMap::new(),
                stats: CacheStats::new(capacity),
                next_load_id: 0,
            }),
            loader: None,
            overwrite_counts_as_insert: false,
        })
    }

    /// Creates a cache from configuration.
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        Ok(Self::new(config.capacity, config.policy.build())?
            .with_overwrite_counts_as_insert(config.overwrite_counts_as_insert))
    }

    /// Installs the loader used by [`Cache::get`] on a miss.
    pub fn with_loader<L>(mut self, loader: L) -> Self
    where
        L: Loader<K, V> + 'static,
    {
        self.loader = Some(Arc::new(loader));
        self
    }

    /// Chooses whether overwriting a present key may trigger an eviction.
    pub fn with_overwrite_counts_as_insert(mut self, enabled: bool) -> Self {
        self.overwrite_counts_as_insert = enabled;
        self
    }

    // == Get ==
    /// Retrieves a value, loading it on a miss when a loader is installed.
    ///
    /// # Returns
    /// - `Ok(Some(value))` on a hit or a successful load
    /// - `Ok(None)` on a miss when no loader is installed
    /// - `Err(CacheError::Load)` if the loader failed; every concurrent caller
    ///   for the key sees the same error and nothing is cached
    /// - `Err(CacheError::PolicyViolation)` if storing the loaded value failed
    pub async fn get(&self, key: &K) -> Result<Option<V>> {
        let role = {
            let mut state = self.state.lock();
            if let Some(value) = state.lookup(key) {
                return Ok(Some(value));
            }
            if self.loader.is_none() {
                return Ok(None);
            }

            let in_flight = state.pending.get(key).map(|pending| pending.outcome.clone());
            match in_flight {
                Some(outcome) => MissRole::Wait(outcome),
                None => {
                    let id = state.next_load_id;
                    state.next_load_id += 1;
                    let (tx, rx) = watch::channel(None);
                    state.pending.insert(
                        key.clone(),
                        PendingLoad {
                            id,
                            outcome: rx,
                            superseded: false,
                        },
                    );
                    state.stats.record_load();
                    MissRole::Lead(id, tx)
                }
            }
        };

        match role {
            MissRole::Lead(id, tx) => self.run_load(key.clone(), id, tx).await.map(Some),
            MissRole::Wait(rx) => self.wait_for_load(key, rx).await.map(Some),
        }
    }

    // == Run Load ==
    /// Runs the loader as the single leader for `key` and publishes the outcome.
    async fn run_load(&self, key: K, id: u64, outcome: watch::Sender<LoadOutcome<V>>) -> Result<V> {
        let mut guard = LoadGuard {
            state: &self.state,
            key,
            id,
            outcome,
            finished: false,
        };

        let loaded = match &self.loader {
            Some(loader) => loader.load(guard.key.clone()).await,
            None => Err(anyhow::anyhow!("no loader installed")),
        };

        let mut state = self.state.lock();
        let storable = state.finish_pending(&guard.key, id);
        let result = match loaded {
            Ok(value) if storable => state
                .insert(guard.key.clone(), value.clone(), self.overwrite_counts_as_insert)
                .map(|()| value),
            Ok(value) => {
                debug!(key = ?guard.key, "Loaded value superseded during load, not cached");
                Ok(value)
            }
            Err(cause) => {
                state.stats.record_load_failure();
                warn!(key = ?guard.key, error = %cause, "Loader failed");
                Err(CacheError::load(format!("{:?}", guard.key), cause))
            }
        };

        guard.outcome.send_replace(Some(result.clone()));
        guard.finished = true;
        drop(state);
        result
    }

    async fn wait_for_load(&self, key: &K, mut outcome: watch::Receiver<LoadOutcome<V>>) -> Result<V> {
        let finished = outcome
            .wait_for(Option::is_some)
            .await
            .ok()
            .and_then(|outcome| outcome.clone());

        finished.unwrap_or_else(|| {
            Err(CacheError::load(
                format!("{:?}", key),
                anyhow::anyhow!("load was abandoned before completing"),
            ))
        })
    }

    // == Get Cached ==
    /// Looks up a value without ever loading. Counts as a hit or miss and as
    /// an access for the policy.
    pub fn get_cached(&self, key: &K) -> Option<V> {
        self.state.lock().lookup(key)
    }

    // == Peek ==
    /// Looks up a value without touching stats or eviction order.
    pub fn peek(&self, key: &K) -> Option<V> {
        self.state
            .lock()
            .store
            .get(key)
            .map(|entry| entry.value.clone())
    }

    // == Set ==
    /// Stores a key-value pair, evicting the policy's victim if the cache is full.
    ///
    /// A load in flight for `key` will not overwrite this value when it finishes.
    pub fn set(&self, key: K, value: V) -> Result<()> {
        let mut state = self.state.lock();
        state.supersede_pending(&key);
        state.insert(key, value, self.overwrite_counts_as_insert)
    }

    // == Delete ==
    /// Removes an entry by key. Deleting an absent key is not an error.
    ///
    /// # Returns
    /// `true` if an entry was removed.
    pub fn delete(&self, key: &K) -> bool {
        let removed = self.state.lock().remove(key);
        if removed {
            debug!(key = ?key, "Deleted entry");
        }
        removed
    }

    // == Invalidate ==
    /// Removes every entry whose key matches `predicate`.
    ///
    /// Loads in flight for matching keys still answer their callers but do not
    /// populate the cache, and any later miss starts a fresh load.
    ///
    /// # Returns
    /// The number of entries removed.
    pub fn invalidate<F>(&self, predicate: F) -> usize
    where
        F: Fn(&K) -> bool,
    {
        let mut state = self.state.lock();
        let doomed: Vec<K> = state
            .store
            .keys()
            .filter(|key| predicate(key))
            .cloned()
            .collect();

        let mut removed = 0;
        for key in &doomed {
            if state.remove(key) {
                removed += 1;
            }
        }
        state.pending.retain(|key, _| !predicate(key));

        if removed > 0 {
            debug!(removed, "Invalidated entries");
        }
        removed
    }

    // == Clear ==
    /// Removes every entry and returns how many were dropped.
    pub fn clear(&self) -> usize {
        let mut state = self.state.lock();
        state.pending.clear();
        let removed = state.store.clear();
        state.policy.clear();
        state.stats.record_invalidations(removed);
        info!(removed, "Cleared cache");
        removed
    }

    // == Set Policy ==
    /// Swaps the active eviction policy without dropping any entry.
    ///
    /// The new policy's order is rebuilt from the current entries in
    /// insertion order; the old policy's order is discarded.
    pub fn set_policy(&self, mut policy: Box<dyn EvictionPolicy<K>>) {
        let mut state = self.state.lock();
        policy.clear();
        for key in state.store.keys_by_insertion() {
            policy.on_insert(key);
        }
        let previous = std::mem::replace(&mut state.policy, policy);
        info!(
            from = previous.name(),
            to = state.policy.name(),
            entries = state.store.len(),
            "Swapped eviction policy"
        );
    }

    /// Name of the active eviction policy.
    pub fn policy_name(&self) -> String {
        self.state.lock().policy.name().to_string()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.state.lock().snapshot()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.state.lock().store.contains(key)
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.state.lock().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().store.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.state.lock().store.capacity()
    }

    /// Number of loads currently in flight.
    pub fn pending_loads(&self) -> usize {
        self.state.lock().pending.len()
    }
}

impl<K, V> fmt::Debug for Cache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("has_loader", &self.loader.is_some())
            .field("overwrite_counts_as_insert", &self.overwrite_counts_as_insert)
            .finish_non_exhaustive()
    }
}
