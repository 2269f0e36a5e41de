//! Eviction Policy Module
//!
//! Pluggable algorithms that choose which entry leaves a full cache.
//!
//! A policy only tracks keys. The cache core owns the entries and calls the
//! policy hooks under its own lock, so implementations need no locking.

mod fifo;
mod lru;
mod order;

use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CacheError;

pub use fifo::FifoPolicy;
pub use lru::LruPolicy;
pub use order::OrderTracker;

// == Eviction Policy Trait ==
/// Capability set every eviction policy provides to the cache core.
///
/// # Contract
/// - When the store is non-empty, `select_victim` returns a key currently in
///   the store.
/// - When the store is empty, `select_victim` returns `None`.
///
/// A policy that breaks this contract makes the triggering insert fail with
/// [`CacheError::PolicyViolation`]; the store is never left over capacity.
pub trait EvictionPolicy<K>: Send {
    /// Short name used in logs and stats.
    fn name(&self) -> &str;

    /// Called after `key` was inserted or overwritten.
    fn on_insert(&mut self, key: &K);

    /// Called after a read hit on `key`.
    fn on_access(&mut self, key: &K);

    /// Called after `key` left the store for any reason.
    fn on_remove(&mut self, key: &K);

    /// Chooses the next key to evict without removing it.
    fn select_victim(&mut self) -> Option<K>;

    /// Drops all auxiliary order state.
    fn clear(&mut self);
}

impl<K> fmt::Debug for dyn EvictionPolicy<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvictionPolicy")
            .field("name", &self.name())
            .finish()
    }
}

// == Policy Kind ==
/// Built-in policies selectable by name from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    Fifo,
    Lru,
}

impl PolicyKind {
    /// Builds a fresh, empty policy of this kind.
    pub fn build<K>(self) -> Box<dyn EvictionPolicy<K>>
    where
        K: Clone + Eq + Hash + Send + 'static,
    {
        match self {
            PolicyKind::Fifo => Box::new(FifoPolicy::new()),
            PolicyKind::Lru => Box::new(LruPolicy::new()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyKind::Fifo => "fifo",
            PolicyKind::Lru => "lru",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fifo" => Ok(PolicyKind::Fifo),
            "lru" => Ok(PolicyKind::Lru),
            other => Err(CacheError::InvalidConfig(format!(
                "Unknown eviction policy '{}', expected 'fifo' or 'lru'",
                other
            ))),
        }
    }
}
