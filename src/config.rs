//! Configuration Module
//!
//! Handles loading cache settings from environment variables.

use std::env;

use serde::{Deserialize, Serialize};

use crate::policy::PolicyKind;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of entries the cache can hold
    pub capacity: usize,
    /// Eviction policy installed at construction
    pub policy: PolicyKind,
    /// Whether overwriting an existing key consumes a capacity slot
    pub overwrite_counts_as_insert: bool,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_CAPACITY` - Maximum cache entries (default: 1000)
    /// - `CACHE_POLICY` - `fifo` or `lru` (default: lru)
    /// - `CACHE_OVERWRITE_COUNTS_AS_INSERT` - `true` or `false` (default: false)
    ///
    /// Unparseable values fall back to their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            capacity: env::var("CACHE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.capacity),
            policy: env::var("CACHE_POLICY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.policy),
            overwrite_counts_as_insert: env::var("CACHE_OVERWRITE_COUNTS_AS_INSERT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.overwrite_counts_as_insert),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            policy: PolicyKind::Lru,
            overwrite_counts_as_insert: false,
        }
    }
}
