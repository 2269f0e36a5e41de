//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, loads and evictions.

use serde::Serialize;

// == Cache Stats ==
/// Snapshot of cache performance metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Current number of entries in the cache
    pub size: usize,
    /// Maximum number of entries the cache can hold
    pub capacity: usize,
    /// Number of lookups answered from the cache
    pub hits: u64,
    /// Number of lookups that found no entry
    pub misses: u64,
    /// Number of entries evicted by the active policy
    pub evictions: u64,
    /// Number of loader invocations
    pub loads: u64,
    /// Number of loader invocations that failed
    pub load_failures: u64,
    /// Number of entries removed by delete, invalidate or clear
    pub invalidations: u64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_load(&mut self) {
        self.loads += 1;
    }

    pub fn record_load_failure(&mut self) {
        self.load_failures += 1;
    }

    // == Record Invalidations ==
    /// Adds `count` explicitly removed entries.
    pub fn record_invalidations(&mut self, count: usize) {
        self.invalidations += count as u64;
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = CacheStats::new(8);
        assert_eq!(stats.capacity, 8);
        assert_eq!(stats.size, 0);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.loads, 0);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        let stats = CacheStats::new(1);
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut stats = CacheStats::new(1);
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        assert_eq!(stats.hit_rate(), 0.75);
    }

    #[test]
    fn test_record_counters() {
        let mut stats = CacheStats::new(1);
        stats.record_eviction();
        stats.record_eviction();
        stats.record_load();
        stats.record_load_failure();
        stats.record_invalidations(3);

        assert_eq!(stats.evictions, 2);
        assert_eq!(stats.loads, 1);
        assert_eq!(stats.load_failures, 1);
        assert_eq!(stats.invalidations, 3);
    }

    #[test]
    fn test_stats_serialize() {
        let mut stats = CacheStats::new(4);
        stats.size = 2;
        stats.record_hit();

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["size"], 2);
        assert_eq!(json["capacity"], 4);
        assert_eq!(json["hits"], 1);
    }
}
