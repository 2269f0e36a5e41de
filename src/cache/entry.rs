//! Cache Entry Module
//!
//! Defines the structure for individual cache entries and their ordering metadata.

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
///
/// The stamp is a logical sequence number handed out by the owning store,
/// not wall-clock time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Sequence number of the put that produced this entry
    pub inserted_at: u64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new entry stamped with sequence `seq`.
    pub fn new(value: V, seq: u64) -> Self {
        Self {
            value,
            inserted_at: seq,
        }
    }
}
