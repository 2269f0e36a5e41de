//! Cache Module
//!
//! Provides the bounded in-memory cache with pluggable eviction and
//! single-flight loading.

mod engine;
mod entry;
mod loader;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use engine::Cache;
pub use entry::CacheEntry;
pub use loader::{LoadFuture, Loader};
pub use stats::CacheStats;
pub use store::EntryStore;
