//! EventCache - A bounded in-process cache in front of slow backing stores
//!
//! Provides pluggable FIFO/LRU eviction, single-flight loading of missing keys
//! and invalidation driven by named domain events.

pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod policy;

pub use cache::{Cache, CacheStats, Loader};
pub use config::CacheConfig;
pub use error::{CacheError, HandlerError, Result};
pub use events::{Event, InvalidationDispatcher, PublishReport, SubscriptionId};
pub use policy::{EvictionPolicy, FifoPolicy, LruPolicy, PolicyKind};
