//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use std::sync::Arc;

use thiserror::Error;

use crate::events::SubscriptionId;

// == Cache Error Enum ==
/// Unified error type for cache operations.
///
/// The type is `Clone` so a single load outcome can be handed to every caller
/// waiting on the same key.
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// The loader failed (or was abandoned) while computing a missing key
    #[error("Load failed for key {key}: {cause}")]
    Load {
        /// Debug rendering of the key that failed to load
        key: String,
        /// Underlying failure reported by the loader
        cause: Arc<anyhow::Error>,
    },

    /// The eviction policy broke its contract with the store
    #[error("Eviction policy violation: {0}")]
    PolicyViolation(String),

    /// Cache could not be built from the given settings
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CacheError {
    // == Load Constructor ==
    /// Wraps a loader failure for `key`.
    pub fn load(key: impl Into<String>, cause: anyhow::Error) -> Self {
        CacheError::Load {
            key: key.into(),
            cause: Arc::new(cause),
        }
    }

    /// Returns the loader's own error when this is a load failure.
    pub fn load_cause(&self) -> Option<&anyhow::Error> {
        match self {
            CacheError::Load { cause, .. } => Some(cause.as_ref()),
            _ => None,
        }
    }
}

// == Handler Error ==
/// Failure of one invalidation handler during a publish.
///
/// Handler failures never abort a publish; they are collected into the
/// [`PublishReport`](crate::events::PublishReport) returned to the publisher.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Handler {subscription} for event '{event}' failed: {message}")]
pub struct HandlerError {
    /// Subscription whose handler failed
    pub subscription: SubscriptionId,
    /// Name of the event being published
    pub event: String,
    /// Rendered error chain or panic message
    pub message: String,
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
