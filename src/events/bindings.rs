//! Cache Bindings
//!
//! Adapters that subscribe a cache to domain events, translating each event
//! into a targeted delete or a predicate invalidation.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::debug;

use super::{InvalidationDispatcher, SubscriptionId};
use crate::cache::Cache;

// == Invalidate Key On ==
/// Deletes the key derived from each `event_name` payload.
///
/// # Example
/// ```ignore
/// invalidate_key_on(&dispatcher, cache.clone(), "subscription.cancelled",
///     |event: SubscriptionCancelled| event.subscription_id);
/// ```
pub fn invalidate_key_on<K, V, T, F>(
    dispatcher: &InvalidationDispatcher,
    cache: Arc<Cache<K, V>>,
    event_name: &str,
    key_of: F,
) -> SubscriptionId
where
    K: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    T: DeserializeOwned + 'static,
    F: Fn(T) -> K + Send + Sync + 'static,
{
    let name = event_name.to_string();
    dispatcher.subscribe_typed(event_name, move |payload: T| {
        let key = key_of(payload);
        let removed = cache.delete(&key);
        debug!(event = %name, key = ?key, removed, "Event invalidated key");
        Ok(())
    })
}

// == Invalidate Matching On ==
/// Removes every key matched by the predicate built from each payload.
///
/// Used for pattern invalidation such as "all entries for customer X".
pub fn invalidate_matching_on<K, V, T, F, P>(
    dispatcher: &InvalidationDispatcher,
    cache: Arc<Cache<K, V>>,
    event_name: &str,
    matcher: F,
) -> SubscriptionId
where
    K: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    T: DeserializeOwned + 'static,
    F: Fn(T) -> P + Send + Sync + 'static,
    P: Fn(&K) -> bool,
{
    let name = event_name.to_string();
    dispatcher.subscribe_typed(event_name, move |payload: T| {
        let removed = cache.invalidate(matcher(payload));
        debug!(event = %name, removed, "Event invalidated matching keys");
        Ok(())
    })
}

// == Clear On ==
/// Empties the cache whenever `event_name` is published, whatever the payload.
pub fn clear_on<K, V>(
    dispatcher: &InvalidationDispatcher,
    cache: Arc<Cache<K, V>>,
    event_name: &str,
) -> SubscriptionId
where
    K: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    dispatcher.subscribe(event_name, move |_event| {
        cache.clear();
        Ok(())
    })
}
