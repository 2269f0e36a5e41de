//! EventCache demo - subscription lookups behind a cache
//!
//! Puts a cache in front of a slow subscription lookup, shows concurrent
//! lookups sharing one backend call, then cancels a subscription through the
//! event dispatcher and shows the entry disappear.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use eventcache::events::invalidate_key_on;
use eventcache::{Cache, CacheConfig, Event, InvalidationDispatcher};

const SUBSCRIPTION_CANCELLED: &str = "subscription.cancelled";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Subscription {
    id: String,
    plan: String,
    active: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct SubscriptionCancelled {
    subscription_id: String,
}

/// Stand-in for the slow backing store.
async fn lookup_subscription(id: String) -> anyhow::Result<Subscription> {
    tokio::time::sleep(Duration::from_millis(100)).await;
    if id.starts_with("missing") {
        anyhow::bail!("no subscription with id {}", id);
    }
    info!(id = %id, "Backend lookup");
    Ok(Subscription {
        id,
        plan: "standard".to_string(),
        active: true,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eventcache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CacheConfig::from_env();
    info!(
        "Configuration loaded: capacity={}, policy={}, overwrite_counts_as_insert={}",
        config.capacity, config.policy, config.overwrite_counts_as_insert
    );

    let cache: Arc<Cache<String, Subscription>> =
        Arc::new(Cache::from_config(&config)?.with_loader(lookup_subscription));
    let dispatcher = InvalidationDispatcher::new();
    invalidate_key_on(
        &dispatcher,
        cache.clone(),
        SUBSCRIPTION_CANCELLED,
        |event: SubscriptionCancelled| event.subscription_id,
    );

    let lookups: Vec<_> = (0..8)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get(&"sub-42".to_string()).await })
        })
        .collect();
    for lookup in lookups {
        match lookup.await? {
            Ok(Some(subscription)) => info!(
                id = %subscription.id,
                plan = %subscription.plan,
                active = subscription.active,
                "Lookup served"
            ),
            Ok(None) => warn!("Lookup returned nothing"),
            Err(e) => warn!(error = %e, "Lookup failed"),
        }
    }

    if let Err(e) = cache.get(&"missing-1".to_string()).await {
        warn!(error = %e, "Lookup failed");
    }

    let event = Event::with_payload(
        SUBSCRIPTION_CANCELLED,
        &SubscriptionCancelled {
            subscription_id: "sub-42".to_string(),
        },
    )?;
    let report = dispatcher.publish_event(&event);
    info!(
        delivered = report.delivered,
        failures = report.failures.len(),
        still_cached = cache.contains(&"sub-42".to_string()),
        "Published cancellation"
    );

    info!("Final stats: {}", serde_json::to_string(&cache.stats())?);
    Ok(())
}
