//! Invalidation Dispatcher
//!
//! Routes named events to the handlers subscribed to them. Handlers run
//! synchronously on the publisher's thread with failure isolation.

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Context;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use super::Event;
use crate::error::HandlerError;

/// Callback invoked for every published event with a matching name.
pub type Handler = Arc<dyn Fn(&Event) -> anyhow::Result<()> + Send + Sync>;

// == Subscription Id ==
/// Identifies one registered handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone)]
struct Subscription {
    id: SubscriptionId,
    handler: Handler,
}

// == Publish Report ==
/// Outcome of one publish: how many handlers ran and which of them failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    /// Name of the published event
    pub event: String,
    /// Number of handlers invoked
    pub delivered: usize,
    /// Failures, in the order the handlers ran
    pub failures: Vec<HandlerError>,
}

impl PublishReport {
    /// Returns true if every handler succeeded (or none was registered).
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of handlers that completed without error.
    pub fn succeeded(&self) -> usize {
        self.delivered - self.failures.len()
    }
}

// == Invalidation Dispatcher ==
/// Explicitly owned event bus connecting domain events to cache invalidation.
///
/// Share it by `Arc` with every component that publishes or subscribes.
pub struct InvalidationDispatcher {
    /// Subscriptions per event name, in registration order
    subscriptions: RwLock<HashMap<String, Vec<Subscription>>>,
    next_id: AtomicU64,
}

impl InvalidationDispatcher {
    /// Creates a dispatcher with no subscriptions.
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    // == Subscribe ==
    /// Registers `handler` for events named `event_name`.
    ///
    /// Handlers for the same name run in registration order.
    pub fn subscribe<F>(&self, event_name: impl Into<String>, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let event_name = event_name.into();
        debug!(event = %event_name, subscription = %id, "Registered handler");
        self.subscriptions
            .write()
            .entry(event_name)
            .or_default()
            .push(Subscription {
                id,
                handler: Arc::new(handler),
            });
        id
    }

    // == Subscribe Typed ==
    /// Registers a handler that receives the payload decoded as `T`.
    ///
    /// A payload that does not decode is reported as that handler's failure.
    pub fn subscribe_typed<T, F>(&self, event_name: impl Into<String>, handler: F) -> SubscriptionId
    where
        T: DeserializeOwned + 'static,
        F: Fn(T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribe(event_name, move |event: &Event| {
            let payload = event
                .decode::<T>()
                .with_context(|| format!("undecodable payload for event '{}'", event.name))?;
            handler(payload)
        })
    }

    // == Unsubscribe ==
    /// Removes a handler. Returns false if the id was unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscriptions = self.subscriptions.write();
        let mut removed = false;
        subscriptions.retain(|_, handlers| {
            let before = handlers.len();
            handlers.retain(|sub| sub.id != id);
            removed |= handlers.len() != before;
            !handlers.is_empty()
        });
        removed
    }

    /// Number of handlers registered for `event_name`.
    pub fn subscriber_count(&self, event_name: &str) -> usize {
        self.subscriptions
            .read()
            .get(event_name)
            .map_or(0, Vec::len)
    }

    // == Publish ==
    /// Publishes an event built from `event_name` and `payload`.
    pub fn publish(&self, event_name: &str, payload: Value) -> PublishReport {
        self.publish_event(&Event::new(event_name, payload))
    }

    /// Runs every handler subscribed to `event.name`, in order, on this thread.
    ///
    /// Handlers run over a snapshot of the subscriptions taken before the first
    /// call, so a handler may itself subscribe or publish. An error or panic in
    /// one handler is recorded and the remaining handlers still run; cache
    /// changes made by earlier handlers are kept.
    pub fn publish_event(&self, event: &Event) -> PublishReport {
        let handlers: Vec<Subscription> = self
            .subscriptions
            .read()
            .get(&event.name)
            .cloned()
            .unwrap_or_default();

        if handlers.is_empty() {
            debug!(event = %event.name, "No handlers registered for event");
        }

        let mut failures = Vec::new();
        for sub in &handlers {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| (sub.handler)(event)));
            let message = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => format!("{:#}", e),
                Err(panic) => {
                    let panic_msg = if let Some(s) = panic.downcast_ref::<&str>() {
                        s.to_string()
                    } else if let Some(s) = panic.downcast_ref::<String>() {
                        s.clone()
                    } else {
                        "Unknown panic".to_string()
                    };
                    format!("handler panicked: {}", panic_msg)
                }
            };

            warn!(
                event = %event.name,
                subscription = %sub.id,
                error = %message,
                "Invalidation handler failed"
            );
            failures.push(HandlerError {
                subscription: sub.id,
                event: event.name.clone(),
                message,
            });
        }

        PublishReport {
            event: event.name.clone(),
            delivered: handlers.len(),
            failures,
        }
    }
}

impl Default for InvalidationDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InvalidationDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subscriptions = self.subscriptions.read();
        f.debug_struct("InvalidationDispatcher")
            .field("event_names", &subscriptions.len())
            .finish_non_exhaustive()
    }
}
