//! Event Module
//!
//! Named domain events with a JSON payload.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// == Event ==
/// A named domain event, e.g. `"subscription.cancelled"`.
///
/// The name is the routing discriminant. Each name has one payload shape,
/// decoded with [`Event::decode`] when a typed subscriber receives it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Routing name
    pub name: String,
    /// Event data, `null` when the event carries none
    #[serde(default)]
    pub payload: Value,
}

impl Event {
    // == Constructor ==
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }

    /// Creates an event whose payload is the JSON form of `payload`.
    pub fn with_payload<T: Serialize>(
        name: impl Into<String>,
        payload: &T,
    ) -> serde_json::Result<Self> {
        Ok(Self::new(name, serde_json::to_value(payload)?))
    }

    // == Decode ==
    /// Decodes the payload into the shape registered for this event name.
    pub fn decode<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        T::deserialize(&self.payload)
    }
}
