//! Events Module
//!
//! Named domain events, the dispatcher that routes them, and bindings that
//! turn them into cache invalidations.

pub mod bindings;
mod dispatcher;
mod event;

pub use bindings::{clear_on, invalidate_key_on, invalidate_matching_on};
pub use dispatcher::{Handler, InvalidationDispatcher, PublishReport, SubscriptionId};
pub use event::Event;
