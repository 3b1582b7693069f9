//! Event system for decoupled cross-component notifications.
//!
//! The event bus provides:
//! - Typed publish-subscribe with explicit unsubscribe handles
//! - An async broadcast stream of every emission
//! - Event batching toward an external sink
//!
//! # Architecture
//!
//! Events flow from producers → EventBus → handlers, and in parallel
//! EventBus → EventBatcher → EventSink:
//! - `EventBus`: synchronous handler registry plus a broadcast channel
//! - `EventBatcher`: buffers events (100ms/50 events) before delivery

mod batcher;
mod event_bus;
mod event_types;

pub use batcher::{EventBatcher, EventSink};
pub use event_bus::{BusEvent, EmitReport, EventBus, Subscription, SubscriptionGuard};
pub use event_types::{should_flush_immediately, AppEvent, EventKind};
