use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use super::event_types::{AppEvent, EventKind};

const BUS_CAPACITY: usize = 1024;

type Handler = Arc<dyn Fn(&AppEvent) + Send + Sync>;
type Registry = DashMap<EventKind, Vec<HandlerEntry>>;

/// Envelope published on the async stream for every emission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusEvent {
    pub id: String,
    pub seq: i64,
    pub created_at: String,
    pub event: AppEvent,
}

struct HandlerEntry {
    id: u64,
    handler: Handler,
}

/// Result of a single synchronous emission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitReport {
    pub delivered: usize,
    pub failed: usize,
}

pub struct EventBus {
    handlers: Arc<Registry>,
    next_handler_id: AtomicU64,
    tx: broadcast::Sender<BusEvent>,
    seq: AtomicI64,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self {
            handlers: Arc::new(DashMap::new()),
            next_handler_id: AtomicU64::new(1),
            tx,
            seq: AtomicI64::new(0),
        }
    }

    /// Register `handler` for every event of `kind`. Handlers of one kind run
    /// in registration order.
    ///
    /// The returned handle must be used to unsubscribe; dropping it leaves the
    /// handler registered. Use [`Subscription::into_guard`] for scope-bound
    /// registrations.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> Subscription
    where
        F: Fn(&AppEvent) + Send + Sync + 'static,
    {
        let id = self.next_handler_id.fetch_add(1, Ordering::Relaxed);
        self.handlers.entry(kind).or_default().push(HandlerEntry {
            id,
            handler: Arc::new(handler),
        });
        tracing::trace!(event = kind.as_str(), handler_id = id, "handler subscribed");

        Subscription {
            kind,
            id,
            registry: Arc::downgrade(&self.handlers),
        }
    }

    /// Synchronously deliver `event` to every handler registered for its kind
    /// when the emission starts, then publish it on the async stream.
    ///
    /// A panicking handler is logged and counted; the remaining handlers still
    /// run.
    pub fn emit(&self, event: AppEvent) -> EmitReport {
        let kind = event.kind();
        // Snapshot so handlers can subscribe/unsubscribe without deadlocking
        // on the registry shard.
        let snapshot: Vec<Handler> = self
            .handlers
            .get(&kind)
            .map(|entries| entries.iter().map(|entry| entry.handler.clone()).collect())
            .unwrap_or_default();

        let mut report = EmitReport::default();
        for handler in snapshot {
            match panic::catch_unwind(AssertUnwindSafe(|| handler(&event))) {
                Ok(()) => report.delivered += 1,
                Err(payload) => {
                    report.failed += 1;
                    tracing::warn!(
                        event = kind.as_str(),
                        "event handler panicked: {}",
                        panic_message(payload.as_ref())
                    );
                }
            }
        }

        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        self.publish(BusEvent {
            id: Uuid::new_v4().to_string(),
            seq,
            created_at: Utc::now().to_rfc3339(),
            event,
        });
        report
    }

    /// Publish a pre-built envelope onto the async stream only.
    pub fn publish(&self, event: BusEvent) {
        if let Err(e) = self.tx.send(event) {
            tracing::trace!("event stream publish skipped (no receivers): {e}");
        }
    }

    /// Get a new receiver for the async stream. Only emissions after this call
    /// are observed.
    pub fn subscribe_stream(&self) -> broadcast::Receiver<BusEvent> {
        self.tx.subscribe()
    }

    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers.get(&kind).map(|entries| entries.len()).unwrap_or(0)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    "non-string panic payload".to_string()
}

/// Handle for removing one registered handler.
#[derive(Debug)]
pub struct Subscription {
    kind: EventKind,
    id: u64,
    registry: Weak<Registry>,
}

impl Subscription {
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Remove exactly this handler. Returns false when it was already removed
    /// (or the bus is gone); repeated calls are no-ops.
    pub fn unsubscribe(&self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        let Some(mut entries) = registry.get_mut(&self.kind) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|entry| entry.id != self.id);
        let removed = entries.len() != before;
        if removed {
            tracing::trace!(event = self.kind.as_str(), handler_id = self.id, "handler unsubscribed");
        }
        removed
    }

    /// Convert into a guard that unsubscribes when dropped.
    pub fn into_guard(self) -> SubscriptionGuard {
        SubscriptionGuard { inner: self }
    }
}

/// Unsubscribes its handler on drop.
#[derive(Debug)]
pub struct SubscriptionGuard {
    inner: Subscription,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.inner.unsubscribe();
    }
}
