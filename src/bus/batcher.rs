use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time;

use super::event_types::should_flush_immediately;
use super::BusEvent;

const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(100);
const DEFAULT_MAX_BATCH: usize = 50;

/// Destination for batched bus events, typically the bridge to a UI layer.
pub trait EventSink: Send + Sync + 'static {
    fn deliver(&self, batch: &[BusEvent]) -> Result<(), String>;
}

pub struct EventBatcher;

impl EventBatcher {
    /// Spawn a background task that batches events from the bus stream and
    /// hands them to `sink`.
    ///
    /// - "Immediate" events (favorites and auth changes) are flushed
    ///   instantly as a single-element batch, after any buffered events.
    /// - All other events are buffered and flushed every 100ms or when the
    ///   buffer reaches 50 events.
    pub fn start(mut rx: broadcast::Receiver<BusEvent>, sink: Arc<dyn EventSink>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut buffer: Vec<BusEvent> = Vec::with_capacity(DEFAULT_MAX_BATCH);
            let mut interval = time::interval(DEFAULT_FLUSH_INTERVAL);

            loop {
                tokio::select! {
                    result = rx.recv() => {
                        match result {
                            Ok(event) => {
                                if should_flush_immediately(&event) {
                                    // Flush buffer first so ordering is preserved
                                    if !buffer.is_empty() {
                                        flush(sink.as_ref(), &mut buffer);
                                    }
                                    if let Err(e) = sink.deliver(std::slice::from_ref(&event)) {
                                        tracing::warn!("failed to deliver immediate event: {e}");
                                    }
                                } else {
                                    buffer.push(event);
                                    if buffer.len() >= DEFAULT_MAX_BATCH {
                                        flush(sink.as_ref(), &mut buffer);
                                    }
                                }
                            }
                            Err(broadcast::error::RecvError::Lagged(n)) => {
                                tracing::warn!("event batcher lagged, dropped {n} events");
                            }
                            Err(broadcast::error::RecvError::Closed) => {
                                // Bus shut down, flush the remainder and exit.
                                if !buffer.is_empty() {
                                    flush(sink.as_ref(), &mut buffer);
                                }
                                break;
                            }
                        }
                    }
                    _ = interval.tick() => {
                        if !buffer.is_empty() {
                            flush(sink.as_ref(), &mut buffer);
                        }
                    }
                }
            }
        })
    }
}

fn flush(sink: &dyn EventSink, buffer: &mut Vec<BusEvent>) {
    if let Err(e) = sink.deliver(buffer) {
        tracing::warn!("failed to deliver event batch of {}: {e}", buffer.len());
    }
    buffer.clear();
}
