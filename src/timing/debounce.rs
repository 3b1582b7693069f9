use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

pub const DEFAULT_DEBOUNCE_DELAY: Duration = Duration::from_millis(300);

/// A value that only settles once its input has been stable for `delay`.
///
/// Every [`set`](Self::set) restarts the timer; only a timer that elapses
/// without being superseded publishes. Dropping the value cancels any
/// pending timer. Requires a Tokio runtime.
pub struct Debounced<T> {
    delay: Duration,
    tx: Arc<watch::Sender<T>>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl<T> Debounced<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(initial: T, delay: Duration) -> Self {
        let (tx, _) = watch::channel(initial);
        Self {
            delay,
            tx: Arc::new(tx),
            pending: Mutex::new(None),
        }
    }

    pub fn with_default_delay(initial: T) -> Self {
        Self::new(initial, DEFAULT_DEBOUNCE_DELAY)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Feed a new input value, replacing any pending one.
    pub fn set(&self, value: T) {
        let tx = self.tx.clone();
        let delay = self.delay;
        let mut pending = self.pending.lock().expect("debounce mutex poisoned");
        if let Some(previous) = pending.take() {
            previous.abort();
        }
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tx.send_replace(value);
        }));
    }

    /// The last settled value.
    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Receiver that is notified only when a value settles.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .expect("debounce mutex poisoned")
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Drop the pending input, if any, without publishing it.
    pub fn cancel(&self) {
        if let Some(handle) = self.pending.lock().expect("debounce mutex poisoned").take() {
            handle.abort();
        }
    }
}

impl<T> Drop for Debounced<T> {
    fn drop(&mut self) {
        let pending = match self.pending.get_mut() {
            Ok(pending) => pending.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = pending {
            handle.abort();
        }
    }
}
