use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

pub const DEFAULT_THROTTLE_INTERVAL: Duration = Duration::from_millis(300);

/// Leading-edge throttle: a call runs immediately when at least `interval`
/// has passed since the last call that ran, otherwise it is dropped.
/// Nothing is queued and there is no trailing call.
pub struct Throttled<F> {
    callback: F,
    interval: Duration,
    last_run: Mutex<Option<Instant>>,
}

impl<F> Throttled<F> {
    pub fn new(interval: Duration, callback: F) -> Self {
        Self {
            callback,
            interval,
            last_run: Mutex::new(None),
        }
    }

    pub fn with_default_interval(callback: F) -> Self {
        Self::new(DEFAULT_THROTTLE_INTERVAL, callback)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run the callback if the interval has elapsed. Returns `None` when the
    /// call was dropped.
    pub fn call<A, R>(&self, args: A) -> Option<R>
    where
        F: Fn(A) -> R,
    {
        {
            let now = Instant::now();
            let mut last_run = self.last_run.lock().expect("throttle mutex poisoned");
            if let Some(last) = *last_run {
                if now.saturating_duration_since(last) < self.interval {
                    return None;
                }
            }
            *last_run = Some(now);
        }
        Some((self.callback)(args))
    }

    pub fn reset(&self) {
        *self.last_run.lock().expect("throttle mutex poisoned") = None;
    }
}
