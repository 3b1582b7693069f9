//! Rate limiting for values (debounce) and callbacks (throttle).
//!
//! Both run on the Tokio clock, so paused-time tests drive them
//! deterministically.

mod debounce;
mod throttle;

pub use debounce::{Debounced, DEFAULT_DEBOUNCE_DELAY};
pub use throttle::{Throttled, DEFAULT_THROTTLE_INTERVAL};
