//! Viewport intersection tracking for deferred work such as image loading.

mod geometry;
mod lazy_image;
mod observer;

pub use geometry::{MarginParseError, MarginValue, Rect, RootMargin};
pub use lazy_image::LazyImage;
pub use observer::{ElementRef, ObserverOptions, VisibilityObserver};

#[cfg(test)]
mod tests;
