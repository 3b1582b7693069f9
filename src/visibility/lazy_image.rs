use std::sync::atomic::{AtomicBool, Ordering};

use crate::visibility::geometry::Rect;
use crate::visibility::observer::{ElementRef, VisibilityObserver};

/// Source selection for an image that loads on first visibility. Once the
/// element has been seen, the real source stays selected even if it scrolls
/// back out.
pub struct LazyImage {
    src: String,
    placeholder: Option<String>,
    element: ElementRef,
    loaded: AtomicBool,
}

impl LazyImage {
    pub fn new(observer: &VisibilityObserver, src: impl Into<String>, placeholder: Option<String>) -> Self {
        Self {
            src: src.into(),
            placeholder,
            element: observer.observe(),
            loaded: AtomicBool::new(false),
        }
    }

    pub fn element(&self) -> &ElementRef {
        &self.element
    }

    pub fn attach(&self, bounds: Rect) {
        self.element.attach(bounds);
    }

    pub fn should_load(&self) -> bool {
        if self.loaded.load(Ordering::Acquire) {
            return true;
        }
        if self.element.is_visible() {
            self.loaded.store(true, Ordering::Release);
            tracing::trace!(src = %self.src, "lazy image became visible");
            return true;
        }
        false
    }

    /// The source to render right now: the placeholder (if any) until first
    /// visibility, then the real source.
    pub fn current_src(&self) -> Option<&str> {
        if self.should_load() {
            Some(&self.src)
        } else {
            self.placeholder.as_deref()
        }
    }

    /// Resolves once the element has been visible.
    pub async fn wait_until_visible(&self) {
        if self.should_load() {
            return;
        }
        let mut rx = self.element.visibility();
        // The sender lives in `self.element`, so this only ends by a flip to
        // visible.
        if rx.wait_for(|visible| *visible).await.is_ok() {
            self.loaded.store(true, Ordering::Release);
        }
    }
}
