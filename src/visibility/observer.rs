use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::watch;

use crate::visibility::geometry::{Rect, RootMargin};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ObserverOptions {
    /// Minimum intersection ratio (0.0..=1.0). Zero (or NaN) means any overlap.
    pub threshold: f64,
    /// Containing box; `None` means the viewport.
    pub root: Option<Rect>,
    pub root_margin: RootMargin,
}

impl ObserverOptions {
    pub fn is_visible(&self, viewport: &Rect, target: &Rect) -> bool {
        let root = self.root_margin.apply(&self.root.unwrap_or(*viewport));
        let Some(overlap) = target.intersection(&root) else {
            return false;
        };
        let threshold = if self.threshold.is_nan() {
            0.0
        } else {
            self.threshold.clamp(0.0, 1.0)
        };
        let target_area = target.area();
        if threshold <= 0.0 || target_area <= 0.0 {
            return true;
        }
        overlap.area() / target_area >= threshold
    }
}

struct Observed {
    bounds: Rect,
    state: Arc<watch::Sender<bool>>,
}

struct ObserverInner {
    options: ObserverOptions,
    viewport: Mutex<Rect>,
    targets: Mutex<HashMap<u64, Observed>>,
    next_id: AtomicU64,
}

impl ObserverInner {
    fn evaluate(&self, bounds: &Rect) -> bool {
        let viewport = *self.viewport.lock().expect("observer viewport mutex poisoned");
        self.options.is_visible(&viewport, bounds)
    }

    fn untrack(&self, id: u64) {
        self.targets
            .lock()
            .expect("observer targets mutex poisoned")
            .remove(&id);
    }
}

/// Tracks whether attached elements fall inside the (margin-adjusted) root.
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct VisibilityObserver {
    inner: Arc<ObserverInner>,
}

impl VisibilityObserver {
    pub fn new(viewport: Rect, options: ObserverOptions) -> Self {
        Self {
            inner: Arc::new(ObserverInner {
                options,
                viewport: Mutex::new(viewport),
                targets: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn options(&self) -> &ObserverOptions {
        &self.inner.options
    }

    /// A reference to attach to one element at a time.
    pub fn observe(&self) -> ElementRef {
        let (tx, _) = watch::channel(false);
        ElementRef {
            id: self.inner.next_id.fetch_add(1, Ordering::Relaxed),
            observer: Arc::downgrade(&self.inner),
            state: Arc::new(tx),
        }
    }

    /// Report a scroll or resize and re-evaluate every attached element.
    ///
    /// The viewport lock is released before the targets lock is taken;
    /// `ElementRef` takes them in the opposite order.
    pub fn set_viewport(&self, viewport: Rect) {
        *self
            .inner
            .viewport
            .lock()
            .expect("observer viewport mutex poisoned") = viewport;
        let targets = self
            .inner
            .targets
            .lock()
            .expect("observer targets mutex poisoned");
        // Re-read: a later call may have stored a newer viewport already.
        let viewport = *self
            .inner
            .viewport
            .lock()
            .expect("observer viewport mutex poisoned");
        for observed in targets.values() {
            let visible = self.inner.options.is_visible(&viewport, &observed.bounds);
            publish(&observed.state, visible);
        }
    }

    pub fn observed_count(&self) -> usize {
        self.inner
            .targets
            .lock()
            .expect("observer targets mutex poisoned")
            .len()
    }
}

fn publish(state: &watch::Sender<bool>, visible: bool) {
    state.send_if_modified(|current| {
        if *current == visible {
            return false;
        }
        *current = visible;
        true
    });
}

/// Handle consumers attach to an element. Dropping it stops observation.
pub struct ElementRef {
    id: u64,
    observer: Weak<ObserverInner>,
    state: Arc<watch::Sender<bool>>,
}

impl ElementRef {
    /// Start observing the element at `bounds`, replacing whatever element
    /// this reference was attached to before.
    pub fn attach(&self, bounds: Rect) {
        let Some(observer) = self.observer.upgrade() else {
            tracing::debug!(element = self.id, "attach after observer dropped; ignored");
            return;
        };
        // Under the targets lock a concurrent `set_viewport` either sees this
        // element or has already stored the viewport read here.
        let mut targets = observer
            .targets
            .lock()
            .expect("observer targets mutex poisoned");
        let visible = observer.evaluate(&bounds);
        targets.insert(
            self.id,
            Observed {
                bounds,
                state: self.state.clone(),
            },
        );
        publish(&self.state, visible);
    }

    /// Report a layout change of the attached element. No-op when detached.
    pub fn move_to(&self, bounds: Rect) {
        let Some(observer) = self.observer.upgrade() else {
            return;
        };
        let mut targets = observer
            .targets
            .lock()
            .expect("observer targets mutex poisoned");
        if let Some(observed) = targets.get_mut(&self.id) {
            observed.bounds = bounds;
            publish(&self.state, observer.evaluate(&bounds));
        }
    }

    /// Stop observing and report not visible.
    pub fn detach(&self) {
        if let Some(observer) = self.observer.upgrade() {
            observer.untrack(self.id);
        }
        publish(&self.state, false);
    }

    pub fn is_attached(&self) -> bool {
        self.observer.upgrade().is_some_and(|observer| {
            observer
                .targets
                .lock()
                .expect("observer targets mutex poisoned")
                .contains_key(&self.id)
        })
    }

    pub fn is_visible(&self) -> bool {
        *self.state.borrow()
    }

    /// Receiver notified whenever the visibility flag flips.
    pub fn visibility(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }
}

impl Drop for ElementRef {
    fn drop(&mut self) {
        if let Some(observer) = self.observer.upgrade() {
            observer.untrack(self.id);
        }
    }
}
