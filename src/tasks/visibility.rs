//! Viewport intersection tracking for the slider's root element.
//!
//! The host reports element and viewport geometry whenever layout or scroll
//! position changes; the observer turns that into a debounced "in view"
//! boolean. Nothing here polls.

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::config::VisibilityOptions;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Grows the rectangle by `margin` on every edge.
    pub fn expand(&self, margin: f64) -> Self {
        Self {
            x: self.x - margin,
            y: self.y - margin,
            width: self.width + 2.0 * margin,
            height: self.height + 2.0 * margin,
        }
    }

    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = (self.x + self.width).min(other.x + other.width);
        let bottom = (self.y + self.height).min(other.y + other.height);
        if right <= left || bottom <= top {
            return None;
        }
        Some(Rect::new(left, top, right - left, bottom - top))
    }
}

/// Share of `element` inside `viewport` grown by `root_margin`, in `[0, 1]`.
///
/// A zero-area element is never considered intersecting.
pub fn intersection_ratio(element: Rect, viewport: Rect, root_margin: f64) -> f64 {
    let area = element.area();
    if area <= 0.0 {
        return 0.0;
    }
    element
        .intersect(&viewport.expand(root_margin))
        .map_or(0.0, |hit| (hit.area() / area).clamp(0.0, 1.0))
}

/// Publishes whether the observed element is in view.
#[derive(Debug)]
pub struct VisibilityObserver {
    options: VisibilityOptions,
    tx: watch::Sender<bool>,
}

impl VisibilityObserver {
    /// Starts out of view until the first geometry report.
    pub fn new(options: VisibilityOptions) -> Self {
        let (tx, _) = watch::channel(false);
        Self { options, tx }
    }

    /// Feeds a new layout measurement; returns the resulting state.
    pub fn observe(&self, element: Rect, viewport: Rect) -> bool {
        let ratio = intersection_ratio(element, viewport, self.options.root_margin);
        let in_view = ratio >= self.options.threshold;
        trace!(ratio, in_view, "visibility measurement");
        self.set_visible(in_view);
        in_view
    }

    /// Publishes a state the host computed itself. Unchanged states are dropped.
    pub fn set_visible(&self, in_view: bool) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == in_view {
                false
            } else {
                *current = in_view;
                true
            }
        });
        if changed {
            debug!(in_view, "visibility changed");
        }
    }

    pub fn is_visible(&self) -> bool {
        *self.tx.borrow()
    }

    /// Receiver for a slider mount. Dropping it disconnects that mount.
    pub fn watch(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Number of live receivers, mounts and callback subscriptions alike.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Calls `on_change` once per state change until the subscription ends.
    ///
    /// The current state is not replayed. Callbacks run one at a time on a
    /// spawned task, so this must be called from within a tokio runtime.
    pub fn subscribe<F>(&self, mut on_change: F) -> Subscription
    where
        F: FnMut(bool) + Send + 'static,
    {
        let mut rx = self.tx.subscribe();
        rx.borrow_and_update();
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let in_view = *rx.borrow_and_update();
                        on_change(in_view);
                    }
                }
            }
        });
        Subscription { cancel }
    }
}

/// Handle returned by [`VisibilityObserver::subscribe`].
///
/// Unsubscribing is idempotent and also happens on drop.
#[derive(Debug)]
pub struct Subscription {
    cancel: CancellationToken,
}

impl Subscription {
    pub fn unsubscribe(&self) {
        self.cancel.cancel();
    }

    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
