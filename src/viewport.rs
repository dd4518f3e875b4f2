//! Viewport fitting and resize negotiation.
//!
//! Fitting is pure geometry. Negotiation decides which fitted sizes are
//! worth a host round-trip: duplicates are dropped, and nothing is sent
//! before the session is ready unless the caller forces it (the one
//! post-connect resize, and re-activation of a hidden tab). The last-sent
//! bookkeeping is updated before the asynchronous send starts and is never
//! rolled back, so it always reflects the most recently attempted size.

use std::time::Duration;

use tokio::task::JoinHandle;

use crate::session::SizeSpec;
use crate::terminal::{CellMetrics, PixelRect};

/// Compute terminal columns and rows from a pixel content box and font
/// metrics. Returns `None` while the container is hidden or mid-layout
/// (non-positive or non-finite geometry).
pub fn fit_viewport(rect: PixelRect, metrics: CellMetrics, padding: f64) -> Option<SizeSpec> {
    if !metrics.width.is_finite() || !metrics.height.is_finite() {
        return None;
    }
    if metrics.width <= 0.0 || metrics.height <= 0.0 {
        return None;
    }
    let usable_width = rect.width - 2.0 * padding;
    let usable_height = rect.height - 2.0 * padding;
    let cols = (usable_width / metrics.width).floor();
    let rows = (usable_height / metrics.height).floor();
    if !cols.is_finite() || !rows.is_finite() || cols <= 0.0 || rows <= 0.0 {
        return None;
    }
    Some(SizeSpec::new(cols as u16, rows as u16))
}

/// Per-session resize gatekeeper.
#[derive(Debug)]
pub struct ResizeNegotiator {
    last_sent: SizeSpec,
    ready: bool,
}

impl ResizeNegotiator {
    pub fn new() -> Self {
        Self {
            last_sent: SizeSpec::ZERO,
            ready: false,
        }
    }

    /// The readiness flag set after connect + settle, cleared on
    /// reconnect and teardown.
    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Last size actually handed to the host (the attempted size, whether
    /// or not the host call later failed).
    pub fn last_sent(&self) -> SizeSpec {
        self.last_sent
    }

    /// Decide whether `size` must be transmitted. `force` bypasses the
    /// readiness gate only; a size equal to the last attempt is always a
    /// no-op. When `Some` is returned the caller must issue the resize;
    /// the bookkeeping has already been updated.
    pub fn negotiate(&mut self, size: Option<SizeSpec>, force: bool) -> Option<SizeSpec> {
        let size = size?;
        if size == self.last_sent {
            return None;
        }
        if !self.ready && !force {
            return None;
        }
        self.last_sent = size;
        Some(size)
    }
}

impl Default for ResizeNegotiator {
    fn default() -> Self {
        Self::new()
    }
}

/// Trailing-edge debounce built on an abortable task handle.
///
/// Arming cancels the pending fire, so only the last event in a burst
/// runs its action. Dropping the timer cancels outstanding work.
#[derive(Debug, Default)]
pub struct DebounceTimer {
    handle: Option<JoinHandle<()>>,
}

impl DebounceTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `action` after `delay`, cancelling any pending fire.
    pub fn arm<F>(&mut self, delay: Duration, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action();
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for DebounceTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
