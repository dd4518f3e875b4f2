//! Terminal pane state and the geometry surface exposed to other modules.
//!
//! The emulator renders in character cells, but viewport fitting and
//! overlay anchoring work in pixels. [`SessionTerminal`] synthesizes a
//! pixel-space content box from the configured font metrics so both
//! conversions stay exact, and exposes only the narrow [`TermView`] trait
//! to the modules that need geometry.

pub mod emulator;

use ratatui::layout::Rect;
use ratatui::text::Line;

/// Rendered glyph cell size in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellMetrics {
    pub width: f64,
    pub height: f64,
}

/// A pixel-space rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Read-only geometry capabilities of a terminal widget.
///
/// The suggestion overlay and the viewport fitter see sessions only
/// through this trait; widget internals stay private.
pub trait TermView {
    /// Cursor cell within the visible grid, `(row, col)`.
    fn cursor_cell(&self) -> (usize, usize);
    /// Glyph cell size in pixels.
    fn cell_metrics(&self) -> CellMetrics;
    /// Content box of the pane in pixels; zero-sized while hidden.
    fn container_rect(&self) -> PixelRect;
}

/// Terminal state for one session pane.
pub struct SessionTerminal {
    pub emulator: emulator::TerminalEmulator,
    metrics: CellMetrics,
    padding: f64,
    container: PixelRect,
    /// Scrollback scroll offset (0 = at bottom / live).
    pub scroll_offset: usize,
}

impl SessionTerminal {
    pub fn new(
        rows: usize,
        cols: usize,
        scrollback: usize,
        metrics: CellMetrics,
        padding: f64,
    ) -> Self {
        Self {
            emulator: emulator::TerminalEmulator::new(rows, cols, scrollback),
            metrics,
            padding,
            container: PixelRect::default(),
            scroll_offset: 0,
        }
    }

    /// Record the pane's inner (borderless) cell area from the last layout
    /// pass. The pixel box covers the same cells plus padding on each side,
    /// so fitting it back through the metrics recovers the cell counts
    /// exactly.
    pub fn sync_layout(&mut self, inner: Rect) {
        self.container = PixelRect {
            x: f64::from(inner.x) * self.metrics.width - self.padding,
            y: f64::from(inner.y) * self.metrics.height - self.padding,
            width: f64::from(inner.width) * self.metrics.width + 2.0 * self.padding,
            height: f64::from(inner.height) * self.metrics.height + 2.0 * self.padding,
        };
    }

    /// Zero the content box, as an unmounted or hidden pane has no layout.
    pub fn mark_hidden(&mut self) {
        self.container = PixelRect::default();
    }

    pub fn padding(&self) -> f64 {
        self.padding
    }

    /// Feed raw session output into the emulator.
    pub fn process_bytes(&mut self, bytes: &[u8]) {
        self.emulator.process_bytes(bytes);
    }

    /// Resize the emulator grid to `cols` x `rows` cells.
    pub fn resize_grid(&mut self, cols: u16, rows: u16) {
        self.emulator.resize(rows as usize, cols as usize);
    }

    /// Rendered lines for display (scrollback + visible grid).
    pub fn render_lines(&self) -> Vec<Line<'static>> {
        self.emulator.render_lines()
    }
}

impl TermView for SessionTerminal {
    fn cursor_cell(&self) -> (usize, usize) {
        self.emulator.cursor()
    }

    fn cell_metrics(&self) -> CellMetrics {
        self.metrics
    }

    fn container_rect(&self) -> PixelRect {
        self.container
    }
}

impl std::fmt::Debug for SessionTerminal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTerminal")
            .field("grid", &(self.emulator.cols(), self.emulator.rows()))
            .field("container", &self.container)
            .field("scroll_offset", &self.scroll_offset)
            .finish()
    }
}
