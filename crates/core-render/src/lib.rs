//! Rendering over an abstract backend: color-pair registry, ANSI-aware
//! text engine, Braille plotter, and per-surface draw modules dispatched by
//! widget payload.
//!
//! Nothing here talks to a terminal directly; everything goes through the
//! [`Renderer`] trait. The color registry is process-wide state with an
//! explicit lifecycle: the render thread creates it at startup, shares it
//! with the backend, and is the only writer.

pub mod ansi;
pub mod border;
pub mod braille;
pub mod buffer;
pub mod color;
pub mod editor;
pub mod mem;
pub mod plotbox;
pub mod text;
pub mod tree;

use std::cell::RefCell;
use std::rc::Rc;

use thiserror::Error;

pub use border::{render_border, render_focus_frame_bg, render_panel};
pub use braille::{PlotColors, PlotSeries, nice_step, plot_braille_multi};
pub use buffer::render_buffer;
pub use color::{ColorRegistry, PairId, Rgb, darken_color_token, is_unset_color_token};
pub use editor::{ColorRun, Colorizer, render_editor, render_editor_with};
pub use mem::MemoryRenderer;
pub use plotbox::render_plot;
pub use text::{display_width, render_text, split_lines_keep_empty, wrap_text};
pub use tree::render_tree;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("renderer backend failure: {0}")]
    Backend(String),
}

/// The only interface the core draws through.
pub trait Renderer {
    /// `(rows, cols)`.
    fn size(&self) -> (i32, i32);
    fn clear(&mut self);
    fn flush(&mut self) -> Result<(), RenderError>;

    /// Write `s` starting at `(y, x)`, clipped to `max_w` columns
    /// (negative = unclipped).
    fn put_text(&mut self, y: i32, x: i32, s: &str, max_w: i32, pair: PairId, bold: bool, inverse: bool);
    fn put_glyph(&mut self, y: i32, x: i32, ch: char, pair: PairId);
    fn fill_rect(&mut self, y: i32, x: i32, h: i32, w: i32, pair: PairId);

    fn put_braille(&mut self, y: i32, x: i32, ch: char, pair: PairId) {
        self.put_glyph(y, x, ch, pair);
    }
}

/// Registry handle shared between the draw path and the backend. The render
/// loop is single-threaded; lookups are idempotent and only the render
/// thread mutates.
pub type SharedColors = Rc<RefCell<ColorRegistry>>;

pub fn shared_colors() -> SharedColors {
    Rc::new(RefCell::new(ColorRegistry::new()))
}

/// Everything a draw function needs: the backend and the color registry.
pub struct RenderCtx<'a> {
    pub r: &'a mut dyn Renderer,
    pub colors: SharedColors,
}

impl<'a> RenderCtx<'a> {
    pub fn new(r: &'a mut dyn Renderer, colors: SharedColors) -> Self {
        Self { r, colors }
    }

    /// Resolve a `(fg, bg)` token pair; 0 is the terminal default.
    pub fn pair(&self, fg: &str, bg: &str) -> PairId {
        self.colors.borrow_mut().pair(fg, bg)
    }
}
