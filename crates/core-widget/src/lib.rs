//! Retained widget tree: objects with styles, layouts and typed data
//! payloads. The render loop owns the tree; nothing here is shared across
//! threads.

pub mod layout;
pub mod payload;

use std::cell::RefCell;
use std::rc::Rc;

pub use layout::{content_rect, layout_tree, pick_topmost, resolve_tracks};
pub use payload::{
    BufferBox, BufferDir, BufferLine, EditorBox, EnvelopeSource, PlotBox, PlotMode, PlotOpts,
    SeriesCfg, TextAlign, TextBox, WidgetPayload,
};

/// Terminal-cell rectangle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && y >= self.y && x < self.x + self.w && y < self.y + self.h
    }

    pub fn inset(&self, l: i32, t: i32, r: i32, b: i32) -> Rect {
        Rect {
            x: self.x + l,
            y: self.y + t,
            w: (self.w - (l + r)).max(0),
            h: (self.h - (t + b)).max(0),
        }
    }
}

/// Color tokens are strings: `<empty>` (terminal default), `#RRGGBB`, or a
/// named token resolved by the color registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Style {
    pub border: bool,
    pub title: String,
    pub label_color: String,
    pub background_color: String,
    pub border_color: String,
    pub bold: bool,
    pub inverse: bool,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            border: false,
            title: String::new(),
            label_color: "white".to_string(),
            background_color: "<empty>".to_string(),
            border_color: "gray".to_string(),
            bold: false,
            inverse: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutMode {
    GridCell,
    Dock,
    Absolute,
    Normalized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dock {
    None,
    Top,
    Bottom,
    Left,
    Right,
    Fill,
}

/// Track size: fixed cells or a fraction of the remainder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackLen {
    Px(f64),
    Frac(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutSpec {
    pub mode: LayoutMode,
    /// Cells for `Absolute`, `[0,1]` of parent content for `Normalized`.
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub grid_row: usize,
    pub grid_col: usize,
    pub grid_row_span: usize,
    pub grid_col_span: usize,
    pub dock: Dock,
    pub dock_size: TrackLen,
    pub pad_left: i32,
    pub pad_top: i32,
    pub pad_right: i32,
    pub pad_bottom: i32,
}

impl Default for LayoutSpec {
    fn default() -> Self {
        Self {
            mode: LayoutMode::Absolute,
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            grid_row: 0,
            grid_col: 0,
            grid_row_span: 1,
            grid_col_span: 1,
            dock: Dock::None,
            dock_size: TrackLen::Px(0.0),
            pad_left: 0,
            pad_top: 0,
            pad_right: 0,
            pad_bottom: 0,
        }
    }
}

impl LayoutSpec {
    pub fn absolute(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            mode: LayoutMode::Absolute,
            x,
            y,
            width,
            height,
            ..Self::default()
        }
    }

    pub fn normalized(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            mode: LayoutMode::Normalized,
            x,
            y,
            width,
            height,
            ..Self::default()
        }
    }

    pub fn docked(dock: Dock, size: TrackLen) -> Self {
        Self {
            mode: LayoutMode::Dock,
            dock,
            dock_size: size,
            ..Self::default()
        }
    }

    pub fn grid_cell(row: usize, col: usize) -> Self {
        Self {
            mode: LayoutMode::GridCell,
            grid_row: row,
            grid_col: col,
            ..Self::default()
        }
    }
}

/// Grid container: row/column tracks with gaps and inner padding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridSpec {
    pub rows: Vec<TrackLen>,
    pub cols: Vec<TrackLen>,
    pub gap_row: i32,
    pub gap_col: i32,
    pub pad_left: i32,
    pub pad_top: i32,
    pub pad_right: i32,
    pub pad_bottom: i32,
}

pub type WidgetRef = Rc<RefCell<WidgetNode>>;

pub struct WidgetNode {
    pub id: String,
    pub visible: bool,
    pub focusable: bool,
    pub focused: bool,
    pub z_index: i32,
    pub layout: LayoutSpec,
    pub style: Style,
    pub grid: Option<GridSpec>,
    pub payload: WidgetPayload,
    pub children: Vec<WidgetRef>,
    /// Resolved by `layout_tree`.
    pub screen: Rect,
}

impl WidgetNode {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            visible: true,
            focusable: false,
            focused: false,
            z_index: 0,
            layout: LayoutSpec::default(),
            style: Style::default(),
            grid: None,
            payload: WidgetPayload::Panel,
            children: Vec::new(),
            screen: Rect::default(),
        }
    }
}

/// Wrap a node for tree membership.
pub fn object(node: WidgetNode) -> WidgetRef {
    Rc::new(RefCell::new(node))
}

/// Convenience: a styled, positioned object with a payload.
pub fn create_object(
    id: impl Into<String>,
    layout: LayoutSpec,
    style: Style,
    payload: WidgetPayload,
) -> WidgetRef {
    let mut n = WidgetNode::new(id);
    n.layout = layout;
    n.style = style;
    n.payload = payload;
    object(n)
}

pub fn add_child(parent: &WidgetRef, child: WidgetRef) {
    parent.borrow_mut().children.push(child);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_contains_is_half_open() {
        let r = Rect::new(1, 1, 2, 2);
        assert!(r.contains(1, 1));
        assert!(r.contains(2, 2));
        assert!(!r.contains(3, 1));
        assert!(!r.contains(0, 1));
    }

    #[test]
    fn rect_inset_clamps_at_zero() {
        let r = Rect::new(0, 0, 3, 3).inset(2, 2, 2, 2);
        assert_eq!(r.w, 0);
        assert_eq!(r.h, 0);
    }

    #[test]
    fn child_insertion_preserves_order() {
        let root = object(WidgetNode::new("root"));
        add_child(&root, object(WidgetNode::new("a")));
        add_child(&root, object(WidgetNode::new("b")));
        let ids: Vec<String> = root
            .borrow()
            .children
            .iter()
            .map(|c| c.borrow().id.clone())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
