//! Typed widget data payloads, one sealed variant per renderable surface.

use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

/// Payload variants the renderer dispatches on.
pub enum WidgetPayload {
    /// Bare background fill.
    Panel,
    Text(TextBox),
    Buffer(BufferBox),
    Editor(EditorBox),
    Plot(PlotBox),
}

#[derive(Debug, Clone)]
pub struct TextBox {
    pub content: String,
    pub wrap: bool,
    pub align: TextAlign,
    pub scroll_x: i32,
    pub scroll_y: i32,
}

impl TextBox {
    pub fn new(content: impl Into<String>, wrap: bool, align: TextAlign) -> Self {
        Self {
            content: content.into(),
            wrap,
            align,
            scroll_x: 0,
            scroll_y: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferDir {
    /// Oldest to newest, bottom-anchored.
    UpDown,
    /// Newest first.
    DownUp,
}

#[derive(Debug, Clone, Default)]
pub struct BufferLine {
    pub text: String,
    /// Optional `[label] ` prefix, repeated as indentation on wrap.
    pub label: String,
    /// Per-line color token; empty defers to the widget text color.
    pub color: String,
}

/// Bounded ring of colored lines with follow-tail scrolling.
#[derive(Debug, Clone)]
pub struct BufferBox {
    pub lines: VecDeque<BufferLine>,
    pub capacity: usize,
    pub dir: BufferDir,
    /// Distance from the tail; 0 means "stick to tail".
    pub scroll: i32,
    pub follow_tail: bool,
    /// Width hint fed back by the renderer for wheel-step scaling.
    pub wrap_width_last: i32,
}

impl BufferBox {
    pub fn new(capacity: usize, dir: BufferDir) -> Self {
        Self {
            lines: VecDeque::new(),
            capacity: capacity.max(1),
            dir,
            scroll: 0,
            follow_tail: true,
            wrap_width_last: 0,
        }
    }

    pub fn push_line(&mut self, text: impl Into<String>, label: impl Into<String>, color: impl Into<String>) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(BufferLine {
            text: text.into(),
            label: label.into(),
            color: color.into(),
        });
    }

    /// Positive moves away from the tail (older content); clamping to the
    /// actual extent happens at render time when the height is known.
    pub fn scroll_by(&mut self, delta: i32) {
        self.scroll = (self.scroll + delta).max(0);
        self.follow_tail = self.scroll == 0;
    }

    pub fn jump_tail(&mut self) {
        self.scroll = 0;
        self.follow_tail = true;
    }
}

/// Line-addressable text with cursor and viewport state.
#[derive(Debug, Clone)]
pub struct EditorBox {
    pub path: String,
    pub lines: Vec<String>,
    pub cursor_line: i32,
    pub cursor_col: i32,
    pub top_line: i32,
    pub left_col: i32,
    pub dirty: bool,
    pub read_only: bool,
    pub status: String,
    /// Geometry of the last render, used by key handling to size pages.
    pub last_body_h: i32,
    pub last_lineno_w: i32,
    pub last_text_w: i32,
}

impl EditorBox {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            lines: vec![String::new()],
            cursor_line: 0,
            cursor_col: 0,
            top_line: 0,
            left_col: 0,
            dirty: false,
            read_only: false,
            status: String::new(),
            last_body_h: 0,
            last_lineno_w: 0,
            last_text_w: 0,
        }
    }

    pub fn load_text(&mut self, text: &str) {
        self.lines = text
            .lines()
            .map(|l| l.strip_suffix('\r').unwrap_or(l).to_string())
            .collect();
        self.ensure_nonempty();
        self.cursor_line = 0;
        self.cursor_col = 0;
        self.top_line = 0;
        self.left_col = 0;
        self.dirty = false;
        self.status.clear();
    }

    pub fn to_text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn ensure_nonempty(&mut self) {
        if self.lines.is_empty() {
            self.lines.push(String::new());
        }
    }

    fn clamp_cursor(&mut self) {
        self.ensure_nonempty();
        self.cursor_line = self.cursor_line.clamp(0, self.lines.len() as i32 - 1);
        let len = self.lines[self.cursor_line as usize].chars().count() as i32;
        self.cursor_col = self.cursor_col.clamp(0, len);
    }

    /// Keep the cursor inside the last-known viewport.
    pub fn scroll_into_view(&mut self) {
        self.clamp_cursor();
        let body_h = self.last_body_h.max(1);
        let text_w = self.last_text_w.max(1);
        if self.cursor_line < self.top_line {
            self.top_line = self.cursor_line;
        }
        if self.cursor_line >= self.top_line + body_h {
            self.top_line = self.cursor_line - body_h + 1;
        }
        if self.cursor_col < self.left_col {
            self.left_col = self.cursor_col;
        }
        if self.cursor_col >= self.left_col + text_w {
            self.left_col = self.cursor_col - text_w + 1;
        }
        self.top_line = self.top_line.max(0);
        self.left_col = self.left_col.max(0);
    }

    fn byte_at(&self, line: usize, col: i32) -> usize {
        let s = &self.lines[line];
        s.char_indices()
            .nth(col as usize)
            .map(|(i, _)| i)
            .unwrap_or(s.len())
    }

    pub fn insert_char(&mut self, c: char) {
        if self.read_only {
            self.status = "read-only".to_string();
            return;
        }
        self.clamp_cursor();
        let line = self.cursor_line as usize;
        let at = self.byte_at(line, self.cursor_col);
        self.lines[line].insert(at, c);
        self.cursor_col += 1;
        self.dirty = true;
        self.scroll_into_view();
    }

    pub fn newline(&mut self) {
        if self.read_only {
            self.status = "read-only".to_string();
            return;
        }
        self.clamp_cursor();
        let line = self.cursor_line as usize;
        let at = self.byte_at(line, self.cursor_col);
        let rest = self.lines[line].split_off(at);
        self.lines.insert(line + 1, rest);
        self.cursor_line += 1;
        self.cursor_col = 0;
        self.dirty = true;
        self.scroll_into_view();
    }

    pub fn backspace(&mut self) {
        if self.read_only {
            self.status = "read-only".to_string();
            return;
        }
        self.clamp_cursor();
        if self.cursor_col > 0 {
            let line = self.cursor_line as usize;
            let at = self.byte_at(line, self.cursor_col - 1);
            self.lines[line].remove(at);
            self.cursor_col -= 1;
            self.dirty = true;
        } else if self.cursor_line > 0 {
            let line = self.cursor_line as usize;
            let removed = self.lines.remove(line);
            let prev = &mut self.lines[line - 1];
            self.cursor_col = prev.chars().count() as i32;
            prev.push_str(&removed);
            self.cursor_line -= 1;
            self.dirty = true;
        }
        self.scroll_into_view();
    }

    pub fn delete(&mut self) {
        if self.read_only {
            self.status = "read-only".to_string();
            return;
        }
        self.clamp_cursor();
        let line = self.cursor_line as usize;
        let len = self.lines[line].chars().count() as i32;
        if self.cursor_col < len {
            let at = self.byte_at(line, self.cursor_col);
            self.lines[line].remove(at);
            self.dirty = true;
        } else if line + 1 < self.lines.len() {
            let next = self.lines.remove(line + 1);
            self.lines[line].push_str(&next);
            self.dirty = true;
        }
        self.scroll_into_view();
    }

    pub fn move_cursor(&mut self, d_line: i32, d_col: i32) {
        self.cursor_line += d_line;
        self.cursor_col += d_col;
        self.clamp_cursor();
        self.scroll_into_view();
    }

    pub fn home(&mut self) {
        self.cursor_col = 0;
        self.scroll_into_view();
    }

    pub fn end(&mut self) {
        self.clamp_cursor();
        self.cursor_col = self.lines[self.cursor_line as usize].chars().count() as i32;
        self.scroll_into_view();
    }

    pub fn page(&mut self, dir: i32) {
        let step = self.last_body_h.max(1);
        self.cursor_line += dir * step;
        self.clamp_cursor();
        self.scroll_into_view();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotMode {
    Line,
    Scatter,
    Stairs,
    Stem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeSource {
    OriginalSamples,
    SegmentPath,
}

#[derive(Debug, Clone)]
pub struct SeriesCfg {
    pub color_fg: String,
    pub mode: PlotMode,
    pub scatter: bool,
    pub scatter_every: usize,
    pub fill_vertical_if_same_x: bool,
    pub stem_y: f64,
    pub envelope_enabled: bool,
    pub envelope_source: EnvelopeSource,
    pub envelope_min_count: i32,
    pub envelope_min_height: i32,
    pub envelope_draw_base: bool,
}

impl Default for SeriesCfg {
    fn default() -> Self {
        Self {
            color_fg: "#C8C8C8".to_string(),
            mode: PlotMode::Line,
            scatter: false,
            scatter_every: 1,
            fill_vertical_if_same_x: true,
            stem_y: f64::NAN,
            envelope_enabled: false,
            envelope_source: EnvelopeSource::OriginalSamples,
            envelope_min_count: 2,
            envelope_min_height: 2,
            envelope_draw_base: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlotOpts {
    pub margin_left: i32,
    pub margin_right: i32,
    pub margin_top: i32,
    pub margin_bot: i32,
    pub draw_axes: bool,
    pub draw_grid: bool,
    pub y_ticks: i32,
    pub x_ticks: i32,
    pub baseline0: bool,
    /// NaN means auto-derive from finite samples.
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    pub x_log: bool,
    pub y_log: bool,
    pub x_log_eps: f64,
    pub y_log_eps: f64,
    pub x_label: String,
    pub y_label: String,
    pub hard_clip: bool,
}

impl Default for PlotOpts {
    fn default() -> Self {
        Self {
            margin_left: 8,
            margin_right: 2,
            margin_top: 1,
            margin_bot: 2,
            draw_axes: true,
            draw_grid: true,
            y_ticks: 5,
            x_ticks: 6,
            baseline0: true,
            x_min: f64::NAN,
            x_max: f64::NAN,
            y_min: f64::NAN,
            y_max: f64::NAN,
            x_log: false,
            y_log: false,
            x_log_eps: 1e-12,
            y_log_eps: 1e-12,
            x_label: String::new(),
            y_label: String::new(),
            hard_clip: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlotBox {
    pub series: Vec<Vec<(f64, f64)>>,
    pub series_cfg: Vec<SeriesCfg>,
    pub opts: PlotOpts,
}
