//! Editor surface: header row, line-number gutter, scroll hints, caret and
//! an optional colorizer callback for per-character color runs.

use core_widget::{WidgetNode, WidgetPayload, content_rect};

use crate::RenderCtx;
use crate::color::PairId;
use crate::text::slice_display_columns;

/// Per-line color runs: `(start_col, end_col, pair)` in content columns.
pub type ColorRun = (usize, usize, PairId);

/// Paints syntax-ish color runs for one content line; `None` renders with
/// the widget colors only.
pub type Colorizer<'a> = &'a dyn Fn(usize, &str) -> Vec<ColorRun>;

fn digits10(mut v: i32) -> i32 {
    if v < 0 {
        v = -v;
    }
    let mut d = 1;
    while v >= 10 {
        v /= 10;
        d += 1;
    }
    d
}

pub fn render_editor(ctx: &mut RenderCtx<'_>, node: &mut WidgetNode) {
    render_editor_with(ctx, node, None);
}

pub fn render_editor_with(
    ctx: &mut RenderCtx<'_>,
    node: &mut WidgetNode,
    colorizer: Option<Colorizer<'_>>,
) {
    let r = content_rect(node);
    let style = node.style.clone();
    let focused = node.focused && node.focusable;
    let WidgetPayload::Editor(ed) = &mut node.payload else {
        return;
    };
    ed.ensure_nonempty();

    let base_pair = ctx.pair(&style.label_color, &style.background_color);
    ctx.r.fill_rect(r.y, r.x, r.h, r.w, base_pair);

    let (w, h) = (r.w, r.h);
    if w <= 0 || h <= 0 {
        return;
    }

    // Header: path + flags left, "Ln x, Col y" and status right.
    {
        let file = if ed.path.is_empty() {
            "<new file>"
        } else {
            ed.path.as_str()
        };
        let mut left = String::new();
        if ed.dirty {
            left.push_str("* ");
        }
        if ed.read_only {
            left.push_str("[RO] ");
        }
        left.push_str(file);

        let mut right = format!("Ln {}, Col {}", ed.cursor_line + 1, ed.cursor_col + 1);
        if !ed.status.is_empty() {
            right.push_str(" | ");
            right.push_str(&ed.status);
        }

        let mut header: Vec<char> = vec![' '; w as usize];
        for (i, c) in left.chars().take(w as usize).enumerate() {
            header[i] = c;
        }
        let right_chars: Vec<char> = right.chars().collect();
        let rlen = right_chars.len().min(w as usize);
        let rx = w as usize - rlen;
        header[rx..rx + rlen].copy_from_slice(&right_chars[right_chars.len() - rlen..]);

        let header: String = header.into_iter().collect();
        ctx.r.put_text(r.y, r.x, &header, w, base_pair, true, false);
    }

    if h == 1 {
        ed.last_body_h = 0;
        ed.last_lineno_w = 0;
        ed.last_text_w = 0;
        return;
    }

    let body_y = r.y + 1;
    let body_h = h - 1;
    let total_lines = (ed.lines.len() as i32).max(1);
    let digits = digits10(total_lines);

    // Gutter "nnn |" is digits + 2 columns, at least 3.
    let ln_w = (digits + 2).clamp(3, w);
    let text_w = (w - ln_w).max(0);

    ed.last_body_h = body_h;
    ed.last_lineno_w = ln_w;
    ed.last_text_w = text_w;

    ed.top_line = ed.top_line.clamp(0, total_lines - 1);
    ed.left_col = ed.left_col.max(0);

    let mut ln_pair = ctx.pair(&style.border_color, &style.background_color);
    if ln_pair == 0 {
        ln_pair = base_pair;
    }

    for row in 0..body_h {
        let li = ed.top_line + row;
        if li < 0 || li >= ed.lines.len() as i32 {
            break;
        }

        let num = (li + 1).to_string();
        let width = digits.clamp(1, 32) as usize;
        let mut gutter = format!("{num:>width$} |");
        let gl = gutter.chars().count() as i32;
        if gl > ln_w {
            gutter = gutter.chars().take(ln_w as usize).collect();
        } else if gl < ln_w {
            gutter.push_str(&" ".repeat((ln_w - gl) as usize));
        }
        ctx.r.put_text(body_y + row, r.x, &gutter, ln_w, ln_pair, false, false);

        let line = &ed.lines[li as usize];
        let shown = if text_w > 0 {
            slice_display_columns(line, ed.left_col, text_w)
        } else {
            String::new()
        };
        ctx.r
            .put_text(body_y + row, r.x + ln_w, &shown, text_w, base_pair, false, false);

        if let Some(colorize) = colorizer {
            for (start, end, pair) in colorize(li as usize, line) {
                let (start, end) = (start as i32, end as i32);
                let vis_start = (start - ed.left_col).max(0);
                let vis_end = (end - ed.left_col).clamp(0, text_w);
                if vis_end <= vis_start {
                    continue;
                }
                let run = slice_display_columns(line, ed.left_col + vis_start, vis_end - vis_start);
                ctx.r.put_text(
                    body_y + row,
                    r.x + ln_w + vis_start,
                    &run,
                    vis_end - vis_start,
                    pair,
                    false,
                    false,
                );
            }
        }
    }

    // Scroll hints on the border side.
    if w > 0 && body_h > 0 {
        if ed.top_line > 0 {
            ctx.r.put_glyph(body_y, r.x + w - 1, '↑', base_pair);
        }
        if ed.top_line + body_h < ed.lines.len() as i32 {
            ctx.r.put_glyph(body_y + body_h - 1, r.x + w - 1, '↓', base_pair);
        }
        if ed.left_col > 0 {
            ctx.r.put_glyph(r.y, r.x + w - 1, '←', base_pair);
        }
    }

    // Caret, clamped into the visible rect.
    if focused && body_h > 0 && text_w > 0 {
        let crow = ed.cursor_line - ed.top_line;
        let ccol = ed.cursor_col - ed.left_col;
        if (0..body_h).contains(&crow) {
            let cx = r.x + ln_w + ccol.clamp(0, (text_w - 1).max(0));
            let cy = body_y + crow;
            if cx >= r.x + ln_w && cx < r.x + w {
                ctx.r.put_text(cy, cx, "|", 1, base_pair, true, true);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::MemoryRenderer;
    use crate::{RenderCtx, shared_colors};
    use core_widget::{EditorBox, LayoutSpec, Rect, WidgetNode, layout_tree, object};

    fn editor_node(text: &str, w: i32, h: i32) -> core_widget::WidgetRef {
        let mut n = WidgetNode::new("ed");
        n.layout = LayoutSpec::absolute(0.0, 0.0, w as f64, h as f64);
        let mut ed = EditorBox::new("demo.txt");
        ed.load_text(text);
        n.payload = WidgetPayload::Editor(ed);
        n.focusable = true;
        object(n)
    }

    fn render(node: &core_widget::WidgetRef, w: i32, h: i32) -> MemoryRenderer {
        let mut r = MemoryRenderer::new(h, w);
        layout_tree(node, Rect::new(0, 0, w, h));
        let mut ctx = RenderCtx::new(&mut r, shared_colors());
        render_editor(&mut ctx, &mut node.borrow_mut());
        r
    }

    #[test]
    fn header_shows_path_and_position() {
        let node = editor_node("hello", 30, 5);
        let r = render(&node, 30, 5);
        let header = r.row_text(0);
        assert!(header.contains("demo.txt"));
        assert!(header.contains("Ln 1, Col 1"));
    }

    #[test]
    fn gutter_width_tracks_line_count() {
        let many = (0..120).map(|i| format!("l{i}")).collect::<Vec<_>>().join("\n");
        let node = editor_node(&many, 20, 6);
        let r = render(&node, 20, 6);
        // 120 lines -> 3 digits -> "  1 |" style gutter of width 5.
        assert_eq!(&r.row_text(1)[..5], "  1 |");
        let n = node.borrow();
        let WidgetPayload::Editor(ed) = &n.payload else {
            unreachable!()
        };
        assert_eq!(ed.last_lineno_w, 5);
    }

    #[test]
    fn dirty_and_readonly_flags_prefix_header() {
        let node = editor_node("x", 30, 4);
        if let WidgetPayload::Editor(ed) = &mut node.borrow_mut().payload {
            ed.dirty = true;
            ed.read_only = true;
        }
        let r = render(&node, 30, 4);
        assert!(r.row_text(0).starts_with("* [RO] demo.txt"));
    }

    #[test]
    fn scroll_hints_appear_when_content_offscreen() {
        let many = (0..40).map(|i| format!("l{i}")).collect::<Vec<_>>().join("\n");
        let node = editor_node(&many, 16, 5);
        if let WidgetPayload::Editor(ed) = &mut node.borrow_mut().payload {
            ed.top_line = 10;
            ed.left_col = 2;
        }
        let r = render(&node, 16, 5);
        assert_eq!(r.cell(1, 15).ch, '↑');
        assert_eq!(r.cell(4, 15).ch, '↓');
        assert_eq!(r.cell(0, 15).ch, '←');
    }

    #[test]
    fn caret_renders_inverse_when_focused() {
        let node = editor_node("abc", 20, 4);
        {
            let mut n = node.borrow_mut();
            n.focused = true;
            if let WidgetPayload::Editor(ed) = &mut n.payload {
                ed.cursor_col = 1;
            }
        }
        let r = render(&node, 20, 4);
        // Gutter "1 |" is 3 wide; caret at content col 1.
        assert!(r.cell(1, 4).inverse);
    }

    #[test]
    fn colorizer_paints_runs() {
        let node = editor_node("keyword rest", 24, 4);
        let mut r = MemoryRenderer::new(4, 24);
        layout_tree(&node, Rect::new(0, 0, 24, 4));
        let colors = shared_colors();
        let mut ctx = RenderCtx::new(&mut r, colors);
        let key_pair = ctx.pair("#FF0000", "<empty>");
        let colorize = move |_line: usize, _text: &str| vec![(0usize, 7usize, key_pair)];
        render_editor_with(&mut ctx, &mut node.borrow_mut(), Some(&colorize));
        assert_eq!(r.cell(1, 3).pair, key_pair);
    }
}
