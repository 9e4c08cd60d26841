//! Buffer surface: ANSI-wrapped ring of labeled lines with follow-tail
//! scrolling in either direction.

use core_widget::{BufferDir, BufferLine, WidgetNode, WidgetPayload, content_rect};

use crate::RenderCtx;
use crate::ansi::{self, AnsiStyle, Row};

pub fn render_buffer(ctx: &mut RenderCtx<'_>, node: &mut WidgetNode) {
    let r = content_rect(node);
    let style = node.style.clone();
    let WidgetPayload::Buffer(bb) = &mut node.payload else {
        return;
    };

    let base_pair = ctx.pair(&style.label_color, &style.background_color);
    ctx.r.fill_rect(r.y, r.x, r.h, r.w, base_pair);

    let (w, h) = (r.w, r.h);
    if w <= 0 || h <= 0 || bb.lines.is_empty() {
        return;
    }
    bb.wrap_width_last = w;

    // One visible row per entry; wrap continuations repeat the label
    // prefix as indentation.
    let mut vis: Vec<Row> = Vec::with_capacity(bb.lines.len() * 2);
    let mut push_wrapped = |line: &BufferLine| {
        let prefix = if line.label.is_empty() {
            String::new()
        } else {
            format!("[{}] ", line.label)
        };
        let prefix_len = prefix.chars().count() as i32;
        let avail = (w - prefix_len).max(1);

        // Line color comes from the event `__color`, falling back to the
        // figure text color.
        let fg = if line.color.is_empty() {
            style.label_color.clone()
        } else {
            line.color.clone()
        };
        let line_pair = {
            let mut colors = ctx.colors.borrow_mut();
            let p = colors.pair(&fg, &style.background_color);
            if p == 0 { base_pair } else { p }
        };

        let base = AnsiStyle {
            fg,
            bg: style.background_color.clone(),
            bold: style.bold,
            inverse: style.inverse,
            dim: false,
        };
        let mut payload_rows = {
            let mut colors = ctx.colors.borrow_mut();
            ansi::hard_wrap(&line.text, avail, &base, line_pair, &mut colors)
        };
        if payload_rows.is_empty() {
            payload_rows.push(Row::default());
        }

        for (i, payload) in payload_rows.into_iter().enumerate() {
            let mut full = Row::default();
            if i == 0 {
                ansi::append_plain(&mut full, &prefix, line_pair, style.bold, style.inverse);
            } else if prefix_len > 0 {
                let indent = " ".repeat(prefix_len as usize);
                ansi::append_plain(&mut full, &indent, line_pair, style.bold, style.inverse);
            }
            for seg in payload.segs {
                let len = seg.text.chars().count() as i32;
                if let Some(last) = full.segs.last_mut()
                    && last.pair == seg.pair
                    && last.bold == seg.bold
                    && last.inverse == seg.inverse
                {
                    last.text.push_str(&seg.text);
                } else {
                    full.segs.push(seg);
                }
                full.len += len;
            }
            vis.push(full);
        }
    };

    match bb.dir {
        BufferDir::UpDown => {
            for line in bb.lines.iter() {
                push_wrapped(line); // oldest..newest
            }
        }
        BufferDir::DownUp => {
            for line in bb.lines.iter().rev() {
                push_wrapped(line); // newest..oldest
            }
        }
    }

    let total = vis.len() as i32;
    if total <= 0 {
        return;
    }

    let max_scroll = (total - h).max(0);
    bb.scroll = bb.scroll.clamp(0, max_scroll);
    bb.follow_tail = bb.scroll == 0;

    let start = match bb.dir {
        BufferDir::UpDown => (total - h - bb.scroll).max(0),
        BufferDir::DownUp => bb.scroll,
    };

    for row in 0..h {
        let idx = start + row;
        if idx < 0 || idx >= total {
            break;
        }
        ansi::render_row(
            ctx,
            r.y + row,
            r.x,
            w,
            &vis[idx as usize],
            base_pair,
            style.bold,
            style.inverse,
        );
    }

    // Overflow hints at the edges.
    if start > 0 {
        ctx.r.put_glyph(r.y, r.x + w - 1, '↑', base_pair);
    }
    if start + h < total {
        ctx.r.put_glyph(r.y + h - 1, r.x + w - 1, '↓', base_pair);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::MemoryRenderer;
    use crate::{RenderCtx, shared_colors};
    use core_widget::{BufferBox, LayoutSpec, Rect, WidgetNode, layout_tree, object};

    fn buffer_node(capacity: usize, dir: BufferDir, w: i32, h: i32) -> core_widget::WidgetRef {
        let mut n = WidgetNode::new("buf");
        n.layout = LayoutSpec::absolute(0.0, 0.0, w as f64, h as f64);
        n.payload = WidgetPayload::Buffer(BufferBox::new(capacity, dir));
        object(n)
    }

    fn render(node: &core_widget::WidgetRef, w: i32, h: i32) -> MemoryRenderer {
        let mut r = MemoryRenderer::new(h, w);
        layout_tree(node, Rect::new(0, 0, w, h));
        let mut ctx = RenderCtx::new(&mut r, shared_colors());
        render_buffer(&mut ctx, &mut node.borrow_mut());
        r
    }

    fn push(node: &core_widget::WidgetRef, text: &str, label: &str, color: &str) {
        if let WidgetPayload::Buffer(bb) = &mut node.borrow_mut().payload {
            bb.push_line(text, label, color);
        }
    }

    #[test]
    fn updown_is_bottom_anchored() {
        let node = buffer_node(10, BufferDir::UpDown, 12, 2);
        for t in ["one", "two", "three"] {
            push(&node, t, "", "");
        }
        let r = render(&node, 12, 2);
        // Only the 2 newest rows fit; oldest scrolled off the top.
        assert!(r.row_text(0).starts_with("two"));
        assert!(r.row_text(1).starts_with("three"));
        assert_eq!(r.cell(0, 11).ch, '↑');
    }

    #[test]
    fn downup_reverses_order() {
        let node = buffer_node(10, BufferDir::DownUp, 12, 3);
        for t in ["one", "two", "three"] {
            push(&node, t, "", "");
        }
        let r = render(&node, 12, 3);
        assert!(r.row_text(0).starts_with("three"));
        assert!(r.row_text(1).starts_with("two"));
    }

    #[test]
    fn label_prefix_indents_wrap_continuations() {
        let node = buffer_node(10, BufferDir::UpDown, 10, 4);
        push(&node, "abcdefghij", "sys", "");
        let r = render(&node, 10, 4);
        // "[sys] " is 6 cols, payload wraps at 4.
        assert_eq!(r.row_text(0), "[sys] abcd");
        assert_eq!(r.row_text(1), "      efgh");
        assert_eq!(r.row_text(2), "      ij  ");
    }

    #[test]
    fn manual_scroll_freezes_view_until_jump_tail() {
        let node = buffer_node(20, BufferDir::UpDown, 12, 2);
        for i in 0..6 {
            push(&node, &format!("line{i}"), "", "");
        }
        if let WidgetPayload::Buffer(bb) = &mut node.borrow_mut().payload {
            bb.scroll_by(2);
        }
        let r = render(&node, 12, 2);
        assert!(r.row_text(0).starts_with("line2"));
        {
            let mut b = node.borrow_mut();
            let WidgetPayload::Buffer(bb) = &mut b.payload else {
                unreachable!()
            };
            assert!(!bb.follow_tail);
            bb.jump_tail();
        }
        let r = render(&node, 12, 2);
        assert!(r.row_text(1).starts_with("line5"));
    }

    #[test]
    fn per_line_color_overrides_widget_color() {
        let node = buffer_node(4, BufferDir::UpDown, 12, 2);
        push(&node, "plain", "", "");
        push(&node, "colored", "", "#FF0000");
        let r = render(&node, 12, 2);
        assert_ne!(r.cell(1, 0).pair, r.cell(0, 0).pair);
    }
}
