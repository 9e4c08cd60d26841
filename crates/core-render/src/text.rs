//! Text surface: ANSI-aware wrapping, plain viewport with scrollbars, and
//! the focused single-line input mode with a trailing caret.

use core_widget::{TextAlign, WidgetNode, WidgetPayload, content_rect};
use unicode_width::UnicodeWidthChar;

use crate::RenderCtx;
use crate::ansi::{self, AnsiStyle};
use crate::color::PairId;

/// Display columns of a string (zero-width chars ignored).
pub fn display_width(s: &str) -> i32 {
    s.chars().map(|c| c.width().unwrap_or(0) as i32).sum()
}

/// Split on `\n`, keeping empty lines; `\r` line endings are stripped.
pub fn split_lines_keep_empty(s: &str) -> Vec<String> {
    s.split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l).to_string())
        .collect()
}

/// Hard wrap into rows of at most `width` columns; physical line breaks
/// are respected first.
pub fn wrap_text(s: &str, width: i32) -> Vec<String> {
    let width = width.max(1);
    let mut out = Vec::new();
    for line in split_lines_keep_empty(s) {
        if line.is_empty() {
            out.push(String::new());
            continue;
        }
        let mut row = String::new();
        let mut col = 0;
        for c in line.chars() {
            let w = c.width().unwrap_or(0) as i32;
            if w == 0 {
                continue;
            }
            if col + w > width {
                out.push(std::mem::take(&mut row));
                col = 0;
            }
            row.push(c);
            col += w;
        }
        out.push(row);
    }
    out
}

/// Slice `line` starting `skip` columns in, up to `take` columns wide.
pub fn slice_display_columns(line: &str, skip: i32, take: i32) -> String {
    let mut out = String::new();
    let mut col = 0;
    for c in line.chars() {
        let w = c.width().unwrap_or(0) as i32;
        if w == 0 {
            continue;
        }
        if col + w > skip + take {
            break;
        }
        if col >= skip {
            out.push(c);
        }
        col += w;
    }
    out
}

pub fn render_text(ctx: &mut RenderCtx<'_>, node: &mut WidgetNode) {
    let r = content_rect(node);
    let style = node.style.clone();
    let focused_input = node.focused && node.focusable;
    let WidgetPayload::Text(tb) = &mut node.payload else {
        return;
    };

    let pair = ctx.pair(&style.label_color, &style.background_color);
    ctx.r.fill_rect(r.y, r.x, r.h, r.w, pair);

    if r.w <= 0 || r.h <= 0 {
        return;
    }

    // Focused input: single line, trailing caret, horizontal auto-scroll.
    // Labels are never focusable, so any focused text box is an input line.
    if focused_input {
        let mut line = tb.content.clone();
        if let Some(p) = line.find('\n') {
            line.truncate(p);
        }

        let vis_w = (r.w - 1).max(0); // reserve the caret column
        let len = display_width(&line);
        let skip = (len - vis_w).max(0);
        let shown = slice_display_columns(&line, skip, vis_w.max(0));

        if vis_w > 0 {
            ctx.r
                .put_text(r.y, r.x, &shown, vis_w, pair, style.bold, style.inverse);
        }
        let caret_off = (len - skip).min(vis_w);
        let cx = r.x + caret_off;
        if cx >= r.x && cx < r.x + r.w {
            ctx.r.put_text(r.y, cx, "|", 1, pair, true, true);
        }
        return;
    }

    // ANSI-aware path.
    if ansi::has_esc(&tb.content) {
        let base = AnsiStyle {
            fg: style.label_color.clone(),
            bg: style.background_color.clone(),
            bold: style.bold,
            inverse: style.inverse,
            dim: false,
        };
        let phys = split_lines_keep_empty(&tb.content);
        let mut y = r.y;
        for pl in &phys {
            if y >= r.y + r.h {
                break;
            }
            let rows = {
                let mut colors = ctx.colors.borrow_mut();
                ansi::hard_wrap(pl, r.w.max(1), &base, pair, &mut colors)
            };
            for row in &rows {
                if y >= r.y + r.h {
                    break;
                }
                let colx = match tb.align {
                    TextAlign::Center => r.x + ((r.w - row.len) / 2).max(0),
                    TextAlign::Right => r.x + (r.w - row.len).max(0),
                    TextAlign::Left => r.x,
                };
                ansi::render_row(
                    ctx,
                    y,
                    colx,
                    (r.w - (colx - r.x)).max(0),
                    row,
                    pair,
                    style.bold,
                    style.inverse,
                );
                y += 1;
                if !tb.wrap {
                    break; // nowrap renders only the first wrapped row
                }
            }
        }
        return;
    }

    // Plain path: viewport with optional scrollbars. Reservation is a
    // fixed point reached within three iterations.
    let (width, height) = (r.w, r.h);
    let mut reserve_v = 0;
    let mut reserve_h = 0;
    let mut text_w = width;
    let mut text_h = height;
    let mut lines: Vec<String>;
    let mut max_line_len = 0;

    for _ in 0..3 {
        text_w = (width - reserve_v).max(0);
        text_h = (height - reserve_h).max(0);
        if text_w <= 0 || text_h <= 0 {
            return;
        }
        lines = if tb.wrap {
            wrap_text(&tb.content, text_w)
        } else {
            split_lines_keep_empty(&tb.content)
        };
        max_line_len = lines.iter().map(|l| display_width(l)).max().unwrap_or(0);

        let need_h = !tb.wrap && max_line_len > text_w;
        let reserve_h_new = i32::from(need_h);
        let text_h_if = (height - reserve_h_new).max(0);
        let need_v = lines.len() as i32 > text_h_if;
        let reserve_v_new = i32::from(need_v);

        if reserve_h_new == reserve_h && reserve_v_new == reserve_v {
            break;
        }
        reserve_h = reserve_h_new;
        reserve_v = reserve_v_new;
    }

    text_w = (width - reserve_v).max(0);
    text_h = (height - reserve_h).max(0);
    if text_w <= 0 || text_h <= 0 {
        return;
    }
    let lines = if tb.wrap {
        wrap_text(&tb.content, text_w)
    } else {
        split_lines_keep_empty(&tb.content)
    };
    max_line_len = lines.iter().map(|l| display_width(l)).max().unwrap_or(0);

    let max_scroll_y = (lines.len() as i32 - text_h).max(0);
    let max_scroll_x = if tb.wrap {
        0
    } else {
        (max_line_len - text_w).max(0)
    };
    tb.scroll_y = tb.scroll_y.clamp(0, max_scroll_y);
    tb.scroll_x = tb.scroll_x.clamp(0, max_scroll_x);

    for row in 0..text_h {
        let li = tb.scroll_y + row;
        if li < 0 || li >= lines.len() as i32 {
            break;
        }
        let mut line = lines[li as usize].clone();
        let selected = line.starts_with('\x1f');
        if selected {
            line.remove(0);
        }
        if !tb.wrap && tb.scroll_x > 0 {
            line = slice_display_columns(&line, tb.scroll_x, text_w);
        }

        let mut colx = r.x;
        // Alignment is only meaningful without horizontal scroll or a side bar.
        if tb.scroll_x == 0 && reserve_v == 0 {
            let len = display_width(&line);
            colx = match tb.align {
                TextAlign::Center => r.x + ((text_w - len) / 2).max(0),
                TextAlign::Right => r.x + (text_w - len).max(0),
                TextAlign::Left => r.x,
            };
        }

        let (line_pair, line_bold) = if selected {
            (ctx.pair("#FFD26E", &style.background_color), true)
        } else {
            (pair, style.bold)
        };
        ctx.r
            .put_text(r.y + row, colx, &line, text_w, line_pair, line_bold, style.inverse);
    }

    let mut bar_pair = ctx.pair(&style.border_color, &style.background_color);
    if bar_pair == 0 {
        bar_pair = pair;
    }

    if reserve_v > 0 && text_h > 0 {
        let bar_x = r.x + text_w;
        for i in 0..text_h {
            ctx.r.put_glyph(r.y + i, bar_x, '│', bar_pair);
        }
        let total = (lines.len() as i32).max(1);
        let mut thumb_h =
            ((f64::from(text_h) * f64::from(text_h)) / f64::from(total)).round() as i32;
        thumb_h = thumb_h.clamp(1, text_h);
        let span = (text_h - thumb_h).max(0);
        let thumb_y = if max_scroll_y > 0 {
            ((f64::from(tb.scroll_y) * f64::from(span)) / f64::from(max_scroll_y)).round() as i32
        } else {
            0
        };
        for i in 0..thumb_h {
            ctx.r.put_glyph(r.y + thumb_y + i, bar_x, '█', bar_pair);
        }
    }

    if reserve_h > 0 && text_w > 0 {
        let bar_y = r.y + text_h;
        for i in 0..text_w {
            ctx.r.put_glyph(bar_y, r.x + i, '─', bar_pair);
        }
        let total = max_line_len.max(1);
        let mut thumb_w =
            ((f64::from(text_w) * f64::from(text_w)) / f64::from(total)).round() as i32;
        thumb_w = thumb_w.clamp(1, text_w);
        let span = (text_w - thumb_w).max(0);
        let thumb_x = if max_scroll_x > 0 {
            ((f64::from(tb.scroll_x) * f64::from(span)) / f64::from(max_scroll_x)).round() as i32
        } else {
            0
        };
        for i in 0..thumb_w {
            ctx.r.put_glyph(bar_y, r.x + thumb_x + i, '█', bar_pair);
        }
        if reserve_v > 0 {
            ctx.r.put_glyph(bar_y, r.x + text_w, '┘', bar_pair);
        }
    }
}
