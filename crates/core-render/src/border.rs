//! Border, focus frame and panel fill.

use core_widget::{WidgetNode, content_rect};

use crate::RenderCtx;
use crate::color::{darken_color_token, is_unset_color_token};

/// Focused widgets darken their frame by 20%.
const FOCUS_DARKEN: f64 = 0.8;

/// Background-only frame for focused, focusable, borderless widgets.
pub fn render_focus_frame_bg(ctx: &mut RenderCtx<'_>, node: &WidgetNode) {
    if !(node.focused && node.focusable) || node.style.border {
        return;
    }
    let s = node.screen;
    if s.w < 3 || s.h < 3 {
        return;
    }

    let bg = darken_color_token(&node.style.background_color, FOCUS_DARKEN);
    let mut fg = node.style.border_color.clone();
    if is_unset_color_token(&fg) {
        fg = node.style.label_color.clone();
    }
    let fg = darken_color_token(&fg, FOCUS_DARKEN);

    let mut pair = ctx.pair(&fg, &bg);
    if pair == 0 {
        pair = ctx.pair("white", &bg);
    }

    ctx.r.fill_rect(s.y, s.x, 1, s.w, pair);
    if s.h > 1 {
        ctx.r.fill_rect(s.y + s.h - 1, s.x, 1, s.w, pair);
    }
    if s.h > 2 {
        ctx.r.fill_rect(s.y + 1, s.x, s.h - 2, 1, pair);
        if s.w > 1 {
            ctx.r.fill_rect(s.y + 1, s.x + s.w - 1, s.h - 2, 1, pair);
        }
    }
}

/// Box-drawing border with the title inlaid on the top edge.
pub fn render_border(ctx: &mut RenderCtx<'_>, node: &WidgetNode) {
    if !node.style.border {
        return;
    }
    let s = node.screen;
    if s.w <= 0 || s.h <= 0 {
        return;
    }

    let mut fg = node.style.border_color.clone();
    let mut bg = node.style.background_color.clone();
    if node.focused && node.focusable {
        if is_unset_color_token(&fg) {
            fg = node.style.label_color.clone();
        }
        fg = darken_color_token(&fg, FOCUS_DARKEN);
        // Terminal-default background cannot be darkened reliably.
        if !is_unset_color_token(&bg) {
            bg = darken_color_token(&bg, FOCUS_DARKEN);
        }
    }
    let pair = ctx.pair(&fg, &bg);

    if s.w == 1 || s.h == 1 {
        // Degenerate rect: paint it so focus stays visible.
        ctx.r.fill_rect(s.y, s.x, s.h, s.w, pair);
        return;
    }

    for c in 1..s.w - 1 {
        ctx.r.put_glyph(s.y, s.x + c, '─', pair);
        ctx.r.put_glyph(s.y + s.h - 1, s.x + c, '─', pair);
    }
    for r in 1..s.h - 1 {
        ctx.r.put_glyph(s.y + r, s.x, '│', pair);
        ctx.r.put_glyph(s.y + r, s.x + s.w - 1, '│', pair);
    }
    ctx.r.put_glyph(s.y, s.x, '┌', pair);
    ctx.r.put_glyph(s.y, s.x + s.w - 1, '┐', pair);
    ctx.r.put_glyph(s.y + s.h - 1, s.x, '└', pair);
    ctx.r.put_glyph(s.y + s.h - 1, s.x + s.w - 1, '┘', pair);

    if !node.style.title.is_empty() && s.w > 4 {
        let available = s.w - 4;
        ctx.r
            .put_text(s.y, s.x + 2, &node.style.title, available, pair, false, false);
    }
}

/// Plain background fill of the content rect.
pub fn render_panel(ctx: &mut RenderCtx<'_>, node: &WidgetNode) {
    let r = content_rect(node);
    let pair = ctx.pair(&node.style.label_color, &node.style.background_color);
    ctx.r.fill_rect(r.y, r.x, r.h, r.w, pair);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::MemoryRenderer;
    use crate::{RenderCtx, shared_colors};
    use core_widget::{LayoutSpec, Rect, Style, WidgetNode, layout_tree, object};

    fn bordered(w: i32, h: i32, title: &str) -> core_widget::WidgetRef {
        let mut n = WidgetNode::new("b");
        n.layout = LayoutSpec::absolute(0.0, 0.0, w as f64, h as f64);
        n.style = Style {
            border: true,
            title: title.to_string(),
            ..Style::default()
        };
        object(n)
    }

    #[test]
    fn draws_box_corners_and_title() {
        let node = bordered(10, 4, "hi");
        layout_tree(&node, Rect::new(0, 0, 10, 4));
        let mut r = MemoryRenderer::new(4, 10);
        let mut ctx = RenderCtx::new(&mut r, shared_colors());
        render_border(&mut ctx, &node.borrow());
        assert_eq!(r.cell(0, 0).ch, '┌');
        assert_eq!(r.cell(0, 9).ch, '┐');
        assert_eq!(r.cell(3, 0).ch, '└');
        assert_eq!(r.cell(3, 9).ch, '┘');
        assert_eq!(r.cell(1, 0).ch, '│');
        // Title inlaid starting at column 2.
        assert_eq!(r.cell(0, 2).ch, 'h');
        assert_eq!(r.cell(0, 3).ch, 'i');
    }

    #[test]
    fn focus_frame_only_for_borderless_focused_focusables() {
        let node = bordered(10, 4, "");
        layout_tree(&node, Rect::new(0, 0, 10, 4));
        let mut r = MemoryRenderer::new(4, 10);
        let colors = shared_colors();
        // Bordered: no frame fill.
        {
            let mut ctx = RenderCtx::new(&mut r, colors.clone());
            render_focus_frame_bg(&mut ctx, &node.borrow());
        }
        assert_eq!(r.cell(0, 0).pair, 0);

        {
            let mut n = node.borrow_mut();
            n.style.border = false;
            n.style.background_color = "#808080".to_string();
            n.focusable = true;
            n.focused = true;
        }
        {
            let mut ctx = RenderCtx::new(&mut r, colors.clone());
            render_focus_frame_bg(&mut ctx, &node.borrow());
        }
        assert_ne!(r.cell(0, 0).pair, 0);
        assert_ne!(r.cell(3, 9).pair, 0);
        // Interior untouched.
        assert_eq!(r.cell(1, 1).pair, 0);
    }

    #[test]
    fn degenerate_border_paints_fill() {
        let node = bordered(5, 1, "");
        layout_tree(&node, Rect::new(0, 0, 5, 1));
        let mut r = MemoryRenderer::new(1, 5);
        let mut ctx = RenderCtx::new(&mut r, shared_colors());
        render_border(&mut ctx, &node.borrow());
        // No panic, whole strip painted with the border pair.
        assert_eq!(r.cell(0, 0).ch, ' ');
    }
}
