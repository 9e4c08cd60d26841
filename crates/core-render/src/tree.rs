//! Whole-tree rendering after layout: focus frame, border, payload,
//! children in declaration order.

use core_widget::{WidgetPayload, WidgetRef};

use crate::RenderCtx;
use crate::border::{render_border, render_focus_frame_bg, render_panel};
use crate::buffer::render_buffer;
use crate::editor::render_editor;
use crate::plotbox::render_plot;
use crate::text::render_text;

pub fn render_tree(ctx: &mut RenderCtx<'_>, node: &WidgetRef) {
    {
        let mut n = node.borrow_mut();
        if !n.visible {
            return;
        }

        // The focus frame is drawn before content; content_rect already
        // reserved the frame cell at layout time.
        render_focus_frame_bg(ctx, &n);
        render_border(ctx, &n);

        if matches!(n.payload, WidgetPayload::Plot(_)) {
            render_plot(ctx, &mut n);
        } else if matches!(n.payload, WidgetPayload::Buffer(_)) {
            render_buffer(ctx, &mut n);
        } else if matches!(n.payload, WidgetPayload::Editor(_)) {
            render_editor(ctx, &mut n);
        } else if matches!(n.payload, WidgetPayload::Text(_)) {
            render_text(ctx, &mut n);
        } else {
            render_panel(ctx, &n);
        }
    }

    let children = node.borrow().children.clone();
    for child in &children {
        render_tree(ctx, child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::MemoryRenderer;
    use crate::{RenderCtx, shared_colors};
    use core_widget::{
        LayoutSpec, Rect, Style, TextAlign, TextBox, WidgetNode, add_child, layout_tree, object,
    };

    #[test]
    fn children_paint_over_parents_in_order() {
        let mut root = WidgetNode::new("root");
        root.layout = LayoutSpec::absolute(0.0, 0.0, 12.0, 3.0);
        root.style = Style {
            border: true,
            title: "t".to_string(),
            ..Style::default()
        };
        let root = object(root);

        let mut child = WidgetNode::new("child");
        child.layout = LayoutSpec::absolute(0.0, 0.0, 5.0, 1.0);
        child.payload = core_widget::WidgetPayload::Text(TextBox::new("abc", false, TextAlign::Left));
        add_child(&root, object(child));

        layout_tree(&root, Rect::new(0, 0, 12, 3));
        let mut r = MemoryRenderer::new(3, 12);
        let mut ctx = RenderCtx::new(&mut r, shared_colors());
        render_tree(&mut ctx, &root);

        assert_eq!(r.cell(0, 0).ch, '┌');
        // Child content starts inside the border.
        assert_eq!(r.cell(1, 1).ch, 'a');
    }

    #[test]
    fn invisible_subtrees_are_skipped() {
        let mut root = WidgetNode::new("root");
        root.layout = LayoutSpec::absolute(0.0, 0.0, 6.0, 2.0);
        root.visible = false;
        let root = object(root);
        layout_tree(&root, Rect::new(0, 0, 6, 2));
        let mut r = MemoryRenderer::new(2, 6);
        let mut ctx = RenderCtx::new(&mut r, shared_colors());
        render_tree(&mut ctx, &root);
        assert_eq!(r.row_text(0), "      ");
    }
}
