//! Plot surface: background fill + option mapping into the braille
//! plotter.

use core_widget::{SeriesCfg, WidgetNode, WidgetPayload, content_rect};

use crate::border::render_panel;
use crate::braille::{PlotColors, PlotSeries, plot_braille_multi};
use crate::color::is_unset_color_token;
use crate::RenderCtx;

pub fn render_plot(ctx: &mut RenderCtx<'_>, node: &mut WidgetNode) {
    let r = content_rect(node);
    let style = node.style.clone();
    let WidgetPayload::Plot(pb) = &node.payload else {
        render_panel(ctx, node);
        return;
    };

    let bg = style.background_color.as_str();
    let bg_pair = ctx.pair(&style.label_color, bg);
    let axes_pair = ctx.pair(&style.label_color, bg);
    let grid_pair = ctx.pair(&style.border_color, bg);

    ctx.r.fill_rect(r.y, r.x, r.h, r.w, bg_pair);

    let default_cfg = SeriesCfg::default();
    let mut series: Vec<PlotSeries<'_>> = Vec::with_capacity(pb.series.len());
    for (i, data) in pb.series.iter().enumerate() {
        let cfg = pb.series_cfg.get(i).unwrap_or(&default_cfg);
        // `<empty>` is unset, not a paintable fg.
        let sfg = if cfg.color_fg.is_empty() || is_unset_color_token(&cfg.color_fg) {
            "#C8C8C8"
        } else {
            cfg.color_fg.as_str()
        };
        let pair = ctx.pair(sfg, bg);
        series.push(PlotSeries {
            data,
            cfg,
            pair,
        });
    }

    plot_braille_multi(
        ctx,
        &series,
        r.x,
        r.y,
        r.w,
        r.h,
        &pb.opts,
        PlotColors {
            axes: axes_pair,
            grid: grid_pair,
            bg: bg_pair,
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::MemoryRenderer;
    use crate::{RenderCtx, shared_colors};
    use core_widget::{LayoutSpec, PlotBox, Rect, WidgetNode, layout_tree, object};

    #[test]
    fn renders_series_inside_content_rect() {
        let mut n = WidgetNode::new("plot");
        n.layout = LayoutSpec::absolute(0.0, 0.0, 40.0, 15.0);
        let mut pb = PlotBox::default();
        pb.series
            .push((0..30).map(|i| (i as f64, (i as f64 * 0.4).cos())).collect());
        pb.series_cfg.push(SeriesCfg::default());
        n.payload = WidgetPayload::Plot(pb);
        let node = object(n);

        layout_tree(&node, Rect::new(0, 0, 40, 15));
        let mut r = MemoryRenderer::new(15, 40);
        let mut ctx = RenderCtx::new(&mut r, shared_colors());
        render_plot(&mut ctx, &mut node.borrow_mut());

        let has_braille = (0..15).any(|y| {
            (0..40).any(|x| ('\u{2800}'..='\u{28FF}').contains(&r.cell(y, x).ch))
        });
        assert!(has_braille);
    }

    #[test]
    fn missing_payload_falls_back_to_panel_fill() {
        let mut n = WidgetNode::new("p");
        n.layout = LayoutSpec::absolute(0.0, 0.0, 10.0, 4.0);
        n.style.background_color = "#112233".to_string();
        let node = object(n);
        layout_tree(&node, Rect::new(0, 0, 10, 4));
        let mut r = MemoryRenderer::new(4, 10);
        let mut ctx = RenderCtx::new(&mut r, shared_colors());
        render_plot(&mut ctx, &mut node.borrow_mut());
        assert_ne!(r.cell(0, 0).pair, 0);
    }
}
