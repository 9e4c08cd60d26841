//! Braille sub-cell plotter: 2x4 dots per terminal cell, grid underlay,
//! data overlay, multi-series modes.

use core_widget::{EnvelopeSource, PlotMode, PlotOpts, SeriesCfg};
use tracing::warn;

use crate::RenderCtx;
use crate::color::PairId;

/// Braille Patterns dot layout:
/// ```text
/// (0,0)=0x01 (1,0)=0x08
/// (0,1)=0x02 (1,1)=0x10
/// (0,2)=0x04 (1,2)=0x20
/// (0,3)=0x40 (1,3)=0x80
/// ```
fn dot_bit(sub_x: usize, sub_y: usize) -> u8 {
    const MAP: [[u8; 2]; 4] = [[0x01, 0x08], [0x02, 0x10], [0x04, 0x20], [0x40, 0x80]];
    MAP[sub_y][sub_x]
}

pub struct PlotSeries<'a> {
    pub data: &'a [(f64, f64)],
    pub cfg: &'a SeriesCfg,
    pub pair: PairId,
}

/// Resolved color pairs the widget layer hands down.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlotColors {
    pub axes: PairId,
    pub grid: PairId,
    /// Used for cells that end up with no glyph color.
    pub bg: PairId,
}

struct DotGrid {
    w: i32,
    h: i32,
    cells: Vec<u8>,
    colors: Vec<PairId>,
}

impl DotGrid {
    fn new(w: i32, h: i32) -> Self {
        Self {
            w,
            h,
            cells: vec![0; (w * h) as usize],
            colors: vec![0; (w * h) as usize],
        }
    }

    fn idx(&self, px: i32, py: i32) -> Option<(usize, usize, usize)> {
        if px < 0 || py < 0 {
            return None;
        }
        let cell_x = px / 2;
        let cell_y = py / 4;
        if cell_x >= self.w || cell_y >= self.h {
            return None;
        }
        Some((
            (cell_y * self.w + cell_x) as usize,
            (px % 2) as usize,
            (py % 4) as usize,
        ))
    }

    fn set_dot(&mut self, px: i32, py: i32) {
        if let Some((i, sx, sy)) = self.idx(px, py) {
            self.cells[i] |= dot_bit(sx, sy);
        }
    }

    /// Underlay: only set when the cell has no color yet.
    fn touch_under(&mut self, px: i32, py: i32, pair: PairId) {
        if pair == 0 {
            return;
        }
        if let Some((i, _, _)) = self.idx(px, py)
            && self.colors[i] == 0
        {
            self.colors[i] = pair;
        }
    }

    /// Overlay: data wins over grid/baseline.
    fn touch(&mut self, px: i32, py: i32, pair: PairId) {
        if pair == 0 {
            return;
        }
        if let Some((i, _, _)) = self.idx(px, py) {
            self.colors[i] = pair;
        }
    }
}

/// Bresenham on sub-pixel coordinates.
fn rasterize_line_int(x0: i32, y0: i32, x1: i32, y1: i32, mut plot: impl FnMut(i32, i32)) {
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let (mut x, mut y) = (x0, y0);
    loop {
        plot(x, y);
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

fn rasterize_vertical_span(grid: &mut DotGrid, px: i32, py0: i32, py1: i32, pair: PairId) {
    let (lo, hi) = if py0 <= py1 { (py0, py1) } else { (py1, py0) };
    for py in lo..=hi {
        grid.set_dot(px, py);
        grid.touch(px, py, pair);
    }
}

/// Tick step chosen from `{1,2,5,10} x 10^floor(log10(span/target))`.
pub fn nice_step(span: f64, target_ticks: i32) -> f64 {
    if span <= 0.0 || target_ticks <= 0 {
        return 1.0;
    }
    let raw = span / f64::from(target_ticks);
    let mag = 10f64.powf(raw.log10().floor());
    let norm = raw / mag;
    let step = if norm < 1.5 {
        1.0
    } else if norm < 3.0 {
        2.0
    } else if norm < 7.0 {
        5.0
    } else {
        10.0
    };
    step * mag
}

fn safe_log10(v: f64, eps: f64) -> f64 {
    if v.is_nan() || v <= -eps {
        return f64::NAN;
    }
    (v.max(0.0) + eps).log10()
}

fn format_tick(v: f64) -> String {
    // `%.6g`-style: trim trailing zeros from a short decimal form.
    let s = format!("{v:.6}");
    if s.contains('.') {
        let t = s.trim_end_matches('0').trim_end_matches('.');
        t.to_string()
    } else {
        s
    }
}

fn draw_text_clipped(ctx: &mut RenderCtx<'_>, y: i32, x: i32, s: &str, max_w: i32, pair: PairId) {
    if max_w <= 0 {
        return;
    }
    ctx.r.put_text(y, x, s, max_w, pair, false, false);
}

/// Render every series into `(start_x, start_y, width, height)` cells.
/// The grid and baseline go in first as an underlay so data overlays with
/// the series color and the grid shows through empty cells.
pub fn plot_braille_multi(
    ctx: &mut RenderCtx<'_>,
    series: &[PlotSeries<'_>],
    start_x: i32,
    start_y: i32,
    width_cells: i32,
    height_cells: i32,
    opts: &PlotOpts,
    palette: PlotColors,
) {
    if width_cells <= 0 || height_cells <= 0 {
        warn!(target: "render.plot", "plot area must be positive");
        return;
    }
    if series.is_empty() {
        return;
    }

    let plot_x0 = start_x + opts.margin_left;
    let plot_y0 = start_y + opts.margin_top;
    let plot_w = (width_cells - (opts.margin_left + opts.margin_right)).max(0);
    let plot_h = (height_cells - (opts.margin_top + opts.margin_bot)).max(0);
    if plot_w <= 0 || plot_h <= 0 {
        return;
    }

    let tx = |x: f64| -> f64 {
        if opts.x_log {
            safe_log10(x, opts.x_log_eps)
        } else {
            x
        }
    };
    let ty = |y: f64| -> f64 {
        if opts.y_log {
            safe_log10(y, opts.y_log_eps)
        } else {
            y
        }
    };

    // Honor fixed bounds; auto-fill only the NaN ones from finite samples.
    let (mut x_min, mut x_max) = (opts.x_min, opts.x_max);
    let (mut y_min, mut y_max) = (opts.y_min, opts.y_max);
    let auto_x_min = !x_min.is_finite();
    let auto_x_max = !x_max.is_finite();
    let auto_y_min = !y_min.is_finite();
    let auto_y_max = !y_max.is_finite();

    for s in series {
        for &(x, y) in s.data {
            let (x, y) = (tx(x), ty(y));
            if !x.is_finite() || !y.is_finite() {
                continue;
            }
            if auto_x_min {
                x_min = if x_min.is_finite() { x_min.min(x) } else { x };
            }
            if auto_x_max {
                x_max = if x_max.is_finite() { x_max.max(x) } else { x };
            }
            if auto_y_min {
                y_min = if y_min.is_finite() { y_min.min(y) } else { y };
            }
            if auto_y_max {
                y_max = if y_max.is_finite() { y_max.max(y) } else { y };
            }
        }
    }
    if !x_min.is_finite() || !x_max.is_finite() || x_max == x_min {
        x_min = 0.0;
        x_max = 1.0;
    }
    if !y_min.is_finite() || !y_max.is_finite() || y_max == y_min {
        y_min = 0.0;
        y_max = 1.0;
    }

    let mut grid = DotGrid::new(plot_w, plot_h);

    let to_px = |x: f64| -> i32 {
        let x = tx(x);
        if !x.is_finite() {
            return i32::MIN / 2;
        }
        let mut t = (x - x_min) / (x_max - x_min);
        if opts.hard_clip {
            t = t.clamp(0.0, 1.0);
        }
        (t * f64::from(plot_w * 2 - 1)).round() as i32
    };
    // Inverted so larger y is higher on screen.
    let to_py = |y: f64| -> i32 {
        let y = ty(y);
        if !y.is_finite() {
            return i32::MIN / 2;
        }
        let mut t = (y - y_min) / (y_max - y_min);
        if opts.hard_clip {
            t = t.clamp(0.0, 1.0);
        }
        ((1.0 - t) * f64::from(plot_h * 4 - 1)).round() as i32
    };

    let baseline_py = if opts.baseline0 && y_min < ty(0.0) && y_max > ty(0.0) {
        Some(to_py(0.0))
    } else {
        None
    };

    // Underlay prepass: gridlines + baseline.
    if opts.draw_grid {
        let y_step = nice_step(y_max - y_min, opts.y_ticks.max(2));
        let mut yv = (y_min / y_step).ceil() * y_step;
        while yv <= y_max + 1e-12 {
            let py = to_py(yv);
            for px in 0..plot_w * 2 {
                grid.set_dot(px, py);
                grid.touch_under(px, py, palette.grid);
            }
            yv += y_step;
        }

        let x_step = nice_step(x_max - x_min, opts.x_ticks.max(2));
        let mut xv = (x_min / x_step).ceil() * x_step;
        while xv <= x_max + 1e-12 {
            let px = ((xv - x_min) / (x_max - x_min) * f64::from(plot_w * 2 - 1)).round() as i32;
            for py in 0..plot_h * 4 {
                grid.set_dot(px, py);
                grid.touch_under(px, py, palette.grid);
            }
            xv += x_step;
        }
    }
    if let Some(bpy) = baseline_py {
        for px in 0..plot_w * 2 {
            grid.set_dot(px, bpy);
            grid.touch_under(px, bpy, palette.axes);
        }
    }

    // Data overlay.
    for s in series {
        if s.data.is_empty() {
            continue;
        }
        let pts = s.data;
        let pair = s.pair;
        let xw = plot_w * 2;
        let yh = plot_h * 4;

        let in_bounds = |px: i32, py: i32| px >= 0 && px < xw && py >= 0 && py < yh;
        let mut put_dot = |grid: &mut DotGrid, px: i32, py: i32| {
            if !opts.hard_clip || in_bounds(px, py) {
                grid.set_dot(px, py);
                grid.touch(px, py, pair);
            }
        };

        let mut draw_segment = |grid: &mut DotGrid, x1: f64, y1: f64, x2: f64, y2: f64| {
            let (px1, py1) = (to_px(x1), to_py(y1));
            let (px2, py2) = (to_px(x2), to_py(y2));
            rasterize_line_int(px1, py1, px2, py2, |qx, qy| put_dot(grid, qx, qy));
            if s.cfg.fill_vertical_if_same_x && px1 == px2 && (py2 - py1).abs() > 1 {
                rasterize_vertical_span(grid, px1, py1, py2, pair);
            }
        };

        let draw_scatter = |grid: &mut DotGrid| {
            let every = s.cfg.scatter_every.max(1);
            for (i, &(x, y)) in pts.iter().enumerate() {
                if i % every != 0 || !x.is_finite() || !y.is_finite() {
                    continue;
                }
                let (px, py) = (to_px(x), to_py(y));
                if !opts.hard_clip || in_bounds(px, py) {
                    grid.set_dot(px, py);
                    grid.touch(px, py, pair);
                }
            }
        };

        match s.cfg.mode {
            PlotMode::Scatter => draw_scatter(&mut grid),
            PlotMode::Stairs => {
                for w in pts.windows(2) {
                    let ((x1, y1), (x2, y2)) = (w[0], w[1]);
                    if ![x1, y1, x2, y2].iter().all(|v| v.is_finite()) {
                        continue;
                    }
                    draw_segment(&mut grid, x1, y1, x2, y1); // horizontal
                    draw_segment(&mut grid, x2, y1, x2, y2); // vertical
                }
                if s.cfg.scatter {
                    draw_scatter(&mut grid);
                }
            }
            PlotMode::Stem => {
                let mut base = s.cfg.stem_y;
                if !base.is_finite() {
                    let zero_t = ty(0.0);
                    base = if y_min <= zero_t && zero_t <= y_max {
                        0.0
                    } else if opts.y_log {
                        10f64.powf(y_min) - opts.y_log_eps
                    } else {
                        y_min
                    };
                }
                let bpy = to_py(base);
                for &(x, y) in pts {
                    if !x.is_finite() || !y.is_finite() {
                        continue;
                    }
                    rasterize_vertical_span(&mut grid, to_px(x), bpy, to_py(y), pair);
                }
                if s.cfg.scatter {
                    draw_scatter(&mut grid);
                }
            }
            PlotMode::Line => {
                let draw_base = !s.cfg.envelope_enabled || s.cfg.envelope_draw_base;
                if draw_base {
                    for w in pts.windows(2) {
                        let ((x1, y1), (x2, y2)) = (w[0], w[1]);
                        if ![x1, y1, x2, y2].iter().all(|v| v.is_finite()) {
                            continue;
                        }
                        draw_segment(&mut grid, x1, y1, x2, y2);
                    }
                }

                if s.cfg.envelope_enabled {
                    // Per-sub-column [min,max] band.
                    let mut bin_min = vec![i32::MAX; xw as usize];
                    let mut bin_max = vec![i32::MIN; xw as usize];
                    let mut bin_cnt = vec![0i32; xw as usize];
                    let mut feed = |px: i32, py: i32| {
                        if px >= 0 && px < xw {
                            let i = px as usize;
                            bin_min[i] = bin_min[i].min(py);
                            bin_max[i] = bin_max[i].max(py);
                            bin_cnt[i] += 1;
                        }
                    };
                    match s.cfg.envelope_source {
                        EnvelopeSource::OriginalSamples => {
                            for &(x, y) in pts {
                                if x.is_finite() && y.is_finite() {
                                    feed(to_px(x), to_py(y));
                                }
                            }
                        }
                        EnvelopeSource::SegmentPath => {
                            for w in pts.windows(2) {
                                let ((x1, y1), (x2, y2)) = (w[0], w[1]);
                                if ![x1, y1, x2, y2].iter().all(|v| v.is_finite()) {
                                    continue;
                                }
                                rasterize_line_int(
                                    to_px(x1),
                                    to_py(y1),
                                    to_px(x2),
                                    to_py(y2),
                                    &mut feed,
                                );
                            }
                        }
                    }
                    let min_count = s.cfg.envelope_min_count.max(1);
                    let min_height = s.cfg.envelope_min_height.max(0);
                    for qx in 0..xw {
                        let i = qx as usize;
                        if bin_cnt[i] >= min_count
                            && bin_min[i] <= bin_max[i]
                            && bin_max[i] - bin_min[i] >= min_height
                        {
                            rasterize_vertical_span(&mut grid, qx, bin_min[i], bin_max[i], pair);
                        }
                    }
                }

                if s.cfg.scatter {
                    draw_scatter(&mut grid);
                }
            }
        }
    }

    // Labels live outside the plot area.
    if opts.draw_axes || opts.draw_grid {
        let y_step = nice_step(y_max - y_min, opts.y_ticks.max(2));
        let mut yv = (y_min / y_step).ceil() * y_step;
        while yv <= y_max + 1e-12 {
            let py = to_py(yv);
            let row = plot_y0 + py / 4;
            let value = if opts.y_log {
                10f64.powf(yv) - opts.y_log_eps
            } else {
                yv
            };
            let label = format_tick(value);
            let lab_x = start_x + (opts.margin_left - 1 - label.len() as i32).max(0);
            draw_text_clipped(ctx, row, lab_x, &label, opts.margin_left - 1, palette.axes);
            yv += y_step;
        }

        let x_step = nice_step(x_max - x_min, opts.x_ticks.max(2));
        let mut xv = (x_min / x_step).ceil() * x_step;
        while xv <= x_max + 1e-12 {
            let px = ((xv - x_min) / (x_max - x_min) * f64::from(plot_w * 2 - 1)).round() as i32;
            let col = plot_x0 + px / 2;
            let value = if opts.x_log {
                10f64.powf(xv) - opts.x_log_eps
            } else {
                xv
            };
            let label = format_tick(value);
            let lx = col - label.len() as i32 / 2;
            draw_text_clipped(
                ctx,
                start_y + opts.margin_top + plot_h,
                lx,
                &label,
                label.len() as i32,
                palette.axes,
            );
            xv += x_step;
        }

        if !opts.y_label.is_empty() {
            draw_text_clipped(ctx, start_y, start_x, &opts.y_label, opts.margin_left, palette.axes);
        }
        if !opts.x_label.is_empty() {
            draw_text_clipped(
                ctx,
                start_y + opts.margin_top + plot_h + 1,
                plot_x0,
                &opts.x_label,
                plot_w,
                palette.axes,
            );
        }
    }

    // Blit braille cells with per-cell color.
    for r in 0..plot_h {
        for c in 0..plot_w {
            let i = (r * plot_w + c) as usize;
            let bits = grid.cells[i];
            let color = grid.colors[i];
            if bits == 0 && color == 0 {
                continue;
            }
            // No dots: emit a space so the background fill stays uniform.
            let ch = if bits == 0 {
                ' '
            } else {
                char::from_u32(0x2800 + u32::from(bits)).unwrap_or(' ')
            };
            let pair = if color != 0 { color } else { palette.bg };
            ctx.r.put_braille(plot_y0 + r, plot_x0 + c, ch, pair);
        }
    }
}

/// Single-series convenience wrapper.
pub fn plot_braille(
    ctx: &mut RenderCtx<'_>,
    points: &[(f64, f64)],
    start_x: i32,
    start_y: i32,
    width_cells: i32,
    height_cells: i32,
) {
    let cfg = SeriesCfg::default();
    let series = [PlotSeries {
        data: points,
        cfg: &cfg,
        pair: 0,
    }];
    plot_braille_multi(
        ctx,
        &series,
        start_x,
        start_y,
        width_cells,
        height_cells,
        &PlotOpts::default(),
        PlotColors::default(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::MemoryRenderer;
    use crate::{RenderCtx, shared_colors};

    fn render_once(points: &[(f64, f64)], opts: &PlotOpts, cfg: &SeriesCfg) -> Vec<(char, u16)> {
        let mut r = MemoryRenderer::new(20, 60);
        let colors = shared_colors();
        let mut ctx = RenderCtx::new(&mut r, colors.clone());
        let pair = ctx.pair("#C8C8C8", "<empty>");
        let grid_pair = ctx.pair("gray", "<empty>");
        let series = [PlotSeries {
            data: points,
            cfg,
            pair,
        }];
        plot_braille_multi(
            &mut ctx,
            &series,
            0,
            0,
            60,
            20,
            opts,
            PlotColors {
                axes: pair,
                grid: grid_pair,
                bg: 0,
            },
        );
        r.snapshot()
    }

    #[test]
    fn nice_step_picks_1_2_5_10() {
        assert_eq!(nice_step(10.0, 10), 1.0);
        assert_eq!(nice_step(10.0, 5), 2.0);
        assert_eq!(nice_step(10.0, 2), 5.0);
        assert_eq!(nice_step(100.0, 10), 10.0);
    }

    #[test]
    fn dot_bits_follow_braille_layout() {
        assert_eq!(dot_bit(0, 0), 0x01);
        assert_eq!(dot_bit(1, 0), 0x08);
        assert_eq!(dot_bit(0, 3), 0x40);
        assert_eq!(dot_bit(1, 3), 0x80);
    }

    #[test]
    fn plotting_is_deterministic() {
        let pts: Vec<(f64, f64)> = (0..50).map(|i| (i as f64, (i as f64 * 0.3).sin())).collect();
        let opts = PlotOpts::default();
        let cfg = SeriesCfg::default();
        let a = render_once(&pts, &opts, &cfg);
        let b = render_once(&pts, &opts, &cfg);
        assert_eq!(a, b);
    }

    #[test]
    fn autoscale_draws_within_plot_area_with_axis_labels() {
        let pts = [(0.0, 0.0), (1.0, 1.0), (2.0, 0.0)];
        let opts = PlotOpts::default();
        let cfg = SeriesCfg::default();

        let mut r = MemoryRenderer::new(20, 60);
        let colors = shared_colors();
        let mut ctx = RenderCtx::new(&mut r, colors);
        let pair = ctx.pair("white", "<empty>");
        let series = [PlotSeries {
            data: &pts,
            cfg: &cfg,
            pair,
        }];
        plot_braille_multi(&mut ctx, &series, 0, 0, 60, 20, &opts, PlotColors {
            axes: pair,
            grid: pair,
            bg: 0,
        });

        // Braille glyphs appear only inside the margin-inset area.
        let left = opts.margin_left;
        let top = opts.margin_top;
        let right = 60 - opts.margin_right;
        let bottom = 20 - opts.margin_bot;
        let mut braille_cells = 0;
        for y in 0..20 {
            for x in 0..60 {
                let ch = r.cell(y, x).ch;
                if ('\u{2800}'..='\u{28FF}').contains(&ch) {
                    braille_cells += 1;
                    assert!(
                        (left..right).contains(&x) && (top..bottom).contains(&y),
                        "braille at ({y},{x}) outside plot area"
                    );
                }
            }
        }
        assert!(braille_cells > 0);

        // Tick labels: x axis shows 0/1/2, y margin shows 0 and 1.
        let x_label_row = top + (20 - opts.margin_top - opts.margin_bot) as i32;
        let x_row = r.row_text(x_label_row);
        for want in ["0", "1", "2"] {
            assert!(x_row.contains(want), "x labels missing {want}: {x_row:?}");
        }
        let margin_text: String = (0..20).map(|y| r.row_text(y)[..left as usize].to_string()).collect();
        assert!(margin_text.contains('0'));
        assert!(margin_text.contains('1'));
    }

    #[test]
    fn degenerate_range_widens_to_unit_window() {
        // All x equal: window becomes [0,1]; must not panic or divide by 0.
        let pts = [(2.0, 5.0), (2.0, 5.0)];
        let snap = render_once(&pts, &PlotOpts::default(), &SeriesCfg::default());
        assert!(snap.iter().any(|&(ch, _)| ('\u{2800}'..='\u{28FF}').contains(&ch)));
    }

    #[test]
    fn stem_mode_fills_vertical_spans() {
        let pts = [(0.0, 1.0), (1.0, -1.0)];
        let mut cfg = SeriesCfg::default();
        cfg.mode = PlotMode::Stem;
        let mut opts = PlotOpts::default();
        opts.draw_grid = false;
        opts.baseline0 = false;
        let snap = render_once(&pts, &opts, &cfg);
        let dots: u32 = snap
            .iter()
            .filter_map(|&(ch, _)| {
                let c = ch as u32;
                (0x2800..=0x28FF).contains(&c).then_some((c - 0x2800).count_ones())
            })
            .sum();
        // Two stems spanning the full height dominate a line's dot count.
        assert!(dots > 40, "expected tall stems, got {dots} dots");
    }

    #[test]
    fn envelope_band_covers_column_extent() {
        let pts = [(0.0, -1.0), (0.0, 1.0), (1.0, -1.0), (1.0, 1.0)];
        let mut cfg = SeriesCfg::default();
        cfg.envelope_enabled = true;
        cfg.envelope_source = EnvelopeSource::OriginalSamples;
        cfg.envelope_min_count = 2;
        cfg.envelope_min_height = 1;
        cfg.envelope_draw_base = false;
        let mut opts = PlotOpts::default();
        opts.draw_grid = false;
        opts.baseline0 = false;
        let snap = render_once(&pts, &opts, &cfg);
        assert!(snap.iter().any(|&(ch, _)| ('\u{2800}'..='\u{28FF}').contains(&ch)));
    }
}
