//! Layout engine: grid track resolution, dock packing, absolute and
//! normalized placement, and topmost picking.

use crate::{Dock, LayoutMode, Rect, TrackLen, WidgetNode, WidgetRef};

/// Content rect after the 1-cell frame (border, or focus frame on a
/// focused focusable) and padding. Too-small widgets keep their full rect
/// so content never collapses to 0x0 behind a frame.
pub fn content_rect(node: &WidgetNode) -> Rect {
    let mut r = node.screen;
    let want_frame = node.style.border || (node.focused && node.focusable);
    if want_frame && r.w >= 3 && r.h >= 3 {
        r = r.inset(1, 1, 1, 1);
    }
    r.inset(
        node.layout.pad_left,
        node.layout.pad_top,
        node.layout.pad_right,
        node.layout.pad_bottom,
    )
}

/// Resolve track sizes inside `total`: fixed (Px) tracks claim their size,
/// fractional tracks share the remainder proportionally, and ±1-cell
/// rounding error is distributed left to right.
pub fn resolve_tracks(defs: &[TrackLen], total: i32, gap: i32, pad_a: i32, pad_b: i32) -> Vec<i32> {
    let n = defs.len();
    let mut out = vec![0i32; n];
    if n == 0 || total <= 0 {
        return out;
    }
    let gaps = gap * (n as i32 - 1);
    let available = (total - pad_a - pad_b - gaps).max(0);

    let mut fixed = 0i32;
    let mut frac_sum = 0.0f64;
    for d in defs {
        match d {
            TrackLen::Px(v) => fixed += v.max(0.0) as i32,
            TrackLen::Frac(v) => frac_sum += v.max(0.0),
        }
    }
    let rem = (available - fixed).max(0);
    for (i, d) in defs.iter().enumerate() {
        out[i] = match d {
            TrackLen::Px(v) => v.max(0.0) as i32,
            TrackLen::Frac(v) => {
                if frac_sum > 0.0 {
                    ((rem as f64) * (v.max(0.0) / frac_sum)).round() as i32
                } else {
                    0
                }
            }
        };
    }
    let mut diff = available - out.iter().sum::<i32>();
    let mut i = 0;
    while diff != 0 && i < n {
        let d = if diff > 0 { 1 } else { -1 };
        out[i] += d;
        diff -= d;
        i += 1;
    }
    out
}

/// Recursive pre-order layout. Grid cells first, then dock strips in
/// declaration order with Fill taking the residual, then absolute and
/// normalized children inside the content rect.
pub fn layout_tree(node: &WidgetRef, rect: Rect) {
    {
        let mut n = node.borrow_mut();
        if !n.visible {
            return;
        }
        n.screen = rect;
    }
    let (inner, grid, children) = {
        let n = node.borrow();
        (content_rect(&n), n.grid.clone(), n.children.clone())
    };

    if let Some(grid) = &grid {
        let rows = resolve_tracks(&grid.rows, inner.h, grid.gap_row, grid.pad_top, grid.pad_bottom);
        let cols = resolve_tracks(&grid.cols, inner.w, grid.gap_col, grid.pad_left, grid.pad_right);

        let mut row_y = vec![0i32; rows.len()];
        let mut y = inner.y + grid.pad_top;
        for (r, h) in rows.iter().enumerate() {
            row_y[r] = y;
            y += h + if r + 1 < rows.len() { grid.gap_row } else { 0 };
        }
        let mut col_x = vec![0i32; cols.len()];
        let mut x = inner.x + grid.pad_left;
        for (c, w) in cols.iter().enumerate() {
            col_x[c] = x;
            x += w + if c + 1 < cols.len() { grid.gap_col } else { 0 };
        }

        for child in &children {
            let spec = {
                let c = child.borrow();
                if !c.visible || c.layout.mode != LayoutMode::GridCell {
                    continue;
                }
                c.layout.clone()
            };
            if rows.is_empty() || cols.is_empty() {
                continue;
            }
            let r = spec.grid_row.min(rows.len() - 1);
            let c = spec.grid_col.min(cols.len() - 1);
            let r_last = (r + spec.grid_row_span.max(1) - 1).min(rows.len() - 1);
            let c_last = (c + spec.grid_col_span.max(1) - 1).min(cols.len() - 1);

            let cx = col_x[c];
            let cy = row_y[r];
            let cw = (col_x[c_last] - cx) + cols[c_last] + grid.gap_col * (c_last - c) as i32;
            let ch = (row_y[r_last] - cy) + rows[r_last] + grid.gap_row * (r_last - r) as i32;
            layout_tree(child, Rect::new(cx, cy, cw, ch));
        }
    }

    let mut free = inner;
    for child in &children {
        let (dock, size) = {
            let c = child.borrow();
            if !c.visible || c.layout.mode != LayoutMode::Dock {
                continue;
            }
            (c.layout.dock, c.layout.dock_size)
        };
        let span = |len: TrackLen, total: i32| -> i32 {
            match len {
                TrackLen::Px(v) => v as i32,
                TrackLen::Frac(v) => ((total as f64) * v).round() as i32,
            }
        };
        match dock {
            Dock::Top => {
                let h = span(size, free.h).max(0);
                layout_tree(child, Rect::new(free.x, free.y, free.w, h));
                free.y += h;
                free.h -= h;
            }
            Dock::Bottom => {
                let h = span(size, free.h).max(0);
                layout_tree(child, Rect::new(free.x, free.y + free.h - h, free.w, h));
                free.h -= h;
            }
            Dock::Left => {
                let w = span(size, free.w).max(0);
                layout_tree(child, Rect::new(free.x, free.y, w, free.h));
                free.x += w;
                free.w -= w;
            }
            Dock::Right => {
                let w = span(size, free.w).max(0);
                layout_tree(child, Rect::new(free.x + free.w - w, free.y, w, free.h));
                free.w -= w;
            }
            Dock::Fill | Dock::None => {}
        }
    }
    for child in &children {
        let is_fill = {
            let c = child.borrow();
            c.visible && c.layout.mode == LayoutMode::Dock && c.layout.dock == Dock::Fill
        };
        if is_fill {
            layout_tree(child, free);
        }
    }

    for child in &children {
        let spec = {
            let c = child.borrow();
            if !c.visible
                || !matches!(c.layout.mode, LayoutMode::Absolute | LayoutMode::Normalized)
            {
                continue;
            }
            c.layout.clone()
        };
        let rect = if spec.mode == LayoutMode::Normalized {
            let x0 = inner.x + (spec.x * inner.w as f64).round() as i32;
            let y0 = inner.y + (spec.y * inner.h as f64).round() as i32;
            let x1 = inner.x + ((spec.x + spec.width) * inner.w as f64).round() as i32;
            let y1 = inner.y + ((spec.y + spec.height) * inner.h as f64).round() as i32;
            Rect::new(x0, y0, (x1 - x0).max(0), (y1 - y0).max(0))
        } else {
            Rect::new(
                inner.x + spec.x as i32,
                inner.y + spec.y as i32,
                spec.width as i32,
                spec.height as i32,
            )
        };
        layout_tree(child, rect);
    }
}

/// Deepest visible node containing `(x, y)`; ties go to the higher
/// z-index, then to the later declaration (last painted wins).
pub fn pick_topmost(node: &WidgetRef, x: i32, y: i32) -> Option<WidgetRef> {
    {
        let n = node.borrow();
        if !n.visible || !n.screen.contains(x, y) {
            return None;
        }
    }
    let children = node.borrow().children.clone();
    let mut best: Option<WidgetRef> = None;
    for child in children.iter().rev() {
        if let Some(got) = pick_topmost(child, x, y) {
            let better = match &best {
                None => true,
                Some(b) => got.borrow().z_index > b.borrow().z_index,
            };
            if better {
                best = Some(got);
            }
        }
    }
    Some(best.unwrap_or_else(|| node.clone()))
}
