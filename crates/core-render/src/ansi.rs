//! ANSI SGR parsing and the row-of-colored-segments model.
//!
//! Supported SGR subset: reset 0; bold 1 / normal 22; dim 2; inverse 7/27;
//! FG 30-37/90-97; BG 40-47/100-107; truecolor `38;2;r;g;b` / `48;2;r;g;b`;
//! 256-color `38;5;n` / `48;5;n`; 39/49 restore base. Non-SGR CSI
//! sequences (`K`, `?...`, etc.) are consumed and discarded.

use unicode_width::UnicodeWidthChar;

use crate::RenderCtx;
use crate::color::{ColorRegistry, PairId, rgb8_to_hex};

pub fn has_esc(s: &str) -> bool {
    s.contains('\x1b')
}

/// Style state threaded through SGR application; colors are tokens so the
/// registry stays the single mapping point.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnsiStyle {
    pub fg: String,
    pub bg: String,
    pub bold: bool,
    pub inverse: bool,
    pub dim: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seg {
    /// Visible chars only, no escapes.
    pub text: String,
    pub pair: PairId,
    pub bold: bool,
    pub inverse: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    pub segs: Vec<Seg>,
    /// Visible columns.
    pub len: i32,
}

/// xterm-ish 16-color palette, dim approximated by scaling.
pub fn ansi_basic_token(idx: i32, bright: bool, dim: bool) -> String {
    const BASE: [(i32, i32, i32); 8] = [
        (0, 0, 0),
        (205, 49, 49),
        (13, 188, 121),
        (229, 229, 16),
        (36, 114, 200),
        (188, 63, 188),
        (17, 168, 205),
        (229, 229, 229),
    ];
    const BRIGHT: [(i32, i32, i32); 8] = [
        (102, 102, 102),
        (241, 76, 76),
        (35, 209, 139),
        (245, 245, 67),
        (59, 142, 234),
        (214, 112, 214),
        (41, 184, 219),
        (255, 255, 255),
    ];
    let idx = idx.clamp(0, 7) as usize;
    let (mut r, mut g, mut b) = if bright { BRIGHT[idx] } else { BASE[idx] };
    if dim {
        const K: f64 = 0.65;
        r = (r as f64 * K).round() as i32;
        g = (g as f64 * K).round() as i32;
        b = (b as f64 * K).round() as i32;
    }
    rgb8_to_hex(r, g, b)
}

/// 0-15 basic+bright, 16-231 the 6x6x6 cube, 232-255 the grayscale ramp.
pub fn xterm256_token(n: i32) -> String {
    let n = n.clamp(0, 255);
    if n < 16 {
        let bright = n >= 8;
        return ansi_basic_token(if bright { n - 8 } else { n }, bright, false);
    }
    if n <= 231 {
        const LEVELS: [i32; 6] = [0, 95, 135, 175, 215, 255];
        let v = n - 16;
        let ir = (v / 36) as usize;
        let ig = ((v / 6) % 6) as usize;
        let ib = (v % 6) as usize;
        return rgb8_to_hex(LEVELS[ir], LEVELS[ig], LEVELS[ib]);
    }
    let g = (8 + (n - 232) * 10).clamp(0, 255);
    rgb8_to_hex(g, g, g)
}

/// Parse a CSI sequence starting at byte `i` (must be ESC `[`). Returns
/// `(next_index, params, final_byte)`; `None` when the sequence is
/// incomplete so the caller can drop the lone ESC.
pub fn parse_csi(s: &str, i: usize) -> Option<(usize, Vec<i32>, char)> {
    let bytes = s.as_bytes();
    if i + 1 >= bytes.len() || bytes[i] != 0x1b || bytes[i + 1] != b'[' {
        return None;
    }
    let mut params = Vec::new();
    let mut cur: i32 = -1;
    let mut j = i + 2;
    while j < bytes.len() {
        let ch = bytes[j];
        match ch {
            b'0'..=b'9' => {
                if cur < 0 {
                    cur = 0;
                }
                cur = cur.saturating_mul(10).saturating_add(i32::from(ch - b'0'));
                j += 1;
            }
            b';' => {
                params.push(cur.max(0));
                cur = -1;
                j += 1;
            }
            b'?' | b':' | b' ' => j += 1,
            0x40..=0x7e => {
                if cur >= 0 {
                    params.push(cur);
                }
                return Some((j + 1, params, ch as char));
            }
            _ => break,
        }
    }
    None
}

/// Apply one SGR parameter list on top of `base`.
pub fn apply_sgr(params: &[i32], st: &mut AnsiStyle, base: &AnsiStyle) {
    // ESC[m is equivalent to ESC[0m.
    if params.is_empty() {
        *st = base.clone();
        return;
    }
    let mut i = 0;
    while i < params.len() {
        let p = params[i];
        match p {
            0 => *st = base.clone(),
            1 => {
                st.bold = true;
                st.dim = false;
            }
            2 => {
                st.dim = true;
                st.bold = false;
            }
            22 => {
                st.bold = false;
                st.dim = false;
            }
            7 => st.inverse = true,
            27 => st.inverse = false,
            39 => st.fg = base.fg.clone(),
            49 => st.bg = base.bg.clone(),
            30..=37 => st.fg = ansi_basic_token(p - 30, false, st.dim),
            90..=97 => st.fg = ansi_basic_token(p - 90, true, st.dim),
            40..=47 => st.bg = ansi_basic_token(p - 40, false, st.dim),
            100..=107 => st.bg = ansi_basic_token(p - 100, true, st.dim),
            38 | 48 => {
                let is_fg = p == 38;
                if params.get(i + 1) == Some(&2) && i + 4 < params.len() {
                    let token = rgb8_to_hex(params[i + 2], params[i + 3], params[i + 4]);
                    if is_fg {
                        st.fg = token;
                    } else {
                        st.bg = token;
                    }
                    i += 4;
                } else if params.get(i + 1) == Some(&5) && i + 2 < params.len() {
                    let token = xterm256_token(params[i + 2]);
                    if is_fg {
                        st.fg = token;
                    } else {
                        st.bg = token;
                    }
                    i += 2;
                }
            }
            _ => {}
        }
        i += 1;
    }
}

fn push_run(row: &mut Row, run: &mut String, st: &AnsiStyle, fallback: PairId, colors: &mut ColorRegistry) {
    if run.is_empty() {
        return;
    }
    let mut pair = colors.pair(&st.fg, &st.bg);
    if pair == 0 {
        pair = fallback;
    }
    let seg = Seg {
        text: std::mem::take(run),
        pair,
        bold: st.bold,
        inverse: st.inverse,
    };
    // Coalesce style-identical neighbors.
    if let Some(last) = row.segs.last_mut()
        && last.pair == seg.pair
        && last.bold == seg.bold
        && last.inverse == seg.inverse
    {
        last.text.push_str(&seg.text);
        return;
    }
    row.segs.push(seg);
}

/// Hard-wrap `s` into rows of at most `width` columns, applying SGR state
/// along the way. Control chars other than `\n`/`\t` are dropped and `\r`
/// is ignored; a line break starts a new row.
pub fn hard_wrap(
    s: &str,
    width: i32,
    base: &AnsiStyle,
    fallback: PairId,
    colors: &mut ColorRegistry,
) -> Vec<Row> {
    let mut out: Vec<Row> = Vec::new();
    if width <= 0 || s.is_empty() {
        out.push(Row::default());
        return out;
    }

    let mut st = base.clone();
    let mut run_style = st.clone();
    let mut run = String::new();
    let mut row = Row::default();
    let mut col = 0i32;

    macro_rules! flush {
        () => {
            push_run(&mut row, &mut run, &run_style, fallback, colors)
        };
    }

    let bytes = s.as_bytes();
    let mut i = 0usize;
    while i < s.len() {
        if bytes[i] == 0x1b && i + 1 < s.len() && bytes[i + 1] == b'[' {
            flush!();
            match parse_csi(s, i) {
                Some((next, params, final_byte)) => {
                    if final_byte == 'm' {
                        apply_sgr(&params, &mut st, base);
                    }
                    i = next;
                }
                None => i += 1,
            }
            continue;
        }

        let ch = s[i..].chars().next().unwrap_or('\u{FFFD}');
        i += ch.len_utf8();

        if ch == '\n' {
            flush!();
            out.push(std::mem::take(&mut row));
            col = 0;
            continue;
        }
        if ch == '\r' || (ch.is_control() && ch != '\t') {
            continue;
        }
        let (ch, w) = if ch == '\t' {
            (' ', 1)
        } else {
            (ch, ch.width().unwrap_or(0) as i32)
        };
        if w == 0 {
            continue;
        }

        if run.is_empty() {
            run_style = st.clone();
        } else if run_style != st {
            flush!();
            run_style = st.clone();
        }

        if col + w > width {
            flush!();
            out.push(std::mem::take(&mut row));
            col = 0;
            run_style = st.clone();
        }

        run.push(ch);
        col += w;
        row.len += w;
    }

    flush!();
    if !row.segs.is_empty() || row.len > 0 || out.is_empty() {
        out.push(row);
    }
    if out.len() >= 2
        && out
            .last()
            .is_some_and(|r| r.segs.is_empty() && r.len == 0)
    {
        out.pop();
    }
    out
}

/// Append unstyled text to a row (used for wrap-indentation prefixes).
pub fn append_plain(row: &mut Row, s: &str, pair: PairId, bold: bool, inverse: bool) {
    if s.is_empty() {
        return;
    }
    let cols: i32 = s.chars().map(|c| c.width().unwrap_or(0) as i32).sum();
    if let Some(last) = row.segs.last_mut()
        && last.pair == pair
        && last.bold == bold
        && last.inverse == inverse
    {
        last.text.push_str(s);
        row.len += cols;
        return;
    }
    row.segs.push(Seg {
        text: s.to_string(),
        pair,
        bold,
        inverse,
    });
    row.len += cols;
}

/// Paint one row at `(y, x)` clipped to `width` columns.
pub fn render_row(
    ctx: &mut RenderCtx<'_>,
    y: i32,
    x: i32,
    width: i32,
    row: &Row,
    fallback: PairId,
    base_bold: bool,
    base_inverse: bool,
) {
    if width <= 0 {
        return;
    }
    let mut col = 0i32;
    for seg in &row.segs {
        if col >= width {
            break;
        }
        let rem = width - col;
        let pair = if seg.pair != 0 { seg.pair } else { fallback };
        ctx.r.put_text(
            y,
            x + col,
            &seg.text,
            rem,
            pair,
            seg.bold || base_bold,
            seg.inverse || base_inverse,
        );
        let cols: i32 = seg
            .text
            .chars()
            .map(|c| c.width().unwrap_or(0) as i32)
            .sum();
        col += cols.min(rem);
    }
}
