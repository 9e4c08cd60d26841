//! Color tokens and the process-wide pair registry.
//!
//! Tokens are `<empty>` (terminal default), `#RRGGBB`, or a named color.
//! Unknown named tokens resolve to "unset" so a typo degrades to the
//! terminal default instead of failing the frame.

use std::collections::HashMap;

use tracing::warn;

/// Backend pair id; 0 always means "terminal default colors".
pub type PairId = u16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    pub fn scaled(self, factor: f64) -> Rgb {
        let f = factor.clamp(0.0, 1.0);
        Rgb {
            r: (f64::from(self.r) * f).round() as u8,
            g: (f64::from(self.g) * f).round() as u8,
            b: (f64::from(self.b) * f).round() as u8,
        }
    }
}

pub fn rgb8_to_hex(r: i32, g: i32, b: i32) -> String {
    Rgb {
        r: r.clamp(0, 255) as u8,
        g: g.clamp(0, 255) as u8,
        b: b.clamp(0, 255) as u8,
    }
    .hex()
}

pub fn is_unset_color_token(s: &str) -> bool {
    s.is_empty() || s == "<empty>"
}

fn named_color(s: &str) -> Option<Rgb> {
    let (r, g, b) = match s.to_ascii_lowercase().as_str() {
        "black" => (0, 0, 0),
        "red" => (205, 49, 49),
        "green" => (13, 188, 121),
        "yellow" => (229, 229, 16),
        "blue" => (36, 114, 200),
        "magenta" => (188, 63, 188),
        "cyan" => (17, 168, 205),
        "white" => (229, 229, 229),
        "gray" | "grey" => (128, 128, 128),
        "darkgray" | "darkgrey" => (64, 64, 64),
        "lightgray" | "lightgrey" => (192, 192, 192),
        "orange" => (255, 165, 0),
        _ => return None,
    };
    Some(Rgb { r, g, b })
}

/// `None` = terminal default. Unknown named tokens warn once per token.
pub fn resolve_color_token(s: &str) -> Option<Rgb> {
    if is_unset_color_token(s) {
        return None;
    }
    let b = s.as_bytes();
    if b.len() == 7 && b[0] == b'#' {
        let parse = |i: usize| u8::from_str_radix(&s[i..i + 2], 16).ok();
        if let (Some(r), Some(g), Some(bl)) = (parse(1), parse(3), parse(5)) {
            return Some(Rgb { r, g, b: bl });
        }
        return None;
    }
    named_color(s)
}

/// Darken a token by `factor`; unset and unresolvable tokens pass through.
pub fn darken_color_token(token: &str, factor: f64) -> String {
    match resolve_color_token(token) {
        Some(rgb) => rgb.scaled(factor).hex(),
        None => token.to_string(),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColorPair {
    pub fg: Option<Rgb>,
    pub bg: Option<Rgb>,
}

/// Maps `(fg, bg)` token pairs to stable pair ids. Id 0 is reserved for
/// the all-default pair and never allocated.
#[derive(Debug, Default)]
pub struct ColorRegistry {
    pairs: Vec<ColorPair>,
    index: HashMap<(String, String), PairId>,
}

impl ColorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pair(&mut self, fg: &str, bg: &str) -> PairId {
        let resolved = ColorPair {
            fg: resolve_color_token(fg),
            bg: resolve_color_token(bg),
        };
        if !is_unset_color_token(fg) && resolved.fg.is_none() {
            warn!(target: "render.color", token = fg, "unresolvable fg color token");
        }
        if !is_unset_color_token(bg) && resolved.bg.is_none() {
            warn!(target: "render.color", token = bg, "unresolvable bg color token");
        }
        if resolved == ColorPair::default() {
            return 0;
        }

        let key = (fg.to_string(), bg.to_string());
        if let Some(&id) = self.index.get(&key) {
            return id;
        }
        self.pairs.push(resolved);
        let id = self.pairs.len() as PairId;
        self.index.insert(key, id);
        id
    }

    pub fn get(&self, id: PairId) -> ColorPair {
        if id == 0 {
            return ColorPair::default();
        }
        self.pairs
            .get(id as usize - 1)
            .copied()
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
