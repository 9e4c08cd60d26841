//! Decoded renderings structures and small token helpers.

/// The DSL's explicit "unset" value; omission of an option is equivalent.
pub const UNSET_TOKEN: &str = "<empty>";

pub fn is_unset(s: &str) -> bool {
    s.is_empty() || s == UNSET_TOKEN
}

/// `<alpha> { <alpha> | <digit> | "_" | "-" | "." }`
pub fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_ascii_alphabetic() {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

pub fn is_hex_color(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() == 7 && b[0] == b'#' && b[1..].iter().all(|c| c.is_ascii_hexdigit())
}

pub fn is_named_color_token(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
}

/// `<empty>`, `#RRGGBB`, or a named token.
pub fn is_valid_color_token(s: &str) -> bool {
    is_unset(s) || is_hex_color(s) || is_named_color_token(s)
}

pub fn is_valid_plot_type(type_raw: &str) -> bool {
    if is_unset(type_raw) {
        return true;
    }
    matches!(
        type_raw.to_ascii_lowercase().as_str(),
        "line" | "scatter" | "stairs" | "stem"
    )
}

/// Figure > panel > screen color fallback chain.
pub fn pick_color(fig: &str, pan: &str, scr: &str, fallback: &str) -> String {
    for c in [fig, pan, scr] {
        if !is_unset(c) {
            return c.to_string();
        }
    }
    fallback.to_string()
}

pub fn sanitize_id(s: &str) -> String {
    if s.is_empty() {
        return "unnamed".to_string();
    }
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

pub fn join_path(a: &str, b: &str) -> String {
    match (a.is_empty(), b.is_empty()) {
        (true, _) => b.to_string(),
        (_, true) => a.to_string(),
        _ => format!("{a}.{b}"),
    }
}

/// Percent-of-parent coordinate pair; `set` records whether the option
/// appeared at all.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Coords {
    pub x: f64,
    pub y: f64,
    pub set: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderingsInstruction {
    pub screens: Vec<Screen>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Screen {
    pub kind_raw: String,
    pub name: String,
    /// Activation key: `F+N`, `F0` (default screen) or unset.
    pub key_raw: String,
    pub border: bool,
    pub text_color: String,
    pub back_color: String,
    pub line_color: String,
    pub tickness: f64,
    pub panels: Vec<Panel>,
    pub events: Vec<Event>,
}

impl Default for Screen {
    fn default() -> Self {
        Self {
            kind_raw: String::new(),
            name: String::new(),
            key_raw: UNSET_TOKEN.to_string(),
            border: false,
            text_color: UNSET_TOKEN.to_string(),
            back_color: UNSET_TOKEN.to_string(),
            line_color: UNSET_TOKEN.to_string(),
            tickness: 1.0,
            panels: Vec::new(),
            events: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub kind_raw: String,
    pub coords: Coords,
    pub shape: Coords,
    pub z_index: i32,
    pub border: bool,
    pub title_on: bool,
    pub title: String,
    pub text_color: String,
    pub back_color: String,
    pub line_color: String,
    pub tickness: f64,
    pub figures: Vec<Figure>,
}

impl Default for Panel {
    fn default() -> Self {
        Self {
            kind_raw: String::new(),
            coords: Coords::default(),
            shape: Coords::default(),
            z_index: 0,
            border: false,
            title_on: false,
            title: String::new(),
            text_color: UNSET_TOKEN.to_string(),
            back_color: UNSET_TOKEN.to_string(),
            line_color: UNSET_TOKEN.to_string(),
            tickness: 1.0,
            figures: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub kind_raw: String,
    pub type_raw: String,
    pub coords: Coords,
    pub shape: Coords,
    pub border: bool,
    pub title_on: bool,
    pub title: String,
    pub legend_on: bool,
    pub legend: String,
    pub text_color: String,
    pub back_color: String,
    pub line_color: String,
    pub tickness: f64,
    pub has_value: bool,
    pub value: String,
    pub has_capacity: bool,
    pub capacity: i64,
    /// Event names wired to this figure, in declaration order.
    pub triggers: Vec<String>,
}

impl Default for Figure {
    fn default() -> Self {
        Self {
            kind_raw: String::new(),
            type_raw: UNSET_TOKEN.to_string(),
            coords: Coords::default(),
            shape: Coords::default(),
            border: false,
            title_on: false,
            title: String::new(),
            legend_on: false,
            legend: String::new(),
            text_color: UNSET_TOKEN.to_string(),
            back_color: UNSET_TOKEN.to_string(),
            line_color: UNSET_TOKEN.to_string(),
            tickness: 1.0,
            has_value: false,
            value: String::new(),
            has_capacity: false,
            capacity: 0,
            triggers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Event {
    pub kind_raw: String,
    pub name: String,
    pub has_label: bool,
    pub label: String,
    pub has_color: bool,
    pub color: String,
    pub bindings: Vec<Binding>,
}

/// `local_name = path` pair on an event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Binding {
    pub local_name: String,
    pub path: String,
}

/// Supported figure kinds; `kind_raw` keeps the original token for
/// diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FigureKind {
    Label,
    InputBox,
    Buffer,
    TextEditor,
    HorizontalPlot,
}

impl FigureKind {
    pub fn parse(kind_raw: &str) -> Option<Self> {
        match kind_raw {
            "_label" => Some(FigureKind::Label),
            "_input_box" => Some(FigureKind::InputBox),
            "_buffer" => Some(FigureKind::Buffer),
            "_text_editor" => Some(FigureKind::TextEditor),
            "_horizontal_plot" => Some(FigureKind::HorizontalPlot),
            _ => None,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            FigureKind::Label => "_label",
            FigureKind::InputBox => "_input_box",
            FigureKind::Buffer => "_buffer",
            FigureKind::TextEditor => "_text_editor",
            FigureKind::HorizontalPlot => "_horizontal_plot",
        }
    }

    /// Only interactive widgets participate in focus navigation.
    pub fn is_focusable(self) -> bool {
        matches!(
            self,
            FigureKind::InputBox | FigureKind::HorizontalPlot | FigureKind::TextEditor
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Update,
    Action,
}

impl EventKind {
    pub fn parse(kind_raw: &str) -> Option<Self> {
        match kind_raw {
            "_update" => Some(EventKind::Update),
            "_action" => Some(EventKind::Action),
            _ => None,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            EventKind::Update => "_update",
            EventKind::Action => "_action",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_token_and_omission_are_equivalent() {
        assert!(is_unset(""));
        assert!(is_unset(UNSET_TOKEN));
        assert!(!is_unset("x"));
    }

    #[test]
    fn ident_requires_alpha_start() {
        assert!(is_ident("abc_1.x-y"));
        assert!(!is_ident("1abc"));
        assert!(!is_ident(""));
        assert!(!is_ident("a b"));
    }

    #[test]
    fn color_tokens() {
        assert!(is_valid_color_token("<empty>"));
        assert!(is_valid_color_token("#A0b1C2"));
        assert!(is_valid_color_token("steel_blue-2"));
        assert!(!is_valid_color_token("#12345"));
        assert!(!is_valid_color_token("no spaces"));
    }

    #[test]
    fn color_fallback_chain() {
        assert_eq!(pick_color("<empty>", "", "red", "white"), "red");
        assert_eq!(pick_color("", "", "", "white"), "white");
        assert_eq!(pick_color("#000000", "red", "blue", "white"), "#000000");
    }

    #[test]
    fn figure_kind_focus_policy() {
        assert!(FigureKind::InputBox.is_focusable());
        assert!(FigureKind::HorizontalPlot.is_focusable());
        assert!(FigureKind::TextEditor.is_focusable());
        assert!(!FigureKind::Label.is_focusable());
        assert!(!FigureKind::Buffer.is_focusable());
    }

    #[test]
    fn sanitize_replaces_reserved_chars() {
        assert_eq!(sanitize_id("a b/c"), "a_b_c");
        assert_eq!(sanitize_id(""), "unnamed");
    }
}
