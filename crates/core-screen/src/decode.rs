//! Renderings grammar + AST decoder.
//!
//! Declaration order is preserved across the document: panel order breaks
//! z-index ties and figure order fixes focus order, so the decoder never
//! reorders anything.

use core_bnf::{
    AstNode, Grammar, GrammarError, InstructionParser, IntermediaryNode, ParseError, SiteHash,
    find_child_by_site, flatten_terminals, parse_grammar, site_hash,
};
use thiserror::Error;
use tracing::{debug, trace};

use crate::model::{
    Binding, Coords, Event, Figure, Panel, RenderingsInstruction, Screen,
};

pub const RENDERINGS_GRAMMAR: &str = r#"
# iinuji renderings DSL
<instruction>   ::= { <screen> } ;
<screen>        ::= "_screen" "(" { <panel> | <event> | <option> } ")" ;
<panel>         ::= "_rectangle" "(" { <figure> | <option> } ")" ;
<figure>        ::= <figure_kind> "(" { <option> } ")" ;
<figure_kind>   ::= "_label" | "_input_box" | "_buffer" | "_text_editor" | "_horizontal_plot" ;
<event>         ::= <event_kind> "(" { <form_binding> | <option> } ")" ;
<event_kind>    ::= "_update" | "_action" ;
<form_binding>  ::= "__form" "=" <form_local> "=" <form_path> ;
<form_local>    ::= /[A-Za-z_][A-Za-z0-9_]*/ ;
<form_path>     ::= /[.][A-Za-z0-9_.]+/ ;
<option>        ::= <option_key> "=" <option_value> ;
<option_key>    ::= /__[a-z_]+/ ;
<option_value>  ::= /"[^"]*"/ | "<empty>" | /[#]?[A-Za-z0-9_.,+-]+/ ;
"#;

#[derive(Debug, Error)]
pub enum RenderingsDecodeError {
    #[error(transparent)]
    Grammar(#[from] GrammarError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

struct Sites {
    screen: SiteHash,
    panel: SiteHash,
    figure: SiteHash,
    figure_kind: Vec<SiteHash>,
    event: SiteHash,
    event_kind: Vec<SiteHash>,
    form_binding: SiteHash,
    form_local: SiteHash,
    form_path: SiteHash,
    option: SiteHash,
    option_key: SiteHash,
    option_value: Vec<SiteHash>,
}

impl Sites {
    fn new() -> Self {
        Self {
            screen: site_hash("screen", 0),
            panel: site_hash("panel", 0),
            figure: site_hash("figure", 0),
            figure_kind: (0..5).map(|i| site_hash("figure_kind", i)).collect(),
            event: site_hash("event", 0),
            event_kind: (0..2).map(|i| site_hash("event_kind", i)).collect(),
            form_binding: site_hash("form_binding", 0),
            form_local: site_hash("form_local", 0),
            form_path: site_hash("form_path", 0),
            option: site_hash("option", 0),
            option_key: site_hash("option_key", 0),
            option_value: (0..3).map(|i| site_hash("option_value", i)).collect(),
        }
    }
}

pub struct RenderingsDecoder {
    grammar: Grammar,
    sites: Sites,
}

impl RenderingsDecoder {
    pub fn new() -> Result<Self, GrammarError> {
        let grammar = parse_grammar(RENDERINGS_GRAMMAR)?;
        Ok(Self {
            grammar,
            sites: Sites::new(),
        })
    }

    pub fn decode(&self, instruction: &str) -> Result<RenderingsInstruction, RenderingsDecodeError> {
        let parser = InstructionParser::new(&self.grammar);
        let ast = parser.parse(instruction)?;
        trace!(target: "screen.decode", ast = %core_bnf::ast::dump(&ast), "parsed renderings instruction");

        let mut out = RenderingsInstruction::default();
        let AstNode::Root(root) = &ast else {
            return Ok(out);
        };
        let Some(instruction_node) = root.children.first().and_then(AstNode::as_intermediary)
        else {
            return Ok(out);
        };

        for child in &instruction_node.children {
            let Some(node) = child.as_intermediary() else {
                continue;
            };
            if node.site == self.sites.screen {
                out.screens.push(self.decode_screen(node));
            }
        }

        debug!(target: "screen.decode", screens = out.screens.len(), "renderings decoded");
        Ok(out)
    }

    fn decode_screen(&self, node: &IntermediaryNode) -> Screen {
        let mut screen = Screen {
            kind_raw: "_screen".to_string(),
            ..Screen::default()
        };
        for child in &node.children {
            let Some(im) = child.as_intermediary() else {
                continue;
            };
            if im.site == self.sites.panel {
                screen.panels.push(self.decode_panel(im));
            } else if im.site == self.sites.event {
                screen.events.push(self.decode_event(im));
            } else if im.site == self.sites.option
                && let Some((key, value)) = self.option_kv(im)
            {
                apply_screen_option(&mut screen, &key, &value);
            }
        }
        screen
    }

    fn decode_panel(&self, node: &IntermediaryNode) -> Panel {
        let mut panel = Panel {
            kind_raw: "_rectangle".to_string(),
            ..Panel::default()
        };
        for child in &node.children {
            let Some(im) = child.as_intermediary() else {
                continue;
            };
            if im.site == self.sites.figure {
                panel.figures.push(self.decode_figure(im));
            } else if im.site == self.sites.option
                && let Some((key, value)) = self.option_kv(im)
            {
                apply_panel_option(&mut panel, &key, &value);
            }
        }
        panel
    }

    fn decode_figure(&self, node: &IntermediaryNode) -> Figure {
        let mut figure = Figure::default();
        for child in &node.children {
            let Some(im) = child.as_intermediary() else {
                continue;
            };
            if self.sites.figure_kind.contains(&im.site) {
                figure.kind_raw = flatten_terminals(child).trim().to_string();
            } else if im.site == self.sites.option
                && let Some((key, value)) = self.option_kv(im)
            {
                apply_figure_option(&mut figure, &key, &value);
            }
        }
        figure
    }

    fn decode_event(&self, node: &IntermediaryNode) -> Event {
        let mut event = Event::default();
        for child in &node.children {
            let Some(im) = child.as_intermediary() else {
                continue;
            };
            if self.sites.event_kind.contains(&im.site) {
                event.kind_raw = flatten_terminals(child).trim().to_string();
            } else if im.site == self.sites.form_binding {
                let local = find_child_by_site(im, self.sites.form_local)
                    .map(flatten_terminals)
                    .unwrap_or_default();
                let path = find_child_by_site(im, self.sites.form_path)
                    .map(flatten_terminals)
                    .unwrap_or_default();
                if !local.is_empty() && !path.is_empty() {
                    event.bindings.push(Binding {
                        local_name: local.trim().to_string(),
                        path: path.trim().to_string(),
                    });
                }
            } else if im.site == self.sites.option
                && let Some((key, value)) = self.option_kv(im)
            {
                apply_event_option(&mut event, &key, &value);
            }
        }
        event
    }

    /// Structured key/value lookup with a string-level fallback on the
    /// flattened option text.
    fn option_kv(&self, node: &IntermediaryNode) -> Option<(String, String)> {
        let key = find_child_by_site(node, self.sites.option_key).map(flatten_terminals);
        let value = self
            .sites
            .option_value
            .iter()
            .find_map(|&s| find_child_by_site(node, s))
            .map(flatten_terminals);
        match (key, value) {
            (Some(k), Some(v)) => Some((k.trim().to_string(), strip_quotes(v.trim()))),
            _ => {
                let flat: String = node.children.iter().map(flatten_terminals).collect();
                let eq = flat.find('=')?;
                Some((
                    flat[..eq].trim().to_string(),
                    strip_quotes(flat[eq + 1..].trim()),
                ))
            }
        }
    }
}

fn strip_quotes(s: &str) -> String {
    let b = s.as_bytes();
    if b.len() >= 2 && b[0] == b'"' && b[b.len() - 1] == b'"' {
        s[1..s.len() - 1].to_string()
    } else {
        s.to_string()
    }
}

fn parse_bool(s: &str) -> bool {
    matches!(s.to_ascii_lowercase().as_str(), "true" | "1" | "on")
}

fn parse_pair(s: &str) -> Coords {
    let mut parts = s.splitn(2, ',');
    let x = parts.next().and_then(|p| p.trim().parse().ok());
    let y = parts.next().and_then(|p| p.trim().parse().ok());
    match (x, y) {
        (Some(x), Some(y)) => Coords { x, y, set: true },
        _ => Coords::default(),
    }
}

fn apply_screen_option(screen: &mut Screen, key: &str, value: &str) {
    match key {
        "__name" => screen.name = value.to_string(),
        "__key" => screen.key_raw = value.to_string(),
        "__border" => screen.border = parse_bool(value),
        "__text_color" => screen.text_color = value.to_string(),
        "__back_color" => screen.back_color = value.to_string(),
        "__line_color" => screen.line_color = value.to_string(),
        "__tickness" => screen.tickness = value.parse().unwrap_or(f64::NAN),
        _ => trace!(target: "screen.decode", key, "ignored screen option"),
    }
}

fn apply_panel_option(panel: &mut Panel, key: &str, value: &str) {
    match key {
        "__coords" => panel.coords = parse_pair(value),
        "__shape" => panel.shape = parse_pair(value),
        "__z" => panel.z_index = value.parse().unwrap_or(0),
        "__border" => panel.border = parse_bool(value),
        "__title" => {
            panel.title_on = true;
            panel.title = value.to_string();
        }
        "__text_color" => panel.text_color = value.to_string(),
        "__back_color" => panel.back_color = value.to_string(),
        "__line_color" => panel.line_color = value.to_string(),
        "__tickness" => panel.tickness = value.parse().unwrap_or(f64::NAN),
        _ => trace!(target: "screen.decode", key, "ignored panel option"),
    }
}

fn apply_figure_option(figure: &mut Figure, key: &str, value: &str) {
    match key {
        "__type" => figure.type_raw = value.to_string(),
        "__coords" => figure.coords = parse_pair(value),
        "__shape" => figure.shape = parse_pair(value),
        "__border" => figure.border = parse_bool(value),
        "__title" => {
            figure.title_on = true;
            figure.title = value.to_string();
        }
        "__legend" => {
            figure.legend_on = true;
            figure.legend = value.to_string();
        }
        "__text_color" => figure.text_color = value.to_string(),
        "__back_color" => figure.back_color = value.to_string(),
        "__line_color" => figure.line_color = value.to_string(),
        "__tickness" => figure.tickness = value.parse().unwrap_or(f64::NAN),
        "__value" => {
            figure.has_value = true;
            figure.value = value.to_string();
        }
        "__capacity" => {
            figure.has_capacity = true;
            figure.capacity = value.parse().unwrap_or(0);
        }
        "__trigger" => figure.triggers.push(value.to_string()),
        _ => trace!(target: "screen.decode", key, "ignored figure option"),
    }
}

fn apply_event_option(event: &mut Event, key: &str, value: &str) {
    match key {
        "__name" => event.name = value.to_string(),
        "__label" => {
            event.has_label = true;
            event.label = value.to_string();
        }
        "__color" => {
            event.has_color = true;
            event.color = value.to_string();
        }
        _ => trace!(target: "screen.decode", key, "ignored event option"),
    }
}
