//! Board grammar + AST decoder.
//!
//! The decoder prefers structured lookup by production-site hash and falls
//! back to string-level parsing of the flattened node text, so a minor
//! grammar edit does not silently drop data.

use core_bnf::{
    AstNode, Grammar, GrammarError, InstructionParser, IntermediaryNode, ParseError, SiteHash,
    find_child_by_site, flatten_terminals, parse_grammar, site_hash,
};
use thiserror::Error;
use tracing::{debug, trace};

use crate::model::{BoardInstruction, CircuitDecl, EndpointDecl, HopDecl, InstanceDecl};

pub const BOARD_GRAMMAR: &str = r#"
# tsiemene board DSL
<instruction>     ::= { <circuit> } ;
<circuit>         ::= <circuit_header> { <hop_decl> | <instance_decl> } <circuit_invoke> ;
<circuit_header>  ::= "circuit" <circuit_name> "=" ;
<circuit_name>    ::= /[A-Za-z_][A-Za-z0-9_.-]*/ ;
<instance_decl>   ::= <instance_alias> "=" <tsi_type> [ ";" ] ;
<instance_alias>  ::= /[A-Za-z_][A-Za-z0-9_]*/ ;
<tsi_type>        ::= /[A-Za-z_][A-Za-z0-9_.]*/ ;
<hop_decl>        ::= <endpoint_from> "->" <endpoint_to> [ ";" ] ;
<endpoint_from>   ::= <endpoint> ;
<endpoint_to>     ::= <endpoint> ;
<endpoint>        ::= <instance_alias> "@" <directive_ref> ":" <kind_ref> ;
<directive_ref>   ::= /[A-Za-z]+/ ;
<kind_ref>        ::= /[A-Za-z]+/ ;
<circuit_invoke>  ::= <invoke_name> "(" <invoke_payload> ")" [ ";" ] ;
<invoke_name>     ::= /[A-Za-z_][A-Za-z0-9_]*/ ;
<invoke_payload>  ::= /"[^"]*"/ ;
"#;

#[derive(Debug, Error)]
pub enum BoardDecodeError {
    #[error(transparent)]
    Grammar(#[from] GrammarError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Production sites the decoder keys on. All rules are single-alternative
/// except the circuit body group, which splices its children directly.
struct Sites {
    circuit: SiteHash,
    circuit_header: SiteHash,
    circuit_name: SiteHash,
    instance_decl: SiteHash,
    instance_alias: SiteHash,
    tsi_type: SiteHash,
    hop_decl: SiteHash,
    endpoint_from: SiteHash,
    endpoint_to: SiteHash,
    circuit_invoke: SiteHash,
    invoke_name: SiteHash,
    invoke_payload: SiteHash,
}

impl Sites {
    fn new() -> Self {
        Self {
            circuit: site_hash("circuit", 0),
            circuit_header: site_hash("circuit_header", 0),
            circuit_name: site_hash("circuit_name", 0),
            instance_decl: site_hash("instance_decl", 0),
            instance_alias: site_hash("instance_alias", 0),
            tsi_type: site_hash("tsi_type", 0),
            hop_decl: site_hash("hop_decl", 0),
            endpoint_from: site_hash("endpoint_from", 0),
            endpoint_to: site_hash("endpoint_to", 0),
            circuit_invoke: site_hash("circuit_invoke", 0),
            invoke_name: site_hash("invoke_name", 0),
            invoke_payload: site_hash("invoke_payload", 0),
        }
    }
}

pub struct BoardDecoder {
    grammar: Grammar,
    sites: Sites,
}

impl BoardDecoder {
    pub fn new() -> Result<Self, GrammarError> {
        let grammar = parse_grammar(BOARD_GRAMMAR)?;
        Ok(Self {
            grammar,
            sites: Sites::new(),
        })
    }

    pub fn decode(&self, instruction: &str) -> Result<BoardInstruction, BoardDecodeError> {
        let parser = InstructionParser::new(&self.grammar);
        let ast = parser.parse(instruction)?;
        trace!(target: "board.decode", ast = %core_bnf::ast::dump(&ast), "parsed board instruction");

        let mut out = BoardInstruction::default();
        let AstNode::Root(root) = &ast else {
            return Ok(out);
        };
        let Some(instruction_node) = root.children.first().and_then(AstNode::as_intermediary)
        else {
            return Ok(out);
        };

        for child in &instruction_node.children {
            let Some(circuit_node) = child.as_intermediary() else {
                continue;
            };
            if circuit_node.site != self.sites.circuit {
                continue;
            }
            let circuit = self.decode_circuit(circuit_node);
            if !circuit.name.is_empty() {
                out.circuits.push(circuit);
            }
        }

        debug!(target: "board.decode", circuits = out.circuits.len(), "board decoded");
        Ok(out)
    }

    fn decode_circuit(&self, node: &IntermediaryNode) -> CircuitDecl {
        let mut out = CircuitDecl::default();

        if let Some(header_node) = find_child_by_site(node, self.sites.circuit_header) {
            if let Some(header) = header_node.as_intermediary()
                && let Some(name) = find_child_by_site(header, self.sites.circuit_name)
            {
                out.name = flatten_terminals(name).trim().to_string();
            }
            if out.name.is_empty() {
                out.name =
                    parse_circuit_header_text(&flatten_terminals(header_node)).unwrap_or_default();
            }
        }

        for child in &node.children {
            let Some(im) = child.as_intermediary() else {
                continue;
            };
            if im.site == self.sites.instance_decl {
                let alias = find_child_by_site(im, self.sites.instance_alias);
                let tsi_type = find_child_by_site(im, self.sites.tsi_type);
                let inst = match (alias, tsi_type) {
                    (Some(a), Some(t)) => Some(InstanceDecl {
                        alias: flatten_terminals(a).trim().to_string(),
                        tsi_type: flatten_terminals(t).trim().to_string(),
                    }),
                    _ => parse_instance_decl_text(&flatten_terminals(child)),
                };
                if let Some(inst) = inst
                    && !inst.alias.is_empty()
                    && !inst.tsi_type.is_empty()
                {
                    out.instances.push(inst);
                }
            } else if im.site == self.sites.hop_decl {
                let from = find_child_by_site(im, self.sites.endpoint_from)
                    .map(flatten_terminals)
                    .and_then(|t| parse_endpoint_text(&t));
                let to = find_child_by_site(im, self.sites.endpoint_to)
                    .map(flatten_terminals)
                    .and_then(|t| parse_endpoint_text(&t));
                let hop = match (from, to) {
                    (Some(from), Some(to)) => Some(HopDecl { from, to }),
                    _ => parse_hop_decl_text(&flatten_terminals(child)),
                };
                if let Some(hop) = hop {
                    out.hops.push(hop);
                }
            } else if im.site == self.sites.circuit_invoke {
                let name = find_child_by_site(im, self.sites.invoke_name);
                let payload = find_child_by_site(im, self.sites.invoke_payload);
                match (name, payload) {
                    (Some(n), Some(p)) => {
                        out.invoke_name = flatten_terminals(n).trim().to_string();
                        out.invoke_payload = strip_quotes(flatten_terminals(p).trim());
                    }
                    _ => {
                        if let Some((n, p)) = parse_circuit_invoke_text(&flatten_terminals(child)) {
                            out.invoke_name = n;
                            out.invoke_payload = p;
                        }
                    }
                }
            }
        }

        if out.name.is_empty() {
            out.name = out.invoke_name.clone();
        }
        if out.invoke_name.is_empty() {
            out.invoke_name = out.name.clone();
        }
        out
    }
}

fn normalize_line(s: &str) -> String {
    s.replace(['\r', '\n'], " ").trim().to_string()
}

fn strip_quotes(s: &str) -> String {
    let b = s.as_bytes();
    if b.len() >= 2 && (b[0] == b'"' || b[0] == b'\'') && b[b.len() - 1] == b[0] {
        s[1..s.len() - 1].to_string()
    } else {
        s.to_string()
    }
}

/// `alias@directive:kind`: `@` splits the alias, the last `:` splits the
/// kind (directive text may itself start with `@`).
fn parse_endpoint_text(text: &str) -> Option<EndpointDecl> {
    let line = normalize_line(text);
    let at = line.find('@')?;
    let colon = line.rfind(':')?;
    if at == 0 || colon <= at + 1 || colon + 1 >= line.len() {
        return None;
    }
    let ep = EndpointDecl {
        instance: line[..at].trim().to_string(),
        directive: line[at + 1..colon].trim().to_string(),
        kind: line[colon + 1..].trim().to_string(),
    };
    if ep.instance.is_empty() || ep.directive.is_empty() || ep.kind.is_empty() {
        return None;
    }
    Some(ep)
}

fn parse_instance_decl_text(text: &str) -> Option<InstanceDecl> {
    let line = normalize_line(text);
    let line = line.strip_suffix(';').unwrap_or(&line);
    let eq = line.find('=')?;
    let inst = InstanceDecl {
        alias: line[..eq].trim().to_string(),
        tsi_type: line[eq + 1..].trim().to_string(),
    };
    if inst.alias.is_empty() || inst.tsi_type.is_empty() {
        return None;
    }
    Some(inst)
}

fn parse_hop_decl_text(text: &str) -> Option<HopDecl> {
    let line = normalize_line(text);
    let line = line.strip_suffix(';').unwrap_or(&line);
    let arrow = line.find("->")?;
    let from = parse_endpoint_text(&line[..arrow])?;
    let to = parse_endpoint_text(&line[arrow + 2..])?;
    Some(HopDecl { from, to })
}

fn parse_circuit_header_text(text: &str) -> Option<String> {
    let line = normalize_line(text);
    let line = line.strip_prefix("circuit").unwrap_or(&line);
    let eq = line.find('=')?;
    let name = line[..eq].trim().to_string();
    if name.is_empty() { None } else { Some(name) }
}

fn parse_circuit_invoke_text(text: &str) -> Option<(String, String)> {
    let mut line = normalize_line(text);
    if line.ends_with(';') {
        line.pop();
        line = line.trim().to_string();
    }
    let lp = line.find('(')?;
    let rp = line.rfind(')')?;
    if lp == 0 || rp <= lp {
        return None;
    }
    let name = line[..lp].trim().to_string();
    let payload = strip_quotes(line[lp + 1..rp].trim());
    if name.is_empty() { None } else { Some((name, payload)) }
}
