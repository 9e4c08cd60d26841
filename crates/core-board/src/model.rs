//! Decoded board structures and directive/kind token resolution.

use std::fmt;

use core_tsi::{DirectiveId, PayloadKind};
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardInstruction {
    pub circuits: Vec<CircuitDecl>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CircuitDecl {
    pub name: String,
    pub invoke_name: String,
    pub invoke_payload: String,
    pub instances: Vec<InstanceDecl>,
    pub hops: Vec<HopDecl>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceDecl {
    pub alias: String,
    pub tsi_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HopDecl {
    pub from: EndpointDecl,
    pub to: EndpointDecl,
}

/// Raw endpoint text as written: `alias@directive:kind`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointDecl {
    pub instance: String,
    pub directive: String,
    pub kind: String,
}

impl fmt::Display for BoardInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "board instruction: circuits={}", self.circuits.len())?;
        for (i, c) in self.circuits.iter().enumerate() {
            writeln!(
                f,
                "  [{i}] {} instances={} hops={} invoke={}(\"{}\")",
                c.name,
                c.instances.len(),
                c.hops.len(),
                c.invoke_name,
                c.invoke_payload,
            )?;
        }
        Ok(())
    }
}

/// `@payload|@loss|@meta`, the `@` optional.
pub fn parse_directive_ref(s: &str) -> Option<DirectiveId> {
    let s = s.trim();
    let s = s.strip_prefix('@').unwrap_or(s);
    match s {
        "payload" => Some(DirectiveId::Payload),
        "loss" => Some(DirectiveId::Loss),
        "meta" => Some(DirectiveId::Meta),
        _ => None,
    }
}

/// `tensor|:tensor|str|:str`.
pub fn parse_kind_ref(s: &str) -> Option<PayloadKind> {
    match s.trim() {
        "tensor" | ":tensor" => Some(PayloadKind::Tensor),
        "str" | ":str" => Some(PayloadKind::String),
        _ => None,
    }
}

/// Invoke payload with a trailing `[...]` qualifier stripped.
pub fn invoke_symbol(circuit: &CircuitDecl) -> String {
    let s = circuit.invoke_payload.trim();
    match s.find('[') {
        Some(lb) => s[..lb].trim().to_string(),
        None => s.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEndpoint {
    pub instance: String,
    pub directive: DirectiveId,
    pub kind: PayloadKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedHop {
    pub from: ResolvedEndpoint,
    pub to: ResolvedEndpoint,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid directive/kind in hop: {hop}")]
pub struct HopResolveError {
    pub hop: String,
}

fn resolve_endpoint(ep: &EndpointDecl) -> Option<ResolvedEndpoint> {
    Some(ResolvedEndpoint {
        instance: ep.instance.trim().to_string(),
        directive: parse_directive_ref(&ep.directive)?,
        kind: parse_kind_ref(&ep.kind)?,
    })
}

pub fn resolve_hop_decl(hop: &HopDecl) -> Result<ResolvedHop, HopResolveError> {
    match (resolve_endpoint(&hop.from), resolve_endpoint(&hop.to)) {
        (Some(from), Some(to)) => Ok(ResolvedHop { from, to }),
        _ => Err(HopResolveError {
            hop: format!(
                "{}@{}:{} -> {}@{}:{}",
                hop.from.instance,
                hop.from.directive,
                hop.from.kind,
                hop.to.instance,
                hop.to.directive,
                hop.to.kind,
            ),
        }),
    }
}

pub fn resolve_hops(circuit: &CircuitDecl) -> Result<Vec<ResolvedHop>, HopResolveError> {
    circuit.hops.iter().map(resolve_hop_decl).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_tokens_accept_optional_at() {
        assert_eq!(parse_directive_ref("payload"), Some(DirectiveId::Payload));
        assert_eq!(parse_directive_ref("@loss"), Some(DirectiveId::Loss));
        assert_eq!(parse_directive_ref(" @meta "), Some(DirectiveId::Meta));
        assert_eq!(parse_directive_ref("bogus"), None);
    }

    #[test]
    fn kind_tokens_accept_optional_colon() {
        assert_eq!(parse_kind_ref("tensor"), Some(PayloadKind::Tensor));
        assert_eq!(parse_kind_ref(":str"), Some(PayloadKind::String));
        assert_eq!(parse_kind_ref("float"), None);
    }

    #[test]
    fn invoke_symbol_strips_bracket_qualifier() {
        let mut c = CircuitDecl::default();
        c.invoke_payload = "train [epochs=3]".to_string();
        assert_eq!(invoke_symbol(&c), "train");
        c.invoke_payload = "plain".to_string();
        assert_eq!(invoke_symbol(&c), "plain");
    }

    #[test]
    fn unresolvable_hop_reports_both_sides() {
        let hop = HopDecl {
            from: EndpointDecl {
                instance: "a".into(),
                directive: "payload".into(),
                kind: "tensor".into(),
            },
            to: EndpointDecl {
                instance: "b".into(),
                directive: "bogus".into(),
                kind: "tensor".into(),
            },
        };
        let err = resolve_hop_decl(&hop).unwrap_err();
        assert!(err.hop.contains("a@payload:tensor"));
        assert!(err.hop.contains("b@bogus:tensor"));
    }
}
