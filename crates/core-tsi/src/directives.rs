//! Canonical directive ids and static directive metadata.

use std::fmt;

/// Type names beginning with this prefix are sinks at the board-DSL level.
pub const SINK_TYPE_PREFIX: &str = "tsi.sink.";

/// Canonical directive ids used across tsi nodes and runtime wiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveId {
    Payload,
    Loss,
    Meta,
}

impl DirectiveId {
    pub const fn token(self) -> &'static str {
        match self {
            DirectiveId::Payload => "@payload",
            DirectiveId::Loss => "@loss",
            DirectiveId::Meta => "@meta",
        }
    }
}

impl fmt::Display for DirectiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveDir {
    In,
    Out,
}

/// Minimal payload families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    Tensor,
    String,
}

impl PayloadKind {
    pub const fn token(self) -> &'static str {
        match self {
            PayloadKind::Tensor => ":tensor",
            PayloadKind::String => ":str",
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Static metadata for one input or output directive on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectiveSpec {
    pub id: DirectiveId,
    pub dir: DirectiveDir,
    pub kind: PayloadKind,
    pub doc: &'static str,
}

pub const fn directive(
    id: DirectiveId,
    dir: DirectiveDir,
    kind: PayloadKind,
    doc: &'static str,
) -> DirectiveSpec {
    DirectiveSpec { id, dir, kind, doc }
}

/// Why two directive specs cannot be wired together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompatIssue {
    Direction,
    Kind,
    Directive,
}

impl fmt::Display for CompatIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CompatIssue::Direction => "direction mismatch (expected Out -> In)",
            CompatIssue::Kind => "kind mismatch",
            CompatIssue::Directive => "directive mismatch",
        })
    }
}

/// Build-time compatibility: Out -> In, same kind, same directive id.
pub fn compatible(outp: &DirectiveSpec, inp: &DirectiveSpec) -> Result<(), CompatIssue> {
    if outp.dir != DirectiveDir::Out || inp.dir != DirectiveDir::In {
        return Err(CompatIssue::Direction);
    }
    if outp.kind != inp.kind {
        return Err(CompatIssue::Kind);
    }
    if outp.id != inp.id {
        return Err(CompatIssue::Directive);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_canonical() {
        assert_eq!(DirectiveId::Payload.token(), "@payload");
        assert_eq!(DirectiveId::Loss.token(), "@loss");
        assert_eq!(DirectiveId::Meta.token(), "@meta");
        assert_eq!(PayloadKind::Tensor.token(), ":tensor");
        assert_eq!(PayloadKind::String.token(), ":str");
    }

    #[test]
    fn compatibility_checks_direction_kind_and_id() {
        let out = directive(
            DirectiveId::Payload,
            DirectiveDir::Out,
            PayloadKind::Tensor,
            "",
        );
        let inp = directive(
            DirectiveId::Payload,
            DirectiveDir::In,
            PayloadKind::Tensor,
            "",
        );
        assert_eq!(compatible(&out, &inp), Ok(()));
        assert_eq!(compatible(&inp, &out), Err(CompatIssue::Direction));

        let wrong_kind = directive(
            DirectiveId::Payload,
            DirectiveDir::In,
            PayloadKind::String,
            "",
        );
        assert_eq!(compatible(&out, &wrong_kind), Err(CompatIssue::Kind));

        let wrong_id = directive(DirectiveId::Loss, DirectiveDir::In, PayloadKind::Tensor, "");
        assert_eq!(compatible(&out, &wrong_id), Err(CompatIssue::Directive));
    }
}
