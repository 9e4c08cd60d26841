//! Circuit view over node instances + hops, and its structural validation.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::directives::{DirectiveDir, DirectiveId, DirectiveSpec, compatible};
use crate::tsi::Tsi;

/// Index of a node inside its owning circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeIdx(pub usize);

/// One side of a hop: a node plus one of its directives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub node: NodeIdx,
    pub directive: DirectiveId,
}

/// Directed edge from an out-directive to an in-directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hop {
    pub from: Endpoint,
    pub to: Endpoint,
}

/// Borrowed view of a circuit; nodes stay owned by the board.
pub struct Circuit<'a> {
    pub nodes: &'a [Box<dyn Tsi>],
    pub hops: &'a [Hop],
    pub doc: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitIssue {
    pub what: String,
    pub hop_index: usize,
}

impl CircuitIssue {
    fn at(what: impl Into<String>, hop_index: usize) -> Self {
        Self {
            what: what.into(),
            hop_index,
        }
    }
}

impl fmt::Display for CircuitIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (hop {})", self.what, self.hop_index)
    }
}

pub fn find_directive<'a>(
    tsi: &'a dyn Tsi,
    id: DirectiveId,
    dir: DirectiveDir,
) -> Option<&'a DirectiveSpec> {
    tsi.directives().iter().find(|d| d.id == id && d.dir == dir)
}

/// Runtime-view validation: directive existence and compatibility per hop,
/// exactly one root (in-degree zero) which is the first hop's source and
/// has at least one input directive, acyclicity, full reachability, and
/// sink-only terminals.
pub fn validate(c: &Circuit<'_>) -> Result<(), CircuitIssue> {
    if c.hops.is_empty() {
        return Err(CircuitIssue::at("empty circuit", 0));
    }

    let mut adj: HashMap<NodeIdx, Vec<NodeIdx>> = HashMap::new();
    let mut in_degree: HashMap<NodeIdx, usize> = HashMap::new();
    let mut out_degree: HashMap<NodeIdx, usize> = HashMap::new();
    let mut referenced: HashSet<NodeIdx> = HashSet::new();

    for (i, hop) in c.hops.iter().enumerate() {
        for ep in [hop.from, hop.to] {
            if ep.node.0 >= c.nodes.len() {
                return Err(CircuitIssue::at("hop endpoint out of range", i));
            }
        }
        let from = c.nodes[hop.from.node.0].as_ref();
        let to = c.nodes[hop.to.node.0].as_ref();

        let out_spec = find_directive(from, hop.from.directive, DirectiveDir::Out);
        let in_spec = find_directive(to, hop.to.directive, DirectiveDir::In);
        let (Some(out_spec), Some(in_spec)) = (out_spec, in_spec) else {
            return Err(CircuitIssue::at("directive not found on tsi", i));
        };
        if let Err(issue) = compatible(out_spec, in_spec) {
            return Err(CircuitIssue::at(issue.to_string(), i));
        }

        referenced.insert(hop.from.node);
        referenced.insert(hop.to.node);
        adj.entry(hop.from.node).or_default().push(hop.to.node);
        adj.entry(hop.to.node).or_default();
        *in_degree.entry(hop.to.node).or_insert(0) += 1;
        in_degree.entry(hop.from.node).or_insert(0);
        *out_degree.entry(hop.from.node).or_insert(0) += 1;
        out_degree.entry(hop.to.node).or_insert(0);
    }

    let roots: Vec<NodeIdx> = referenced
        .iter()
        .copied()
        .filter(|n| in_degree.get(n).copied().unwrap_or(0) == 0)
        .collect();
    if roots.is_empty() {
        return Err(CircuitIssue::at("circuit has no root node", 0));
    }
    if roots.len() != 1 {
        return Err(CircuitIssue::at("circuit must have exactly one root node", 0));
    }
    let root = roots[0];
    if root != c.hops[0].from.node {
        return Err(CircuitIssue::at("first hop must start from circuit root", 0));
    }

    let start = c.nodes[root.0].as_ref();
    let start_has_input = start
        .directives()
        .iter()
        .any(|d| d.dir == DirectiveDir::In);
    if !start_has_input {
        return Err(CircuitIssue::at("start tsi has no input directives", 0));
    }

    // DFS with tri-color marking: gray-on-gray re-entry is a cycle.
    #[derive(Clone, Copy, PartialEq)]
    enum Color {
        White,
        Gray,
        Black,
    }
    let mut color: HashMap<NodeIdx, Color> = HashMap::new();
    let mut reachable: HashSet<NodeIdx> = HashSet::new();
    let mut stack: Vec<(NodeIdx, usize)> = vec![(root, 0)];
    color.insert(root, Color::Gray);
    reachable.insert(root);

    while let Some((node, next)) = stack.pop() {
        let edges = adj.get(&node).map(Vec::as_slice).unwrap_or(&[]);
        if next < edges.len() {
            stack.push((node, next + 1));
            let child = edges[next];
            match color.get(&child).copied().unwrap_or(Color::White) {
                Color::Gray => {
                    return Err(CircuitIssue::at("cycle detected in circuit graph", 0));
                }
                Color::White => {
                    color.insert(child, Color::Gray);
                    reachable.insert(child);
                    stack.push((child, 0));
                }
                Color::Black => {}
            }
        } else {
            color.insert(node, Color::Black);
        }
    }

    if reachable.len() != referenced.len() {
        return Err(CircuitIssue::at("unreachable tsi from circuit root", 0));
    }

    // Any terminal node in the graph must be a sink.
    for node in &referenced {
        let od = out_degree.get(node).copied().unwrap_or(0);
        if od == 0 && !c.nodes[node.0].is_sink() {
            return Err(CircuitIssue::at("terminal tsi must be a sink", 0));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directives::{DirectiveDir, DirectiveId, PayloadKind, directive};
    use crate::nodes::{SinkBuffer, TextFanSource, TextTransform};
    use crate::tsi::Tsi;

    fn chain() -> (Vec<Box<dyn Tsi>>, Vec<Hop>) {
        let nodes: Vec<Box<dyn Tsi>> = vec![
            Box::new(TextFanSource::new(1, "src")),
            Box::new(TextTransform::new(2, "map")),
            Box::new(SinkBuffer::new(3, "sink", PayloadKind::String, 16)),
        ];
        let hops = vec![
            Hop {
                from: Endpoint {
                    node: NodeIdx(0),
                    directive: DirectiveId::Payload,
                },
                to: Endpoint {
                    node: NodeIdx(1),
                    directive: DirectiveId::Payload,
                },
            },
            Hop {
                from: Endpoint {
                    node: NodeIdx(1),
                    directive: DirectiveId::Payload,
                },
                to: Endpoint {
                    node: NodeIdx(2),
                    directive: DirectiveId::Payload,
                },
            },
        ];
        (nodes, hops)
    }

    #[test]
    fn accepts_a_valid_chain() {
        let (nodes, hops) = chain();
        let c = Circuit {
            nodes: &nodes,
            hops: &hops,
            doc: "chain",
        };
        assert_eq!(validate(&c), Ok(()));
    }

    #[test]
    fn rejects_cycles() {
        let (nodes, mut hops) = chain();
        hops.push(Hop {
            from: Endpoint {
                node: NodeIdx(1),
                directive: DirectiveId::Payload,
            },
            to: Endpoint {
                node: NodeIdx(1),
                directive: DirectiveId::Payload,
            },
        });
        let c = Circuit {
            nodes: &nodes,
            hops: &hops,
            doc: "cyclic",
        };
        let issue = validate(&c).unwrap_err();
        assert!(issue.what.contains("cycle"));
    }

    #[test]
    fn rejects_non_sink_terminal() {
        let (nodes, mut hops) = chain();
        hops.pop(); // map becomes terminal
        let c = Circuit {
            nodes: &nodes,
            hops: &hops,
            doc: "truncated",
        };
        let issue = validate(&c).unwrap_err();
        assert!(issue.what.contains("sink"));
    }

    #[test]
    fn rejects_kind_mismatch_across_hop() {
        let nodes: Vec<Box<dyn Tsi>> = vec![
            Box::new(TextFanSource::new(1, "src")),
            Box::new(SinkBuffer::new(2, "sink", PayloadKind::Tensor, 8)),
        ];
        let hops = vec![Hop {
            from: Endpoint {
                node: NodeIdx(0),
                directive: DirectiveId::Payload,
            },
            to: Endpoint {
                node: NodeIdx(1),
                directive: DirectiveId::Payload,
            },
        }];
        let c = Circuit {
            nodes: &nodes,
            hops: &hops,
            doc: "mismatched",
        };
        let issue = validate(&c).unwrap_err();
        assert_eq!(issue.what, "kind mismatch");
        assert_eq!(issue.hop_index, 0);
    }

    #[test]
    fn rejects_missing_directive() {
        let (nodes, mut hops) = chain();
        hops[0].from.directive = DirectiveId::Loss;
        let c = Circuit {
            nodes: &nodes,
            hops: &hops,
            doc: "bad",
        };
        let issue = validate(&c).unwrap_err();
        assert_eq!(issue.hop_index, 0);
        assert!(issue.what.contains("directive not found"));
    }

    #[test]
    fn find_directive_filters_by_direction() {
        let src = TextFanSource::new(1, "src");
        assert!(find_directive(&src, DirectiveId::Payload, DirectiveDir::In).is_some());
        assert!(find_directive(&src, DirectiveId::Meta, DirectiveDir::In).is_none());
        let spec = directive(
            DirectiveId::Payload,
            DirectiveDir::Out,
            PayloadKind::String,
            "",
        );
        assert_eq!(
            find_directive(&src, DirectiveId::Payload, DirectiveDir::Out).map(|d| d.kind),
            Some(spec.kind)
        );
    }
}
