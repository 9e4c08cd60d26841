//! Board: owns circuits; each circuit owns its node instances and hop
//! graph, plus the default execution seed for a wave.

use std::collections::HashSet;
use std::fmt;

use crate::circuits::{Circuit, CircuitIssue, Hop, NodeIdx, find_directive, validate};
use crate::directives::{DirectiveDir, DirectiveId, PayloadKind};
use crate::runtime::{RunOptions, WaveOutcome, run_wave};
use crate::tsi::{Ingress, Tsi, TsiContext};
use crate::waves::Wave;

pub struct BoardCircuit {
    pub name: String,
    pub invoke_name: String,
    pub invoke_payload: String,

    pub nodes: Vec<Box<dyn Tsi>>,
    pub hops: Vec<Hop>,

    /// Default execution seed for this circuit.
    pub wave0: Wave,
    pub ingress0: Option<Ingress>,
}

impl BoardCircuit {
    pub fn new(
        name: impl Into<String>,
        invoke_name: impl Into<String>,
        invoke_payload: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            invoke_name: invoke_name.into(),
            invoke_payload: invoke_payload.into(),
            nodes: Vec::new(),
            hops: Vec::new(),
            wave0: Wave::default(),
            ingress0: None,
        }
    }

    pub fn add_node(&mut self, node: impl Tsi + 'static) -> NodeIdx {
        self.nodes.push(Box::new(node));
        NodeIdx(self.nodes.len() - 1)
    }

    pub fn view(&self) -> Circuit<'_> {
        Circuit {
            nodes: &self.nodes,
            hops: &self.hops,
            doc: &self.name,
        }
    }
}

#[derive(Debug, Default)]
pub struct Board {
    pub circuits: Vec<BoardCircuit>,
}

impl fmt::Debug for BoardCircuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoardCircuit")
            .field("name", &self.name)
            .field("invoke_name", &self.invoke_name)
            .field("nodes", &self.nodes.len())
            .field("hops", &self.hops.len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardIssue {
    pub what: String,
    pub circuit_index: usize,
    pub circuit_issue: Option<CircuitIssue>,
}

impl fmt::Display for BoardIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "circuit[{}]: {}", self.circuit_index, self.what)?;
        if let Some(ci) = &self.circuit_issue {
            write!(f, " ({ci})")?;
        }
        Ok(())
    }
}

/// Prefer a string-kind input on the root node, then any input.
pub fn pick_start_directive(circuit: &BoardCircuit) -> DirectiveId {
    let Some(first) = circuit.hops.first() else {
        return DirectiveId::Payload;
    };
    let Some(root) = circuit.nodes.get(first.from.node.0) else {
        return DirectiveId::Payload;
    };
    let directives = root.directives();
    directives
        .iter()
        .find(|d| d.dir == DirectiveDir::In && d.kind == PayloadKind::String)
        .or_else(|| directives.iter().find(|d| d.dir == DirectiveDir::In))
        .map(|d| d.id)
        .unwrap_or(DirectiveId::Payload)
}

pub fn validate_board(board: &Board) -> Result<(), BoardIssue> {
    if board.circuits.is_empty() {
        return Err(BoardIssue {
            what: "empty board".to_string(),
            circuit_index: 0,
            circuit_issue: None,
        });
    }

    for (i, circuit) in board.circuits.iter().enumerate() {
        let fail = |what: &str| {
            Err(BoardIssue {
                what: what.to_string(),
                circuit_index: i,
                circuit_issue: None,
            })
        };

        if circuit.name.trim().is_empty() {
            return fail("circuit name is empty");
        }
        if circuit.invoke_name.trim().is_empty() {
            return fail("circuit invoke_name is empty");
        }
        if circuit.invoke_payload.trim().is_empty() {
            return fail("circuit invoke_payload is empty");
        }
        if circuit.nodes.is_empty() {
            return fail("circuit has no nodes");
        }

        let mut ids = HashSet::new();
        for node in &circuit.nodes {
            if !ids.insert(node.id()) {
                return fail("duplicated tsi id in circuit nodes");
            }
        }

        let mut wired: HashSet<NodeIdx> = HashSet::new();
        for hop in &circuit.hops {
            if hop.from.node.0 >= circuit.nodes.len() || hop.to.node.0 >= circuit.nodes.len() {
                return fail("hop endpoint is not owned by circuit nodes");
            }
            wired.insert(hop.from.node);
            wired.insert(hop.to.node);
        }
        if wired.len() != circuit.nodes.len() {
            return fail("orphan node not referenced by any hop");
        }

        if let Err(ci) = validate(&circuit.view()) {
            return Err(BoardIssue {
                what: "invalid circuit".to_string(),
                circuit_index: i,
                circuit_issue: Some(ci),
            });
        }

        // The seed ingress must land on an existing root input of the same kind.
        let Some(ingress) = &circuit.ingress0 else {
            return fail("circuit has no seed ingress");
        };
        let root = circuit.hops[0].from.node;
        let root_node = circuit.nodes[root.0].as_ref();
        let Some(spec) = find_directive(root_node, ingress.directive, DirectiveDir::In) else {
            return fail("seed ingress directive not found on root tsi");
        };
        if spec.kind != ingress.signal.kind() {
            return fail("seed ingress kind mismatch with root tsi input");
        }
    }
    Ok(())
}

pub fn run_circuit(circuit: &mut BoardCircuit, ctx: &mut TsiContext, opts: RunOptions) -> WaveOutcome {
    let Some(start) = circuit.ingress0.clone() else {
        return WaveOutcome {
            steps: 0,
            error: None,
        };
    };
    run_wave(&mut circuit.nodes, &circuit.hops, circuit.wave0, start, ctx, opts)
}

/// Run every circuit's seed wave; returns total steps across the board.
pub fn run_board(board: &mut Board, ctx: &mut TsiContext) -> u64 {
    let mut total = 0;
    for circuit in &mut board.circuits {
        total += run_circuit(circuit, ctx, RunOptions::default()).steps;
    }
    total
}
