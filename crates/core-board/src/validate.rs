//! Semantic validation of decoded boards and instantiation into a runnable
//! [`core_tsi::Board`].

use std::collections::{HashMap, HashSet};

use core_bnf::Diagnostics;
use core_tsi::{
    Board, BoardCircuit, DirectiveId, Endpoint, Hop, Ingress, NodeIdx, SINK_TYPE_PREFIX, Tsi,
    TsiId, Wave, pick_start_directive, string_signal,
};
use tracing::debug;

use crate::model::{BoardInstruction, CircuitDecl, ResolvedHop, invoke_symbol, resolve_hop_decl};

/// Per-circuit semantic checks. All problems are accumulated; callers
/// refuse to instantiate a board whose diagnostics carry any error.
pub fn validate_circuit_decl(circuit: &CircuitDecl, diag: &mut Diagnostics) {
    let name = circuit.name.trim();
    if name.is_empty() {
        diag.err("empty circuit name");
    }
    if circuit.invoke_name.trim().is_empty() {
        diag.err("empty circuit invoke name");
    }
    if circuit.invoke_payload.trim().is_empty() {
        diag.err("empty circuit invoke payload");
    }
    if circuit.instances.is_empty() {
        diag.err("circuit has no instance declarations");
    }
    if circuit.hops.is_empty() {
        diag.err("circuit has no hop declarations");
    }
    if !diag.ok() {
        return;
    }

    let mut alias_to_type: HashMap<&str, &str> = HashMap::new();
    for inst in &circuit.instances {
        let alias = inst.alias.trim();
        let tsi_type = inst.tsi_type.trim();
        if alias.is_empty() {
            diag.err("empty instance alias");
            continue;
        }
        if tsi_type.is_empty() {
            diag.err(format!("empty tsi_type for alias: {alias}"));
            continue;
        }
        if alias_to_type.insert(alias, tsi_type).is_some() {
            diag.err(format!("duplicated instance alias: {alias}"));
        }
    }

    let mut resolved: Vec<ResolvedHop> = Vec::with_capacity(circuit.hops.len());
    for (hi, hop) in circuit.hops.iter().enumerate() {
        match resolve_hop_decl(hop) {
            Ok(r) => resolved.push(r),
            Err(e) => diag.err(format!("hop[{hi}]: {e}")),
        }
    }
    if !diag.ok() {
        return;
    }

    let mut adj: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut in_degree: HashMap<&str, usize> = HashMap::new();
    let mut out_degree: HashMap<&str, usize> = HashMap::new();
    let mut referenced: HashSet<&str> = HashSet::new();

    for hop in &resolved {
        for ep in [&hop.from, &hop.to] {
            if !alias_to_type.contains_key(ep.instance.as_str()) {
                diag.err(format!(
                    "hop references unknown instance alias: {}",
                    ep.instance
                ));
            }
        }
        referenced.insert(&hop.from.instance);
        referenced.insert(&hop.to.instance);
        adj.entry(&hop.from.instance).or_default().push(&hop.to.instance);
        adj.entry(&hop.to.instance).or_default();
        *in_degree.entry(&hop.to.instance).or_insert(0) += 1;
        in_degree.entry(&hop.from.instance).or_insert(0);
        *out_degree.entry(&hop.from.instance).or_insert(0) += 1;
        out_degree.entry(&hop.to.instance).or_insert(0);
    }
    if !diag.ok() {
        return;
    }

    for alias in alias_to_type.keys() {
        if !referenced.contains(alias) {
            diag.err(format!("orphan instance not referenced by any hop: {alias}"));
        }
    }

    let mut roots: Vec<&str> = referenced
        .iter()
        .copied()
        .filter(|a| in_degree.get(a).copied().unwrap_or(0) == 0)
        .collect();
    roots.sort_unstable();

    if roots.is_empty() {
        diag.err("circuit has no root instance");
        return;
    }
    if roots.len() != 1 {
        diag.err("circuit must have exactly one root instance");
        return;
    }

    // Tri-color DFS from the root: gray re-entry means a cycle.
    let mut color: HashMap<&str, u8> = HashMap::new();
    let mut reachable: HashSet<&str> = HashSet::new();
    let mut cycle = false;
    let mut stack: Vec<(&str, usize)> = vec![(roots[0], 0)];
    color.insert(roots[0], 1);
    reachable.insert(roots[0]);

    while let Some((node, next)) = stack.pop() {
        let edges = adj.get(node).map(Vec::as_slice).unwrap_or(&[]);
        if next < edges.len() {
            stack.push((node, next + 1));
            let child = edges[next];
            match color.get(child).copied().unwrap_or(0) {
                1 => {
                    cycle = true;
                    break;
                }
                0 => {
                    color.insert(child, 1);
                    reachable.insert(child);
                    stack.push((child, 0));
                }
                _ => {}
            }
        } else {
            color.insert(node, 2);
        }
    }

    if cycle {
        diag.err("cycle detected in circuit hops");
        return;
    }
    if reachable.len() != referenced.len() {
        diag.err("unreachable instance from circuit root");
    }

    for alias in &referenced {
        let od = out_degree.get(alias).copied().unwrap_or(0);
        if od != 0 {
            continue;
        }
        let tsi_type = alias_to_type.get(alias).copied().unwrap_or("");
        if !tsi_type.starts_with(SINK_TYPE_PREFIX) {
            diag.err(format!(
                "terminal instance must be sink type: {alias}={tsi_type}"
            ));
        }
    }
}

/// Board-level checks on top of the per-circuit ones: at least one circuit,
/// unique circuit names, unique invoke names.
pub fn validate_board_instruction(board: &BoardInstruction) -> Diagnostics {
    let mut diag = Diagnostics::default();
    if board.circuits.is_empty() {
        diag.err("board has no circuits");
        return diag;
    }

    let mut names: HashSet<&str> = HashSet::new();
    let mut invoke_names: HashSet<&str> = HashSet::new();
    for (i, circuit) in board.circuits.iter().enumerate() {
        let cname = circuit.name.trim();
        if !names.insert(cname) {
            diag.err(format!("duplicated circuit name: {cname}"));
        }
        let iname = circuit.invoke_name.trim();
        if !invoke_names.insert(iname) {
            diag.err(format!("duplicated circuit invoke name: {iname}"));
        }

        let mut local = Diagnostics::default();
        validate_circuit_decl(circuit, &mut local);
        for e in local.errors {
            diag.err(format!("circuit[{i}] {e}"));
        }
        for w in local.warnings {
            diag.warn(format!("circuit[{i}] {w}"));
        }
    }
    diag
}

/// Maps a `tsi_type` name from the DSL to a concrete node instance.
pub trait NodeFactory {
    fn make(&self, tsi_type: &str, id: TsiId, alias: &str) -> Option<Box<dyn Tsi>>;
}

impl<F> NodeFactory for F
where
    F: Fn(&str, TsiId, &str) -> Option<Box<dyn Tsi>>,
{
    fn make(&self, tsi_type: &str, id: TsiId, alias: &str) -> Option<Box<dyn Tsi>> {
        self(tsi_type, id, alias)
    }
}

/// Turn a validated instruction into a runnable board. The seed ingress for
/// each circuit is the invoke symbol delivered as a string signal on the
/// root's preferred input directive.
pub fn instantiate_board(
    instruction: &BoardInstruction,
    factory: &dyn NodeFactory,
) -> Result<Board, Diagnostics> {
    let diag = validate_board_instruction(instruction);
    if !diag.ok() {
        return Err(diag);
    }

    let mut board = Board::default();
    let mut diag = Diagnostics::default();
    let mut next_id: TsiId = 1;

    for decl in &instruction.circuits {
        let mut circuit =
            BoardCircuit::new(&decl.name, &decl.invoke_name, &decl.invoke_payload);
        let mut alias_idx: HashMap<&str, NodeIdx> = HashMap::new();

        for inst in &decl.instances {
            match factory.make(&inst.tsi_type, next_id, &inst.alias) {
                Some(node) => {
                    let idx = NodeIdx(circuit.nodes.len());
                    circuit.nodes.push(node);
                    alias_idx.insert(inst.alias.as_str(), idx);
                    next_id += 1;
                }
                None => diag.err(format!(
                    "no node factory for tsi_type: {} (alias {})",
                    inst.tsi_type, inst.alias
                )),
            }
        }
        if !diag.ok() {
            return Err(diag);
        }

        for hop in &decl.hops {
            // Resolution already succeeded during validation.
            let Ok(resolved) = resolve_hop_decl(hop) else {
                continue;
            };
            let (Some(&from), Some(&to)) = (
                alias_idx.get(resolved.from.instance.as_str()),
                alias_idx.get(resolved.to.instance.as_str()),
            ) else {
                continue;
            };
            circuit.hops.push(Hop {
                from: Endpoint {
                    node: from,
                    directive: resolved.from.directive,
                },
                to: Endpoint {
                    node: to,
                    directive: resolved.to.directive,
                },
            });
        }

        let start_directive = pick_start_directive(&circuit);
        circuit.wave0 = Wave::default();
        circuit.ingress0 = Some(Ingress {
            directive: start_directive,
            signal: string_signal(invoke_symbol(decl)),
        });
        debug!(
            target: "board.build",
            circuit = %decl.name,
            nodes = circuit.nodes.len(),
            hops = circuit.hops.len(),
            start = %start_directive,
            "circuit instantiated"
        );
        board.circuits.push(circuit);
    }

    Ok(board)
}
