//! FIFO wave runtime: event queue, broadcast emitter, meta-traces.

use std::collections::VecDeque;
use std::fmt::Write as _;

use thiserror::Error;
use tracing::debug;

use crate::circuits::{Hop, NodeIdx};
use crate::directives::{DirectiveDir, DirectiveId, DirectiveSpec, SINK_TYPE_PREFIX};
use crate::tsi::{Emitter, Ingress, StepError, Tsi, TsiContext};
use crate::waves::{Signal, Wave, string_signal};

#[derive(Debug, Clone, Error)]
pub enum RunError {
    #[error("event queue full (capacity {capacity}) during wave {wave_id}")]
    QueueFull { capacity: usize, wave_id: u64 },
    #[error(transparent)]
    Step(#[from] StepError),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Upper bound on queued events; `None` leaves the queue unbounded.
    pub capacity: Option<usize>,
}

/// Result of driving one wave to completion (or termination).
#[derive(Debug)]
pub struct WaveOutcome {
    pub steps: u64,
    pub error: Option<RunError>,
}

impl WaveOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

struct RuntimeEvent {
    node: NodeIdx,
    wave: Wave,
    ingress: Ingress,
}

/// Immutable node facts captured before stepping begins, so the emitter can
/// trace while the stepped node is mutably borrowed.
struct NodeMeta {
    type_name: String,
    instance_name: String,
    directives: Vec<DirectiveSpec>,
    emits_meta: bool,
}

impl NodeMeta {
    fn capture(node: &dyn Tsi) -> Self {
        let directives = node.directives().to_vec();
        let emits_meta = directives
            .iter()
            .any(|d| d.id == DirectiveId::Meta && d.dir == DirectiveDir::Out);
        Self {
            type_name: node.type_name().to_string(),
            instance_name: node.instance_name().to_string(),
            directives,
            emits_meta,
        }
    }

    fn kind_token(&self, id: DirectiveId, dir: DirectiveDir) -> &'static str {
        self.directives
            .iter()
            .find(|d| d.id == id && d.dir == dir)
            .map(|d| d.kind.token())
            .unwrap_or(":unknown")
    }

    fn directive_summary(&self) -> String {
        let mut out = String::new();
        for (i, d) in self.directives.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            let _ = write!(
                out,
                "{}[{}{}]",
                if d.dir == DirectiveDir::In { "in" } else { "out" },
                d.id,
                d.kind
            );
        }
        out
    }
}

/// Routes emissions to every hop whose `from` endpoint matches the node
/// currently stepping; non-meta routing decisions are themselves reported
/// on the `@meta` directive with a one-hop re-entry guard.
struct CircuitEmitter<'a> {
    hops: &'a [Hop],
    metas: &'a [NodeMeta],
    queue: &'a mut VecDeque<RuntimeEvent>,
    capacity: Option<usize>,
    src: NodeIdx,
    emits_this_step: u64,
    in_meta_emit: bool,
    overflowed: bool,
}

impl CircuitEmitter<'_> {
    fn push(&mut self, ev: RuntimeEvent) {
        if let Some(cap) = self.capacity
            && self.queue.len() >= cap
        {
            self.overflowed = true;
            return;
        }
        self.queue.push_back(ev);
    }

    fn emit_meta(&mut self, wave: Wave, msg: String) {
        let meta = &self.metas[self.src.0];
        debug!(target: "tsi.runtime", tsi = %meta.instance_name, "{msg}");
        // The system log sink would feed its own trace back into itself.
        if meta.type_name.starts_with(SINK_TYPE_PREFIX) {
            return;
        }
        if !meta.emits_meta || self.in_meta_emit {
            return;
        }
        self.in_meta_emit = true;
        self.emit(wave, DirectiveId::Meta, string_signal(msg));
        self.in_meta_emit = false;
    }

    fn trace_step(&mut self, ev_node: NodeIdx, wave: Wave, ingress: &Ingress) {
        let meta = &self.metas[ev_node.0];
        let msg = format!(
            "step tsi={} in=[{}{}] signal={{{}}} directives={{{}}}",
            meta.instance_name,
            ingress.directive,
            meta.kind_token(ingress.directive, DirectiveDir::In),
            ingress.signal.summarize(),
            meta.directive_summary(),
        );
        self.emit_meta(wave, msg);
    }

    fn trace_step_done(&mut self, ev_node: NodeIdx, wave: Wave) {
        let meta = &self.metas[ev_node.0];
        let msg = format!(
            "step.done tsi={} emits={} queue={}",
            meta.instance_name,
            self.emits_this_step,
            self.queue.len(),
        );
        self.emit_meta(wave, msg);
    }
}

impl Emitter for CircuitEmitter<'_> {
    fn emit(&mut self, wave: Wave, out_directive: DirectiveId, signal: Signal) {
        let is_meta = out_directive == DirectiveId::Meta;
        let src_meta = &self.metas[self.src.0];

        let mut routed = false;
        for hop in self.hops {
            if hop.from.node != self.src || hop.from.directive != out_directive {
                continue;
            }
            if !is_meta {
                let dst_meta = &self.metas[hop.to.node.0];
                let msg = format!(
                    "route from={}[{}{}] to={}[{}{}] signal={{{}}}",
                    src_meta.instance_name,
                    out_directive,
                    src_meta.kind_token(out_directive, DirectiveDir::Out),
                    dst_meta.instance_name,
                    hop.to.directive,
                    dst_meta.kind_token(hop.to.directive, DirectiveDir::In),
                    signal.summarize(),
                );
                self.emit_meta(wave, msg);
            }
            self.push(RuntimeEvent {
                node: hop.to.node,
                wave,
                ingress: Ingress {
                    directive: hop.to.directive,
                    signal: signal.clone(),
                },
            });
            routed = true;
            if !is_meta {
                self.emits_this_step += 1;
            }
        }

        if !routed && !is_meta {
            let msg = format!(
                "drop from={}[{}{}] signal={{{}}} no_route",
                src_meta.instance_name,
                out_directive,
                src_meta.kind_token(out_directive, DirectiveDir::Out),
                signal.summarize(),
            );
            self.emit_meta(wave, msg);
        }
    }
}

/// Drive one wave through the circuit. The initial ingress goes to the
/// first hop's source node (the validated root). Delivery order per source
/// directive follows emission order; a step error or queue overflow
/// terminates the wave and the queue is drained.
pub fn run_wave(
    nodes: &mut [Box<dyn Tsi>],
    hops: &[Hop],
    wave0: Wave,
    start: Ingress,
    ctx: &mut TsiContext,
    opts: RunOptions,
) -> WaveOutcome {
    let Some(first) = hops.first() else {
        return WaveOutcome {
            steps: 0,
            error: None,
        };
    };

    let metas: Vec<NodeMeta> = nodes.iter().map(|n| NodeMeta::capture(n.as_ref())).collect();
    let mut queue: VecDeque<RuntimeEvent> = VecDeque::new();
    queue.push_back(RuntimeEvent {
        node: first.from.node,
        wave: wave0,
        ingress: start,
    });

    let mut steps = 0u64;
    let mut error: Option<RunError> = None;

    while let Some(ev) = queue.pop_front() {
        let mut emitter = CircuitEmitter {
            hops,
            metas: &metas,
            queue: &mut queue,
            capacity: opts.capacity,
            src: ev.node,
            emits_this_step: 0,
            in_meta_emit: false,
            overflowed: false,
        };
        emitter.trace_step(ev.node, ev.wave, &ev.ingress);

        let result = nodes[ev.node.0].step(ev.wave, ev.ingress, ctx, &mut emitter);
        emitter.trace_step_done(ev.node, ev.wave);
        let overflowed = emitter.overflowed;
        steps += 1;

        if let Err(e) = result {
            error = Some(RunError::Step(e));
            queue.clear();
            break;
        }
        if overflowed {
            error = Some(RunError::QueueFull {
                capacity: opts.capacity.unwrap_or(0),
                wave_id: ev.wave.id,
            });
            queue.clear();
            break;
        }
    }

    WaveOutcome { steps, error }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuits::Endpoint;
    use crate::directives::PayloadKind;
    use crate::nodes::{SinkBuffer, TextFanSource, TextTransform};

    fn hop(from: usize, to: usize) -> Hop {
        Hop {
            from: Endpoint {
                node: NodeIdx(from),
                directive: DirectiveId::Payload,
            },
            to: Endpoint {
                node: NodeIdx(to),
                directive: DirectiveId::Payload,
            },
        }
    }

    fn build_chain() -> (Vec<Box<dyn Tsi>>, Vec<Hop>) {
        let nodes: Vec<Box<dyn Tsi>> = vec![
            Box::new(TextFanSource::new(1, "src")),
            Box::new(TextTransform::new(2, "map")),
            Box::new(SinkBuffer::new(3, "sink", PayloadKind::String, 64)),
        ];
        (nodes, vec![hop(0, 1), hop(1, 2)])
    }

    fn sink_items(nodes: &[Box<dyn Tsi>], idx: usize) -> Vec<(Wave, String)> {
        // Test-only inspection through the concrete node type.
        let any = nodes[idx].as_ref();
        let sink = any
            .as_any()
            .downcast_ref::<SinkBuffer>()
            .expect("sink node");
        sink.items()
            .iter()
            .map(|(w, s)| (*w, s.as_text().unwrap_or_default().to_string()))
            .collect()
    }

    #[test]
    fn wave_flows_in_emission_order() {
        let (mut nodes, hops) = build_chain();
        let mut ctx = TsiContext::default();
        let outcome = run_wave(
            &mut nodes,
            &hops,
            Wave { id: 7, i: 0 },
            Ingress {
                directive: DirectiveId::Payload,
                signal: string_signal("alpha beta gamma"),
            },
            &mut ctx,
            RunOptions::default(),
        );
        assert!(outcome.is_ok());
        // 1 source step + 3 map steps + 3 sink steps.
        assert_eq!(outcome.steps, 7);

        let items = sink_items(&nodes, 2);
        let texts: Vec<&str> = items.iter().map(|(_, s)| s.as_str()).collect();
        assert_eq!(texts, vec!["ALPHA", "BETA", "GAMMA"]);
        // Wave identity preserved, item index incremented by the source.
        assert_eq!(items[0].0, Wave { id: 7, i: 0 });
        assert_eq!(items[2].0, Wave { id: 7, i: 2 });
    }

    #[test]
    fn broadcast_reaches_every_matching_hop() {
        let nodes: Vec<Box<dyn Tsi>> = vec![
            Box::new(TextFanSource::new(1, "src")),
            Box::new(SinkBuffer::new(2, "sink_a", PayloadKind::String, 8)),
            Box::new(SinkBuffer::new(3, "sink_b", PayloadKind::String, 8)),
        ];
        let hops = vec![hop(0, 1), hop(0, 2)];
        let mut nodes = nodes;
        let mut ctx = TsiContext::default();
        let outcome = run_wave(
            &mut nodes,
            &hops,
            Wave::default(),
            Ingress {
                directive: DirectiveId::Payload,
                signal: string_signal("only"),
            },
            &mut ctx,
            RunOptions::default(),
        );
        assert!(outcome.is_ok());
        assert_eq!(sink_items(&nodes, 1).len(), 1);
        assert_eq!(sink_items(&nodes, 2).len(), 1);
    }

    #[test]
    fn bounded_queue_overflow_terminates_wave() {
        let (mut nodes, hops) = build_chain();
        let mut ctx = TsiContext::default();
        let outcome = run_wave(
            &mut nodes,
            &hops,
            Wave::default(),
            Ingress {
                directive: DirectiveId::Payload,
                signal: string_signal("a b c d e f g h"),
            },
            &mut ctx,
            RunOptions { capacity: Some(2) },
        );
        assert!(matches!(outcome.error, Some(RunError::QueueFull { .. })));
    }

    #[test]
    fn step_error_drains_queue_and_reports_steps() {
        struct Failing;
        impl Tsi for Failing {
            fn type_name(&self) -> &str {
                "tsi.map.fail"
            }
            fn instance_name(&self) -> &str {
                "boom"
            }
            fn id(&self) -> u64 {
                9
            }
            fn as_any(&self) -> &dyn std::any::Any {
                self
            }
            fn directives(&self) -> &[DirectiveSpec] {
                use crate::directives::{DirectiveDir, directive};
                const D: [DirectiveSpec; 2] = [
                    directive(
                        DirectiveId::Payload,
                        DirectiveDir::In,
                        PayloadKind::String,
                        "",
                    ),
                    directive(
                        DirectiveId::Payload,
                        DirectiveDir::Out,
                        PayloadKind::String,
                        "",
                    ),
                ];
                &D
            }
            fn step(
                &mut self,
                _wave: Wave,
                _ingress: Ingress,
                _ctx: &mut TsiContext,
                _out: &mut dyn Emitter,
            ) -> Result<(), StepError> {
                Err(StepError::new("boom", "induced"))
            }
        }

        let mut nodes: Vec<Box<dyn Tsi>> = vec![
            Box::new(TextFanSource::new(1, "src")),
            Box::new(Failing),
            Box::new(SinkBuffer::new(3, "sink", PayloadKind::String, 8)),
        ];
        let hops = vec![hop(0, 1), hop(1, 2)];
        let mut ctx = TsiContext::default();
        let outcome = run_wave(
            &mut nodes,
            &hops,
            Wave::default(),
            Ingress {
                directive: DirectiveId::Payload,
                signal: string_signal("x y"),
            },
            &mut ctx,
            RunOptions::default(),
        );
        // Source step + the first failing step.
        assert_eq!(outcome.steps, 2);
        assert!(matches!(outcome.error, Some(RunError::Step(_))));
        assert!(sink_items(&nodes, 2).is_empty());
    }
}
