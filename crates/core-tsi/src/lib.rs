//! tsiemene dataflow runtime: typed processing nodes ("TSIs") wired into
//! single-rooted acyclic circuits, driven by wave-tagged tokens.
//!
//! The runtime is single-threaded cooperative: [`runtime::run_wave`] pops one
//! event at a time from a FIFO queue, calls the target node's `step`, and
//! queues whatever it emitted. Broadcast, type compatibility and sink
//! termination are established by [`circuits::validate`] before anything
//! runs.

pub mod board;
pub mod circuits;
pub mod directives;
pub mod nodes;
pub mod runtime;
pub mod tsi;
pub mod waves;

pub use board::{Board, BoardCircuit, BoardIssue, pick_start_directive, run_board, run_circuit, validate_board};
pub use circuits::{Circuit, CircuitIssue, Endpoint, Hop, NodeIdx, find_directive, validate};
pub use directives::{
    CompatIssue, DirectiveDir, DirectiveId, DirectiveSpec, PayloadKind, SINK_TYPE_PREFIX,
    compatible, directive,
};
pub use nodes::{SinkBuffer, TextFanSource, TextTransform};
pub use runtime::{RunError, RunOptions, WaveOutcome, run_wave};
pub use tsi::{Determinism, Emitter, Ingress, StepError, Tsi, TsiContext, TsiId};
pub use waves::{Signal, TensorData, Wave, WaveId, string_signal, tensor_signal};
