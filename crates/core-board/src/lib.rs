//! Board instructions: the DSL surface
//!
//! ```text
//! circuit <name> =
//!   <alias> = <tsi_type>
//!   <alias>@<directive>:<kind> -> <alias>@<directive>:<kind>
//!   <invoke_name>("<payload>")
//! ```
//!
//! decoded into [`BoardInstruction`] structures, semantically validated
//! (unique aliases, single root, acyclicity, sink termination) and
//! instantiated into a runnable [`core_tsi::Board`].

pub mod decode;
pub mod model;
pub mod validate;

pub use decode::{BOARD_GRAMMAR, BoardDecoder};
pub use model::{
    BoardInstruction, CircuitDecl, EndpointDecl, HopDecl, InstanceDecl, ResolvedEndpoint,
    ResolvedHop, invoke_symbol, parse_directive_ref, parse_kind_ref, resolve_hop_decl,
    resolve_hops,
};
pub use validate::{
    NodeFactory, instantiate_board, validate_board_instruction, validate_circuit_decl,
};
