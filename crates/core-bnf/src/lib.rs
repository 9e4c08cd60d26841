//! Hand-written BNF toolchain: lexer, grammar parser, instruction parser.
//!
//! A grammar document is a sequence of productions
//!
//! ```text
//! <instruction> ::= { <circuit> } ;
//! <circuit>     ::= "circuit" /[A-Za-z_][A-Za-z0-9_.]*/ "=" ... ;
//! ```
//!
//! with `<name>` non-terminals, `"…"` escaped terminals, `'…'` literal
//! terminals, `/…/` regex terminals and the meta groups `[ ]` (optional),
//! `{ }` (repetition), `( )` (grouping) and `|` (alternation). The first
//! declared rule is the start symbol unless overridden via
//! [`Grammar::with_start`].
//!
//! Instructions are parsed against a compiled [`Grammar`] by predictive
//! recursive descent with an explicit cursor save/restore for alternation
//! backtracking; no exceptions-as-control-flow, failures surface as
//! [`ParseError`] with the furthest offset and the expected set.

pub mod ast;
pub mod diag;
pub mod grammar;
pub mod lexer;
pub mod parser;

pub use ast::{
    AstNode, IntermediaryNode, RootNode, SiteHash, TerminalNode, Visitor, WalkContext,
    find_child_by_site, flatten_terminals, site_hash, walk,
};
pub use diag::Diagnostics;
pub use grammar::{Alternative, Grammar, GrammarError, MetaKind, ProductionUnit, parse_grammar};
pub use lexer::{LexError, Lexer, Token, UnitKind};
pub use parser::{InstructionParser, ParseError};
