//! SSA program model and construction.
//!
//! The analysis engine consumes a whole-package intermediate representation
//! in which every variable is assigned exactly once and control-flow joins
//! are phi nodes. This module defines that representation ([`types`]) and
//! the API hosts use to produce it ([`builder`]).
//!
//! # Components
//!
//! - [`types`] - arenas, the closed [`ValueKind`] sum type, functions,
//!   globals, referrer lists
//! - [`builder`] - two-phase [`ProgramBuilder`] / [`FunctionBuilder`]
//!   ingestion API

pub mod builder;
pub mod types;

pub use builder::{FunctionBuilder, ProgramBuilder};
pub use types::{
    Block, CallExpr, CallTarget, FuncId, Function, Global, GlobalId, Instr, Location, MethodRef,
    Program, ReceiverInfo, Referrer, TypeRef, Value, ValueId, ValueKind,
};
