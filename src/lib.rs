//! taintflow - interprocedural taint analysis over SSA form.
//!
//! A security-oriented static analysis core: given a package in SSA form
//! and a taint policy, it detects data-flow vulnerabilities by tracing
//! tainted values from configured **sources** (untrusted inputs) to
//! configured **sinks** (dangerous operations), optionally interrupted by
//! **sanitizers**.
//!
//! # Architecture
//!
//! - [`ssa`] - the SSA program model the engine consumes and the
//!   [`ProgramBuilder`](ssa::ProgramBuilder) hosts use to produce it
//! - [`config`] - source/sink/sanitizer declarations, indexed into O(1)
//!   lookup tables; built-in policies under [`config::presets`]
//! - [`callgraph`] - class-hierarchy call graph with a per-package,
//!   once-only build cache
//! - [`taint`] - the engine itself: sink scanner, taint oracle,
//!   field-sensitive struct analysis, and return-reachability checks
//!
//! The engine leans toward soundness with documented conservative
//! trade-offs: unknown constructs, exhausted recursion budgets, and
//! revisited values all report *untainted*, preferring false negatives
//! over analyzer aborts. It never panics on well-formed programs and
//! always hands the host a verdict.
//!
//! # Example
//!
//! ```
//! use taintflow::config::presets;
//! use taintflow::ssa::{FunctionBuilder, Location, ProgramBuilder, TypeRef};
//! use taintflow::taint::Analyzer;
//!
//! // handler(db *sql.DB) { db.Query(os.Getenv("QUERY")) }
//! let mut pb = ProgramBuilder::new("app");
//! let getenv = pb.declare_external("os", "Getenv");
//! let query = pb.declare_method("database/sql", "DB", true, "Query");
//! let handler = pb.declare_function("handler");
//!
//! let mut fb = FunctionBuilder::new();
//! let db = fb.param(TypeRef::pointer_to("database/sql", "DB"));
//! let key = fb.constant();
//! let env = fb.call_static(getenv, vec![key]);
//! fb.at(Location::new("handler.go", 7, 2));
//! fb.call_static(query, vec![db, env]);
//! fb.ret(vec![]);
//! pb.set_body(handler, fb);
//! let program = pb.finish();
//!
//! let analyzer = Analyzer::new(&presets::sql_injection()).unwrap();
//! let findings = analyzer.analyze(&program, &program.source_functions());
//! assert_eq!(findings.len(), 1);
//! assert_eq!(findings[0].sink.key(), "(*database/sql.DB).Query");
//! ```

pub mod callgraph;
pub mod config;
pub mod error;
pub mod ssa;
pub mod taint;

pub use callgraph::{CallGraph, PackageAnalysisCache};
pub use config::{Sanitizer, Sink, Source, TaintPolicy};
pub use error::{Result, TaintflowError};
pub use ssa::{FuncId, FunctionBuilder, GlobalId, Location, Program, ProgramBuilder, TypeRef};
pub use taint::{analyze_packages, Analyzer, Finding, Rule, Severity};
