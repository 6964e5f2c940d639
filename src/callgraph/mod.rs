//! Class-hierarchy call graph construction.
//!
//! Builds a package-wide call graph from SSA by walking every call site:
//!
//! - static call sites contribute one edge to their concrete callee;
//! - interface-dispatched sites contribute one edge to every method whose
//!   name matches the dispatch descriptor, the class-hierarchy-analysis
//!   over-approximation. CHA is fast and sound for this use (no missed
//!   callers) at the cost of spurious edges.
//!
//! The graph is immutable once built. In-edge lists preserve the order in
//! which call sites were encountered, so first-caller walks are
//! deterministic for a fixed program.
//!
//! # Components
//!
//! - [`CallGraph`] - nodes per function, in-edges carrying the call site
//! - [`cache`] - per-package memoization so concurrent analyzer passes
//!   share one build

pub mod cache;

pub use cache::PackageAnalysisCache;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::ssa::{CallTarget, FuncId, Instr, Program, ValueId, ValueKind};

/// An edge in the call graph: a call site in `caller` that may dispatch to
/// the edge's target function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSiteEdge {
    /// Function containing the call site.
    pub caller: FuncId,
    /// The call value inside the caller's arena.
    pub site: ValueId,
}

/// A call graph over the functions of one package's SSA program.
#[derive(Debug, Default)]
pub struct CallGraph {
    /// Callee -> ordered list of call sites that may reach it.
    in_edges: FxHashMap<FuncId, Vec<CallSiteEdge>>,
}

impl CallGraph {
    /// Build the graph for a program using class hierarchy analysis.
    pub fn build(program: &Program) -> Self {
        let mut in_edges: FxHashMap<FuncId, Vec<CallSiteEdge>> = FxHashMap::default();

        for (i, func) in program.functions.iter().enumerate() {
            let caller = FuncId(i as u32);
            for block in &func.blocks {
                for instr in &block.instrs {
                    let Instr::Value(site) = *instr else { continue };
                    let ValueKind::Call(call) = &func.value(site).kind else {
                        continue;
                    };
                    match &call.target {
                        CallTarget::Static(callee) => {
                            in_edges
                                .entry(*callee)
                                .or_default()
                                .push(CallSiteEdge { caller, site });
                        }
                        CallTarget::Invoke(method) => {
                            // CHA: any method with a matching name may be
                            // the runtime target.
                            for (j, candidate) in program.functions.iter().enumerate() {
                                if candidate.receiver.is_some() && candidate.name == method.method {
                                    in_edges
                                        .entry(FuncId(j as u32))
                                        .or_default()
                                        .push(CallSiteEdge { caller, site });
                                }
                            }
                        }
                        CallTarget::Indirect(_) | CallTarget::Builtin(_) => {}
                    }
                }
            }
        }

        debug!(
            package = %program.package,
            functions = program.functions.len(),
            "built CHA call graph"
        );

        Self { in_edges }
    }

    /// Call sites that may reach `callee`, in discovery order. Empty for
    /// functions nothing in the package calls.
    #[inline]
    pub fn callers(&self, callee: FuncId) -> &[CallSiteEdge] {
        self.in_edges
            .get(&callee)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

// =============================================================================
// Tests
// =============================================================================
