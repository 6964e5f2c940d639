//! Per-package analysis caching.
//!
//! Building a call graph is the one expensive step shared by every
//! analyzer pass over a package. [`PackageAnalysisCache`] guards the build
//! behind a one-time initialization primitive: no matter how many worker
//! threads race on first use, exactly one performs the build and every
//! reader observes the same immutable graph afterwards.
//!
//! When the underlying SSA is absent or has no functions, the accessor
//! reports that without attempting a build; callers treat the absent graph
//! as "no interprocedural context available".

use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::debug;

use super::CallGraph;
use crate::ssa::Program;

/// Shared, lazily initialized analysis artifacts for one package.
#[derive(Debug)]
pub struct PackageAnalysisCache<'p> {
    program: Option<&'p Program>,
    call_graph: OnceCell<Option<Arc<CallGraph>>>,
}

impl<'p> PackageAnalysisCache<'p> {
    /// Create a cache for a package's SSA program.
    pub fn new(program: &'p Program) -> Self {
        Self {
            program: Some(program),
            call_graph: OnceCell::new(),
        }
    }

    /// Create a cache with no SSA available; the call graph accessor will
    /// always report absence.
    pub fn absent() -> Self {
        Self {
            program: None,
            call_graph: OnceCell::new(),
        }
    }

    /// The package's call graph, built on first request.
    ///
    /// Safe for concurrent use: the first caller builds, peers block until
    /// publication, and every subsequent call is a non-blocking read of the
    /// same instance. Returns `None` when the SSA program is missing or has
    /// no functions.
    pub fn call_graph(&self) -> Option<Arc<CallGraph>> {
        self.call_graph
            .get_or_init(|| {
                let program = self.program?;
                if program.functions.is_empty() {
                    debug!(package = %program.package, "no functions, skipping call graph build");
                    return None;
                }
                Some(Arc::new(CallGraph::build(program)))
            })
            .clone()
    }
}

// =============================================================================
// Tests
// =============================================================================
