//! Interprocedural taint analysis engine.
//!
//! Traces data flow from configured sources (untrusted inputs) to
//! configured sinks (dangerous operations), optionally interrupted by
//! sanitizers, over a package's SSA program and its CHA call graph.
//!
//! # Architecture
//!
//! One [`Analyzer`] owns an indexed policy and is immutable after
//! construction, so any number of packages can be analyzed with it
//! concurrently. Each `analyze` call creates a private pass holding the
//! program and the shared call graph; all per-query state (visited sets,
//! depth counters) lives on the stack of a single query and never escapes
//! it.
//!
//! The engine is split by concern:
//!
//! - `scanner` walks basic blocks looking for sink calls and assembles
//!   findings with caller-chain paths
//! - `oracle` answers "is this SSA value tainted?", recursing through
//!   value producers and across call-graph edges at parameters
//! - `field` decides taint for one struct field rather than the whole
//!   struct, tracing constructor bodies when available
//! - `interproc` checks whether tainted arguments actually influence a
//!   callee's return values
//!
//! # Termination
//!
//! Phi nodes make SSA data flow cyclic. Every recursive entry point
//! threads an identity-keyed visited set and a depth counter; on a revisit
//! or when the depth bound is exceeded the query fails closed (*not
//! tainted*). Bounds: [`MAX_TAINT_DEPTH`] for the oracle,
//! [`MAX_REACH_DEPTH`] for the return-reachability sub-analysis.
//!
//! # Example
//!
//! ```
//! use taintflow::config::presets;
//! use taintflow::taint::Analyzer;
//! use taintflow::ssa::ProgramBuilder;
//!
//! let analyzer = Analyzer::new(&presets::sql_injection()).unwrap();
//! let program = ProgramBuilder::new("app").finish();
//! let findings = analyzer.analyze(&program, &[]);
//! assert!(findings.is_empty());
//! ```

pub mod finding;
mod field;
mod interproc;
mod oracle;
mod scanner;

pub use finding::{Finding, Rule, Severity};

use std::sync::Arc;

use rayon::prelude::*;
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::callgraph::{CallGraph, PackageAnalysisCache};
use crate::config::{PolicyIndex, TaintPolicy};
use crate::error::Result;
use crate::ssa::{FuncId, Function, Program, Value, ValueId};

/// Recursion bound for the taint oracle. Prevents stack exhaustion on
/// pathological data-flow graphs; queries that exceed it report untainted.
pub const MAX_TAINT_DEPTH: u32 = 50;

/// Recursion bound for the intrafunction return-reachability search.
pub const MAX_REACH_DEPTH: u32 = 30;

/// Identity-keyed visited set for one outermost oracle query.
pub(crate) type Visited = FxHashSet<(FuncId, ValueId)>;

// =============================================================================
// Analyzer
// =============================================================================

/// Taint analyzer: an indexed policy plus optional rule metadata.
///
/// Immutable after construction; safe to share across worker threads.
#[derive(Debug)]
pub struct Analyzer {
    index: PolicyIndex,
    rule: Option<Rule>,
}

impl Analyzer {
    /// Create an analyzer from a policy.
    ///
    /// Fails with [`crate::TaintflowError::InvalidPolicy`] when two
    /// declarations collide on a key with differing semantics.
    pub fn new(policy: &TaintPolicy) -> Result<Self> {
        Ok(Self {
            index: PolicyIndex::new(policy)?,
            rule: None,
        })
    }

    /// Attach rule metadata carried onto every finding.
    #[must_use]
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rule = Some(rule);
        self
    }

    /// Analyze one package, building its call graph privately.
    ///
    /// `roots` is the set of entry functions to scan for sink calls,
    /// typically [`Program::source_functions`]. Never fails; empty roots
    /// yield an empty finding list.
    pub fn analyze(&self, program: &Program, roots: &[FuncId]) -> Vec<Finding> {
        let cache = PackageAnalysisCache::new(program);
        self.analyze_with_cache(program, roots, &cache)
    }

    /// Analyze one package against a shared [`PackageAnalysisCache`], so
    /// multiple analyzers over the same package reuse one call graph.
    pub fn analyze_with_cache(
        &self,
        program: &Program,
        roots: &[FuncId],
        cache: &PackageAnalysisCache<'_>,
    ) -> Vec<Finding> {
        if roots.is_empty() {
            return Vec::new();
        }

        debug!(package = %program.package, roots = roots.len(), "starting taint analysis");

        let pass = Pass {
            program,
            index: &self.index,
            graph: cache.call_graph(),
            rule: self.rule.as_ref(),
        };

        roots
            .iter()
            .flat_map(|&f| pass.scan_function(f))
            .collect()
    }
}

/// Analyze several packages on the rayon worker pool, one shared cache per
/// package, concatenating findings. Within a package the analysis stays
/// single-threaded.
pub fn analyze_packages(analyzer: &Analyzer, packages: &[(&Program, Vec<FuncId>)]) -> Vec<Finding> {
    packages
        .par_iter()
        .flat_map(|(program, roots)| analyzer.analyze(program, roots))
        .collect()
}

// =============================================================================
// Per-analysis Pass
// =============================================================================

/// State for one package analysis: the program, the shared call graph, and
/// the immutable policy tables. Created per `analyze` call and dropped with
/// it.
pub(crate) struct Pass<'a> {
    pub(crate) program: &'a Program,
    pub(crate) index: &'a PolicyIndex,
    pub(crate) graph: Option<Arc<CallGraph>>,
    pub(crate) rule: Option<&'a Rule>,
}

impl<'a> Pass<'a> {
    #[inline]
    pub(crate) fn func(&self, id: FuncId) -> &'a Function {
        self.program.func(id)
    }

    #[inline]
    pub(crate) fn value(&self, func: FuncId, id: ValueId) -> &'a Value {
        self.program.func(func).value(id)
    }
}

// =============================================================================
// Tests
// =============================================================================
