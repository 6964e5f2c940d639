//! Sink scanning and finding assembly.
//!
//! Walks each root function's basic blocks in order, classifies every call
//! instruction against the configured sinks, and asks the oracle about
//! each checked argument. One finding at most per sink call: scanning
//! short-circuits at the first tainted argument.
//!
//! Classification order matters and is fixed: interface-dispatched method
//! calls are matched first (pointer-ness ignored, two keyed lookups), then
//! statically resolved callees (exact pointer-ness required).

use rustc_hash::FxHashSet;
use tracing::{debug, trace};

use super::finding::Finding;
use super::{Pass, Visited};
use crate::config::Sink;
use crate::ssa::{CallExpr, CallTarget, FuncId, Instr, ValueKind};

impl<'a> Pass<'a> {
    /// Scan one function for sink calls with tainted arguments.
    pub(crate) fn scan_function(&self, func: FuncId) -> Vec<Finding> {
        let f = self.func(func);
        if !f.has_body() {
            return Vec::new();
        }

        let mut findings = Vec::new();

        for block in &f.blocks {
            for instr in &block.instrs {
                let Instr::Value(v) = *instr else { continue };
                let ValueKind::Call(call) = &f.value(v).kind else {
                    continue;
                };
                let Some(sink) = self.match_sink(call) else {
                    continue;
                };

                trace!(sink = %sink.key(), at = %f.value(v).pos, "matched sink call");

                // Which argument positions to inspect: the declaration's
                // list verbatim, or every argument when it is empty.
                let args_to_check: Vec<_> = if sink.check_args.is_empty() {
                    call.args.clone()
                } else {
                    sink.check_args
                        .iter()
                        .filter_map(|&idx| call.args.get(idx).copied())
                        .collect()
                };

                for arg in args_to_check {
                    let mut visited = Visited::default();
                    if self.is_tainted(func, arg, &mut visited, 0) {
                        debug!(
                            sink = %sink.key(),
                            function = %f.symbol_key(),
                            "tainted data reaches sink"
                        );
                        findings.push(Finding {
                            rule: self.rule.cloned(),
                            sink: sink.clone(),
                            location: f.value(v).pos.clone(),
                            path: self.build_path(func),
                        });
                        break;
                    }
                }
            }
        }

        findings
    }

    /// Classify a call against the configured sinks.
    fn match_sink(&self, call: &CallExpr) -> Option<&'a Sink> {
        match &call.target {
            // Interface dispatch: the descriptor carries package, receiver
            // type, and method name; pointer-ness is not observable at the
            // call site, so both encodings are tried.
            CallTarget::Invoke(method) => {
                let plain = format!(
                    "({}.{}).{}",
                    method.package, method.receiver, method.method
                );
                if let Some(sink) = self.index.sink(&plain) {
                    return Some(sink);
                }
                let pointer = format!(
                    "(*{}.{}).{}",
                    method.package, method.receiver, method.method
                );
                self.index.sink(&pointer)
            }

            // Static callee: its symbol key carries the exact receiver
            // shape, so a single lookup suffices.
            CallTarget::Static(callee) => self.index.sink(&self.func(*callee).symbol_key()),

            CallTarget::Indirect(_) | CallTarget::Builtin(_) => None,
        }
    }

    /// Reconstruct a call path from a root entry function down to `func`
    /// by walking in-edges upward, taking the first caller at each step.
    /// Purely informational; cycles terminate the walk.
    pub(crate) fn build_path(&self, func: FuncId) -> Vec<String> {
        let mut path = vec![self.func(func).symbol_key()];

        let Some(graph) = self.graph.as_deref() else {
            return path;
        };

        let mut visited = FxHashSet::default();
        let mut current = func;

        loop {
            if !visited.insert(current) {
                break;
            }
            let callers = graph.callers(current);
            let Some(edge) = callers.first() else { break };
            path.insert(0, self.func(edge.caller).symbol_key());
            current = edge.caller;
        }

        path
    }
}

// =============================================================================
// Tests
// =============================================================================
