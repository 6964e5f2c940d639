//! The taint oracle: is a given SSA value tainted?
//!
//! Answers by recursing through the value's producers. Type-based source
//! matching is applied ONLY to function parameters and globals; locally
//! constructed values of source types (e.g. a request object built with
//! hardcoded inputs) are not automatically tainted - their taintedness
//! depends on the data flowing into them.
//!
//! Parameters delegate to the caller resolver, which walks call-graph
//! in-edges and asks whether any caller passes tainted data at the same
//! argument position. Free variables resolve against the closure bindings
//! of the enclosing function.

use tracing::trace;

use super::{Pass, Visited, MAX_TAINT_DEPTH};
use crate::ssa::{CallExpr, CallTarget, FuncId, Instr, Referrer, ValueId, ValueKind};

impl<'a> Pass<'a> {
    /// Whether value `v`, observed in `func`, carries tainted data.
    ///
    /// Fails closed: revisited values, exhausted depth, and unrecognized
    /// producers all report untainted.
    pub(crate) fn is_tainted(
        &self,
        func: FuncId,
        v: ValueId,
        visited: &mut Visited,
        depth: u32,
    ) -> bool {
        if depth > MAX_TAINT_DEPTH {
            return false;
        }

        // Phi nodes induce cycles; never revisit a value within one query.
        if !visited.insert((func, v)) {
            return false;
        }

        match &self.value(func, v).kind {
            ValueKind::Param { .. } => self.is_parameter_tainted(func, v, visited, depth + 1),

            ValueKind::Call(call) => self.is_call_tainted(func, call, visited, depth),

            // Field access on a struct: decide for this specific field
            // instead of conflating it with the whole struct.
            ValueKind::FieldAddr { .. } => {
                self.is_field_access_tainted(func, v, visited, depth + 1)
            }

            ValueKind::IndexAddr { x, .. }
            | ValueKind::UnOp { x }
            | ValueKind::Convert { x }
            | ValueKind::ChangeType { x }
            | ValueKind::TypeAssert { x }
            | ValueKind::MakeInterface { x }
            | ValueKind::SliceOp { x }
            | ValueKind::Lookup { x, .. } => self.is_tainted(func, *x, visited, depth + 1),

            ValueKind::Extract { tuple, .. } => self.is_tainted(func, *tuple, visited, depth + 1),

            ValueKind::BinOp { x, y } => {
                self.is_tainted(func, *x, visited, depth + 1)
                    || self.is_tainted(func, *y, visited, depth + 1)
            }

            ValueKind::Phi { edges } => edges
                .iter()
                .any(|&edge| self.is_tainted(func, edge, visited, depth + 1)),

            ValueKind::Alloc => self.is_alloc_tainted(func, v, visited, depth),

            ValueKind::MakeSlice => self.is_make_slice_tainted(func, v, visited, depth),

            // Globals are tainted only when configured as a source.
            ValueKind::Global(g) => {
                let key = self.program.global(*g).key();
                self.index.source(&key).is_some()
            }

            ValueKind::FreeVar { .. } => self.is_free_var_tainted(func, v, visited, depth + 1),

            ValueKind::Const | ValueKind::MakeMap | ValueKind::MakeChan => false,

            // Unhandled kinds: stay conservative and do not propagate,
            // trading possible false negatives for fewer false positives.
            ValueKind::MakeClosure { .. } => false,
        }
    }

    /// Taint of a call's result.
    fn is_call_tainted(
        &self,
        func: FuncId,
        call: &CallExpr,
        visited: &mut Visited,
        depth: u32,
    ) -> bool {
        // Sanitizers break the taint chain no matter what flows in, and
        // they win over a simultaneous source-function match.
        if self.is_sanitizer_call(call) {
            trace!("sanitizer call stops taint propagation");
            return false;
        }

        // Known source functions produce tainted output unconditionally.
        if self.is_source_func_call(call) {
            return true;
        }

        match &call.target {
            // Interface dispatch: taint flows out when the receiver or any
            // explicit argument is tainted. This covers chains like
            // req.URL.Query().Get("param") on a tainted request.
            CallTarget::Invoke(_) => {
                if let Some(&recv) = call.args.first() {
                    if self.is_tainted(func, recv, visited, depth + 1) {
                        return true;
                    }
                }
                call.args
                    .iter()
                    .skip(1)
                    .any(|&arg| self.is_tainted(func, arg, visited, depth + 1))
            }

            CallTarget::Static(callee_id) => {
                let callee = self.func(*callee_id);
                if callee.receiver.is_some() {
                    // Static method call: receiver is args[0].
                    if let Some(&recv) = call.args.first() {
                        if self.is_tainted(func, recv, visited, depth + 1) {
                            return true;
                        }
                    }
                    if callee.has_body() {
                        // Internal method: only report taint that actually
                        // reaches a return value.
                        self.tainted_args_flow_to_return(func, call, *callee_id, visited, depth + 1)
                    } else {
                        // External method: conservatively propagate any
                        // tainted non-receiver argument.
                        call.args
                            .iter()
                            .skip(1)
                            .any(|&arg| self.is_tainted(func, arg, visited, depth + 1))
                    }
                } else if callee.has_body() {
                    self.tainted_args_flow_to_return(func, call, *callee_id, visited, depth + 1)
                } else {
                    // External function: any tainted argument taints the
                    // result. Correct for stdlib data transformations
                    // (string ops, fmt, ...).
                    call.args
                        .iter()
                        .any(|&arg| self.is_tainted(func, arg, visited, depth + 1))
                }
            }

            // Calls through function values are not tracked; the callee is
            // unknowable without pointer analysis.
            CallTarget::Indirect(_) => false,

            // Intrinsics (append, copy, string conversion, ...) pass taint
            // through from any argument.
            CallTarget::Builtin(_) => call
                .args
                .iter()
                .any(|&arg| self.is_tainted(func, arg, visited, depth + 1)),
        }
    }

    /// Allocation taint: any store writing a tainted value into the cell,
    /// directly or through an indexed address (e.g. variadic element
    /// stores).
    fn is_alloc_tainted(&self, func: FuncId, v: ValueId, visited: &mut Visited, depth: u32) -> bool {
        let f = self.func(func);
        for referrer in f.referrers(v) {
            if let Referrer::Store { val, .. } = referrer {
                if self.is_tainted(func, *val, visited, depth + 1) {
                    return true;
                }
            }
            if let Referrer::Value(user) = referrer {
                if let ValueKind::IndexAddr { .. } = f.value(*user).kind {
                    for index_ref in f.referrers(*user) {
                        if let Referrer::Store { val, .. } = index_ref {
                            if self.is_tainted(func, *val, visited, depth + 1) {
                                return true;
                            }
                        }
                    }
                }
            }
        }
        false
    }

    /// MakeSlice taint: populated by a tainted store, or used in a call
    /// alongside a tainted non-self argument (e.g. append).
    fn is_make_slice_tainted(
        &self,
        func: FuncId,
        v: ValueId,
        visited: &mut Visited,
        depth: u32,
    ) -> bool {
        let f = self.func(func);
        for referrer in f.referrers(v) {
            match referrer {
                Referrer::Store { val, .. } => {
                    if self.is_tainted(func, *val, visited, depth + 1) {
                        return true;
                    }
                }
                Referrer::Value(user) => {
                    if let ValueKind::Call(call) = &f.value(*user).kind {
                        for &arg in &call.args {
                            if arg == v {
                                continue;
                            }
                            if self.is_tainted(func, arg, visited, depth + 1) {
                                return true;
                            }
                        }
                    }
                }
            }
        }
        false
    }

    // =========================================================================
    // Parameter / caller resolution
    // =========================================================================

    /// Whether a function parameter receives tainted data.
    ///
    /// A parameter is tainted if its declared type matches a configured
    /// source type, or if any caller passes tainted data at the
    /// corresponding argument position.
    pub(crate) fn is_parameter_tainted(
        &self,
        func: FuncId,
        param: ValueId,
        visited: &mut Visited,
        depth: u32,
    ) -> bool {
        if depth > MAX_TAINT_DEPTH {
            return false;
        }

        // The ONLY place where type-based source matching triggers
        // automatic taint: parameters represent data flowing in from
        // callers we do not control.
        if self.index.matches_source_type(&self.value(func, param).ty) {
            return true;
        }

        let Some(graph) = self.graph.as_deref() else {
            return false;
        };

        let Some(param_idx) = self.func(func).param_index(param) else {
            return false;
        };

        // Receiver-at-args[0] holds for every call mode, so the parameter
        // position maps directly onto the caller's argument vector.
        for edge in graph.callers(func) {
            let ValueKind::Call(call) = &self.value(edge.caller, edge.site).kind else {
                continue;
            };
            if let Some(&arg) = call.args.get(param_idx) {
                if self.is_tainted(edge.caller, arg, visited, depth + 1) {
                    return true;
                }
            }
        }

        false
    }

    // =========================================================================
    // Free variable resolution
    // =========================================================================

    /// Whether a closure's free variable is tainted, by locating the
    /// closure-creation site in the enclosing function and recursing on
    /// the binding at the matching index.
    pub(crate) fn is_free_var_tainted(
        &self,
        func: FuncId,
        fv: ValueId,
        visited: &mut Visited,
        depth: u32,
    ) -> bool {
        if depth > MAX_TAINT_DEPTH {
            return false;
        }

        let f = self.func(func);
        let Some(parent_id) = f.parent else {
            return false;
        };
        let parent = self.func(parent_id);

        for block in &parent.blocks {
            for instr in &block.instrs {
                let Instr::Value(mc) = *instr else { continue };
                let ValueKind::MakeClosure { func: closed, bindings } = &parent.value(mc).kind
                else {
                    continue;
                };
                if *closed != func {
                    continue;
                }
                // Bindings correspond to the closure's free variables in
                // the same order.
                for (i, &binding) in bindings.iter().enumerate() {
                    if f.free_vars.get(i) == Some(&fv) {
                        return self.is_tainted(parent_id, binding, visited, depth + 1);
                    }
                }
            }
        }

        false
    }

    // =========================================================================
    // Call classification helpers
    // =========================================================================

    /// Whether a call invokes a configured sanitizer. Only statically
    /// dispatched callees can match.
    pub(crate) fn is_sanitizer_call(&self, call: &CallExpr) -> bool {
        if !self.index.has_sanitizers() {
            return false;
        }
        let Some(callee) = call.static_callee() else {
            return false;
        };
        self.index.is_sanitizer(&self.func(callee).symbol_key())
    }

    /// Whether a call invokes a configured source function (e.g.
    /// `os.Getenv`).
    pub(crate) fn is_source_func_call(&self, call: &CallExpr) -> bool {
        let Some(callee) = call.static_callee() else {
            return false;
        };
        let callee = self.func(callee);
        let key = format!("{}.{}", callee.package, callee.name);
        self.index.func_source(&key).is_some()
    }
}

// =============================================================================
// Tests
// =============================================================================
