//! Tainted-argument-to-return reachability.
//!
//! When an internal call receives tainted arguments, the call result is
//! tainted only if those arguments actually influence a return value.
//! Constructor-like functions routinely store one argument into a field
//! that the caller never reads; propagating taint through every such call
//! would drown the report in false positives.
//!
//! The check maps tainted argument positions onto the callee's parameters
//! and runs a lightweight intrafunction reachability search from each
//! returned value back through the usual SSA producers. Walks into call
//! instructions are shallow (a call "uses its arguments"); free variables
//! are conservatively ignored; globals and constants are unreachable.

use rustc_hash::FxHashSet;

use super::{Pass, Visited, MAX_REACH_DEPTH, MAX_TAINT_DEPTH};
use crate::ssa::{CallExpr, CallTarget, FuncId, Instr, Referrer, ValueId, ValueKind};

impl<'a> Pass<'a> {
    /// Whether any tainted argument of `call` flows into a return value of
    /// `callee`.
    pub(crate) fn tainted_args_flow_to_return(
        &self,
        caller: FuncId,
        call: &CallExpr,
        callee: FuncId,
        visited: &mut Visited,
        depth: u32,
    ) -> bool {
        if depth > MAX_TAINT_DEPTH {
            return false;
        }

        let callee_fn = self.func(callee);

        // Identify tainted argument positions; results land in the shared
        // visited set, so re-queries inside this pass stay cheap.
        let mut tainted_params: FxHashSet<ValueId> = FxHashSet::default();
        for (i, &arg) in call.args.iter().enumerate() {
            if self.is_tainted(caller, arg, visited, depth) {
                if let Some(&param) = callee_fn.params.get(i) {
                    tainted_params.insert(param);
                }
            }
        }
        if tainted_params.is_empty() {
            return false;
        }

        for block in &callee_fn.blocks {
            for instr in &block.instrs {
                let Instr::Return { results } = instr else { continue };
                for &ret_val in results {
                    let mut seen = FxHashSet::default();
                    if self.value_reachable_from_params(
                        callee,
                        ret_val,
                        &tainted_params,
                        &mut seen,
                        0,
                    ) {
                        return true;
                    }
                }
            }
        }

        false
    }

    /// Whether a value inside `func` is data-derived from any of the given
    /// parameters. Purely intrafunction, bounded at [`MAX_REACH_DEPTH`].
    fn value_reachable_from_params(
        &self,
        func: FuncId,
        v: ValueId,
        tainted_params: &FxHashSet<ValueId>,
        seen: &mut FxHashSet<ValueId>,
        depth: u32,
    ) -> bool {
        if depth > MAX_REACH_DEPTH || !seen.insert(v) {
            return false;
        }

        let f = self.func(func);
        match &f.value(v).kind {
            ValueKind::Param { .. } => tainted_params.contains(&v),

            ValueKind::Const | ValueKind::Global(_) => false,

            // Conservative: closure captures do not flow from parameters.
            ValueKind::FreeVar { .. } => false,

            // An allocation is reachable when any store into it, directly
            // or through a field address, uses a reachable value.
            ValueKind::Alloc => {
                for referrer in f.referrers(v) {
                    match referrer {
                        Referrer::Store { addr, val } if *addr == v => {
                            if self.value_reachable_from_params(
                                func,
                                *val,
                                tainted_params,
                                seen,
                                depth + 1,
                            ) {
                                return true;
                            }
                        }
                        Referrer::Value(user)
                            if matches!(f.value(*user).kind, ValueKind::FieldAddr { .. }) =>
                        {
                            for fa_ref in f.referrers(*user) {
                                if let Referrer::Store { addr, val } = fa_ref {
                                    if addr == user
                                        && self.value_reachable_from_params(
                                            func,
                                            *val,
                                            tainted_params,
                                            seen,
                                            depth + 1,
                                        )
                                    {
                                        return true;
                                    }
                                }
                            }
                        }
                        _ => {}
                    }
                }
                false
            }

            // Shallow walk into calls: a call uses its arguments, and an
            // indirect call also uses its function operand.
            ValueKind::Call(call) => {
                if call
                    .args
                    .iter()
                    .any(|&arg| self.value_reachable_from_params(func, arg, tainted_params, seen, depth + 1))
                {
                    return true;
                }
                if let CallTarget::Indirect(callee) = call.target {
                    return self
                        .value_reachable_from_params(func, callee, tainted_params, seen, depth + 1);
                }
                false
            }

            ValueKind::Phi { edges } => edges
                .iter()
                .any(|&edge| self.value_reachable_from_params(func, edge, tainted_params, seen, depth + 1)),

            ValueKind::BinOp { x, y } => {
                self.value_reachable_from_params(func, *x, tainted_params, seen, depth + 1)
                    || self.value_reachable_from_params(func, *y, tainted_params, seen, depth + 1)
            }

            ValueKind::UnOp { x }
            | ValueKind::Convert { x }
            | ValueKind::ChangeType { x }
            | ValueKind::MakeInterface { x }
            | ValueKind::TypeAssert { x }
            | ValueKind::SliceOp { x }
            | ValueKind::FieldAddr { x, .. }
            | ValueKind::IndexAddr { x, .. }
            | ValueKind::Lookup { x, .. } => {
                self.value_reachable_from_params(func, *x, tainted_params, seen, depth + 1)
            }

            ValueKind::Extract { tuple, .. } => {
                self.value_reachable_from_params(func, *tuple, tainted_params, seen, depth + 1)
            }

            // Unknown producers do not propagate.
            ValueKind::MakeSlice
            | ValueKind::MakeMap
            | ValueKind::MakeChan
            | ValueKind::MakeClosure { .. } => false,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
