//! Field-sensitive struct taint analysis.
//!
//! Decides whether a specific field of a struct carries tainted data,
//! rather than treating the whole struct as tainted when any field is.
//! When the struct was returned by a function with an available body, the
//! analysis traces into the callee: it finds the returned allocation,
//! inspects stores into the requested field, and maps callee parameters
//! back to the actual caller arguments.
//!
//! Nested field paths resolve sensitivity only at the outermost field;
//! deeper paths degrade to parent taint.

use rustc_hash::FxHashSet;

use super::{Pass, Visited, MAX_TAINT_DEPTH};
use crate::ssa::{FuncId, Function, Instr, Referrer, ValueId, ValueKind};

impl<'a> Pass<'a> {
    /// Whether the field addressed by the `FieldAddr` value `fa` is
    /// tainted.
    pub(crate) fn is_field_access_tainted(
        &self,
        func: FuncId,
        fa: ValueId,
        visited: &mut Visited,
        depth: u32,
    ) -> bool {
        if depth > MAX_TAINT_DEPTH {
            return false;
        }

        let ValueKind::FieldAddr { x, field } = self.value(func, fa).kind else {
            return false;
        };

        // CASE 1: the struct itself is of a configured source type. All
        // fields of an externally supplied source object are tainted, so a
        // parameter answers yes immediately; anything else is judged by
        // the origin of the struct value.
        if self.index.matches_source_type(&self.value(func, x).ty) {
            if matches!(self.value(func, x).kind, ValueKind::Param { .. }) {
                return true;
            }
            return self.is_tainted(func, x, visited, depth);
        }

        match &self.value(func, x).kind {
            // CASE 2: struct returned by a call. With a body available,
            // look inside the callee for stores into this field;
            // otherwise judge the call result as a whole.
            ValueKind::Call(call) => match call.static_callee() {
                Some(callee) if self.func(callee).has_body() => {
                    self.is_field_tainted_via_call(func, x, field, callee, visited, depth)
                }
                _ => self.is_tainted(func, x, visited, depth),
            },

            // CASE 3: struct from a tuple extraction, e.g.
            // cfg, err := newConfig(...).
            ValueKind::Extract { tuple, .. } => {
                if let ValueKind::Call(call) = &self.value(func, *tuple).kind {
                    if let Some(callee) = call.static_callee() {
                        if self.func(callee).has_body() {
                            return self
                                .is_field_tainted_via_call(func, *tuple, field, callee, visited, depth);
                        }
                    }
                }
                self.is_tainted(func, x, visited, depth)
            }

            // CASE 4: local allocation; check stores through this field.
            ValueKind::Alloc => self.is_field_of_alloc_tainted(func, x, field, visited, depth),

            // CASE 5: pointer dereference; trace through the pointer.
            ValueKind::UnOp { x: pointee } => {
                self.is_field_tainted_on_value(func, *pointee, field, visited, depth)
            }

            // CASE 6: control-flow join; tainted if tainted on any edge.
            ValueKind::Phi { edges } => edges
                .iter()
                .any(|&edge| self.is_field_tainted_on_value(func, edge, field, visited, depth + 1)),

            // CASE 7: nested field access; resolve at the outer field.
            ValueKind::FieldAddr { .. } => self.is_field_access_tainted(func, x, visited, depth),

            // Default: fall back to the parent struct's taint.
            _ => self.is_tainted(func, x, visited, depth),
        }
    }

    /// Whether field `field` of value `v` is tainted; the value-shaped
    /// companion of [`Self::is_field_access_tainted`] used behind phis and
    /// pointer loads.
    fn is_field_tainted_on_value(
        &self,
        func: FuncId,
        v: ValueId,
        field: usize,
        visited: &mut Visited,
        depth: u32,
    ) -> bool {
        if depth > MAX_TAINT_DEPTH {
            return false;
        }

        match &self.value(func, v).kind {
            ValueKind::Call(call) => match call.static_callee() {
                Some(callee) if self.func(callee).has_body() => {
                    self.is_field_tainted_via_call(func, v, field, callee, visited, depth)
                }
                _ => self.is_tainted(func, v, visited, depth),
            },
            ValueKind::Extract { tuple, .. } => {
                if let ValueKind::Call(call) = &self.value(func, *tuple).kind {
                    if let Some(callee) = call.static_callee() {
                        if self.func(callee).has_body() {
                            return self
                                .is_field_tainted_via_call(func, *tuple, field, callee, visited, depth);
                        }
                    }
                }
                self.is_tainted(func, v, visited, depth)
            }
            ValueKind::Alloc => self.is_field_of_alloc_tainted(func, v, field, visited, depth),
            ValueKind::Phi { edges } => edges
                .iter()
                .any(|&edge| self.is_field_tainted_on_value(func, edge, field, visited, depth + 1)),
            _ => self.is_tainted(func, v, visited, depth),
        }
    }

    /// Whether a specific field of a locally allocated struct has been
    /// assigned tainted data: every store through a field address at the
    /// requested index is inspected.
    fn is_field_of_alloc_tainted(
        &self,
        func: FuncId,
        alloc: ValueId,
        field: usize,
        visited: &mut Visited,
        depth: u32,
    ) -> bool {
        let f = self.func(func);
        for referrer in f.referrers(alloc) {
            let Referrer::Value(fa) = referrer else { continue };
            if !matches!(f.value(*fa).kind, ValueKind::FieldAddr { field: i, .. } if i == field) {
                continue;
            }
            for fa_ref in f.referrers(*fa) {
                let Referrer::Store { addr, val } = fa_ref else { continue };
                if addr != fa {
                    continue;
                }
                if self.is_tainted(func, *val, visited, depth + 1) {
                    return true;
                }
            }
        }
        false
    }

    // =========================================================================
    // Interprocedural field tracing
    // =========================================================================

    /// Whether field `field` of the struct returned by `call` is tainted,
    /// by looking inside the callee: find the returned allocation, then
    /// check whether the field was assigned data derived from tainted
    /// caller arguments.
    fn is_field_tainted_via_call(
        &self,
        caller: FuncId,
        call: ValueId,
        field: usize,
        callee: FuncId,
        visited: &mut Visited,
        depth: u32,
    ) -> bool {
        if depth > MAX_TAINT_DEPTH {
            return false;
        }

        let callee_fn = self.func(callee);
        let ValueKind::Call(call_expr) = &self.value(caller, call).kind else {
            return false;
        };

        // No body: assume the field is tainted when any constructor
        // argument is.
        if !callee_fn.has_body() {
            return call_expr
                .args
                .iter()
                .any(|&arg| self.is_tainted(caller, arg, visited, depth));
        }

        for block in &callee_fn.blocks {
            for instr in &block.instrs {
                let Instr::Return { results } = instr else { continue };
                for &ret_val in results {
                    let Some(alloc) = trace_to_alloc(callee_fn, ret_val) else {
                        continue;
                    };
                    if self.is_field_of_alloc_tainted_in_callee(
                        alloc,
                        field,
                        callee,
                        caller,
                        call,
                        visited,
                        depth + 1,
                    ) {
                        return true;
                    }
                }
            }
        }

        false
    }

    /// Whether field `field` of an allocation inside `callee` receives
    /// tainted data from the caller's arguments.
    #[allow(clippy::too_many_arguments)]
    fn is_field_of_alloc_tainted_in_callee(
        &self,
        alloc: ValueId,
        field: usize,
        callee: FuncId,
        caller: FuncId,
        call: ValueId,
        visited: &mut Visited,
        depth: u32,
    ) -> bool {
        if depth > MAX_TAINT_DEPTH {
            return false;
        }

        let callee_fn = self.func(callee);
        for referrer in callee_fn.referrers(alloc) {
            let Referrer::Value(fa) = referrer else { continue };
            if !matches!(
                callee_fn.value(*fa).kind,
                ValueKind::FieldAddr { field: i, .. } if i == field
            ) {
                continue;
            }
            for fa_ref in callee_fn.referrers(*fa) {
                let Referrer::Store { addr, val } = fa_ref else { continue };
                if addr != fa {
                    continue;
                }
                // Map the stored value back to caller context.
                if self.is_callee_value_tainted(*val, callee, caller, call, visited, depth + 1) {
                    return true;
                }
            }
        }
        false
    }

    /// Whether a value inside `callee` is tainted when evaluated against
    /// the caller's arguments: callee parameters map to the actual
    /// arguments of `call`, constants never taint, other producers recurse
    /// structurally, and anything else falls back to the callee-local
    /// oracle.
    pub(crate) fn is_callee_value_tainted(
        &self,
        v: ValueId,
        callee: FuncId,
        caller: FuncId,
        call: ValueId,
        visited: &mut Visited,
        depth: u32,
    ) -> bool {
        if depth > MAX_TAINT_DEPTH {
            return false;
        }

        let callee_fn = self.func(callee);
        match &callee_fn.value(v).kind {
            ValueKind::Param { .. } => {
                let ValueKind::Call(call_expr) = &self.value(caller, call).kind else {
                    return false;
                };
                match callee_fn.param_index(v) {
                    Some(i) => match call_expr.args.get(i) {
                        Some(&arg) => self.is_tainted(caller, arg, visited, depth),
                        None => false,
                    },
                    None => false,
                }
            }

            ValueKind::Const => false,

            ValueKind::Call(inner) => {
                if self.is_sanitizer_call(inner) {
                    return false;
                }
                if self.is_source_func_call(inner) {
                    return true;
                }
                inner
                    .args
                    .iter()
                    .any(|&arg| self.is_callee_value_tainted(arg, callee, caller, call, visited, depth + 1))
            }

            ValueKind::Extract { tuple, .. } => {
                self.is_callee_value_tainted(*tuple, callee, caller, call, visited, depth + 1)
            }

            ValueKind::Phi { edges } => edges
                .iter()
                .any(|&edge| self.is_callee_value_tainted(edge, callee, caller, call, visited, depth + 1)),

            ValueKind::BinOp { x, y } => {
                self.is_callee_value_tainted(*x, callee, caller, call, visited, depth + 1)
                    || self.is_callee_value_tainted(*y, callee, caller, call, visited, depth + 1)
            }

            ValueKind::Convert { x }
            | ValueKind::ChangeType { x }
            | ValueKind::FieldAddr { x, .. }
            | ValueKind::UnOp { x } => {
                self.is_callee_value_tainted(*x, callee, caller, call, visited, depth + 1)
            }

            // Anything else: judge it in the callee's own context.
            _ => self.is_tainted(callee, v, visited, depth),
        }
    }
}

/// Follow a returned value back through joins, boxing, conversions, and
/// loads to the allocation it originates from, if any.
fn trace_to_alloc(f: &Function, v: ValueId) -> Option<ValueId> {
    let mut seen = FxHashSet::default();
    trace_to_alloc_inner(f, v, &mut seen)
}

fn trace_to_alloc_inner(
    f: &Function,
    v: ValueId,
    seen: &mut FxHashSet<ValueId>,
) -> Option<ValueId> {
    if !seen.insert(v) {
        return None;
    }
    match &f.value(v).kind {
        ValueKind::Alloc => Some(v),
        ValueKind::Phi { edges } => edges
            .iter()
            .find_map(|&edge| trace_to_alloc_inner(f, edge, seen)),
        ValueKind::MakeInterface { x }
        | ValueKind::ChangeType { x }
        | ValueKind::Convert { x }
        | ValueKind::UnOp { x } => trace_to_alloc_inner(f, *x, seen),
        _ => None,
    }
}

// =============================================================================
// Tests
// =============================================================================
