//! SSA program construction.
//!
//! [`ProgramBuilder`] and [`FunctionBuilder`] are the ingestion API: a host
//! front-end lowers its IR through them, and the test suite uses them to
//! write SSA programs as literals.
//!
//! Construction is two-phase so call sites can reference functions declared
//! later: declare every function first (obtaining [`FuncId`]s), then attach
//! bodies. A function whose body is never attached stays external, which is
//! exactly how unresolved library dependencies are represented.
//!
//! # Example
//!
//! ```
//! use taintflow::ssa::{FunctionBuilder, Location, ProgramBuilder};
//!
//! let mut pb = ProgramBuilder::new("app");
//! let getenv = pb.declare_external("os", "Getenv");
//! let handler = pb.declare_function("handler");
//!
//! let mut fb = FunctionBuilder::new();
//! let key = fb.constant();
//! let v = fb
//!     .at(Location::new("main.go", 10, 3))
//!     .call_static(getenv, vec![key]);
//! fb.ret(vec![v]);
//! pb.set_body(handler, fb);
//!
//! let program = pb.finish();
//! assert!(program.func(handler).has_body());
//! assert!(!program.func(getenv).has_body());
//! ```

use super::types::{
    Block, CallExpr, CallTarget, FuncId, Function, Global, GlobalId, Instr, Location, MethodRef,
    Program, ReceiverInfo, Referrer, TypeRef, Value, ValueId, ValueKind,
};

// =============================================================================
// Program Builder
// =============================================================================

/// Builder for a whole-package [`Program`].
#[derive(Debug)]
pub struct ProgramBuilder {
    package: String,
    functions: Vec<Function>,
    globals: Vec<Global>,
}

impl ProgramBuilder {
    /// Start building a program for the given package import path.
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            functions: Vec::new(),
            globals: Vec::new(),
        }
    }

    fn declare(&mut self, package: String, name: String, receiver: Option<ReceiverInfo>) -> FuncId {
        let id = FuncId(self.functions.len() as u32);
        self.functions.push(Function {
            package,
            name,
            receiver,
            params: Vec::new(),
            free_vars: Vec::new(),
            blocks: Vec::new(),
            values: Vec::new(),
            referrers: Vec::new(),
            parent: None,
        });
        id
    }

    /// Declare a package-level function in the package under analysis.
    pub fn declare_function(&mut self, name: impl Into<String>) -> FuncId {
        let package = self.package.clone();
        self.declare(package, name.into(), None)
    }

    /// Declare a package-level function in another package. It stays
    /// external unless a body is attached.
    pub fn declare_external(
        &mut self,
        package: impl Into<String>,
        name: impl Into<String>,
    ) -> FuncId {
        self.declare(package.into(), name.into(), None)
    }

    /// Declare a method on `[*]package.receiver`.
    pub fn declare_method(
        &mut self,
        package: impl Into<String>,
        receiver: impl Into<String>,
        pointer: bool,
        name: impl Into<String>,
    ) -> FuncId {
        self.declare(
            package.into(),
            name.into(),
            Some(ReceiverInfo {
                type_name: receiver.into(),
                pointer,
            }),
        )
    }

    /// Declare an anonymous function nested inside `parent`. Free variables
    /// of its body resolve against `parent`'s closure bindings.
    pub fn declare_closure(&mut self, parent: FuncId, name: impl Into<String>) -> FuncId {
        let package = self.package.clone();
        let id = self.declare(package, name.into(), None);
        self.functions[id.0 as usize].parent = Some(parent);
        id
    }

    /// Declare a package-level variable.
    pub fn declare_global(
        &mut self,
        package: impl Into<String>,
        name: impl Into<String>,
    ) -> GlobalId {
        let id = GlobalId(self.globals.len() as u32);
        self.globals.push(Global {
            package: package.into(),
            name: name.into(),
        });
        id
    }

    /// Attach a finished body to a declared function.
    ///
    /// Referrer lists are computed here, once, so the analysis can walk
    /// from any value to its uses without re-scanning blocks.
    pub fn set_body(&mut self, id: FuncId, body: FunctionBuilder) {
        let referrers = body.compute_referrers();
        let f = &mut self.functions[id.0 as usize];
        f.params = body.params;
        f.free_vars = body.free_vars;
        f.blocks = body.blocks;
        f.values = body.values;
        f.referrers = referrers;
    }

    /// Finish construction.
    pub fn finish(self) -> Program {
        Program {
            package: self.package,
            functions: self.functions,
            globals: self.globals,
        }
    }
}

// =============================================================================
// Function Builder
// =============================================================================

/// Builder for one function body.
///
/// Value-producing instructions append to the current basic block;
/// [`FunctionBuilder::start_block`] opens a new one. Parameters, free
/// variables, globals, and constants are values but not instructions, so
/// they never appear in a block.
#[derive(Debug)]
pub struct FunctionBuilder {
    values: Vec<Value>,
    params: Vec<ValueId>,
    free_vars: Vec<ValueId>,
    blocks: Vec<Block>,
    loc: Location,
}

impl FunctionBuilder {
    /// Start a body with a single empty entry block.
    pub fn new() -> Self {
        Self {
            values: Vec::new(),
            params: Vec::new(),
            free_vars: Vec::new(),
            blocks: vec![Block::default()],
            loc: Location::unknown(),
        }
    }

    /// Set the source position applied to subsequently created values.
    pub fn at(&mut self, loc: Location) -> &mut Self {
        self.loc = loc;
        self
    }

    /// Open a new basic block; subsequent instructions append to it.
    /// Returns the block's index in layout order.
    pub fn start_block(&mut self) -> usize {
        self.blocks.push(Block::default());
        self.blocks.len() - 1
    }

    fn new_value(&mut self, kind: ValueKind, ty: TypeRef) -> ValueId {
        let id = ValueId(self.values.len() as u32);
        self.values.push(Value {
            kind,
            ty,
            pos: self.loc.clone(),
        });
        id
    }

    fn push_instr(&mut self, kind: ValueKind, ty: TypeRef) -> ValueId {
        let id = self.new_value(kind, ty);
        self.blocks
            .last_mut()
            .expect("function builder always has a current block")
            .instrs
            .push(Instr::Value(id));
        id
    }

    // -------------------------------------------------------------------------
    // Non-instruction values
    // -------------------------------------------------------------------------

    /// Declare the next parameter, with its static type.
    pub fn param(&mut self, ty: TypeRef) -> ValueId {
        let index = self.params.len();
        let id = self.new_value(ValueKind::Param { index }, ty);
        self.params.push(id);
        id
    }

    /// Declare the next free variable of a closure body.
    pub fn free_var(&mut self, ty: TypeRef) -> ValueId {
        let index = self.free_vars.len();
        let id = self.new_value(ValueKind::FreeVar { index }, ty);
        self.free_vars.push(id);
        id
    }

    /// Reference a package-level variable.
    pub fn global_ref(&mut self, g: GlobalId) -> ValueId {
        self.new_value(ValueKind::Global(g), TypeRef::Opaque)
    }

    /// A constant or literal.
    pub fn constant(&mut self) -> ValueId {
        self.new_value(ValueKind::Const, TypeRef::Opaque)
    }

    // -------------------------------------------------------------------------
    // Calls
    // -------------------------------------------------------------------------

    /// Call with a statically known callee. For method calls the receiver
    /// is `args[0]`.
    pub fn call_static(&mut self, callee: FuncId, args: Vec<ValueId>) -> ValueId {
        self.push_instr(
            ValueKind::Call(CallExpr {
                target: CallTarget::Static(callee),
                args,
            }),
            TypeRef::Opaque,
        )
    }

    /// Interface-dispatched method call; `args[0]` is the receiver.
    pub fn call_invoke(
        &mut self,
        package: impl Into<String>,
        receiver: impl Into<String>,
        method: impl Into<String>,
        args: Vec<ValueId>,
    ) -> ValueId {
        self.push_instr(
            ValueKind::Call(CallExpr {
                target: CallTarget::Invoke(MethodRef {
                    package: package.into(),
                    receiver: receiver.into(),
                    method: method.into(),
                }),
                args,
            }),
            TypeRef::Opaque,
        )
    }

    /// Call through a function value computed at runtime.
    pub fn call_indirect(&mut self, callee: ValueId, args: Vec<ValueId>) -> ValueId {
        self.push_instr(
            ValueKind::Call(CallExpr {
                target: CallTarget::Indirect(callee),
                args,
            }),
            TypeRef::Opaque,
        )
    }

    /// Call of a language intrinsic.
    pub fn call_builtin(&mut self, name: impl Into<String>, args: Vec<ValueId>) -> ValueId {
        self.push_instr(
            ValueKind::Call(CallExpr {
                target: CallTarget::Builtin(name.into()),
                args,
            }),
            TypeRef::Opaque,
        )
    }

    // -------------------------------------------------------------------------
    // Value instructions
    // -------------------------------------------------------------------------

    /// Local allocation; `ty` is the type of the allocated cell.
    pub fn alloc(&mut self, ty: TypeRef) -> ValueId {
        self.push_instr(ValueKind::Alloc, ty)
    }

    pub fn bin_op(&mut self, x: ValueId, y: ValueId) -> ValueId {
        self.push_instr(ValueKind::BinOp { x, y }, TypeRef::Opaque)
    }

    /// Unary operation; also used for loads through a pointer.
    pub fn un_op(&mut self, x: ValueId) -> ValueId {
        self.push_instr(ValueKind::UnOp { x }, TypeRef::Opaque)
    }

    pub fn phi(&mut self, edges: Vec<ValueId>) -> ValueId {
        self.push_instr(ValueKind::Phi { edges }, TypeRef::Opaque)
    }

    /// Append an incoming edge to an existing phi. Loop headers need this:
    /// their back-edge values are created after the phi itself.
    pub fn add_phi_edge(&mut self, phi: ValueId, edge: ValueId) {
        match &mut self.values[phi.0 as usize].kind {
            ValueKind::Phi { edges } => edges.push(edge),
            _ => panic!("add_phi_edge target is not a phi"),
        }
    }

    pub fn field_addr(&mut self, x: ValueId, field: usize) -> ValueId {
        self.push_instr(ValueKind::FieldAddr { x, field }, TypeRef::Opaque)
    }

    pub fn index_addr(&mut self, x: ValueId, index: ValueId) -> ValueId {
        self.push_instr(ValueKind::IndexAddr { x, index }, TypeRef::Opaque)
    }

    pub fn make_slice(&mut self) -> ValueId {
        self.push_instr(ValueKind::MakeSlice, TypeRef::Opaque)
    }

    pub fn make_map(&mut self) -> ValueId {
        self.push_instr(ValueKind::MakeMap, TypeRef::Opaque)
    }

    pub fn make_chan(&mut self) -> ValueId {
        self.push_instr(ValueKind::MakeChan, TypeRef::Opaque)
    }

    pub fn make_interface(&mut self, x: ValueId) -> ValueId {
        self.push_instr(ValueKind::MakeInterface { x }, TypeRef::Opaque)
    }

    /// Construct a closure over `func`, binding values from this function's
    /// scope. Bindings correspond index-wise to `func`'s free variables.
    pub fn make_closure(&mut self, func: FuncId, bindings: Vec<ValueId>) -> ValueId {
        self.push_instr(ValueKind::MakeClosure { func, bindings }, TypeRef::Opaque)
    }

    pub fn convert(&mut self, x: ValueId) -> ValueId {
        self.push_instr(ValueKind::Convert { x }, TypeRef::Opaque)
    }

    pub fn change_type(&mut self, x: ValueId) -> ValueId {
        self.push_instr(ValueKind::ChangeType { x }, TypeRef::Opaque)
    }

    pub fn type_assert(&mut self, x: ValueId) -> ValueId {
        self.push_instr(ValueKind::TypeAssert { x }, TypeRef::Opaque)
    }

    pub fn slice_op(&mut self, x: ValueId) -> ValueId {
        self.push_instr(ValueKind::SliceOp { x }, TypeRef::Opaque)
    }

    pub fn extract(&mut self, tuple: ValueId, index: usize) -> ValueId {
        self.push_instr(ValueKind::Extract { tuple, index }, TypeRef::Opaque)
    }

    pub fn lookup(&mut self, x: ValueId, index: ValueId) -> ValueId {
        self.push_instr(ValueKind::Lookup { x, index }, TypeRef::Opaque)
    }

    /// Override the static type recorded for a value. Types default to
    /// opaque; only values whose type participates in source matching need
    /// one.
    pub fn set_type(&mut self, v: ValueId, ty: TypeRef) {
        self.values[v.0 as usize].ty = ty;
    }

    // -------------------------------------------------------------------------
    // Non-value instructions
    // -------------------------------------------------------------------------

    /// Store `val` through the address `addr`.
    pub fn store(&mut self, addr: ValueId, val: ValueId) {
        self.blocks
            .last_mut()
            .expect("function builder always has a current block")
            .instrs
            .push(Instr::Store { addr, val });
    }

    /// Return from the function.
    pub fn ret(&mut self, results: Vec<ValueId>) {
        self.blocks
            .last_mut()
            .expect("function builder always has a current block")
            .instrs
            .push(Instr::Return { results });
    }

    // -------------------------------------------------------------------------
    // Finalization
    // -------------------------------------------------------------------------

    fn compute_referrers(&self) -> Vec<Vec<Referrer>> {
        let mut referrers: Vec<Vec<Referrer>> = vec![Vec::new(); self.values.len()];

        for (i, value) in self.values.iter().enumerate() {
            let user = ValueId(i as u32);
            for operand in operands_of(&value.kind) {
                referrers[operand.0 as usize].push(Referrer::Value(user));
            }
        }

        for block in &self.blocks {
            for instr in &block.instrs {
                if let Instr::Store { addr, val } = *instr {
                    referrers[addr.0 as usize].push(Referrer::Store { addr, val });
                    if val != addr {
                        referrers[val.0 as usize].push(Referrer::Store { addr, val });
                    }
                }
            }
        }

        referrers
    }
}

impl Default for FunctionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Operands of a value kind, in a fixed order.
fn operands_of(kind: &ValueKind) -> Vec<ValueId> {
    match kind {
        ValueKind::Param { .. }
        | ValueKind::FreeVar { .. }
        | ValueKind::Global(_)
        | ValueKind::Const
        | ValueKind::Alloc
        | ValueKind::MakeSlice
        | ValueKind::MakeMap
        | ValueKind::MakeChan => Vec::new(),
        ValueKind::Call(call) => {
            let mut ops = call.args.clone();
            if let CallTarget::Indirect(callee) = call.target {
                ops.push(callee);
            }
            ops
        }
        ValueKind::BinOp { x, y } => vec![*x, *y],
        ValueKind::UnOp { x }
        | ValueKind::MakeInterface { x }
        | ValueKind::Convert { x }
        | ValueKind::ChangeType { x }
        | ValueKind::TypeAssert { x }
        | ValueKind::SliceOp { x } => vec![*x],
        ValueKind::Phi { edges } => edges.clone(),
        ValueKind::FieldAddr { x, .. } => vec![*x],
        ValueKind::IndexAddr { x, index } => vec![*x, *index],
        ValueKind::MakeClosure { bindings, .. } => bindings.clone(),
        ValueKind::Extract { tuple, .. } => vec![*tuple],
        ValueKind::Lookup { x, index } => vec![*x, *index],
    }
}

// =============================================================================
// Tests
// =============================================================================
