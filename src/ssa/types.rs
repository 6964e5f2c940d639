//! SSA type definitions.
//!
//! An in-memory, arena-based model of a package in SSA form. Every value is
//! assigned exactly once; control-flow joins are represented by phi nodes.
//! The taint engine consumes this model read-only.
//!
//! # Identity
//!
//! Functions, globals, and values are addressed by index newtypes
//! ([`FuncId`], [`GlobalId`], [`ValueId`]). Value arenas are per-function,
//! so a value is uniquely identified crate-wide by a `(FuncId, ValueId)`
//! pair; the analysis visited sets key on exactly that pair.
//!
//! # Argument convention
//!
//! The receiver of every method call, whether statically dispatched or
//! interface-dispatched, occupies argument position 0. Checked-argument
//! indices in sink declarations are interpreted against this convention.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Identifiers
// =============================================================================

/// Unique identifier for a function within a [`Program`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FuncId(pub u32);

/// Unique identifier for a global variable within a [`Program`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GlobalId(pub u32);

/// Unique identifier for a value within a [`Function`]'s arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValueId(pub u32);

// =============================================================================
// Source Locations
// =============================================================================

/// A source code location with file, line, and column information.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// File path (relative or absolute)
    pub file: String,
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
}

impl Location {
    /// Create a new location.
    #[inline]
    pub fn new(file: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }

    /// Create an unknown/synthetic location.
    #[inline]
    pub fn unknown() -> Self {
        Self {
            file: "<unknown>".to_string(),
            line: 0,
            column: 0,
        }
    }

    /// Whether this is a real position rather than a synthetic one.
    #[inline]
    pub fn is_known(&self) -> bool {
        self.line != 0
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

// =============================================================================
// Types
// =============================================================================

/// Static type reference attached to SSA values.
///
/// Only the structure relevant to source matching is modeled: named types,
/// pointers to them, and an opaque bucket for everything else. The key
/// encoding is `[*]pkg.Name`, asterisk iff pointer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeRef {
    /// A named type declared in a package.
    Named {
        /// Import path of the declaring package (e.g. `net/http`)
        package: String,
        /// Type name (e.g. `Request`)
        name: String,
    },
    /// Pointer to another type.
    Pointer(Box<TypeRef>),
    /// Any type the analysis does not need to distinguish (builtins,
    /// slices, maps, funcs, ...).
    Opaque,
}

impl TypeRef {
    /// Shorthand for a named type.
    pub fn named(package: impl Into<String>, name: impl Into<String>) -> Self {
        TypeRef::Named {
            package: package.into(),
            name: name.into(),
        }
    }

    /// Shorthand for a pointer to a named type.
    pub fn pointer_to(package: impl Into<String>, name: impl Into<String>) -> Self {
        TypeRef::Pointer(Box::new(TypeRef::named(package, name)))
    }

    /// Canonical `[*]pkg.Name` key for this type, if it has one.
    pub fn key(&self) -> Option<String> {
        match self {
            TypeRef::Named { package, name } => Some(format!("{package}.{name}")),
            TypeRef::Pointer(elem) => elem.key().map(|k| format!("*{k}")),
            TypeRef::Opaque => None,
        }
    }

    /// The pointee type if this is a pointer.
    #[inline]
    pub fn pointee(&self) -> Option<&TypeRef> {
        match self {
            TypeRef::Pointer(elem) => Some(elem),
            _ => None,
        }
    }
}

// =============================================================================
// Values
// =============================================================================

/// How a call site dispatches to its target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallTarget {
    /// Concrete callee known statically.
    Static(FuncId),
    /// Interface-dispatched method call; the concrete callee is unknown at
    /// the call site and only the method descriptor is recorded.
    Invoke(MethodRef),
    /// Call through a function value computed at runtime. Taint does not
    /// propagate through indirect calls.
    Indirect(ValueId),
    /// Language intrinsic (append, copy, string conversion, ...).
    Builtin(String),
}

/// Descriptor of an interface method used at dynamically dispatched sites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodRef {
    /// Import path of the package declaring the interface.
    pub package: String,
    /// Name of the interface type.
    pub receiver: String,
    /// Method name.
    pub method: String,
}

/// A call expression: dispatch target plus argument vector.
///
/// For method calls the receiver is `args[0]`; see the module docs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallExpr {
    pub target: CallTarget,
    pub args: Vec<ValueId>,
}

impl CallExpr {
    /// The statically known callee, if any.
    #[inline]
    pub fn static_callee(&self) -> Option<FuncId> {
        match self.target {
            CallTarget::Static(f) => Some(f),
            _ => None,
        }
    }
}

/// The closed set of SSA value kinds.
///
/// Analyses dispatch exhaustively on this enum; arms that a given analysis
/// does not understand fall back to a conservative default rather than
/// failing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueKind {
    /// Function parameter. For methods the receiver is parameter 0.
    Param { index: usize },
    /// Variable captured from the enclosing function by a closure.
    FreeVar { index: usize },
    /// Reference to a package-level variable.
    Global(GlobalId),
    /// Compile-time constant or literal.
    Const,
    /// Call instruction.
    Call(CallExpr),
    /// Binary operation.
    BinOp { x: ValueId, y: ValueId },
    /// Unary operation, including loads through pointers.
    UnOp { x: ValueId },
    /// Control-flow join; one incoming edge per predecessor block.
    Phi { edges: Vec<ValueId> },
    /// Address of a struct field (`&s.f`), by field index.
    FieldAddr { x: ValueId, field: usize },
    /// Address of an array/slice element (`&a[i]`).
    IndexAddr { x: ValueId, index: ValueId },
    /// Local allocation (stack or heap).
    Alloc,
    /// Slice allocation with dynamic length.
    MakeSlice,
    /// Map allocation.
    MakeMap,
    /// Channel allocation.
    MakeChan,
    /// Boxing of a concrete value into an interface.
    MakeInterface { x: ValueId },
    /// Closure construction binding free variables of `func`.
    MakeClosure { func: FuncId, bindings: Vec<ValueId> },
    /// Value-changing conversion between types.
    Convert { x: ValueId },
    /// Representation-preserving type change.
    ChangeType { x: ValueId },
    /// Dynamic type assertion on an interface value.
    TypeAssert { x: ValueId },
    /// Slicing operation (`a[lo:hi]`).
    SliceOp { x: ValueId },
    /// Component extraction from a tuple-valued instruction.
    Extract { tuple: ValueId, index: usize },
    /// Map or string lookup (`m[k]`, `s[i]`).
    Lookup { x: ValueId, index: ValueId },
}

/// An SSA value: kind, static type, and source position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Value {
    pub kind: ValueKind,
    pub ty: TypeRef,
    pub pos: Location,
}

// =============================================================================
// Instructions and Blocks
// =============================================================================

/// An instruction slot within a basic block.
///
/// Value-producing instructions appear as [`Instr::Value`]; stores and
/// returns produce no value and carry their operands inline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instr {
    /// A value-producing instruction, in evaluation order.
    Value(ValueId),
    /// Store of `val` through the address `addr`.
    Store { addr: ValueId, val: ValueId },
    /// Function return with zero or more results.
    Return { results: Vec<ValueId> },
}

/// A basic block: a straight-line instruction sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub instrs: Vec<Instr>,
}

/// A use of a value by another instruction.
///
/// Referrer lists are recorded at construction time and let analyses walk
/// from an allocation to the stores that populate it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Referrer {
    /// Used as an operand of another value-producing instruction.
    Value(ValueId),
    /// Used by a store, either as the address or the stored value.
    Store { addr: ValueId, val: ValueId },
}

// =============================================================================
// Functions, Globals, Program
// =============================================================================

/// Receiver of a method: named type plus pointer-ness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiverInfo {
    /// Name of the receiver type (e.g. `DB`).
    pub type_name: String,
    /// Whether the receiver is a pointer (`*DB` vs `DB`).
    pub pointer: bool,
}

/// A function in SSA form.
///
/// A function with no blocks is external: its body is unavailable and
/// analyses must treat calls to it conservatively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    /// Import path of the declaring package.
    pub package: String,
    /// Function or method name.
    pub name: String,
    /// Receiver for methods, `None` for package-level functions.
    pub receiver: Option<ReceiverInfo>,
    /// Parameter values, receiver first for methods.
    pub params: Vec<ValueId>,
    /// Free variables, for closures only; ordered to match the bindings of
    /// the `MakeClosure` that constructs this function.
    pub free_vars: Vec<ValueId>,
    /// Basic blocks in layout order; empty for external functions.
    pub blocks: Vec<Block>,
    /// Value arena.
    pub(crate) values: Vec<Value>,
    /// Per-value referrer lists, parallel to `values`.
    pub(crate) referrers: Vec<Vec<Referrer>>,
    /// Enclosing function for closures.
    pub parent: Option<FuncId>,
}

impl Function {
    /// Whether a body is available for analysis.
    #[inline]
    pub fn has_body(&self) -> bool {
        !self.blocks.is_empty()
    }

    /// Look up a value in this function's arena.
    #[inline]
    pub fn value(&self, id: ValueId) -> &Value {
        &self.values[id.0 as usize]
    }

    /// Instructions that use the given value.
    #[inline]
    pub fn referrers(&self, id: ValueId) -> &[Referrer] {
        &self.referrers[id.0 as usize]
    }

    /// Position of `v` in the parameter list, receiver included.
    pub fn param_index(&self, v: ValueId) -> Option<usize> {
        self.params.iter().position(|&p| p == v)
    }

    /// Canonical symbol key for this function: `pkg.Name` for package-level
    /// functions, `(<[*]pkg.Recv>).Method` for methods.
    pub fn symbol_key(&self) -> String {
        match &self.receiver {
            None => format!("{}.{}", self.package, self.name),
            Some(recv) => {
                let star = if recv.pointer { "*" } else { "" };
                format!("({star}{}.{}).{}", self.package, recv.type_name, self.name)
            }
        }
    }
}

/// A package-level variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Global {
    /// Import path of the declaring package.
    pub package: String,
    /// Variable name.
    pub name: String,
}

impl Global {
    /// Canonical `pkg.Name` key.
    #[inline]
    pub fn key(&self) -> String {
        format!("{}.{}", self.package, self.name)
    }
}

/// A whole-package SSA program: the unit the engine analyzes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    /// Import path of the package under analysis.
    pub package: String,
    /// Function arena, indexed by [`FuncId`]. External dependencies appear
    /// here too, as body-less functions.
    pub functions: Vec<Function>,
    /// Global arena, indexed by [`GlobalId`].
    pub globals: Vec<Global>,
}

impl Program {
    /// Look up a function.
    #[inline]
    pub fn func(&self, id: FuncId) -> &Function {
        &self.functions[id.0 as usize]
    }

    /// Look up a global.
    #[inline]
    pub fn global(&self, id: GlobalId) -> &Global {
        &self.globals[id.0 as usize]
    }

    /// Ids of all functions declared in the package under analysis that
    /// have bodies; the usual root set for [`crate::taint::Analyzer`].
    pub fn source_functions(&self) -> Vec<FuncId> {
        self.functions
            .iter()
            .enumerate()
            .filter(|(_, f)| f.package == self.package && f.has_body())
            .map(|(i, _)| FuncId(i as u32))
            .collect()
    }
}

// =============================================================================
// Tests
// =============================================================================
