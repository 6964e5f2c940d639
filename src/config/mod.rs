//! Taint policy declarations and their indexed form.
//!
//! A [`TaintPolicy`] is the declarative configuration of one analyzer:
//! where untrusted data originates ([`Source`]), which calls must not
//! receive it ([`Sink`]), and which calls neutralize it ([`Sanitizer`]).
//!
//! [`PolicyIndex`] normalizes the declarations into keyed tables so that
//! every lookup the engine performs during analysis is O(1). The key
//! encodings are canonical:
//!
//! - sources: `[*]pkg.Name`, asterisk iff pointer
//! - sinks and sanitizers: `pkg.Fn` for package-level functions,
//!   `(<[*]pkg.Recv>).Method` for methods
//!
//! Two declarations with the same key and identical semantics are accepted
//! silently; a key collision with differing payloads is a configuration
//! error.

pub mod presets;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TaintflowError};
use crate::ssa::TypeRef;

// =============================================================================
// Declarations
// =============================================================================

/// Where tainted data originates.
///
/// When `is_func` is true, any call whose static callee resolves to
/// `package.name` produces tainted output (e.g. `os.Getenv`). When false,
/// the entry is a *type* (possibly pointer-qualified); any function
/// parameter of that type is tainted at entry (e.g. `*net/http.Request`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Import path of the declaring package (e.g. `net/http`).
    pub package: String,
    /// Type or function name (e.g. `Request`, `Getenv`).
    pub name: String,
    /// Whether the source is a pointer type (`*Type`).
    #[serde(default)]
    pub pointer: bool,
    /// Marks this source as a function returning tainted data rather than
    /// a type tainted at parameter entry.
    #[serde(default)]
    pub is_func: bool,
}

impl Source {
    /// A type source: parameters of `[*]package.name` are tainted at entry.
    pub fn typed(package: impl Into<String>, name: impl Into<String>, pointer: bool) -> Self {
        Self {
            package: package.into(),
            name: name.into(),
            pointer,
            is_func: false,
        }
    }

    /// A function source: calls to `package.name` return tainted data.
    pub fn function(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            name: name.into(),
            pointer: false,
            is_func: true,
        }
    }

    /// Canonical `[*]pkg.Name` lookup key.
    pub fn key(&self) -> String {
        let star = if self.pointer { "*" } else { "" };
        format!("{star}{}.{}", self.package, self.name)
    }
}

/// A dangerous call that must not receive tainted data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sink {
    /// Import path of the declaring package (e.g. `database/sql`).
    pub package: String,
    /// Receiver type name for methods (e.g. `DB`), empty for package-level
    /// functions.
    #[serde(default)]
    pub receiver: String,
    /// Function or method name (e.g. `Query`).
    pub method: String,
    /// Whether the receiver is a pointer type.
    #[serde(default)]
    pub pointer: bool,
    /// Argument positions to check for taint. The receiver of a method
    /// call is position 0. Empty means every argument is checked.
    #[serde(default)]
    pub check_args: Vec<usize>,
}

impl Sink {
    /// A package-level function sink.
    pub fn function(package: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            receiver: String::new(),
            method: method.into(),
            pointer: false,
            check_args: Vec::new(),
        }
    }

    /// A method sink on `[*]package.receiver`.
    pub fn method(
        package: impl Into<String>,
        receiver: impl Into<String>,
        pointer: bool,
        method: impl Into<String>,
    ) -> Self {
        Self {
            package: package.into(),
            receiver: receiver.into(),
            method: method.into(),
            pointer,
            check_args: Vec::new(),
        }
    }

    /// Restrict the checked argument positions.
    #[must_use]
    pub fn check_args(mut self, args: impl IntoIterator<Item = usize>) -> Self {
        self.check_args = args.into_iter().collect();
        self
    }

    /// Canonical lookup key: `pkg.Fn` or `(<[*]pkg.Recv>).Method`.
    pub fn key(&self) -> String {
        symbol_key(&self.package, &self.receiver, &self.method, self.pointer)
    }
}

/// A call that neutralizes taint: its result is untainted regardless of
/// its inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sanitizer {
    /// Import path of the declaring package (e.g. `html`).
    pub package: String,
    /// Receiver type name for methods, empty for package-level functions.
    #[serde(default)]
    pub receiver: String,
    /// Function or method name (e.g. `EscapeString`).
    pub method: String,
    /// Whether the receiver is a pointer type.
    #[serde(default)]
    pub pointer: bool,
}

impl Sanitizer {
    /// A package-level function sanitizer.
    pub fn function(package: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            receiver: String::new(),
            method: method.into(),
            pointer: false,
        }
    }

    /// A method sanitizer on `[*]package.receiver`.
    pub fn method(
        package: impl Into<String>,
        receiver: impl Into<String>,
        pointer: bool,
        method: impl Into<String>,
    ) -> Self {
        Self {
            package: package.into(),
            receiver: receiver.into(),
            method: method.into(),
            pointer,
        }
    }

    /// Canonical lookup key, same encoding as sinks.
    pub fn key(&self) -> String {
        symbol_key(&self.package, &self.receiver, &self.method, self.pointer)
    }
}

fn symbol_key(package: &str, receiver: &str, method: &str, pointer: bool) -> String {
    if receiver.is_empty() {
        format!("{package}.{method}")
    } else {
        let star = if pointer { "*" } else { "" };
        format!("({star}{package}.{receiver}).{method}")
    }
}

// =============================================================================
// Policy
// =============================================================================

/// The union of source, sink, and sanitizer declarations owned by one
/// analyzer instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaintPolicy {
    pub sources: Vec<Source>,
    pub sinks: Vec<Sink>,
    #[serde(default)]
    pub sanitizers: Vec<Sanitizer>,
}

impl TaintPolicy {
    /// Load a policy from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serialize the policy to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// =============================================================================
// Indexed Tables
// =============================================================================

/// Keyed tables built once per analyzer; immutable afterwards.
#[derive(Debug, Clone)]
pub struct PolicyIndex {
    /// All sources keyed by `[*]pkg.Name`.
    sources: FxHashMap<String, Source>,
    /// The function-source subset, keyed the same way.
    func_sources: FxHashMap<String, Source>,
    /// Sinks keyed by symbol key.
    sinks: FxHashMap<String, Sink>,
    /// Sanitizer presence keyed by symbol key.
    sanitizers: FxHashSet<String>,
}

impl PolicyIndex {
    /// Index a policy.
    ///
    /// Fails with [`TaintflowError::InvalidPolicy`] only when two
    /// declarations collide on a key with differing payloads.
    pub fn new(policy: &TaintPolicy) -> Result<Self> {
        let mut sources = FxHashMap::default();
        let mut func_sources = FxHashMap::default();
        let mut sinks = FxHashMap::default();
        let mut sanitizers = FxHashSet::default();

        for src in &policy.sources {
            let key = src.key();
            if let Some(existing) = sources.insert(key.clone(), src.clone()) {
                if existing != *src {
                    return Err(TaintflowError::conflicting_key("source", &key));
                }
            }
            if src.is_func {
                func_sources.insert(key, src.clone());
            }
        }

        for sink in &policy.sinks {
            let key = sink.key();
            if let Some(existing) = sinks.insert(key.clone(), sink.clone()) {
                if existing != *sink {
                    return Err(TaintflowError::conflicting_key("sink", &key));
                }
            }
        }

        for san in &policy.sanitizers {
            sanitizers.insert(san.key());
        }

        Ok(Self {
            sources,
            func_sources,
            sinks,
            sanitizers,
        })
    }

    /// Source declaration for a `[*]pkg.Name` key, type or function.
    #[inline]
    pub fn source(&self, key: &str) -> Option<&Source> {
        self.sources.get(key)
    }

    /// Function-source declaration for a `pkg.Name` key.
    #[inline]
    pub fn func_source(&self, key: &str) -> Option<&Source> {
        self.func_sources.get(key)
    }

    /// Sink declaration for a symbol key.
    #[inline]
    pub fn sink(&self, key: &str) -> Option<&Sink> {
        self.sinks.get(key)
    }

    /// Whether a symbol key names a sanitizer.
    #[inline]
    pub fn is_sanitizer(&self, key: &str) -> bool {
        self.sanitizers.contains(key)
    }

    /// Whether any sanitizers are configured at all; lets the engine skip
    /// callee resolution when there is nothing to match.
    #[inline]
    pub fn has_sanitizers(&self) -> bool {
        !self.sanitizers.is_empty()
    }

    /// Whether a static type matches a configured source type.
    ///
    /// Applied only to function parameters and globals, never to locally
    /// constructed values; a request object built from hardcoded inputs is
    /// not tainted merely by its type.
    pub fn matches_source_type(&self, ty: &TypeRef) -> bool {
        match ty {
            TypeRef::Named { package, name } => {
                self.sources.contains_key(&format!("{package}.{name}"))
                    || self.sources.contains_key(&format!("*{package}.{name}"))
            }
            TypeRef::Pointer(elem) => {
                if let Some(key) = ty.key() {
                    if self.sources.contains_key(&key) {
                        return true;
                    }
                }
                self.matches_source_type(elem)
            }
            TypeRef::Opaque => false,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
