//! Central error types for taintflow.
//!
//! Uses `thiserror` for ergonomic error definitions with automatic
//! `Display` and `From` implementations.

use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum TaintflowError {
    /// Two policy declarations share a lookup key but disagree on semantics
    /// (e.g. the same sink key with different checked-argument lists).
    #[error("invalid taint policy: {0}")]
    InvalidPolicy(String),

    /// JSON serialization/deserialization error when loading a policy.
    #[error("policy serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Convenience type alias for Results using TaintflowError.
pub type Result<T> = std::result::Result<T, TaintflowError>;

impl TaintflowError {
    /// Create an `InvalidPolicy` error for a conflicting declaration key.
    ///
    /// Use this when indexing finds two declarations that collide on the
    /// same canonical key with differing payloads.
    #[inline]
    pub fn conflicting_key(kind: &str, key: &str) -> Self {
        TaintflowError::InvalidPolicy(format!(
            "conflicting {kind} declarations share key {key:?}"
        ))
    }
}
