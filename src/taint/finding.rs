//! Finding and rule types for taint analysis results.

use serde::{Deserialize, Serialize};

use crate::config::Sink;
use crate::ssa::Location;

// =============================================================================
// Severity
// =============================================================================

/// Severity of a detected taint flow.
/// Follows standard vulnerability scoring conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational - may not be exploitable but worth reviewing
    Info,
    /// Low severity - limited impact or requires specific conditions
    Low,
    /// Medium severity - potential for significant impact
    Medium,
    /// High severity - likely exploitable with serious impact
    High,
    /// Critical - easily exploitable with severe consequences
    Critical,
}

impl Default for Severity {
    fn default() -> Self {
        Self::Medium
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" | "informational" => Ok(Self::Info),
            "low" => Ok(Self::Low),
            "medium" | "med" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" | "crit" => Ok(Self::Critical),
            _ => Err(format!("Unknown severity: {s}")),
        }
    }
}

// =============================================================================
// Rule Metadata
// =============================================================================

/// Identifying metadata attached to every finding an analyzer emits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Stable rule identifier (e.g. `TF101`).
    pub id: String,
    /// Human-readable description of the vulnerability class.
    pub description: String,
    /// Severity assigned to flows this rule detects.
    pub severity: Severity,
}

impl Rule {
    /// Create a rule.
    pub fn new(id: impl Into<String>, description: impl Into<String>, severity: Severity) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            severity,
        }
    }
}

// =============================================================================
// Finding
// =============================================================================

/// A detected taint flow: tainted data reaches a checked argument of a
/// configured sink call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Rule metadata, when the analyzer carries any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<Rule>,
    /// The matched sink declaration.
    pub sink: Sink,
    /// Source position of the sink call.
    pub location: Location,
    /// Call path from a root entry function down to the function containing
    /// the sink call, as qualified symbol keys. Never empty; the last
    /// element is the sink call's containing function.
    pub path: Vec<String>,
}

impl Finding {
    /// The function containing the sink call.
    #[inline]
    pub fn sink_function(&self) -> &str {
        self.path.last().map(String::as_str).unwrap_or("")
    }
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(rule) = &self.rule {
            write!(f, "[{}] [{}] ", rule.id, rule.severity)?;
        }
        write!(
            f,
            "tainted data reaches {} at {} (via {})",
            self.sink.key(),
            self.location,
            self.path.join(" -> ")
        )
    }
}

// =============================================================================
// Tests
// =============================================================================
