//! Built-in taint policies.
//!
//! Curated source/sink/sanitizer sets for the common injection classes,
//! covering the Go standard library surface the analyzer is most often
//! pointed at. Hosts can use these as-is, extend them, or load their own
//! policies from JSON.

use super::{Sanitizer, Sink, Source, TaintPolicy};

/// Sources shared by every preset: externally supplied request data,
/// environment access, and process arguments.
fn untrusted_input_sources() -> Vec<Source> {
    vec![
        Source::typed("net/http", "Request", true),
        Source::function("os", "Getenv"),
        Source::function("os", "ReadFile"),
        Source::typed("os", "Args", false),
        Source::function("bufio", "ReadString"),
        Source::function("io", "ReadAll"),
    ]
}

/// SQL injection: untrusted input reaching `database/sql` query methods.
///
/// The query string is argument 1 on every method (the receiver occupies
/// position 0), so only that position is checked.
pub fn sql_injection() -> TaintPolicy {
    let query_arg = [1usize];
    TaintPolicy {
        sources: untrusted_input_sources(),
        sinks: vec![
            Sink::method("database/sql", "DB", true, "Query").check_args(query_arg),
            Sink::method("database/sql", "DB", true, "QueryRow").check_args(query_arg),
            Sink::method("database/sql", "DB", true, "Exec").check_args(query_arg),
            Sink::method("database/sql", "DB", true, "Prepare").check_args(query_arg),
            // Context variants take ctx at position 1, the query at 2.
            Sink::method("database/sql", "DB", true, "QueryContext").check_args([2]),
            Sink::method("database/sql", "DB", true, "ExecContext").check_args([2]),
            Sink::method("database/sql", "Tx", true, "Query").check_args(query_arg),
            Sink::method("database/sql", "Tx", true, "Exec").check_args(query_arg),
        ],
        sanitizers: vec![],
    }
}

/// Command injection: untrusted input reaching process execution.
pub fn command_injection() -> TaintPolicy {
    TaintPolicy {
        sources: untrusted_input_sources(),
        sinks: vec![
            Sink::function("os/exec", "Command"),
            Sink::function("os/exec", "CommandContext"),
            Sink::function("syscall", "Exec"),
        ],
        sanitizers: vec![],
    }
}

/// Reflected XSS: untrusted input written to an HTTP response without
/// escaping.
pub fn response_write_xss() -> TaintPolicy {
    TaintPolicy {
        sources: untrusted_input_sources(),
        sinks: vec![
            Sink::method("net/http", "ResponseWriter", false, "Write").check_args([1]),
            Sink::function("fmt", "Fprintf").check_args([1, 2]),
        ],
        sanitizers: vec![
            Sanitizer::function("html", "EscapeString"),
            Sanitizer::function("html/template", "HTMLEscapeString"),
            Sanitizer::function("html/template", "JSEscapeString"),
        ],
    }
}

// =============================================================================
// Tests
// =============================================================================
