//! Policy loading and indexing tests.

use taintflow::config::{presets, PolicyIndex, Sanitizer, Sink, Source, TaintPolicy};
use taintflow::TaintflowError;

#[test]
fn test_policy_round_trips_through_json() {
    let policy = presets::sql_injection();
    let json = policy.to_json().unwrap();
    let back = TaintPolicy::from_json(&json).unwrap();
    assert_eq!(policy, back);
}

#[test]
fn test_policy_loads_from_handwritten_json() {
    let json = r#"{
        "sources": [
            {"package": "net/http", "name": "Request", "pointer": true},
            {"package": "os", "name": "Getenv", "is_func": true}
        ],
        "sinks": [
            {"package": "database/sql", "receiver": "DB", "method": "Query",
             "pointer": true, "check_args": [1]}
        ],
        "sanitizers": [
            {"package": "html", "method": "EscapeString"}
        ]
    }"#;

    let policy = TaintPolicy::from_json(json).unwrap();
    assert_eq!(policy.sources.len(), 2);
    assert!(policy.sources[0].pointer);
    assert!(!policy.sources[0].is_func);
    assert!(policy.sources[1].is_func);
    assert_eq!(policy.sinks[0].check_args, vec![1]);

    let index = PolicyIndex::new(&policy).unwrap();
    assert!(index.sink("(*database/sql.DB).Query").is_some());
    assert!(index.is_sanitizer("html.EscapeString"));
    assert!(index.func_source("os.Getenv").is_some());
    assert!(index.source("*net/http.Request").is_some());
}

#[test]
fn test_malformed_json_is_rejected() {
    assert!(matches!(
        TaintPolicy::from_json("[1, 2,").unwrap_err(),
        TaintflowError::Serde(_)
    ));
}

#[test]
fn test_conflicting_declarations_fail_construction() {
    let policy = TaintPolicy {
        sources: vec![],
        sinks: vec![
            Sink::method("database/sql", "DB", true, "Query").check_args([1]),
            Sink::method("database/sql", "DB", true, "Query"),
        ],
        sanitizers: vec![],
    };
    let err = PolicyIndex::new(&policy).unwrap_err();
    assert!(matches!(err, TaintflowError::InvalidPolicy(_)));
    assert!(err.to_string().contains("(*database/sql.DB).Query"));
}

#[test]
fn test_overlapping_identical_declarations_are_silently_accepted() {
    let policy = TaintPolicy {
        sources: vec![
            Source::typed("net/http", "Request", true),
            Source::typed("net/http", "Request", true),
        ],
        sinks: vec![],
        sanitizers: vec![
            Sanitizer::function("html", "EscapeString"),
            Sanitizer::function("html", "EscapeString"),
        ],
    };
    assert!(PolicyIndex::new(&policy).is_ok());
}

#[test]
fn test_pointer_distinguishes_source_keys() {
    let policy = TaintPolicy {
        sources: vec![
            Source::typed("net/http", "Request", true),
            Source::typed("net/http", "Request", false),
        ],
        sinks: vec![],
        sanitizers: vec![],
    };
    // Different keys, so no conflict.
    let index = PolicyIndex::new(&policy).unwrap();
    assert!(index.source("*net/http.Request").is_some());
    assert!(index.source("net/http.Request").is_some());
}
