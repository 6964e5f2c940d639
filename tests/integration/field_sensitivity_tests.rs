//! Field-sensitive flow tests.
//!
//! Struct fields are tracked individually: a constructor storing user
//! input into one field taints reads of that field and nothing else, and
//! joins over branches preserve per-field precision.

use taintflow::config::{Sink, Source, TaintPolicy};
use taintflow::ssa::{FunctionBuilder, Location, ProgramBuilder, TypeRef};
use taintflow::taint::Analyzer;

fn web_policy() -> TaintPolicy {
    TaintPolicy {
        sources: vec![
            Source::typed("net/http", "Request", true),
            Source::function("os", "Getenv"),
        ],
        sinks: vec![Sink::method("database/sql", "DB", true, "Query").check_args([1])],
        sanitizers: vec![],
    }
}

// =============================================================================
// Scenario: constructor-of-struct
// =============================================================================

/// newConfig(v string) *Config { return &Config{Value: v} }
/// handler(req, db) {
///     cfg := newConfig(req.FormValue("q"))
///     db.Query(cfg.Value)
/// }
#[test]
fn test_constructor_stored_field_is_traced_into_callee() {
    let mut pb = ProgramBuilder::new("app");
    let form_value = pb.declare_method("net/http", "Request", true, "FormValue");
    let db_query = pb.declare_method("database/sql", "DB", true, "Query");
    let new_config = pb.declare_function("newConfig");
    let handler = pb.declare_function("handler");

    // newConfig body: allocate, store the parameter into field 0, return.
    let mut cb = FunctionBuilder::new();
    let v = cb.param(TypeRef::Opaque);
    let cfg = cb.alloc(TypeRef::named("app", "Config"));
    let value_addr = cb.field_addr(cfg, 0);
    cb.store(value_addr, v);
    cb.ret(vec![cfg]);
    pb.set_body(new_config, cb);

    let mut hb = FunctionBuilder::new();
    let req = hb.param(TypeRef::pointer_to("net/http", "Request"));
    let db = hb.param(TypeRef::pointer_to("database/sql", "DB"));
    let key = hb.constant();
    let input = hb.call_static(form_value, vec![req, key]);
    let cfg = hb.call_static(new_config, vec![input]);
    let value_addr = hb.field_addr(cfg, 0);
    let value = hb.un_op(value_addr);
    hb.at(Location::new("handler.go", 22, 2));
    hb.call_static(db_query, vec![db, value]);
    hb.ret(vec![]);
    pb.set_body(handler, hb);

    let program = pb.finish();
    let analyzer = Analyzer::new(&web_policy()).unwrap();

    let findings = analyzer.analyze(&program, &[new_config, handler]);
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].location, Location::new("handler.go", 22, 2));
}

/// A constructor that returns its struct through a (value, error) tuple is
/// traced the same way.
#[test]
fn test_constructor_behind_tuple_extract() {
    let mut pb = ProgramBuilder::new("app");
    let form_value = pb.declare_method("net/http", "Request", true, "FormValue");
    let db_query = pb.declare_method("database/sql", "DB", true, "Query");
    let new_job = pb.declare_function("newJob");
    let handler = pb.declare_function("handler");

    let mut jb = FunctionBuilder::new();
    let v = jb.param(TypeRef::Opaque);
    let job = jb.alloc(TypeRef::named("app", "Job"));
    let query_addr = jb.field_addr(job, 0);
    jb.store(query_addr, v);
    let nil = jb.constant();
    jb.ret(vec![job, nil]);
    pb.set_body(new_job, jb);

    let mut hb = FunctionBuilder::new();
    let req = hb.param(TypeRef::pointer_to("net/http", "Request"));
    let db = hb.param(TypeRef::pointer_to("database/sql", "DB"));
    let key = hb.constant();
    let input = hb.call_static(form_value, vec![req, key]);
    let tuple = hb.call_static(new_job, vec![input]);
    let job = hb.extract(tuple, 0);
    let query_addr = hb.field_addr(job, 0);
    let q = hb.un_op(query_addr);
    hb.call_static(db_query, vec![db, q]);
    hb.ret(vec![]);
    pb.set_body(handler, hb);

    let program = pb.finish();
    let analyzer = Analyzer::new(&web_policy()).unwrap();
    assert_eq!(analyzer.analyze(&program, &[handler]).len(), 1);
}

/// A constructor storing the tainted argument into a *different* field
/// than the one read stays clean.
#[test]
fn test_unread_field_does_not_taint_sibling() {
    let mut pb = ProgramBuilder::new("app");
    let form_value = pb.declare_method("net/http", "Request", true, "FormValue");
    let db_query = pb.declare_method("database/sql", "DB", true, "Query");
    let new_config = pb.declare_function("newConfig");
    let handler = pb.declare_function("handler");

    // Field 1 gets the tainted value, field 0 gets a constant.
    let mut cb = FunctionBuilder::new();
    let v = cb.param(TypeRef::Opaque);
    let cfg = cb.alloc(TypeRef::named("app", "Config"));
    let audit_addr = cb.field_addr(cfg, 1);
    cb.store(audit_addr, v);
    let lit = cb.constant();
    let value_addr = cb.field_addr(cfg, 0);
    cb.store(value_addr, lit);
    cb.ret(vec![cfg]);
    pb.set_body(new_config, cb);

    let mut hb = FunctionBuilder::new();
    let req = hb.param(TypeRef::pointer_to("net/http", "Request"));
    let db = hb.param(TypeRef::pointer_to("database/sql", "DB"));
    let key = hb.constant();
    let input = hb.call_static(form_value, vec![req, key]);
    let cfg = hb.call_static(new_config, vec![input]);
    let value_addr = hb.field_addr(cfg, 0);
    let value = hb.un_op(value_addr);
    hb.call_static(db_query, vec![db, value]);
    hb.ret(vec![]);
    pb.set_body(handler, hb);

    let program = pb.finish();
    let analyzer = Analyzer::new(&web_policy()).unwrap();
    assert!(analyzer.analyze(&program, &[handler]).is_empty());
}

// =============================================================================
// Scenario: phi join
// =============================================================================

/// Two branches build &Query{SQL: req.FormValue(...)} and &Query{SQL:
/// "literal"}; the join block reads q.SQL. Either tainted edge fires.
#[test]
fn test_phi_join_over_branch_allocations() {
    let mut pb = ProgramBuilder::new("app");
    let form_value = pb.declare_method("net/http", "Request", true, "FormValue");
    let db_query = pb.declare_method("database/sql", "DB", true, "Query");
    let handler = pb.declare_function("handler");

    let mut fb = FunctionBuilder::new();
    let req = fb.param(TypeRef::pointer_to("net/http", "Request"));
    let db = fb.param(TypeRef::pointer_to("database/sql", "DB"));
    let key = fb.constant();
    let input = fb.call_static(form_value, vec![req, key]);

    // then-branch
    let a = fb.alloc(TypeRef::named("app", "Query"));
    let sql_a = fb.field_addr(a, 0);
    fb.store(sql_a, input);

    // else-branch
    fb.start_block();
    let lit = fb.constant();
    let b = fb.alloc(TypeRef::named("app", "Query"));
    let sql_b = fb.field_addr(b, 0);
    fb.store(sql_b, lit);

    // join
    fb.start_block();
    let q = fb.phi(vec![a, b]);
    let sql_addr = fb.field_addr(q, 0);
    let sql = fb.un_op(sql_addr);
    fb.call_static(db_query, vec![db, sql]);
    fb.ret(vec![]);
    pb.set_body(handler, fb);

    let program = pb.finish();
    let analyzer = Analyzer::new(&web_policy()).unwrap();
    assert_eq!(analyzer.analyze(&program, &[handler]).len(), 1);
}

/// The same join with both branches storing literals stays clean.
#[test]
fn test_phi_join_of_clean_branches() {
    let mut pb = ProgramBuilder::new("app");
    let db_query = pb.declare_method("database/sql", "DB", true, "Query");
    let handler = pb.declare_function("handler");

    let mut fb = FunctionBuilder::new();
    let db = fb.param(TypeRef::pointer_to("database/sql", "DB"));

    let lit_a = fb.constant();
    let a = fb.alloc(TypeRef::named("app", "Query"));
    let sql_a = fb.field_addr(a, 0);
    fb.store(sql_a, lit_a);

    fb.start_block();
    let lit_b = fb.constant();
    let b = fb.alloc(TypeRef::named("app", "Query"));
    let sql_b = fb.field_addr(b, 0);
    fb.store(sql_b, lit_b);

    fb.start_block();
    let q = fb.phi(vec![a, b]);
    let sql_addr = fb.field_addr(q, 0);
    let sql = fb.un_op(sql_addr);
    fb.call_static(db_query, vec![db, sql]);
    fb.ret(vec![]);
    pb.set_body(handler, fb);

    let program = pb.finish();
    let analyzer = Analyzer::new(&web_policy()).unwrap();
    assert!(analyzer.analyze(&program, &[handler]).is_empty());
}

// =============================================================================
// Scenario: nested field path (documented limitation)
// =============================================================================

/// req := &Request{Query: &Query{SQL: r.FormValue("input")}}
/// db.Query(req.Query.SQL)
///
/// Field sensitivity resolves only the outermost field; chains through a
/// loaded inner struct pointer degrade and report nothing.
#[test]
fn test_nested_field_path_is_a_known_zero() {
    let mut pb = ProgramBuilder::new("app");
    let form_value = pb.declare_method("net/http", "Request", true, "FormValue");
    let db_query = pb.declare_method("database/sql", "DB", true, "Query");
    let handler = pb.declare_function("handler");

    let mut fb = FunctionBuilder::new();
    let r = fb.param(TypeRef::pointer_to("net/http", "Request"));
    let db = fb.param(TypeRef::pointer_to("database/sql", "DB"));
    let key = fb.constant();
    let input = fb.call_static(form_value, vec![r, key]);

    let inner = fb.alloc(TypeRef::named("app", "Query"));
    let sql_addr = fb.field_addr(inner, 0);
    fb.store(sql_addr, input);

    let outer = fb.alloc(TypeRef::named("app", "Request"));
    let inner_field = fb.field_addr(outer, 0);
    fb.store(inner_field, inner);

    let read_inner_addr = fb.field_addr(outer, 0);
    let inner_ptr = fb.un_op(read_inner_addr);
    let deep_sql_addr = fb.field_addr(inner_ptr, 0);
    let deep_sql = fb.un_op(deep_sql_addr);
    fb.call_static(db_query, vec![db, deep_sql]);
    fb.ret(vec![]);
    pb.set_body(handler, fb);

    let program = pb.finish();
    let analyzer = Analyzer::new(&web_policy()).unwrap();
    assert!(analyzer.analyze(&program, &[handler]).is_empty());
}
