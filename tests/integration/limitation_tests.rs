//! Regression tests for the documented conservative trade-offs.
//!
//! Each case is a flow a more precise analysis could report; the engine
//! deliberately does not, preferring false negatives over noise. These
//! zeros are contract, not accident - a change that makes one of them
//! fire is a behavior change, not a free improvement.

use taintflow::config::{Sink, Source, TaintPolicy};
use taintflow::ssa::{FunctionBuilder, ProgramBuilder, TypeRef};
use taintflow::taint::Analyzer;

fn policy() -> TaintPolicy {
    TaintPolicy {
        sources: vec![
            Source::function("os", "Getenv"),
            Source::typed("net/http", "Request", true),
        ],
        sinks: vec![Sink::method("database/sql", "DB", true, "Query").check_args([1])],
        sanitizers: vec![],
    }
}

/// Taint written into a map is not carried through a later lookup.
#[test]
fn test_map_value_taint_is_not_tracked() {
    let mut pb = ProgramBuilder::new("app");
    let getenv = pb.declare_external("os", "Getenv");
    let query = pb.declare_method("database/sql", "DB", true, "Query");
    let handler = pb.declare_function("handler");

    let mut fb = FunctionBuilder::new();
    let db = fb.param(TypeRef::pointer_to("database/sql", "DB"));
    let key = fb.constant();
    let env = fb.call_static(getenv, vec![key]);
    let m = fb.make_map();
    fb.call_builtin("mapassign", vec![m, key, env]);
    let read = fb.lookup(m, key);
    fb.call_static(query, vec![db, read]);
    fb.ret(vec![]);
    pb.set_body(handler, fb);

    let program = pb.finish();
    let analyzer = Analyzer::new(&policy()).unwrap();
    assert!(analyzer.analyze(&program, &[handler]).is_empty());
}

/// Assigning to a non-source global and reading it back elsewhere is not
/// tracked as a flow.
#[test]
fn test_global_round_trip_is_not_tracked() {
    let mut pb = ProgramBuilder::new("app");
    let getenv = pb.declare_external("os", "Getenv");
    let query = pb.declare_method("database/sql", "DB", true, "Query");
    let cache = pb.declare_global("app", "lastQuery");
    let writer = pb.declare_function("writer");
    let reader = pb.declare_function("reader");

    let mut wb = FunctionBuilder::new();
    let key = wb.constant();
    let env = wb.call_static(getenv, vec![key]);
    let slot = wb.global_ref(cache);
    wb.store(slot, env);
    wb.ret(vec![]);
    pb.set_body(writer, wb);

    let mut rb = FunctionBuilder::new();
    let db = rb.param(TypeRef::pointer_to("database/sql", "DB"));
    let slot = rb.global_ref(cache);
    let loaded = rb.un_op(slot);
    rb.call_static(query, vec![db, loaded]);
    rb.ret(vec![]);
    pb.set_body(reader, rb);

    let program = pb.finish();
    let analyzer = Analyzer::new(&policy()).unwrap();
    assert!(analyzer.analyze(&program, &[writer, reader]).is_empty());
}

/// A function value assigned and then called indirectly does not
/// propagate the callee's taint.
#[test]
fn test_indirect_call_is_not_tracked() {
    let mut pb = ProgramBuilder::new("app");
    let getenv = pb.declare_external("os", "Getenv");
    let query = pb.declare_method("database/sql", "DB", true, "Query");
    let handler = pb.declare_function("handler");
    let producer = pb.declare_closure(handler, "handler$1");

    let mut prod = FunctionBuilder::new();
    let key = prod.constant();
    let env = prod.call_static(getenv, vec![key]);
    prod.ret(vec![env]);
    pb.set_body(producer, prod);

    let mut fb = FunctionBuilder::new();
    let db = fb.param(TypeRef::pointer_to("database/sql", "DB"));
    let fn_val = fb.make_closure(producer, vec![]);
    let out = fb.call_indirect(fn_val, vec![]);
    fb.call_static(query, vec![db, out]);
    fb.ret(vec![]);
    pb.set_body(handler, fb);

    let program = pb.finish();
    let analyzer = Analyzer::new(&policy()).unwrap();
    assert!(analyzer.analyze(&program, &[handler]).is_empty());
}

/// Purely interface-typed calls propagate receiver/argument taint only:
/// an invoke with clean receiver and clean arguments stays clean even
/// when some implementation of the method would return tainted data.
#[test]
fn test_invoke_result_depends_only_on_receiver_and_args() {
    let mut pb = ProgramBuilder::new("app");
    let query = pb.declare_method("database/sql", "DB", true, "Query");
    // An implementation whose body returns tainted data.
    let getenv = pb.declare_external("os", "Getenv");
    let impl_read = pb.declare_method("app", "EnvReader", false, "Read");
    let handler = pb.declare_function("handler");

    let mut ib = FunctionBuilder::new();
    let _recv = ib.param(TypeRef::named("app", "EnvReader"));
    let key = ib.constant();
    let env = ib.call_static(getenv, vec![key]);
    ib.ret(vec![env]);
    pb.set_body(impl_read, ib);

    let mut fb = FunctionBuilder::new();
    let db = fb.param(TypeRef::pointer_to("database/sql", "DB"));
    let reader = fb.param(TypeRef::Opaque);
    let out = fb.call_invoke("app", "Reader", "Read", vec![reader]);
    fb.call_static(query, vec![db, out]);
    fb.ret(vec![]);
    pb.set_body(handler, fb);

    let program = pb.finish();
    let analyzer = Analyzer::new(&policy()).unwrap();
    assert!(analyzer.analyze(&program, &[handler]).is_empty());
}

/// Depth exhaustion fails closed: an absurdly long derivation chain stops
/// reporting rather than crashing.
#[test]
fn test_deep_chains_fail_closed() {
    let mut pb = ProgramBuilder::new("app");
    let getenv = pb.declare_external("os", "Getenv");
    let query = pb.declare_method("database/sql", "DB", true, "Query");
    let handler = pb.declare_function("handler");

    let mut fb = FunctionBuilder::new();
    let db = fb.param(TypeRef::pointer_to("database/sql", "DB"));
    let key = fb.constant();
    let env = fb.call_static(getenv, vec![key]);

    // 80 conversions: over the depth budget of 50.
    let mut v = env;
    for _ in 0..80 {
        v = fb.convert(v);
    }
    fb.call_static(query, vec![db, v]);
    fb.ret(vec![]);
    pb.set_body(handler, fb);

    let program = pb.finish();
    let analyzer = Analyzer::new(&policy()).unwrap();
    assert!(analyzer.analyze(&program, &[handler]).is_empty());

    // A chain inside the budget still fires.
    let mut pb = ProgramBuilder::new("app");
    let getenv = pb.declare_external("os", "Getenv");
    let query = pb.declare_method("database/sql", "DB", true, "Query");
    let handler = pb.declare_function("handler");

    let mut fb = FunctionBuilder::new();
    let db = fb.param(TypeRef::pointer_to("database/sql", "DB"));
    let key = fb.constant();
    let env = fb.call_static(getenv, vec![key]);
    let mut v = env;
    for _ in 0..10 {
        v = fb.convert(v);
    }
    fb.call_static(query, vec![db, v]);
    fb.ret(vec![]);
    pb.set_body(handler, fb);

    let program = pb.finish();
    let analyzer = Analyzer::new(&policy()).unwrap();
    assert_eq!(analyzer.analyze(&program, &[handler]).len(), 1);
}
