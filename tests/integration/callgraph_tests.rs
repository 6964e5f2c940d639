//! Call graph and shared cache tests.

use std::sync::Arc;

use taintflow::callgraph::{CallGraph, PackageAnalysisCache};
use taintflow::config::{Sink, Source, TaintPolicy};
use taintflow::ssa::{FunctionBuilder, ProgramBuilder, TypeRef};
use taintflow::taint::Analyzer;

fn policy() -> TaintPolicy {
    TaintPolicy {
        sources: vec![Source::function("os", "Getenv")],
        sinks: vec![Sink::method("database/sql", "DB", true, "Query").check_args([1])],
        sanitizers: vec![],
    }
}

/// main -> middle -> leaf, where leaf contains the sink and main supplies
/// the tainted value; the reconstructed path lists the whole chain.
#[test]
fn test_path_reconstruction_walks_to_the_root() {
    let mut pb = ProgramBuilder::new("app");
    let getenv = pb.declare_external("os", "Getenv");
    let query = pb.declare_method("database/sql", "DB", true, "Query");
    let leaf = pb.declare_function("leaf");
    let middle = pb.declare_function("middle");
    let main = pb.declare_function("main");

    let mut lb = FunctionBuilder::new();
    let db = lb.param(TypeRef::pointer_to("database/sql", "DB"));
    let q = lb.param(TypeRef::Opaque);
    lb.call_static(query, vec![db, q]);
    lb.ret(vec![]);
    pb.set_body(leaf, lb);

    let mut mb = FunctionBuilder::new();
    let db = mb.param(TypeRef::pointer_to("database/sql", "DB"));
    let q = mb.param(TypeRef::Opaque);
    mb.call_static(leaf, vec![db, q]);
    mb.ret(vec![]);
    pb.set_body(middle, mb);

    let mut rb = FunctionBuilder::new();
    let db = rb.param(TypeRef::pointer_to("database/sql", "DB"));
    let key = rb.constant();
    let env = rb.call_static(getenv, vec![key]);
    rb.call_static(middle, vec![db, env]);
    rb.ret(vec![]);
    pb.set_body(main, rb);

    let program = pb.finish();
    let analyzer = Analyzer::new(&policy()).unwrap();

    let findings = analyzer.analyze(&program, &[leaf]);
    assert_eq!(findings.len(), 1);
    assert_eq!(
        findings[0].path,
        vec!["app.main", "app.middle", "app.leaf"]
    );
}

/// Mutually recursive callers terminate path reconstruction via the cycle
/// guard instead of looping.
#[test]
fn test_path_reconstruction_survives_recursion() {
    let mut pb = ProgramBuilder::new("app");
    let getenv = pb.declare_external("os", "Getenv");
    let query = pb.declare_method("database/sql", "DB", true, "Query");
    let ping = pb.declare_function("ping");
    let pong = pb.declare_function("pong");

    let mut gb = FunctionBuilder::new();
    let db = gb.param(TypeRef::pointer_to("database/sql", "DB"));
    let key = gb.constant();
    let env = gb.call_static(getenv, vec![key]);
    gb.call_static(pong, vec![db, env]);
    gb.ret(vec![]);
    pb.set_body(ping, gb);

    let mut ob = FunctionBuilder::new();
    let db = ob.param(TypeRef::pointer_to("database/sql", "DB"));
    let q = ob.param(TypeRef::Opaque);
    ob.call_static(query, vec![db, q]);
    ob.call_static(ping, vec![db]);
    ob.ret(vec![]);
    pb.set_body(pong, ob);

    let program = pb.finish();
    let analyzer = Analyzer::new(&policy()).unwrap();

    let findings = analyzer.analyze(&program, &[ping, pong]);
    assert_eq!(findings.len(), 1);
    let path = &findings[0].path;
    assert!(!path.is_empty());
    assert_eq!(path.last().unwrap(), "app.pong");
}

/// A shared cache hands every analyzer the same graph instance.
#[test]
fn test_shared_cache_reuses_one_graph_across_analyzers() {
    let mut pb = ProgramBuilder::new("app");
    let f = pb.declare_function("f");
    let mut fb = FunctionBuilder::new();
    fb.ret(vec![]);
    pb.set_body(f, fb);
    let program = pb.finish();

    let cache = PackageAnalysisCache::new(&program);
    let graph_before: Arc<CallGraph> = cache.call_graph().unwrap();

    let sql = Analyzer::new(&policy()).unwrap();
    let xss = Analyzer::new(&taintflow::config::presets::response_write_xss()).unwrap();
    sql.analyze_with_cache(&program, &[f], &cache);
    xss.analyze_with_cache(&program, &[f], &cache);

    let graph_after = cache.call_graph().unwrap();
    assert!(Arc::ptr_eq(&graph_before, &graph_after));
}

/// Without interprocedural context (absent graph), parameter taint from
/// callers is invisible but intraprocedural flows still fire.
#[test]
fn test_absent_graph_degrades_to_intraprocedural() {
    let mut pb = ProgramBuilder::new("app");
    let getenv = pb.declare_external("os", "Getenv");
    let query = pb.declare_method("database/sql", "DB", true, "Query");
    let handler = pb.declare_function("handler");

    let mut fb = FunctionBuilder::new();
    let db = fb.param(TypeRef::pointer_to("database/sql", "DB"));
    let key = fb.constant();
    let env = fb.call_static(getenv, vec![key]);
    fb.call_static(query, vec![db, env]);
    fb.ret(vec![]);
    pb.set_body(handler, fb);
    let program = pb.finish();

    let analyzer = Analyzer::new(&policy()).unwrap();
    let cache = PackageAnalysisCache::absent();

    let findings = analyzer.analyze_with_cache(&program, &[handler], &cache);
    assert_eq!(findings.len(), 1);
    // No graph: the path degenerates to the containing function alone.
    assert_eq!(findings[0].path, vec!["app.handler"]);
}
