//! Tests for the value and frame types

use dbgr_core::types::{CallRecord, CallSite, Dumpable, ErrorReport, RequestContext, ToDump, Variable};
use serde::Serialize;
use serde_json::json;

#[derive(Serialize)]
struct User
{
    id: u32,
    name: &'static str,
}

#[test]
fn test_struct_is_serialized_with_type_name()
{
    let variable = Variable::new("user", &User { id: 1, name: "ada" });
    assert_eq!(variable.name, "user");
    match variable.value {
        Dumpable::Value { type_name, value } => {
            assert!(type_name.ends_with("User"));
            assert_eq!(value, json!({"id": 1, "name": "ada"}));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_explicit_backtrace_is_not_sniffed()
{
    // Data shaped like a stack stays ordinary data
    let lookalike = json!([{"file": "src/main.rs", "line": 3, "function": "main"}]);
    assert!(matches!(lookalike.to_dump(), Dumpable::Value { .. }));

    let trace = Dumpable::backtrace(vec![CallRecord::at("src/main.rs", 3).with_function("main")]);
    assert!(matches!(trace, Dumpable::Backtrace(ref records) if records.len() == 1));
}

#[test]
fn test_error_report_to_dump()
{
    let err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
    let report = ErrorReport::new(&err);
    assert_eq!(report.message, "missing");
    assert!(matches!(report.to_dump(), Dumpable::Error(_)));
}

#[test]
fn test_call_site_to_record()
{
    let record = CallSite::new("src/jobs.rs", 12, "app::jobs::Worker::run").to_record();
    assert_eq!(record.file.as_deref(), Some("src/jobs.rs"));
    assert_eq!(record.line, Some(12));
    assert_eq!(record.owner.as_deref(), Some("app::jobs::Worker"));
    assert_eq!(record.function.as_deref(), Some("run"));
}

#[test]
fn test_call_site_macro_names_enclosing_function()
{
    let site = dbgr_core::call_site!();
    assert!(site.function.ends_with("test_call_site_macro_names_enclosing_function"));
    assert!(site.file.ends_with("types.rs"));
}

#[test]
fn test_request_context_builders()
{
    let request = RequestContext::new()
        .with_client_addr("10.0.0.5")
        .with_query("page", 2)
        .with_form("q", "rust")
        .with_session("user", json!({"id": 1}));

    assert_eq!(request.client_addr.as_deref(), Some("10.0.0.5"));
    assert_eq!(request.query["page"], json!(2));
    assert_eq!(request.form["q"], json!("rust"));
    assert!(request.server.is_empty());
}
