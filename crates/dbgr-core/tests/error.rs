//! Tests for error handling

use std::io;
use std::path::PathBuf;

use dbgr_core::error::{DumpError, DumpResult};

#[test]
fn test_config_not_found_display()
{
    let error = DumpError::ConfigNotFound(PathBuf::from("/etc/dbgr.json"));
    let message = format!("{}", error);
    assert!(message.contains("/etc/dbgr.json"));
    assert!(message.contains("not found"));
}

#[test]
fn test_config_parse_display()
{
    let error = DumpError::ConfigParse("expected value at line 1 column 2".to_string());
    let message = format!("{}", error);
    assert!(message.contains("Invalid configuration"));
    assert!(message.contains("line 1"));
}

#[test]
fn test_counter_errors_display()
{
    let message = format!("{}", DumpError::NotCountable("rows".to_string()));
    assert!(message.contains("not countable"));

    let message = format!("{}", DumpError::UnknownCounter("rows".to_string()));
    assert!(message.contains("'rows'"));
}

#[test]
fn test_io_error_conversion()
{
    let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "read-only log dir");
    let error: DumpError = io_err.into();

    match error {
        DumpError::Io(ref inner) => {
            assert_eq!(inner.kind(), io::ErrorKind::PermissionDenied);
        }
        _ => panic!("Expected Io variant"),
    }
    assert!(error.to_string().contains("read-only log dir"));
}

#[test]
fn test_json_error_conversion()
{
    let json_err = serde_json::from_str::<serde_json::Value>("{ nope").unwrap_err();
    let error: DumpError = json_err.into();
    assert!(matches!(error, DumpError::ConfigParse(_)));
}

#[test]
fn test_result_alias()
{
    fn parse(input: &str) -> DumpResult<u32>
    {
        input.parse().map_err(|_| DumpError::ConfigParse(input.to_string()))
    }

    assert_eq!(parse("7").unwrap(), 7);
    assert!(parse("x").is_err());
}
