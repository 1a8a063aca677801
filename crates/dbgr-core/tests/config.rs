//! Tests for configuration loading

use std::fs;
use std::path::PathBuf;

use dbgr_core::{Config, DumpError};

#[test]
fn test_load_missing_file()
{
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");

    match Config::load(&path) {
        Err(DumpError::ConfigNotFound(missing)) => assert_eq!(missing, path),
        other => panic!("Expected ConfigNotFound, got {other:?}"),
    }
}

#[test]
fn test_load_and_merge_file()
{
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dbgr.json");
    fs::write(
        &path,
        r#"{"logDir": "var/dumps", "allowedIPAddresses": ["10.1.1.1"], "adminerDatabaseName": "test", "adminerUsername": "develop"}"#,
    )
    .unwrap();

    let config = Config::defaults().merged(Config::load(&path).unwrap());
    assert_eq!(config.log_dir, Some(PathBuf::from("var/dumps")));
    assert_eq!(config.allowed_ip_addresses, vec!["10.1.1.1".to_string()]);
    assert_eq!(config.adminer_database_name.as_deref(), Some("test"));
    assert_eq!(config.editor_uri, Config::defaults().editor_uri);
}

#[test]
fn test_load_malformed_file()
{
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    fs::write(&path, "{ \"logDir\": ").unwrap();

    assert!(matches!(Config::load(&path), Err(DumpError::ConfigParse(_))));
}

#[test]
fn test_unknown_keys_are_ignored()
{
    let config = Config::from_json_str(r#"{"theme": "dark", "logDir": "log"}"#).unwrap();
    assert_eq!(config.log_dir, Some(PathBuf::from("log")));
}
