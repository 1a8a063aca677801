//! # Configuration
//!
//! Settings that outlive a single dump: where HTML logs go, which clients may
//! see dumps, and how to link into an editor or an Adminer instance.
//!
//! Configuration is layered:
//!
//! 1. Built-in defaults (`assets/defaults.json`)
//! 2. A local file: the path in `DBGR_CONFIG`, or `dbgr.json` in the working directory
//! 3. Explicit overrides passed to [`crate::Session::set_config`] or
//!    [`crate::Session::load_config`]
//!
//! Later layers override scalar settings and extend the IP allow-list.
//!
//! ## File format
//!
//! ```json
//! {
//!     "logDir": "var/log/dbgr",
//!     "allowedIPAddresses": ["10.0.0.12"],
//!     "adminerUrlLink": "http://localhost/adminer.php",
//!     "adminerDatabaseName": "app",
//!     "adminerUsername": "develop",
//!     "editorUri": "phpstorm://open?file=%file&line=%line"
//! }
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DumpError, DumpResult};

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV: &str = "DBGR_CONFIG";

/// File name looked up in the working directory when `DBGR_CONFIG` is unset.
pub const LOCAL_CONFIG_FILE: &str = "dbgr.json";

const DEFAULTS: &str = include_str!("../assets/defaults.json");

/// Merged configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config
{
    /// Base directory of the HTML log files written by `set_file`.
    pub log_dir: Option<PathBuf>,
    /// Client addresses allowed to see dumps, on top of the local ones.
    #[serde(rename = "allowedIPAddresses")]
    pub allowed_ip_addresses: Vec<String>,
    /// URL of an Adminer instance used for "open query" links.
    pub adminer_url_link: Option<String>,
    /// Database selected in Adminer links.
    pub adminer_database_name: Option<String>,
    /// User name used in Adminer links.
    pub adminer_username: Option<String>,
    /// Editor link template with `%file` and `%line` placeholders.
    pub editor_uri: Option<String>,
}

impl Config
{
    /// The built-in defaults.
    pub fn defaults() -> Self
    {
        // The embedded file is part of the crate and always parses
        Self::from_json_str(DEFAULTS).unwrap_or_default()
    }

    /// Parse a JSON document.
    ///
    /// ## Errors
    ///
    /// `ConfigParse` if the document is not a JSON object with the expected keys.
    pub fn from_json_str(json: &str) -> DumpResult<Self>
    {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a configuration file.
    ///
    /// ## Errors
    ///
    /// - `ConfigNotFound` if `path` does not exist
    /// - `Io` if it cannot be read
    /// - `ConfigParse` if it is not valid configuration JSON
    pub fn load(path: impl AsRef<Path>) -> DumpResult<Self>
    {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DumpError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Where the optional local configuration file lives.
    pub fn local_path() -> PathBuf
    {
        env::var_os(CONFIG_ENV).map_or_else(|| PathBuf::from(LOCAL_CONFIG_FILE), PathBuf::from)
    }

    /// Defaults merged with the local configuration file when one exists.
    ///
    /// ## Errors
    ///
    /// Returns the defaults alongside the error when the local file exists but
    /// cannot be read or parsed, so callers can report it and carry on.
    pub fn discover() -> (Self, Option<DumpError>)
    {
        let mut config = Self::defaults();
        let local = Self::local_path();
        if !local.exists() {
            return (config, None);
        }

        match Self::load(&local) {
            Ok(overrides) => {
                tracing::debug!(path = %local.display(), "merged local configuration");
                config.merge(overrides);
                (config, None)
            }
            Err(err) => (config, Some(err)),
        }
    }

    /// Layer `overrides` on top of `self`.
    ///
    /// Set scalar values replace ours; an empty editor template is ignored.
    /// Allowed addresses are appended, skipping duplicates.
    pub fn merge(&mut self, overrides: Config)
    {
        if overrides.log_dir.is_some() {
            self.log_dir = overrides.log_dir;
        }
        for addr in overrides.allowed_ip_addresses {
            if !self.allowed_ip_addresses.contains(&addr) {
                self.allowed_ip_addresses.push(addr);
            }
        }
        if overrides.adminer_url_link.is_some() {
            self.adminer_url_link = overrides.adminer_url_link;
        }
        if overrides.adminer_database_name.is_some() {
            self.adminer_database_name = overrides.adminer_database_name;
        }
        if overrides.adminer_username.is_some() {
            self.adminer_username = overrides.adminer_username;
        }
        if overrides.editor_uri.as_deref().is_some_and(|uri| !uri.is_empty()) {
            self.editor_uri = overrides.editor_uri;
        }
    }

    /// Merge and return `self`, for building configurations inline.
    #[must_use]
    pub fn merged(mut self, overrides: Config) -> Self
    {
        self.merge(overrides);
        self
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_defaults_parse()
    {
        let config = Config::defaults();
        assert_eq!(config.log_dir, Some(PathBuf::from("log")));
        assert!(config.allowed_ip_addresses.is_empty());
        assert_eq!(config.adminer_username.as_deref(), Some("develop"));
        assert!(config.editor_uri.as_deref().is_some_and(|uri| uri.contains("%file")));
    }

    #[test]
    fn test_camel_case_keys()
    {
        let config = Config::from_json_str(
            r#"{"logDir": "/tmp/dbgr", "allowedIPAddresses": ["10.0.0.1"], "adminerDatabaseName": "test"}"#,
        )
        .unwrap();
        assert_eq!(config.log_dir, Some(PathBuf::from("/tmp/dbgr")));
        assert_eq!(config.allowed_ip_addresses, vec!["10.0.0.1".to_string()]);
        assert_eq!(config.adminer_database_name.as_deref(), Some("test"));
        assert_eq!(config.adminer_url_link, None);
    }

    #[test]
    fn test_merge_extends_addresses_and_overrides_scalars()
    {
        let mut base = Config {
            log_dir: Some(PathBuf::from("log")),
            allowed_ip_addresses: vec!["10.0.0.1".into()],
            editor_uri: Some("editor://open/?file=%file&line=%line".into()),
            ..Config::default()
        };
        base.merge(Config {
            log_dir: Some(PathBuf::from("other")),
            allowed_ip_addresses: vec!["10.0.0.1".into(), "10.0.0.2".into()],
            editor_uri: Some(String::new()),
            ..Config::default()
        });

        assert_eq!(base.log_dir, Some(PathBuf::from("other")));
        assert_eq!(base.allowed_ip_addresses, vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()]);
        assert_eq!(base.editor_uri.as_deref(), Some("editor://open/?file=%file&line=%line"));
    }

    #[test]
    fn test_malformed_json_is_parse_error()
    {
        let err = Config::from_json_str("{ logDir: ").unwrap_err();
        assert!(matches!(err, DumpError::ConfigParse(_)));
    }
}
