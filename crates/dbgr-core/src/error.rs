//! # Error Types
//!
//! Error handling for dump sessions.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.
//!
//! Most of what a dump session does cannot fail: rendering is pure string
//! building. Errors come from the edges, namely reading configuration,
//! writing to the output stream or the log directory, and misuse of the
//! counter helpers.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for dump session operations
///
/// ## Error Categories
///
/// 1. **Configuration errors**: ConfigNotFound, ConfigParse
/// 2. **Counter errors**: NotCountable, UnknownCounter
/// 3. **I/O errors**: Io (output stream, log directory, HTML log files)
#[derive(Error, Debug)]
pub enum DumpError
{
    /// An explicitly requested configuration file does not exist
    ///
    /// Only [`crate::Config::load`] and [`crate::Session::load_config`] return
    /// this. The optional local `dbgr.json` picked up at startup is skipped
    /// silently when missing.
    #[error("Configuration file {} not found", .0.display())]
    ConfigNotFound(PathBuf),

    /// A configuration file exists but is not valid JSON for [`crate::Config`]
    ///
    /// [`crate::Session::load_config`] reports this through `echo` and keeps
    /// the current configuration instead of returning it.
    #[error("Invalid configuration: {0}")]
    ConfigParse(String),

    /// The value given to `set_counter` has no meaningful length
    ///
    /// Examples:
    /// - A JSON string or boolean
    /// - A negative integer
    #[error("Argument is not countable: {0}")]
    NotCountable(String),

    /// `increment_counter` was called for a counter that was never set up
    ///
    /// ## Solution
    ///
    /// Call `set_counter(name, total)` before incrementing.
    #[error("Counter '{0}' has not been set")]
    UnknownCounter(String),

    /// I/O error (output stream, log directory, log files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for DumpError
{
    fn from(err: serde_json::Error) -> Self
    {
        DumpError::ConfigParse(err.to_string())
    }
}

/// Convenience type alias for `Result<T, DumpError>`
///
/// ```rust
/// use dbgr_core::error::DumpResult;
/// fn foo() -> DumpResult<()>
/// {
///     Ok(())
/// }
/// ```
pub type DumpResult<T> = std::result::Result<T, DumpError>;
