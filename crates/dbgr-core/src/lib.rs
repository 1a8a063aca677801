//! # dbgr-core
//!
//! Variable dumps for developers: capture where a dump was requested, render
//! any value as HTML, ANSI-colored or plain text, and deliver it to the page
//! being served, a script response, an HTML log file, or the console.
//!
//! This crate provides:
//! - Call-site and call-stack capture ([`backtrace`], [`call_site!`])
//! - A value renderer for anything `Serialize` ([`render`])
//! - SQL recognition and highlighting ([`sql`])
//! - Environment and permission detection ([`env`])
//! - Output routing ([`output`]) driven by a [`Session`]
//! - Counters, conditions and "die after N calls" helpers ([`counter`], [`Flow`])
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use dbgr_core::{die_after, dump, Session};
//!
//! let mut session = Session::new();
//! for row in [1, 2, 3] {
//!     dump!(session, row).unwrap();
//!     if die_after!(session, 2).unwrap().is_halt() {
//!         std::process::exit(0);
//!     }
//! }
//! ```
//!
//! ## State
//!
//! All state lives in an explicit [`Session`] value. Create one per process
//! (console tools) or per request (web handlers, via
//! [`Session::set_request`]). Nothing is global.

pub mod backtrace;
pub mod config;
pub mod counter;
pub mod env;
pub mod error;
mod macros;
pub mod output;
pub mod prelude;
pub mod render;
pub mod session;
pub mod sql;
pub mod types;

pub use config::Config;
pub use env::Environment;
// Re-export commonly used types
pub use error::{DumpError, DumpResult};
pub use session::{Flow, Session};
pub use types::{CallRecord, CallSite, Dumpable, ErrorReport, RequestContext, ToDump, Variable};
