//! # Types
//!
//! Plain data shared by the renderers and the session.
//!
//! - [`CallRecord`] / [`CallSite`]: one stack frame and the location of a dump call
//! - [`Dumpable`] / [`Variable`]: values handed to a dump, tagged by kind
//! - [`RequestContext`]: the web request a session is serving, if any

pub mod frame;
pub mod request;
pub mod value;

// Re-export all public types
pub use frame::{CallRecord, CallSite};
pub use request::RequestContext;
pub use value::{Dumpable, ErrorReport, ToDump, Variable};
