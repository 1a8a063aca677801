//! Common module for library exports

pub use crate::config::Config;
pub use crate::counter::Countable;
pub use crate::env::Environment;
pub use crate::error::{DumpError, DumpResult};
pub use crate::session::{Flow, Session};
pub use crate::types::{CallRecord, CallSite, Dumpable, ErrorReport, RequestContext, ToDump, Variable};
pub use crate::{call_site, die_after, die_now, dump, dump_conditional, dump_on_true};
