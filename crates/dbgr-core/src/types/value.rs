//! Values handed to a dump.
//!
//! Every argument of a dump is turned into a [`Dumpable`] before rendering.
//! Ordinary data goes through `serde` and becomes a JSON tree; errors and
//! call stacks are tagged explicitly by the producer so the renderer never has
//! to guess from the shape of the data.

use std::any::type_name;
use std::error::Error;

use serde::Serialize;
use serde_json::{json, Value};

use super::frame::CallRecord;

/// A value ready to be rendered.
#[derive(Debug, Clone, PartialEq)]
pub enum Dumpable
{
    /// Any `Serialize` value, with the Rust type it came from.
    Value
    {
        /// `std::any::type_name` of the original value.
        type_name: &'static str,
        /// Serialized form.
        value: Value,
    },
    /// An error together with its source chain and stack.
    Error(ErrorReport),
    /// A call stack, innermost frame first.
    Backtrace(Vec<CallRecord>),
}

impl Dumpable
{
    /// Serialize any value.
    ///
    /// Serialization failures do not abort the dump; the failure message is
    /// rendered in place of the value.
    pub fn value<T: Serialize + ?Sized>(value: &T) -> Self
    {
        let value = serde_json::to_value(value).unwrap_or_else(|err| Value::String(format!("<unserializable: {err}>")));
        Dumpable::Value {
            type_name: type_name::<T>(),
            value,
        }
    }

    /// A plain message.
    pub fn text(message: impl Into<String>) -> Self
    {
        Dumpable::Value {
            type_name: type_name::<str>(),
            value: Value::String(message.into()),
        }
    }

    /// An error, with the stack captured at the point of this call.
    pub fn error<E: Error + ?Sized>(err: &E) -> Self
    {
        Dumpable::Error(ErrorReport::new(err).with_trace(crate::backtrace::capture()))
    }

    /// A call stack, innermost frame first.
    pub fn backtrace(records: Vec<CallRecord>) -> Self
    {
        Dumpable::Backtrace(records)
    }

    /// The string payload when this is a top-level string value.
    pub fn as_str(&self) -> Option<&str>
    {
        match self {
            Dumpable::Value {
                value: Value::String(s), ..
            } => Some(s),
            _ => None,
        }
    }
}

/// Conversion into a [`Dumpable`], used by the dump macros.
///
/// Implemented for every `Serialize` type, and for the explicitly tagged
/// [`Dumpable`] and [`ErrorReport`].
pub trait ToDump
{
    /// Produce the dumpable form of `self`.
    fn to_dump(&self) -> Dumpable;
}

impl<T: Serialize + ?Sized> ToDump for T
{
    fn to_dump(&self) -> Dumpable
    {
        Dumpable::value(self)
    }
}

impl ToDump for Dumpable
{
    fn to_dump(&self) -> Dumpable
    {
        self.clone()
    }
}

impl ToDump for ErrorReport
{
    fn to_dump(&self) -> Dumpable
    {
        Dumpable::Error(self.clone())
    }
}

/// Snapshot of an error: its type, message, sources and stack.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorReport
{
    /// `std::any::type_name` of the error.
    pub type_name: &'static str,
    /// `Display` of the error.
    pub message: String,
    /// `Display` of every `source()` in order.
    pub sources: Vec<String>,
    /// Stack at the point the report was taken, innermost first.
    pub trace: Vec<CallRecord>,
}

impl ErrorReport
{
    /// Capture message and source chain; the trace starts empty.
    pub fn new<E: Error + ?Sized>(err: &E) -> Self
    {
        let mut sources = Vec::new();
        let mut current = err.source();
        while let Some(source) = current {
            sources.push(source.to_string());
            current = source.source();
        }

        Self {
            type_name: type_name::<E>(),
            message: err.to_string(),
            sources,
            trace: Vec::new(),
        }
    }

    /// Attach a stack.
    #[must_use]
    pub fn with_trace(mut self, trace: Vec<CallRecord>) -> Self
    {
        self.trace = trace;
        self
    }

    /// Structured form handed to the value renderer.
    pub fn to_value(&self) -> Value
    {
        if self.sources.is_empty() {
            json!({ "message": self.message })
        } else {
            json!({ "message": self.message, "sources": self.sources })
        }
    }
}

/// A named argument of a dump.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable
{
    /// Label shown above the value, usually the source expression.
    pub name: String,
    /// The value itself.
    pub value: Dumpable,
}

impl Variable
{
    /// Pair a label with anything dumpable.
    pub fn new<T: ToDump + ?Sized>(name: impl Into<String>, value: &T) -> Self
    {
        Self {
            name: name.into(),
            value: value.to_dump(),
        }
    }
}

#[cfg(test)]
mod tests
{
    use std::fmt;

    use super::*;

    #[derive(Debug)]
    struct Outer(Inner);

    #[derive(Debug)]
    struct Inner;

    impl fmt::Display for Outer
    {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
        {
            write!(f, "query failed")
        }
    }

    impl fmt::Display for Inner
    {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
        {
            write!(f, "connection reset")
        }
    }

    impl Error for Outer
    {
        fn source(&self) -> Option<&(dyn Error + 'static)>
        {
            Some(&self.0)
        }
    }

    impl Error for Inner {}

    #[test]
    fn test_value_keeps_type_name()
    {
        let dump = vec![1, 2, 3].to_dump();
        match dump {
            Dumpable::Value { type_name, value } => {
                assert!(type_name.contains("Vec<i32>"));
                assert_eq!(value, json!([1, 2, 3]));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_str_is_string_value()
    {
        let dump = "SELECT 1".to_dump();
        assert_eq!(dump.as_str(), Some("SELECT 1"));
        assert_eq!(Dumpable::text("hi").as_str(), Some("hi"));
    }

    #[test]
    fn test_error_report_collects_sources()
    {
        let report = ErrorReport::new(&Outer(Inner));
        assert_eq!(report.message, "query failed");
        assert_eq!(report.sources, vec!["connection reset".to_string()]);
        assert!(report.type_name.ends_with("Outer"));
        assert_eq!(report.to_value()["sources"][0], "connection reset");
    }

    #[test]
    fn test_dumpable_passes_through()
    {
        let records = vec![CallRecord::at("src/main.rs", 1)];
        let dump = Dumpable::backtrace(records.clone()).to_dump();
        assert_eq!(dump, Dumpable::Backtrace(records));
    }
}
