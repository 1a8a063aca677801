//! Stack frame types.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::panic::Location;

/// Separator placed between an owner and a function name.
pub const PATH_SEPARATOR: &str = "::";

/// One frame of a call stack, captured when a dump happens.
///
/// Every field is optional because frames coming out of a release build or a
/// foreign library often lack file and line information.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CallRecord
{
    /// Source file path as reported by the compiler or the unwinder.
    pub file: Option<String>,
    /// Line number within `file`.
    pub line: Option<u32>,
    /// Type or module that owns `function` (`my_app::db::Repo`).
    pub owner: Option<String>,
    /// How `function` hangs off `owner`, usually `::`.
    pub call_type: Option<String>,
    /// Bare function name (`load`).
    pub function: Option<String>,
    /// Free-form label shown next to the frame.
    pub label: Option<String>,
}

impl CallRecord
{
    /// A frame that only knows its source position.
    pub fn at(file: impl Into<String>, line: u32) -> Self
    {
        Self {
            file: Some(file.into()),
            line: Some(line),
            ..Self::default()
        }
    }

    /// Attach a fully qualified function path, splitting it into owner and name.
    ///
    /// `my_app::db::Repo::load` becomes owner `my_app::db::Repo`, call type `::`
    /// and function `load`. A path without separators only sets the function.
    #[must_use]
    pub fn with_function(mut self, path: &str) -> Self
    {
        let path = path.trim();
        if path.is_empty() {
            return self;
        }

        match split_path(path) {
            (Some(owner), function) => {
                self.owner = Some(owner.to_string());
                self.call_type = Some(PATH_SEPARATOR.to_string());
                self.function = Some(function.to_string());
            }
            (None, function) => {
                self.owner = None;
                self.call_type = None;
                self.function = Some(function.to_string());
            }
        }
        self
    }

    /// Attach a label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self
    {
        self.label = Some(label.into());
        self
    }

    /// Owner, call type and function glued back together.
    pub fn qualified_function(&self) -> Option<String>
    {
        let function = self.function.as_deref()?;
        match (&self.owner, &self.call_type) {
            (Some(owner), Some(call_type)) => Some(format!("{owner}{call_type}{function}")),
            (Some(owner), None) => Some(format!("{owner}{PATH_SEPARATOR}{function}")),
            _ => Some(function.to_string()),
        }
    }

    /// Merge the position of `self` with the identity of the frame that called it.
    ///
    /// The innermost frame of a dump is the dump call itself, whose function is
    /// an internal wrapper. What a reader wants is "this line, inside that
    /// function", so the owner, call type and function of `caller` replace ours
    /// whenever the caller knows them.
    #[must_use]
    pub fn merged_with_caller(&self, caller: Option<&CallRecord>) -> CallRecord
    {
        let mut merged = self.clone();
        if let Some(caller) = caller {
            if caller.owner.is_some() {
                merged.owner.clone_from(&caller.owner);
            }
            if caller.function.is_some() {
                merged.function.clone_from(&caller.function);
            }
            if caller.call_type.is_some() {
                merged.call_type.clone_from(&caller.call_type);
            }
        }
        merged
    }
}

impl fmt::Display for CallRecord
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        if let Some(file) = &self.file {
            write!(f, "{file}")?;
            if let Some(line) = self.line {
                write!(f, ":{line}")?;
            }
            write!(f, " ")?;
        }
        if let Some(function) = self.qualified_function() {
            write!(f, "{function}()")?;
        }
        Ok(())
    }
}

/// Split `a::b::c` into `(Some("a::b"), "c")`, ignoring separators inside `<...>`.
fn split_path(path: &str) -> (Option<&str>, &str)
{
    let bytes = path.as_bytes();
    let mut depth = 0usize;
    let mut split_at = None;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'<' => depth += 1,
            b'>' => depth = depth.saturating_sub(1),
            b':' if depth == 0 && bytes.get(i + 1) == Some(&b':') => {
                split_at = Some(i);
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }

    match split_at {
        Some(at) if at > 0 => (Some(&path[..at]), &path[at + PATH_SEPARATOR.len()..]),
        _ => (None, path),
    }
}

/// Where a dump was requested from.
///
/// Built by the [`call_site!`](crate::call_site) macro (file, line and the
/// enclosing function) or by [`CallSite::caller`] through `#[track_caller]`
/// (file and line only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallSite
{
    /// Source file of the call.
    pub file: &'static str,
    /// Line of the call.
    pub line: u32,
    /// Fully qualified path of the enclosing function, empty when unknown.
    pub function: &'static str,
}

impl CallSite
{
    /// Describe a call site explicitly.
    pub const fn new(file: &'static str, line: u32, function: &'static str) -> Self
    {
        Self { file, line, function }
    }

    /// The location of whoever called the `#[track_caller]` chain leading here.
    #[track_caller]
    pub fn caller() -> Self
    {
        let location = Location::caller();
        Self::new(location.file(), location.line(), "")
    }

    /// Convert to the innermost [`CallRecord`] of a dump.
    pub fn to_record(&self) -> CallRecord
    {
        CallRecord::at(self.file, self.line).with_function(self.function)
    }

    /// Stable-within-a-process hash of the location.
    pub fn fingerprint(&self) -> u64
    {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_with_function_splits_owner()
    {
        let record = CallRecord::at("src/db.rs", 10).with_function("my_app::db::Repo::load");
        assert_eq!(record.owner.as_deref(), Some("my_app::db::Repo"));
        assert_eq!(record.call_type.as_deref(), Some("::"));
        assert_eq!(record.function.as_deref(), Some("load"));
        assert_eq!(record.qualified_function().as_deref(), Some("my_app::db::Repo::load"));
    }

    #[test]
    fn test_with_function_ignores_generic_separators()
    {
        let record = CallRecord::default().with_function("<alloc::vec::Vec<T> as core::fmt::Debug>::fmt");
        assert_eq!(record.owner.as_deref(), Some("<alloc::vec::Vec<T> as core::fmt::Debug>"));
        assert_eq!(record.function.as_deref(), Some("fmt"));
    }

    #[test]
    fn test_with_function_without_owner()
    {
        let record = CallRecord::default().with_function("main");
        assert_eq!(record.owner, None);
        assert_eq!(record.function.as_deref(), Some("main"));
    }

    #[test]
    fn test_merged_with_caller_keeps_position()
    {
        let inner = CallRecord::at("src/lib.rs", 42).with_function("dbgr_core::Session::dump");
        let caller = CallRecord::at("src/main.rs", 7).with_function("app::run");

        let merged = inner.merged_with_caller(Some(&caller));
        assert_eq!(merged.file.as_deref(), Some("src/lib.rs"));
        assert_eq!(merged.line, Some(42));
        assert_eq!(merged.qualified_function().as_deref(), Some("app::run"));

        let alone = inner.merged_with_caller(None);
        assert_eq!(alone, inner);
    }

    #[test]
    fn test_display()
    {
        let record = CallRecord::at("src/main.rs", 3).with_function("app::main");
        assert_eq!(record.to_string(), "src/main.rs:3 app::main()");
    }

    #[test]
    fn test_call_site_fingerprint_is_stable()
    {
        let a = CallSite::new("src/main.rs", 1, "app::main");
        let b = CallSite::new("src/main.rs", 1, "app::main");
        let c = CallSite::new("src/main.rs", 2, "app::main");
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }
}
