//! Named progress counters and named conditions.
//!
//! A counter is registered with a total, then incremented from inside a loop;
//! every `n`-th increment prints `current/total (name)`. Conditions are named
//! booleans that gate [`crate::Session::dump_conditional`].

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde_json::Value;

use crate::error::{DumpError, DumpResult};

/// Anything that can serve as the total of a counter.
pub trait Countable
{
    /// Item count, or `None` when the value has no meaningful size.
    fn count(&self) -> Option<usize>;
}

macro_rules! countable_integer {
    ($($t:ty),*) => {
        $(
            impl Countable for $t
            {
                fn count(&self) -> Option<usize>
                {
                    usize::try_from(*self).ok()
                }
            }
        )*
    };
}

// Negative numbers are not countable
countable_integer!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

impl<T> Countable for [T]
{
    fn count(&self) -> Option<usize>
    {
        Some(self.len())
    }
}

impl<T, const N: usize> Countable for [T; N]
{
    fn count(&self) -> Option<usize>
    {
        Some(N)
    }
}

impl<T> Countable for Vec<T>
{
    fn count(&self) -> Option<usize>
    {
        Some(self.len())
    }
}

impl<K, V, S> Countable for HashMap<K, V, S>
{
    fn count(&self) -> Option<usize>
    {
        Some(self.len())
    }
}

impl<K, V> Countable for BTreeMap<K, V>
{
    fn count(&self) -> Option<usize>
    {
        Some(self.len())
    }
}

impl<T, S> Countable for HashSet<T, S>
{
    fn count(&self) -> Option<usize>
    {
        Some(self.len())
    }
}

impl<T> Countable for BTreeSet<T>
{
    fn count(&self) -> Option<usize>
    {
        Some(self.len())
    }
}

impl Countable for Value
{
    fn count(&self) -> Option<usize>
    {
        match self {
            Value::Array(items) => Some(items.len()),
            Value::Object(map) => Some(map.len()),
            Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
            _ => None,
        }
    }
}

impl<T: Countable + ?Sized> Countable for &T
{
    fn count(&self) -> Option<usize>
    {
        (**self).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Counter
{
    current: usize,
    total: usize,
}

/// Named counters.
#[derive(Debug, Clone, Default)]
pub struct Counters
{
    counters: HashMap<String, Counter>,
}

impl Counters
{
    /// Register (or reset) `name` with the size of `total`.
    ///
    /// ## Errors
    ///
    /// `NotCountable` if `total` has no size.
    pub fn set<T: Countable + ?Sized>(&mut self, name: &str, total: &T) -> DumpResult<()>
    {
        let total = total.count().ok_or_else(|| DumpError::NotCountable(name.to_string()))?;
        self.counters.insert(name.to_string(), Counter { current: 0, total });
        Ok(())
    }

    /// Advance `name`, returning the progress line when it should be printed.
    ///
    /// The line uses the value before the increment and is produced when
    /// `every` is non-zero and divides it.
    ///
    /// ## Errors
    ///
    /// `UnknownCounter` if `name` was never registered.
    ///
    /// ## Example
    ///
    /// ```rust
    /// use dbgr_core::counter::Counters;
    ///
    /// let mut counters = Counters::default();
    /// counters.set("rows", &vec![1, 2, 3]).unwrap();
    /// assert_eq!(counters.increment("rows", 2).unwrap().as_deref(), Some("0/3 (rows)"));
    /// assert_eq!(counters.increment("rows", 2).unwrap(), None);
    /// assert_eq!(counters.increment("rows", 2).unwrap().as_deref(), Some("2/3 (rows)"));
    /// ```
    pub fn increment(&mut self, name: &str, every: usize) -> DumpResult<Option<String>>
    {
        let counter = self
            .counters
            .get_mut(name)
            .ok_or_else(|| DumpError::UnknownCounter(name.to_string()))?;

        let current = counter.current;
        counter.current += 1;

        if every != 0 && current % every == 0 {
            Ok(Some(format!("{current}/{} ({name})", counter.total)))
        } else {
            Ok(None)
        }
    }

    /// `(current, total)` of `name`.
    pub fn progress(&self, name: &str) -> Option<(usize, usize)>
    {
        self.counters.get(name).map(|c| (c.current, c.total))
    }
}

/// Named booleans.
#[derive(Debug, Clone, Default)]
pub struct Conditions
{
    conditions: HashMap<String, bool>,
}

impl Conditions
{
    /// Set `name` to `value`.
    pub fn set(&mut self, name: &str, value: bool)
    {
        self.conditions.insert(name.to_string(), value);
    }

    /// True only when `name` is set and true.
    pub fn is_true(&self, name: &str) -> bool
    {
        self.conditions.get(name).copied().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests
{
    use serde_json::json;

    use super::*;

    #[test]
    fn test_countable_values()
    {
        assert_eq!(5u32.count(), Some(5));
        assert_eq!((-1i64).count(), None);
        assert_eq!([1, 2].count(), Some(2));
        assert_eq!(json!({"a": 1}).count(), Some(1));
        assert_eq!(json!(3).count(), Some(3));
        assert_eq!(json!(-3).count(), None);
        assert_eq!(json!("abc").count(), None);
    }

    #[test]
    fn test_not_countable()
    {
        let mut counters = Counters::default();
        let err = counters.set("x", &json!(null)).unwrap_err();
        assert!(matches!(err, DumpError::NotCountable(name) if name == "x"));
    }

    #[test]
    fn test_every_one_prints_each_step()
    {
        let mut counters = Counters::default();
        counters.set("loop", &3usize).unwrap();
        let lines: Vec<_> = (0..3).map(|_| counters.increment("loop", 1).unwrap()).collect();
        assert_eq!(
            lines,
            vec![
                Some("0/3 (loop)".to_string()),
                Some("1/3 (loop)".to_string()),
                Some("2/3 (loop)".to_string())
            ]
        );
        assert_eq!(counters.progress("loop"), Some((3, 3)));
    }

    #[test]
    fn test_every_zero_never_prints()
    {
        let mut counters = Counters::default();
        counters.set("loop", &10usize).unwrap();
        assert!((0..10).all(|_| counters.increment("loop", 0).unwrap().is_none()));
    }

    #[test]
    fn test_unknown_counter()
    {
        let mut counters = Counters::default();
        assert!(matches!(counters.increment("nope", 1), Err(DumpError::UnknownCounter(_))));
    }

    #[test]
    fn test_conditions()
    {
        let mut conditions = Conditions::default();
        assert!(!conditions.is_true("a"));
        conditions.set("a", true);
        assert!(conditions.is_true("a"));
        conditions.set("a", false);
        assert!(!conditions.is_true("a"));
    }
}
