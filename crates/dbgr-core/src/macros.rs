//! Call-site macros.
//!
//! The macros capture what a function call cannot: the source text of each
//! dumped expression and the path of the enclosing function.

/// The [`CallSite`](crate::types::CallSite) of the macro invocation.
///
/// ```rust
/// fn locate() -> dbgr_core::types::CallSite
/// {
///     dbgr_core::call_site!()
/// }
///
/// let site = locate();
/// assert!(site.function.ends_with("locate"));
/// assert!(site.line > 0);
/// ```
#[macro_export]
macro_rules! call_site {
    () => {{
        fn __here() {}
        fn __type_name_of<T>(_: T) -> &'static str
        {
            ::std::any::type_name::<T>()
        }
        let path = __type_name_of(__here);
        $crate::types::CallSite::new(file!(), line!(), path.strip_suffix("::__here").unwrap_or(path))
    }};
}

/// Dump any number of expressions, labelled with their source text.
///
/// Expands to [`Session::dump`](crate::Session::dump) and returns its result.
///
/// ```rust
/// use dbgr_core::{dump, Config, Environment, Session};
///
/// let mut session = Session::with_writer(Config::defaults(), Environment::console_with_vars([("HOSTNAME", "localhost")]), Vec::new());
/// let user = ("ada", 36);
/// dump!(session, user, user.1 + 1).unwrap();
/// assert!(session.outputs()[0].contains("user.1 + 1:"));
/// ```
#[macro_export]
macro_rules! dump {
    ($session:expr $(, $value:expr)* $(,)?) => {
        $session.dump(
            $crate::call_site!(),
            ::std::vec![$($crate::types::Variable::new(stringify!($value), &($value))),*],
        )
    };
}

/// Dump only when the named condition is set and true.
#[macro_export]
macro_rules! dump_conditional {
    ($session:expr, $condition:expr $(, $value:expr)* $(,)?) => {
        $session.dump_conditional(
            $condition,
            $crate::call_site!(),
            ::std::vec![$($crate::types::Variable::new(stringify!($value), &($value))),*],
        )
    };
}

/// Dump only when the first expression is true.
#[macro_export]
macro_rules! dump_on_true {
    ($session:expr, $condition:expr $(, $value:expr)* $(,)?) => {
        $session.dump_on_true(
            $condition,
            $crate::call_site!(),
            ::std::vec![$($crate::types::Variable::new(stringify!($value), &($value))),*],
        )
    };
}

/// [`Session::die_after`](crate::Session::die_after) from the current call site.
///
/// `die_after!(session, count)`, `die_after!(session, count, force)` or
/// `die_after!(session, count, force, value)`.
#[macro_export]
macro_rules! die_after {
    ($session:expr, $count:expr) => {
        $crate::die_after!($session, $count, false)
    };
    ($session:expr, $count:expr, $force:expr) => {
        $session.die_after($count, $force, $crate::call_site!(), ::std::option::Option::None)
    };
    ($session:expr, $count:expr, $force:expr, $value:expr) => {
        $session.die_after(
            $count,
            $force,
            $crate::call_site!(),
            ::std::option::Option::Some($crate::types::Variable::new(stringify!($value), &($value))),
        )
    };
}

/// [`Session::die_now`](crate::Session::die_now) from the current call site.
#[macro_export]
macro_rules! die_now {
    ($session:expr) => {
        $crate::die_now!($session, false)
    };
    ($session:expr, $force:expr) => {
        $session.die_now($force, $crate::call_site!())
    };
}
