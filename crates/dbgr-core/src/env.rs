//! # Environment Detection
//!
//! Answers the questions the output router asks before every dump:
//!
//! - Is this a console process or a web request?
//! - Was the request made by a script (AJAX)?
//! - May this client see debug output at all?
//! - Does the terminal understand ANSI colors?
//!
//! The environment is captured once, when the [`Environment`] is built, so a
//! session behaves consistently for its whole lifetime and tests can build
//! any environment they like without touching process state.

use std::collections::BTreeMap;
use std::env;
use std::io::{self, IsTerminal};

use crate::types::RequestContext;

/// Addresses that always count as local.
pub const LOCAL_ADDRESSES: [&str; 4] = ["127.0.0.1", "0.0.0.0", "localhost", "::1"];

/// Environment variable that switches debug output on for every client.
pub const DEBUG_ENV: &str = "DBGR_DEBUG";

/// The process a session is running in.
#[derive(Debug, Clone, Default)]
pub struct Environment
{
    request: Option<RequestContext>,
    vars: BTreeMap<String, String>,
    stdout_is_tty: bool,
}

impl Environment
{
    /// A console process, with the current environment variables.
    pub fn detect() -> Self
    {
        Self {
            request: None,
            vars: env::vars().collect(),
            stdout_is_tty: io::stdout().is_terminal(),
        }
    }

    /// A process serving `request`.
    pub fn web(request: RequestContext) -> Self
    {
        Self {
            request: Some(request),
            ..Self::detect()
        }
    }

    /// A console process with exactly the given variables and no terminal.
    ///
    /// Useful when the real environment must not leak in (tests, embedding).
    pub fn console_with_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            request: None,
            vars: vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            stdout_is_tty: false,
        }
    }

    /// Replace the request, turning this into a web environment.
    #[must_use]
    pub fn with_request(mut self, request: RequestContext) -> Self
    {
        self.request = Some(request);
        self
    }

    /// Pretend stdout is (or is not) a terminal.
    #[must_use]
    pub fn with_tty(mut self, stdout_is_tty: bool) -> Self
    {
        self.stdout_is_tty = stdout_is_tty;
        self
    }

    /// The request being served, if any.
    pub fn request(&self) -> Option<&RequestContext>
    {
        self.request.as_ref()
    }

    /// No request attached.
    pub fn is_console(&self) -> bool
    {
        self.request.is_none()
    }

    /// Attached request was made by a script.
    pub fn is_ajax(&self) -> bool
    {
        self.request.as_ref().is_some_and(RequestContext::is_ajax)
    }

    /// Web request whose response is HTML.
    pub fn wants_html(&self) -> bool
    {
        self.request.as_ref().is_some_and(RequestContext::responds_with_html)
    }

    /// Captured environment variable.
    pub fn var(&self, name: &str) -> Option<&str>
    {
        self.vars.get(name).map(String::as_str)
    }

    /// Whether the terminal is expected to render ANSI escape codes.
    pub fn terminal_colors(&self) -> bool
    {
        self.var("ConEmuANSI") == Some("ON")
            || self.var("ANSICON").is_some()
            || self.var("TERM") == Some("xterm-256color")
            || self.stdout_is_tty
    }

    /// The address debug permissions are checked against.
    ///
    /// Web requests use the client address; console processes use the host
    /// name, falling back to `localhost`.
    pub fn resolved_address(&self) -> String
    {
        match &self.request {
            Some(request) => request.client_addr.clone().unwrap_or_default(),
            None => self
                .var("HOSTNAME")
                .or_else(|| self.var("COMPUTERNAME"))
                .unwrap_or("localhost")
                .to_string(),
        }
    }

    /// Debug mode switched on from outside through `DBGR_DEBUG`.
    pub fn debug_forced_by_env(&self) -> bool
    {
        self.var(DEBUG_ENV)
            .is_some_and(|value| matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "on" | "yes"))
    }

    /// Whether dumps may be shown.
    ///
    /// True when development mode is forced, when `DBGR_DEBUG` is set, when the
    /// resolved address is local or listed in `allowed`, or when the request
    /// carries a `dbgr-debug` cookie whose `secret@address` value is listed.
    pub fn can_output(&self, allowed: &[String], force_development: bool) -> bool
    {
        if force_development || self.debug_forced_by_env() {
            return true;
        }

        let addr = self.resolved_address();
        let listed = |candidate: &str| LOCAL_ADDRESSES.contains(&candidate) || allowed.iter().any(|a| a == candidate);

        if !addr.is_empty() && listed(&addr) {
            return true;
        }

        self.request
            .as_ref()
            .and_then(RequestContext::debug_token)
            .is_some_and(|secret| allowed.iter().any(|a| *a == format!("{secret}@{addr}")))
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_loopback_is_allowed_with_empty_list()
    {
        let env = Environment::console_with_vars(Vec::<(String, String)>::new())
            .with_request(RequestContext::new().with_client_addr("127.0.0.1"));
        assert!(env.can_output(&[], false));
    }

    #[test]
    fn test_unknown_client_is_rejected()
    {
        let env = Environment::console_with_vars(Vec::<(String, String)>::new())
            .with_request(RequestContext::new().with_client_addr("203.0.113.9"));
        assert!(!env.can_output(&[], false));
        assert!(env.can_output(&["203.0.113.9".to_string()], false));
        assert!(env.can_output(&[], true));
    }

    #[test]
    fn test_debug_cookie()
    {
        let env = Environment::console_with_vars(Vec::<(String, String)>::new()).with_request(
            RequestContext::new()
                .with_client_addr("203.0.113.9")
                .with_cookie("dbgr-debug", "s3cret"),
        );
        assert!(env.can_output(&["s3cret@203.0.113.9".to_string()], false));
        assert!(!env.can_output(&["other@203.0.113.9".to_string()], false));
    }

    #[test]
    fn test_debug_env_switch()
    {
        let env = Environment::console_with_vars([("DBGR_DEBUG", "1"), ("HOSTNAME", "build-box")]);
        assert!(env.can_output(&[], false));

        let env = Environment::console_with_vars([("HOSTNAME", "build-box")]);
        assert!(!env.can_output(&[], false));
        assert!(env.can_output(&["build-box".to_string()], false));
    }

    #[test]
    fn test_console_without_hostname_is_local()
    {
        let env = Environment::console_with_vars(Vec::<(String, String)>::new());
        assert_eq!(env.resolved_address(), "localhost");
        assert!(env.can_output(&[], false));
    }

    #[test]
    fn test_terminal_colors()
    {
        assert!(Environment::console_with_vars([("TERM", "xterm-256color")]).terminal_colors());
        assert!(Environment::console_with_vars([("ConEmuANSI", "ON")]).terminal_colors());
        assert!(Environment::console_with_vars([("ANSICON", "1")]).terminal_colors());
        assert!(!Environment::console_with_vars([("TERM", "dumb")]).terminal_colors());
        assert!(Environment::console_with_vars([("TERM", "dumb")]).with_tty(true).terminal_colors());
    }

    #[test]
    fn test_modes()
    {
        let console = Environment::console_with_vars(Vec::<(String, String)>::new());
        assert!(console.is_console());
        assert!(!console.is_ajax());
        assert!(!console.wants_html());

        let ajax = console.with_request(RequestContext::new().with_header("X-Requested-With", "XMLHttpRequest"));
        assert!(!ajax.is_console());
        assert!(ajax.is_ajax());
        assert!(ajax.wants_html());
    }
}
