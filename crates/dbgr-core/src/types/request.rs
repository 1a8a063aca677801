//! Web request description.
//!
//! dbgr does not depend on any web framework. A handler that wants dumps in
//! its response builds a [`RequestContext`] from whatever its framework
//! offers and hands it to [`crate::Environment::web`].

use std::collections::BTreeMap;

use serde_json::Value;

/// Header sent by `XMLHttpRequest`-style clients.
pub const REQUESTED_WITH_HEADER: &str = "x-requested-with";

/// Cookie carrying the `secret@address` debug token.
pub const DEBUG_COOKIE: &str = "dbgr-debug";

/// The request being served, as far as dumping is concerned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext
{
    /// Address of the remote client (`REMOTE_ADDR`).
    pub client_addr: Option<String>,
    /// Request headers, keyed by lower-case name.
    pub headers: BTreeMap<String, String>,
    /// Request cookies.
    pub cookies: BTreeMap<String, String>,
    /// Decoded query string parameters.
    pub query: BTreeMap<String, Value>,
    /// Decoded form body parameters.
    pub form: BTreeMap<String, Value>,
    /// Server/environment variables exposed by the host.
    pub server: BTreeMap<String, Value>,
    /// Session data.
    pub session: BTreeMap<String, Value>,
    /// Content type of the response being produced, if already decided.
    pub response_content_type: Option<String>,
}

impl RequestContext
{
    /// Empty request from an unknown client.
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Set the client address.
    #[must_use]
    pub fn with_client_addr(mut self, addr: impl Into<String>) -> Self
    {
        self.client_addr = Some(addr.into());
        self
    }

    /// Add a request header. Names are case-insensitive.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self
    {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Add a cookie.
    #[must_use]
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self
    {
        self.cookies.insert(name.into(), value.into());
        self
    }

    /// Add a query string parameter.
    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self
    {
        self.query.insert(name.into(), value.into());
        self
    }

    /// Add a form parameter.
    #[must_use]
    pub fn with_form(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self
    {
        self.form.insert(name.into(), value.into());
        self
    }

    /// Add a server variable.
    #[must_use]
    pub fn with_server(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self
    {
        self.server.insert(name.into(), value.into());
        self
    }

    /// Add a session entry.
    #[must_use]
    pub fn with_session(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self
    {
        self.session.insert(name.into(), value.into());
        self
    }

    /// Declare the content type of the response.
    #[must_use]
    pub fn with_response_content_type(mut self, content_type: impl Into<String>) -> Self
    {
        self.response_content_type = Some(content_type.into());
        self
    }

    /// Look up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str>
    {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Whether the request was made by a script rather than a page load.
    pub fn is_ajax(&self) -> bool
    {
        self.header(REQUESTED_WITH_HEADER)
            .is_some_and(|value| value.trim().eq_ignore_ascii_case("xmlhttprequest"))
    }

    /// Whether the response is (or will be) an HTML document.
    pub fn responds_with_html(&self) -> bool
    {
        match self.response_content_type.as_deref() {
            None => true,
            Some(content_type) => content_type.trim_start().to_ascii_lowercase().starts_with("text/html"),
        }
    }

    /// The debug token cookie, if present.
    pub fn debug_token(&self) -> Option<&str>
    {
        self.cookies.get(DEBUG_COOKIE).map(String::as_str)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_ajax_detection_is_case_insensitive()
    {
        let request = RequestContext::new().with_header("X-Requested-With", "XMLHttpRequest");
        assert!(request.is_ajax());

        let request = RequestContext::new().with_header("x-requested-with", "xmlhttprequest");
        assert!(request.is_ajax());

        assert!(!RequestContext::new().is_ajax());
        assert!(!RequestContext::new().with_header("X-Requested-With", "fetch").is_ajax());
    }

    #[test]
    fn test_responds_with_html()
    {
        assert!(RequestContext::new().responds_with_html());
        assert!(RequestContext::new()
            .with_response_content_type("text/html; charset=utf-8")
            .responds_with_html());
        assert!(!RequestContext::new()
            .with_response_content_type("application/json")
            .responds_with_html());
    }
}
