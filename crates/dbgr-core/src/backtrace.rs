//! # Call Stack Capture and Formatting
//!
//! Captures the stack at a dump site and renders frames as editor links.
//!
//! Frames come from [`std::backtrace::Backtrace`]. Its textual form is parsed
//! into [`CallRecord`]s, symbol names are demangled with `rustc-demangle`
//! when they still look mangled, and frames belonging to the backtrace
//! machinery, the runtime entry point, or this crate are dropped so the
//! innermost remaining frame is the function that asked for the dump.

use std::backtrace::Backtrace;
use std::path::Path;

use chrono::{DateTime, Local};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::Config;
use crate::render::escape_html;
use crate::types::CallRecord;

/// Editor link template used when the configuration has none.
pub const DEFAULT_EDITOR_URI: &str = "editor://open/?file=%file&line=%line";

static FRAME_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(\d+):\s+(.+?)\s*$").expect("frame pattern is valid"));

static LOCATION_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*at\s+(.+?):(\d+)(?::\d+)?\s*$").expect("location pattern is valid"));

static SYMBOL_HASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"::h[0-9a-f]{16}$").expect("hash pattern is valid"));

/// Symbol prefixes that never belong to the code being debugged.
const SKIPPED_PREFIXES: &[&str] = &[
    "std::backtrace",
    "backtrace::",
    "dbgr_core::",
    "<dbgr_core::",
    "std::rt::",
    "std::sys::",
    "std::panicking::",
    "std::panic::",
    "core::ops::function::",
    "<core::panic::",
    "__libc_start",
];

/// Runtime entry points.
const SKIPPED_SYMBOLS: &[&str] = &["main", "_start"];

/// Snapshot the current stack, innermost frame first.
pub fn capture() -> Vec<CallRecord>
{
    let trace = Backtrace::force_capture();
    parse(&trace.to_string())
}

/// Parse the `Display` output of a [`Backtrace`].
///
/// Each frame is a numbered symbol line optionally followed by an
/// `at file:line:column` line. Internal frames are removed.
pub fn parse(text: &str) -> Vec<CallRecord>
{
    let mut records: Vec<CallRecord> = Vec::new();
    let mut skipping = false;

    for line in text.lines() {
        if let Some(caps) = FRAME_LINE.captures(line) {
            let symbol = demangle(&caps[2]);
            skipping = is_internal(&symbol);
            if !skipping {
                records.push(CallRecord::default().with_function(&symbol));
            }
        } else if let Some(caps) = LOCATION_LINE.captures(line) {
            if skipping {
                continue;
            }
            if let Some(record) = records.last_mut() {
                if record.file.is_none() {
                    record.file = Some(caps[1].to_string());
                    record.line = caps[2].parse().ok();
                }
            }
        }
    }

    records
}

fn demangle(symbol: &str) -> String
{
    let symbol = symbol.trim();
    let readable = if symbol.starts_with("_ZN") || symbol.starts_with("_R") {
        format!("{:#}", rustc_demangle::demangle(symbol))
    } else {
        symbol.to_string()
    };
    SYMBOL_HASH.replace(&readable, "").into_owned()
}

fn is_internal(symbol: &str) -> bool
{
    SKIPPED_PREFIXES.iter().any(|prefix| symbol.starts_with(prefix)) || SKIPPED_SYMBOLS.contains(&symbol)
}

/// Editor link template with `%file` and `%line` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorUri
{
    template: String,
}

impl EditorUri
{
    /// Use `template` as is.
    pub fn new(template: impl Into<String>) -> Self
    {
        Self {
            template: template.into(),
        }
    }

    /// Template from the configuration, or [`DEFAULT_EDITOR_URI`].
    pub fn from_config(config: &Config) -> Self
    {
        Self::new(config.editor_uri.as_deref().unwrap_or(DEFAULT_EDITOR_URI))
    }

    /// Link opening `file` at `line`. An empty template gives `#`.
    ///
    /// ## Example
    ///
    /// ```rust
    /// use dbgr_core::backtrace::EditorUri;
    ///
    /// let uri = EditorUri::new("editor://open/?file=%file&line=%line");
    /// assert_eq!(uri.link("/src/main.rs", 3), "editor://open/?file=%2Fsrc%2Fmain.rs&line=3");
    /// ```
    pub fn link(&self, file: &str, line: u32) -> String
    {
        if self.template.is_empty() {
            return "#".to_string();
        }

        let encoded: String = form_urlencoded::byte_serialize(file.as_bytes()).collect();
        self.template.replace("%file", &encoded).replace("%line", &line.to_string())
    }
}

impl Default for EditorUri
{
    fn default() -> Self
    {
        Self::new(DEFAULT_EDITOR_URI)
    }
}

/// Renders call records as HTML lines.
#[derive(Debug, Clone, Default)]
pub struct BacktraceFormatter
{
    editor: EditorUri,
}

impl BacktraceFormatter
{
    /// Formatter linking into `editor`.
    pub fn new(editor: EditorUri) -> Self
    {
        Self { editor }
    }

    /// One frame: an editor link for its position, then `Owner::function() `.
    pub fn record(&self, record: &CallRecord) -> String
    {
        let mut html = String::new();

        if let Some(file) = record.file.as_deref() {
            let line = record.line.unwrap_or(0);
            let path = Path::new(file);
            let dir = path
                .parent()
                .map(|p| p.display().to_string())
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| ".".to_string());
            let base = path
                .file_name()
                .map_or_else(|| file.to_string(), |name| name.to_string_lossy().into_owned());

            html.push_str(&format!(
                "<a title='Open in editor' href='{}'><small>{}/</small><strong>{}",
                escape_html(&self.editor.link(file, line)),
                escape_html(&dir),
                escape_html(&base)
            ));
            if let Some(line) = record.line {
                html.push_str(&format!(" ({line})"));
            }
            html.push_str("</strong></a> ");
        }

        if let Some(function) = record.qualified_function() {
            html.push_str(&escape_html(&function));
            html.push_str("() ");
        }

        if let Some(label) = record.label.as_deref() {
            html.push_str(&format!("<em>{}</em> ", escape_html(label)));
        }

        html
    }

    /// Numbered list of frames, in the given order.
    pub fn list(&self, records: &[CallRecord]) -> String
    {
        let mut html = String::from("<div class=\"debug-backtrace-as-variable\">");
        for (i, record) in records.iter().enumerate() {
            html.push_str(&format!("\n<div class='debug-backtrace'>{}. {}</div>", i + 1, self.record(record)));
        }
        html.push_str("\n</div>");
        html
    }
}

/// Wall-clock bookkeeping for the header of each dump.
#[derive(Debug, Clone, Copy, Default)]
pub struct Timers
{
    first: Option<DateTime<Local>>,
    last: Option<DateTime<Local>>,
}

impl Timers
{
    /// Timing span for a dump happening at `now`.
    ///
    /// The first dump shows the time of day. Later dumps show seconds since
    /// the first dump and, in parentheses, since the previous one.
    pub fn annotate(&mut self, now: DateTime<Local>) -> String
    {
        let body = match (self.first, self.last) {
            (Some(first), Some(last)) => format!("{:.3} ({:.3})", seconds(now - first), seconds(now - last)),
            _ => {
                self.first = Some(now);
                now.format("%H:%M:%S:%6f").to_string()
            }
        };
        self.last = Some(now);

        format!(
            "<span class='debug-hide' title='{}'>{body}</span>",
            now.format("%Y-%m-%d %H:%M:%S:%6f")
        )
    }
}

fn seconds(delta: chrono::TimeDelta) -> f64
{
    delta.num_microseconds().map_or(0.0, |us| us as f64 / 1_000_000.0)
}
