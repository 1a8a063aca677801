//! # Rendering
//!
//! Turns dumped values into text for one of three targets:
//!
//! - [`Format::Html`]: browser responses and HTML log files
//! - [`Format::Terminal`]: consoles that understand ANSI colors
//! - [`Format::Text`]: everything else
//!
//! All three go through the same HTML-shaped buffer. Leaf text is always
//! escaped, so the console and AJAX sinks can recover plain text with
//! [`plain_text`] no matter what the values contained.

pub mod value;

use once_cell::sync::Lazy;
use regex::Regex;

pub use value::ValueRenderer;

static TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag pattern is valid"));

static BLANK_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(^[\r\n]*|[\r\n]+)[\s\t]*[\r\n]+").expect("blank run pattern is valid"));

/// Output flavour of a rendered value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format
{
    /// HTML spans with CSS classes.
    Html,
    /// ANSI-colored text.
    Terminal,
    /// Plain text.
    Text,
}

/// Knobs of the value renderer.
///
/// Reset to [`DumperOptions::default`] after every dump; `set_depth` only
/// affects the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumperOptions
{
    /// How many levels of nesting are expanded.
    pub depth: usize,
    /// Nested strings longer than this many characters are cut. `0` disables.
    pub truncate: usize,
    /// Start the top-level structure collapsed (HTML only).
    pub collapse: bool,
    /// Nested structures with more items than this start collapsed (HTML only).
    pub collapse_count: usize,
}

impl Default for DumperOptions
{
    fn default() -> Self
    {
        Self {
            depth: 4,
            truncate: 1024,
            collapse: false,
            collapse_count: 15,
        }
    }
}

/// Escape text for inclusion in HTML content or attribute values.
pub fn escape_html(text: &str) -> String
{
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

/// Reverse of [`escape_html`].
pub fn unescape_html(text: &str) -> String
{
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&amp;", "&")
}

/// Remove every tag, keeping the text between them.
pub fn strip_tags(html: &str) -> String
{
    TAGS.replace_all(html, "").into_owned()
}

/// Text form of an HTML buffer: tags removed, entities decoded, blank lines collapsed.
pub fn plain_text(html: &str) -> String
{
    let stripped = strip_tags(html);
    let collapsed = BLANK_RUNS.replace_all(&stripped, "\n");
    unescape_html(&collapsed)
}
