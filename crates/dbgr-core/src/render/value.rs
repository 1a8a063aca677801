//! Structured value renderer.
//!
//! Renders a `serde_json::Value` tree with depth limiting, string
//! truncation and collapsible nested structures.

use std::fmt::Write as _;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::{escape_html, DumperOptions, Format};

const INDENT: &str = "   ";

static MODULE_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:[A-Za-z_][A-Za-z0-9_]*::)+").expect("module path pattern is valid"));

/// Piece of output that gets its own color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Style
{
    Null,
    Bool,
    Number,
    String,
    Structure,
    Key,
    Meta,
}

impl Style
{
    fn class(self) -> &'static str
    {
        match self {
            Style::Null => "dbgr-dump-null",
            Style::Bool => "dbgr-dump-bool",
            Style::Number => "dbgr-dump-number",
            Style::String => "dbgr-dump-string",
            Style::Structure => "dbgr-dump-structure",
            Style::Key => "dbgr-dump-key",
            Style::Meta => "dbgr-dump-meta",
        }
    }

    fn ansi(self) -> &'static str
    {
        match self {
            Style::Null | Style::Bool => "1;33",
            Style::Number => "1;32",
            Style::String => "1;36",
            Style::Structure => "1;31",
            Style::Key => "1;37",
            Style::Meta => "1;30",
        }
    }
}

/// Renders values in one [`Format`] with one set of [`DumperOptions`].
#[derive(Debug, Clone, Copy)]
pub struct ValueRenderer
{
    format: Format,
    options: DumperOptions,
}

impl ValueRenderer
{
    /// Renderer for `format` using `options`.
    pub fn new(format: Format, options: DumperOptions) -> Self
    {
        Self { format, options }
    }

    /// Render a top-level value that came from a value of type `type_name`.
    ///
    /// Top-level strings are never truncated. Top-level objects are labelled
    /// with the short name of their Rust type.
    pub fn render(&self, type_name: &str, value: &Value) -> String
    {
        let mut out = String::new();
        match value {
            Value::String(s) => self.write_string(&mut out, s, false),
            Value::Object(map) if !is_generic_map(type_name) => {
                let header = format!("{} ({})", short_type_name(type_name), map.len());
                self.write_structure(&mut out, &header, value, 0);
            }
            _ => self.write_value(&mut out, value, 0),
        }
        out.push('\n');
        out
    }

    fn write_value(&self, out: &mut String, value: &Value, level: usize)
    {
        match value {
            Value::Null => out.push_str(&self.paint(Style::Null, "null")),
            Value::Bool(b) => out.push_str(&self.paint(Style::Bool, if *b { "true" } else { "false" })),
            Value::Number(n) => out.push_str(&self.paint(Style::Number, &n.to_string())),
            Value::String(s) => self.write_string(out, s, true),
            Value::Array(items) => {
                let header = format!("array ({})", items.len());
                self.write_structure(out, &header, value, level);
            }
            Value::Object(map) => {
                let header = format!("object ({})", map.len());
                self.write_structure(out, &header, value, level);
            }
        }
    }

    fn write_string(&self, out: &mut String, s: &str, truncate: bool)
    {
        let length = s.chars().count();
        let limit = self.options.truncate;
        let shown = if truncate && limit > 0 && length > limit {
            let cut: String = s.chars().take(limit).collect();
            format!("\"{cut}\" …")
        } else {
            format!("\"{s}\"")
        };

        match self.format {
            Format::Html => {
                let _ = write!(
                    out,
                    "<span class=\"{}\" title=\"{length} characters\">{}</span>",
                    Style::String.class(),
                    escape_html(&shown)
                );
            }
            Format::Terminal | Format::Text => {
                out.push_str(&self.paint(Style::String, &shown));
                if length > 1 {
                    out.push_str(&self.paint(Style::Meta, &format!(" ({length})")));
                }
            }
        }
    }

    fn write_structure(&self, out: &mut String, header: &str, value: &Value, level: usize)
    {
        let entries: Vec<(String, &Value)> = match value {
            Value::Array(items) => items.iter().enumerate().map(|(i, v)| (i.to_string(), v)).collect(),
            Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
            _ => Vec::new(),
        };

        if entries.is_empty() {
            out.push_str(&self.paint(Style::Structure, header));
            return;
        }

        if level >= self.options.depth {
            out.push_str(&self.paint(Style::Structure, header));
            out.push_str(&self.paint(Style::Meta, " …"));
            return;
        }

        let collapsed = if level == 0 {
            self.options.collapse
        } else {
            entries.len() > self.options.collapse_count
        };
        let separator = if value.is_array() { " => " } else { ": " };

        if self.format == Format::Html {
            let _ = write!(
                out,
                "<span class=\"dbgr-toggle{}\" onclick=\"debugToggle(this);\">{}</span><span class=\"dbgr-dump-items\"{}>",
                if collapsed { " dbgr-collapsed" } else { "" },
                escape_html(header),
                if collapsed { " style=\"display:none;\"" } else { "" }
            );
        } else {
            out.push_str(&self.paint(Style::Structure, header));
        }

        for (key, item) in entries {
            out.push('\n');
            out.push_str(&INDENT.repeat(level + 1));
            out.push_str(&self.paint(Style::Key, &key));
            out.push_str(separator);
            self.write_value(out, item, level + 1);
        }

        if self.format == Format::Html {
            out.push_str("</span>");
        }
    }

    /// Only HTML output is escaped.
    fn paint(&self, style: Style, text: &str) -> String
    {
        match self.format {
            Format::Html => format!("<span class=\"{}\">{}</span>", style.class(), escape_html(text)),
            Format::Terminal => format!("\x1b[{}m{text}\x1b[0m", style.ansi()),
            Format::Text => text.to_string(),
        }
    }
}

/// `alloc::vec::Vec<my_app::User>` becomes `Vec<User>`.
pub fn short_type_name(type_name: &str) -> String
{
    let trimmed = type_name.trim_start_matches('&');
    MODULE_PATH.replace_all(trimmed, "").into_owned()
}

fn is_generic_map(type_name: &str) -> bool
{
    let short = short_type_name(type_name);
    short == "Value" || short.starts_with("Map<") || short.starts_with("HashMap<") || short.starts_with("BTreeMap<")
}
