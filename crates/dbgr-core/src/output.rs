//! # Output Routing
//!
//! Every dump renders into one buffer, which is then delivered to exactly one
//! [`Sink`]:
//!
//! | Sink | When | What is written |
//! |---|---|---|
//! | `WebHtml` | web request, no file, output permitted | the HTML fragment (plus styles once) |
//! | `WebAjax` | same, but the request came from a script | plain text and a `=====` separator |
//! | `File` | a file name and a log directory are set | the whole accumulated HTML document |
//! | `Console` | console process | plain text between dotted rules |
//! | `Discard` | anything else | nothing |

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::DumpResult;
use crate::render::plain_text;

/// Stylesheet and script every HTML page with dumps needs once.
pub const STYLES: &str = concat!(
    "<style>",
    include_str!("../assets/dumper.css"),
    "</style><script>",
    include_str!("../assets/dumper.js"),
    "</script>"
);

/// Line written after every AJAX chunk.
pub const AJAX_SEPARATOR: &str = "===========================";

/// Rule framing console output.
pub const CONSOLE_RULE: &str = "\n..................................\n";

/// Where one rendered dump goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sink
{
    /// HTML response.
    WebHtml,
    /// Plain-text stream for script requests.
    WebAjax,
    /// Accumulating HTML log file.
    File(PathBuf),
    /// Standard output of a console process.
    Console,
    /// Nowhere.
    Discard,
}

impl Sink
{
    /// Pick the sink for the current dump.
    ///
    /// `file` is the full path of the log file when both a file name and a
    /// log directory are set.
    pub fn select(console: bool, ajax: bool, file: Option<PathBuf>, can_output: bool) -> Self
    {
        match file {
            None if !console && can_output => {
                if ajax {
                    Sink::WebAjax
                } else {
                    Sink::WebHtml
                }
            }
            Some(path) => Sink::File(path),
            None if console => Sink::Console,
            None => Sink::Discard,
        }
    }
}

/// Delivers rendered dumps and keeps the per-file accumulators.
#[derive(Debug, Default)]
pub struct OutputRouter
{
    styles_printed: bool,
    files: HashMap<PathBuf, String>,
}

impl OutputRouter
{
    /// Empty router.
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Whether the styles have already gone out with an HTML response.
    pub fn styles_printed(&self) -> bool
    {
        self.styles_printed
    }

    /// Deliver `fragment` to `sink`, writing stream output to `out`.
    ///
    /// ## Errors
    ///
    /// `Io` if the stream or the log file cannot be written.
    pub fn deliver<W: Write>(&mut self, sink: &Sink, fragment: &str, out: &mut W) -> DumpResult<()>
    {
        match sink {
            Sink::WebHtml => {
                let mut chunk = fragment.to_string();
                if !self.styles_printed {
                    chunk.push_str(STYLES);
                    self.styles_printed = true;
                }
                write_line(out, &chunk)
            }
            Sink::WebAjax => write_line(out, &ajax_chunk(fragment)),
            Sink::File(path) => self.append_to_file(path, fragment),
            Sink::Console => write_line(out, &console_block(fragment)),
            Sink::Discard => Ok(()),
        }
    }

    fn append_to_file(&mut self, path: &Path, fragment: &str) -> DumpResult<()>
    {
        let lines = self.files.entry(path.to_path_buf()).or_default();
        lines.push_str(fragment);

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, html_document(lines))?;
        tracing::debug!(path = %path.display(), bytes = lines.len(), "rewrote dump log");
        Ok(())
    }
}

/// Full HTML page around accumulated fragments.
pub fn html_document(fragments: &str) -> String
{
    format!(
        "<html lang=\"\"><body>{}\n{fragments}</body></html>",
        STYLES.replace('\n', " ")
    )
}

/// Plain-text form of a fragment followed by the AJAX separator.
pub fn ajax_chunk(fragment: &str) -> String
{
    format!("{}{AJAX_SEPARATOR}\n", plain_text(fragment))
}

/// Plain-text form of a fragment framed by dotted rules.
pub fn console_block(fragment: &str) -> String
{
    format!("\n{CONSOLE_RULE}{}{CONSOLE_RULE}\n", plain_text(fragment))
}

/// Write `message` and a newline, then flush.
pub fn write_line<W: Write>(out: &mut W, message: &str) -> DumpResult<()>
{
    out.write_all(message.as_bytes())?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}
