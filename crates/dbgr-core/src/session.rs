//! # Dump Session
//!
//! A [`Session`] owns everything that outlives a single dump: configuration,
//! the detected environment, sticky AJAX/console flags, timers, counters,
//! conditions and the per-file log accumulators.
//!
//! Each dump runs the same pipeline:
//!
//! 1. Clear the buffer and open the dump container
//! 2. Render the call site with its timing, then (for HTML pages) the hidden
//!    panel with the rest of the stack and the request data
//! 3. Render every variable
//! 4. Close the container, reset one-shot options and deliver the buffer to
//!    the selected [`Sink`]
//!
//! ## Example
//!
//! ```rust
//! use dbgr_core::{dump, Config, Environment, Session};
//!
//! let env = Environment::console_with_vars([("HOSTNAME", "localhost")]);
//! let mut session = Session::with_writer(Config::defaults(), env, Vec::new());
//!
//! let answer = 42;
//! dump!(session, answer).unwrap();
//!
//! let printed = String::from_utf8(session.into_writer()).unwrap();
//! assert!(printed.contains("answer:"));
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::{self, Stdout, Write};
use std::path::Path;

use chrono::Local;

use crate::backtrace::{self, BacktraceFormatter, EditorUri, Timers};
use crate::config::Config;
use crate::counter::{Conditions, Countable, Counters};
use crate::env::Environment;
use crate::error::{DumpError, DumpResult};
use crate::output::{write_line, OutputRouter, Sink};
use crate::render::{escape_html, strip_tags, DumperOptions, Format, ValueRenderer};
use crate::sql;
use crate::types::{CallRecord, CallSite, Dumpable, RequestContext, Variable};

/// Compiler that built this crate, shown in the details panel.
pub const RUST_VERSION: &str = env!("DBGR_RUSTC_VERSION");

/// Whether the caller should keep running after a `die_*` call.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow
{
    /// Keep going.
    Continue,
    /// Stop the process (or request) now.
    Halt,
}

impl Flow
{
    /// `true` for [`Flow::Halt`].
    pub fn is_halt(self) -> bool
    {
        self == Flow::Halt
    }
}

/// Dump state for one process or request.
pub struct Session<W: Write = Stdout>
{
    config: Config,
    env: Environment,
    out: W,
    output: String,
    outputs: Vec<String>,
    router: OutputRouter,
    timers: Timers,
    counters: Counters,
    conditions: Conditions,
    options: DumperOptions,
    name: Option<String>,
    color: Option<String>,
    file: Option<String>,
    ajax: bool,
    console: bool,
    force_html: bool,
    force_development: bool,
    even: bool,
    die_countdown: Option<usize>,
}

impl Session<Stdout>
{
    /// Session for the current console process, writing to stdout.
    ///
    /// Configuration is the built-in defaults merged with the local
    /// configuration file, if there is one.
    pub fn new() -> Self
    {
        let mut session = Self::with_writer(Config::defaults(), Environment::detect(), io::stdout());
        session.load_default_config();
        session
    }
}

impl Default for Session<Stdout>
{
    fn default() -> Self
    {
        Self::new()
    }
}

impl<W: Write> Session<W>
{
    /// Session with explicit configuration, environment and output stream.
    pub fn with_writer(config: Config, env: Environment, out: W) -> Self
    {
        Self {
            config,
            env,
            out,
            output: String::new(),
            outputs: Vec::new(),
            router: OutputRouter::new(),
            timers: Timers::default(),
            counters: Counters::default(),
            conditions: Conditions::default(),
            options: DumperOptions::default(),
            name: None,
            color: None,
            file: None,
            ajax: false,
            console: false,
            force_html: false,
            force_development: false,
            even: false,
            die_countdown: None,
        }
    }

    // ========================================================================
    // Dumping
    // ========================================================================

    /// Dump `variables` as seen from `site`.
    ///
    /// Usually called through [`dump!`](crate::dump), which fills in the
    /// call site and the variable names.
    ///
    /// ## Errors
    ///
    /// `Io` if the output stream or the log file cannot be written.
    pub fn dump(&mut self, site: CallSite, variables: Vec<Variable>) -> DumpResult<&mut Self>
    {
        self.process(site, &variables)?;
        Ok(self)
    }

    /// Dump only when the condition `name` is set and true.
    ///
    /// ## Errors
    ///
    /// Same as [`Session::dump`].
    pub fn dump_conditional(&mut self, name: &str, site: CallSite, variables: Vec<Variable>) -> DumpResult<&mut Self>
    {
        if self.conditions.is_true(name) {
            self.process(site, &variables)?;
        }
        Ok(self)
    }

    /// Dump only when `condition` is true.
    ///
    /// ## Errors
    ///
    /// Same as [`Session::dump`].
    pub fn dump_on_true(&mut self, condition: bool, site: CallSite, variables: Vec<Variable>) -> DumpResult<&mut Self>
    {
        if condition {
            self.process(site, &variables)?;
        }
        Ok(self)
    }

    /// Count calls and ask the caller to halt once `count` calls went through.
    ///
    /// Only active when `force` is set or output is permitted. One countdown
    /// is shared by every call site: the first call arms it with `count`,
    /// every call decrements it, and the call that finds it at zero dumps
    /// `value` (if any) and a red termination marker, then returns
    /// [`Flow::Halt`].
    ///
    /// ## Errors
    ///
    /// Same as [`Session::dump`].
    pub fn die_after(&mut self, count: usize, force: bool, site: CallSite, value: Option<Variable>) -> DumpResult<Flow>
    {
        if !force && !self.can_output() {
            return Ok(Flow::Continue);
        }

        let remaining = *self.die_countdown.get_or_insert(count);
        if remaining > 0 {
            self.die_countdown = Some(remaining - 1);
            return Ok(Flow::Continue);
        }

        if let Some(value) = value {
            self.process(site, &[value])?;
        }
        self.set_color("red");
        let marker = Dumpable::text(format!("SCRIPT FORCEFULLY STOPPED AFTER {count} CALLS"));
        self.process(site, &[Variable::new("END", &marker)])?;
        tracing::debug!(count, "die_after countdown reached zero");
        Ok(Flow::Halt)
    }

    /// Dump a red termination marker and ask the caller to halt.
    ///
    /// Only active when `force` is set or output is permitted.
    ///
    /// ## Errors
    ///
    /// Same as [`Session::dump`].
    pub fn die_now(&mut self, force: bool, site: CallSite) -> DumpResult<Flow>
    {
        if !force && !self.can_output() {
            return Ok(Flow::Continue);
        }

        self.set_color("red");
        let marker = Dumpable::text("SCRIPT FORCEFULLY ENDED");
        self.process(site, &[Variable::new("END", &marker)])?;
        Ok(Flow::Halt)
    }

    /// Write `message` straight to the output stream.
    ///
    /// `bold` wraps it in `<b>`, `show_time` prefixes the local time, and
    /// `strip_tags` removes markup when running in a console.
    ///
    /// ## Errors
    ///
    /// `Io` if the stream cannot be written.
    pub fn echo(&mut self, message: &str, bold: bool, show_time: bool, strip: bool) -> DumpResult<&mut Self>
    {
        let mut message = message.to_string();
        if bold {
            message = format!("<b>{message}</b>");
        }
        if show_time {
            message = format!("{} - {message}", Local::now().format("%Y-%m-%d %H:%M:%S"));
        }
        if strip && self.env.is_console() {
            message = strip_tags(&message);
        }

        write_line(&mut self.out, &message)?;
        Ok(self)
    }

    // ========================================================================
    // Counters and conditions
    // ========================================================================

    /// Register the counter `name` with the size of `total`.
    ///
    /// ## Errors
    ///
    /// `NotCountable` if `total` has no size.
    pub fn set_counter<T: Countable + ?Sized>(&mut self, name: &str, total: &T) -> DumpResult<&mut Self>
    {
        self.counters.set(name, total)?;
        Ok(self)
    }

    /// Advance the counter `name`, printing `current/total (name)` every
    /// `every` calls. `0` never prints.
    ///
    /// ## Errors
    ///
    /// - `UnknownCounter` if `name` was never registered
    /// - `Io` if the progress line cannot be written
    pub fn increment_counter(&mut self, name: &str, every: usize) -> DumpResult<&mut Self>
    {
        if let Some(line) = self.counters.increment(name, every)? {
            self.echo(&line, true, false, true)?;
        }
        Ok(self)
    }

    /// Set the condition `name` used by [`Session::dump_conditional`].
    pub fn condition(&mut self, name: &str, value: bool) -> &mut Self
    {
        self.conditions.set(name, value);
        self
    }

    /// Alias of [`Session::condition`].
    pub fn set_condition(&mut self, name: &str, value: bool) -> &mut Self
    {
        self.condition(name, value)
    }

    // ========================================================================
    // One-shot and sticky settings
    // ========================================================================

    /// Title shown above the next dump.
    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self
    {
        self.name = Some(name.into());
        self
    }

    /// Background color of the next dump's header.
    pub fn set_color(&mut self, color: impl Into<String>) -> &mut Self
    {
        self.color = Some(color.into());
        self
    }

    /// Nesting depth for the next dump.
    pub fn set_depth(&mut self, depth: usize) -> &mut Self
    {
        self.options.depth = depth;
        self
    }

    /// Send the next dump to an HTML log file instead of the stream.
    ///
    /// `None` derives the name from the caller's location, so repeated
    /// calls from one line share a file. `.html` is appended once. HTML
    /// rendering is forced from now on.
    #[track_caller]
    pub fn set_file(&mut self, name: Option<&str>) -> &mut Self
    {
        let name = match name {
            Some(name) => name.to_string(),
            None => format!("{:016x}", CallSite::caller().fingerprint()),
        };
        self.file = Some(format!("{}.html", name.replace(".html", "")));
        self.force_html(true)
    }

    /// Render HTML even for script requests.
    pub fn force_html(&mut self, set: bool) -> &mut Self
    {
        self.force_html = set;
        self
    }

    /// Same as [`Session::force_html`].
    pub fn no_ajax(&mut self, set: bool) -> &mut Self
    {
        self.force_html(set)
    }

    /// Treat every client as allowed to see dumps.
    pub fn force_development_mode(&mut self, set: bool) -> &mut Self
    {
        self.force_development = set;
        self
    }

    /// Directory for HTML log files, created if missing.
    ///
    /// ## Errors
    ///
    /// `Io` if the directory cannot be created.
    pub fn set_log_dir(&mut self, dir: impl AsRef<Path>) -> DumpResult<&mut Self>
    {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        self.config.log_dir = Some(dir.to_path_buf());
        Ok(self)
    }

    // ========================================================================
    // Configuration and environment
    // ========================================================================

    /// Merge `overrides` into the current configuration.
    pub fn set_config(&mut self, overrides: Config) -> &mut Self
    {
        self.config.merge(overrides);
        self
    }

    /// Merge a configuration file into the current configuration.
    ///
    /// A file that exists but does not parse is reported on the output
    /// stream and ignored.
    ///
    /// ## Errors
    ///
    /// - `ConfigNotFound` if `path` does not exist
    /// - `Io` if it cannot be read, or the report cannot be written
    pub fn load_config(&mut self, path: impl AsRef<Path>) -> DumpResult<&mut Self>
    {
        match Config::load(path.as_ref()) {
            Ok(overrides) => Ok(self.set_config(overrides)),
            Err(DumpError::ConfigParse(reason)) => {
                tracing::warn!(path = %path.as_ref().display(), %reason, "ignoring malformed configuration");
                self.echo(&format!("Invalid configuration {}: {reason}", path.as_ref().display()), true, false, true)
            }
            Err(err) => Err(err),
        }
    }

    /// Replace the configuration with the defaults merged with the local file.
    pub fn load_default_config(&mut self) -> &mut Self
    {
        let (config, problem) = Config::discover();
        self.config = config;
        if let Some(err) = problem {
            tracing::warn!(error = %err, "ignoring local configuration");
            if let Err(write_err) = self.echo(&err.to_string(), true, false, true) {
                tracing::warn!(error = %write_err, "could not report configuration problem");
            }
        }
        self
    }

    /// Attach the request being served.
    pub fn set_request(&mut self, request: RequestContext) -> &mut Self
    {
        self.env = std::mem::take(&mut self.env).with_request(request);
        self
    }

    /// Whether dumps may be shown to the current client.
    pub fn can_output(&self) -> bool
    {
        self.env.can_output(&self.config.allowed_ip_addresses, self.force_development)
    }

    /// Current configuration.
    pub fn config(&self) -> &Config
    {
        &self.config
    }

    /// Environment the session runs in.
    pub fn environment(&self) -> &Environment
    {
        &self.env
    }

    /// Every rendered dump so far, in order.
    pub fn outputs(&self) -> &[String]
    {
        &self.outputs
    }

    /// The output stream.
    pub fn writer(&self) -> &W
    {
        &self.out
    }

    /// Give the output stream back.
    pub fn into_writer(self) -> W
    {
        self.out
    }

    // ========================================================================
    // Pipeline
    // ========================================================================

    fn process(&mut self, site: CallSite, variables: &[Variable]) -> DumpResult<()>
    {
        let stack = backtrace::capture();
        self.output.clear();

        self.debug_start(&site, variables, &stack);
        let formatter = BacktraceFormatter::new(EditorUri::from_config(&self.config));

        self.first_backtrace(&formatter, &site, &stack);
        if !self.ajax && !self.console {
            self.rest_of_backtraces(&formatter, &stack);
        }

        for variable in variables {
            self.print_variable(&formatter, &variable.name, &variable.value);
        }

        self.debug_end();
        self.print_output()
    }

    fn debug_start(&mut self, site: &CallSite, variables: &[Variable], stack: &[CallRecord])
    {
        if !self.force_html && self.env.is_ajax() {
            self.ajax = true;
        }
        if self.env.is_console() {
            self.console = true;
        }

        let background = if self.even { "lightyellow" } else { "rgb(255, 255, 187)" };
        self.even = !self.even;

        let mut hasher = DefaultHasher::new();
        site.hash(&mut hasher);
        for variable in variables {
            variable.name.hash(&mut hasher);
        }
        let hash = hasher.finish();

        let mut hasher = DefaultHasher::new();
        stack.hash(&mut hasher);
        let border = format!("#{:06x}", hasher.finish() & 0x00FF_FFFF);

        self.push_line(&format!(
            "<div class='debug-inline hash-{hash:016x}' style='background-color:{background}; border-left: 6px double {border};'>"
        ));
    }

    fn first_backtrace(&mut self, formatter: &BacktraceFormatter, site: &CallSite, stack: &[CallRecord])
    {
        let record = if site.function.is_empty() {
            site.to_record().merged_with_caller(stack.first())
        } else {
            site.to_record()
        };

        let style = self
            .color
            .take()
            .map(|color| format!(" style = \"background-color:{};\"", escape_html(&color)))
            .unwrap_or_default();
        self.push_line(&format!(
            "<div ondblclick=\"debugToggle(this);\" class=\"debug-backtrace debug-backtrace-first\" title=\"Double-click to show details\"{style}>"
        ));

        if let Some(name) = self.name.take() {
            self.push_line(&format!("<div class='debug-inline-name'>{}</div>", escape_html(&name)));
        }

        let header = formatter.record(&record) + &self.timers.annotate(Local::now());
        self.push_line(&header);
        self.push_line("</div>");
    }

    fn rest_of_backtraces(&mut self, formatter: &BacktraceFormatter, stack: &[CallRecord])
    {
        self.push_line("<div class=\"debug-backtraces\" style=\"display:none;\" >");
        for (i, record) in stack.iter().enumerate().rev() {
            self.push_line(&format!("<div class='debug-backtrace'>{}. {}</div>", i + 1, formatter.record(record)));
        }

        if let Some(request) = self.env.request().cloned() {
            let sections = [
                ("GET", &request.query),
                ("POST", &request.form),
                ("SERVER", &request.server),
                ("SESSION", &request.session),
            ];
            for (label, values) in sections {
                if !values.is_empty() {
                    self.print_variable(formatter, label, &Dumpable::value(values));
                }
            }
        }

        self.print_variable(formatter, "Rust Version", &Dumpable::text(RUST_VERSION));
        self.push_line("</div>");
    }

    fn print_variable(&mut self, formatter: &BacktraceFormatter, name: &str, value: &Dumpable)
    {
        if (self.ajax || self.console) && self.file.is_none() {
            self.push_line("---");
        }
        self.push_line(&format!("<div><strong class='debug-variable-name'>{}:</strong>", escape_html(name)));
        self.push_line("<pre ondblclick='debugExpand(this);' class='debug-variable'>");

        if let Some(text) = value.as_str().filter(|text| sql::looks_like_sql(text)) {
            self.print_sql(text);
        } else {
            self.print_value(formatter, value);
        }

        self.push_line("</pre></div>");
    }

    fn print_value(&mut self, formatter: &BacktraceFormatter, value: &Dumpable)
    {
        let format = self.format();
        let renderer = ValueRenderer::new(format, self.options);
        match value {
            Dumpable::Value { type_name, value } => {
                let rendered = renderer.render(type_name, value);
                self.push_rendered(format, &rendered);
            }
            Dumpable::Error(report) => {
                let rendered = renderer.render(report.type_name, &report.to_value());
                self.push_rendered(format, &rendered);
                self.push_line(&formatter.list(&report.trace));
            }
            Dumpable::Backtrace(records) => {
                self.push_line(&formatter.list(records));
            }
        }
    }

    fn print_sql(&mut self, text: &str)
    {
        self.push_line("<div class='debug-sql'>");
        self.push_line(&sql::highlight(text));
        let link = if self.can_output() {
            sql::adminer_link(text, &self.config).unwrap_or_default()
        } else {
            String::new()
        };
        self.push_line(&link);
        self.push_line("</div>");
    }

    fn debug_end(&mut self)
    {
        self.options = DumperOptions::default();
        self.push_line("</div>");
    }

    fn print_output(&mut self) -> DumpResult<()>
    {
        self.outputs.push(self.output.clone());

        let file = self.file.take().and_then(|file| match &self.config.log_dir {
            Some(dir) => Some(dir.join(file)),
            None => {
                tracing::warn!(%file, "no log directory configured, dump goes to the output stream");
                None
            }
        });

        let sink = Sink::select(self.console, self.ajax, file, self.can_output());
        tracing::debug!(?sink, "delivering dump");
        self.router.deliver(&sink, &self.output, &mut self.out)
    }

    /// HTML for pages and log files, ANSI for color terminals, text otherwise.
    fn format(&self) -> Format
    {
        if self.file.is_some() || (!self.env.is_console() && self.env.wants_html()) {
            Format::Html
        } else if self.env.is_console() && self.env.terminal_colors() {
            Format::Terminal
        } else {
            Format::Text
        }
    }

    /// The buffer is HTML; text renderings are escaped so `plain_text` restores them.
    fn push_rendered(&mut self, format: Format, rendered: &str)
    {
        if format == Format::Html {
            self.output.push_str(rendered);
        } else {
            self.output.push_str(&escape_html(rendered));
        }
    }

    fn push_line(&mut self, text: &str)
    {
        self.output.push_str(text);
        self.output.push('\n');
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn console() -> Session<Vec<u8>>
    {
        Session::with_writer(
            Config::default(),
            Environment::console_with_vars([("HOSTNAME", "localhost")]),
            Vec::new(),
        )
    }

    fn printed(session: &Session<Vec<u8>>) -> String
    {
        String::from_utf8_lossy(session.writer()).into_owned()
    }

    #[test]
    fn test_flow()
    {
        assert!(Flow::Halt.is_halt());
        assert!(!Flow::Continue.is_halt());
    }

    #[test]
    fn test_set_file_appends_extension_once()
    {
        let mut session = console();
        session.set_file(Some("trace.html"));
        assert_eq!(session.file.as_deref(), Some("trace.html"));
        session.set_file(Some("trace"));
        assert_eq!(session.file.as_deref(), Some("trace.html"));
        assert!(session.force_html);
    }

    #[test]
    fn test_set_file_without_name_is_stable_per_line()
    {
        let mut session = console();
        let mut names = Vec::new();
        for _ in 0..2 {
            session.set_file(None);
            names.push(session.file.take());
        }
        assert_eq!(names[0], names[1]);
        assert!(names[0].as_deref().is_some_and(|name| name.ends_with(".html")));
    }

    #[test]
    fn test_echo_strips_tags_in_console()
    {
        let mut session = console();
        session.echo("<i>done</i>", true, false, true).unwrap();
        session.echo("<i>raw</i>", false, false, false).unwrap();
        assert_eq!(printed(&session), "done\n<i>raw</i>\n");
    }

    #[test]
    fn test_echo_with_time()
    {
        let mut session = console();
        session.echo("tick", false, true, false).unwrap();
        let line = printed(&session);
        assert!(line.ends_with(" - tick\n"));
        assert_eq!(line.len(), "2024-01-01 00:00:00 - tick\n".len());
    }

    #[test]
    fn test_options_reset_after_dump()
    {
        let mut session = console();
        session.set_depth(1);
        assert_eq!(session.options.depth, 1);
        session
            .dump(CallSite::new("src/main.rs", 1, "app::main"), vec![Variable::new("x", &[[1]])])
            .unwrap();
        assert_eq!(session.options, DumperOptions::default());
        assert!(printed(&session).contains("array (1) …"));
    }

    #[test]
    fn test_name_and_color_are_one_shot()
    {
        let mut session = console();
        session.force_html(true).set_name("First").set_color("red");
        let site = CallSite::new("src/main.rs", 1, "app::main");
        session.dump(site, vec![Variable::new("a", &1)]).unwrap();
        session.dump(site, vec![Variable::new("a", &2)]).unwrap();

        let outputs = session.outputs();
        assert!(outputs[0].contains("<div class='debug-inline-name'>First</div>"));
        assert!(outputs[0].contains("background-color:red;"));
        assert!(!outputs[1].contains("debug-inline-name"));
        assert!(!outputs[1].contains("background-color:red;"));
    }

    #[test]
    fn test_backgrounds_alternate()
    {
        let mut session = console();
        let site = CallSite::new("src/main.rs", 1, "app::main");
        session.dump(site, vec![]).unwrap();
        session.dump(site, vec![]).unwrap();

        assert!(session.outputs()[0].contains("background-color:rgb(255, 255, 187);"));
        assert!(session.outputs()[1].contains("background-color:lightyellow;"));
    }
}
