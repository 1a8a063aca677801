use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use dbgr_core::sql::{highlight, looks_like_sql};
use dbgr_core::{die_after, dump, Config, DumpResult, Dumpable, Flow, Session};
use dbgr_utils::{debug, info, init_logging};
use serde::Serialize;
use serde_json::json;

/// Dump variables, call stacks and SQL to the console or an HTML log file.
#[derive(Parser, Debug)]
#[command(name = "dbgr")]
#[command(version)]
#[command(about = "Dump variables, call stacks and SQL to the console or an HTML log file", long_about = None)]
struct Cli
{
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Highlight an SQL query as HTML
    Highlight
    {
        /// Query to highlight (read from stdin when omitted)
        sql: Option<String>,
        /// Only report whether the text looks like SQL (exit code 1 if not)
        #[arg(long, default_value_t = false)]
        check: bool,
    },
    /// Print the merged configuration as JSON
    Config
    {
        /// Extra configuration file merged over the defaults
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Dump a set of sample values
    Demo
    {
        /// Write the dumps to this HTML log file instead of the console
        #[arg(long)]
        file: Option<String>,
        /// Directory for HTML log files
        #[arg(long)]
        log_dir: Option<PathBuf>,
        /// Extra configuration file merged over the defaults
        #[arg(long)]
        config: Option<PathBuf>,
        /// Stop after this many loop iterations went through
        #[arg(long)]
        die_after: Option<usize>,
    },
}

#[derive(Serialize)]
struct Sample
{
    name: String,
    tags: Vec<&'static str>,
    parent: Option<Box<Sample>>,
}

fn main()
{
    // Diagnostics go to stderr; stdout carries the dumps
    let _guard = match init_logging() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            process::exit(1);
        }
    };

    let cli = Cli::parse();

    match run_command(cli) {
        Ok(Flow::Continue) => {}
        Ok(Flow::Halt) => {
            info!("stopped by die_after");
            process::exit(0);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn run_command(cli: Cli) -> DumpResult<Flow>
{
    match cli.command {
        Commands::Highlight { sql, check } => {
            let sql = match sql {
                Some(sql) => sql,
                None => {
                    let mut buffer = String::new();
                    io::stdin().read_to_string(&mut buffer)?;
                    buffer
                }
            };

            if check {
                let is_sql = looks_like_sql(&sql);
                println!("{}", is_sql);
                if !is_sql {
                    process::exit(1);
                }
            } else {
                println!("{}", highlight(&sql));
            }
            Ok(Flow::Continue)
        }
        Commands::Config { config } => {
            let mut session = Session::new();
            if let Some(path) = config {
                session.load_config(&path)?;
            }
            println!("{}", serde_json::to_string_pretty(session.config())?);
            Ok(Flow::Continue)
        }
        Commands::Demo {
            file,
            log_dir,
            config,
            die_after,
        } => run_demo(file, log_dir, config, die_after),
    }
}

fn run_demo(
    file: Option<String>,
    log_dir: Option<PathBuf>,
    config: Option<PathBuf>,
    limit: Option<usize>,
) -> DumpResult<Flow>
{
    let mut session = Session::new();
    if let Some(path) = config {
        session.load_config(&path)?;
    }
    if let Some(dir) = log_dir {
        session.set_log_dir(&dir)?;
    }
    demo(&mut session, file.as_deref(), limit)
}

/// Dump the sample values, then walk a counter loop.
///
/// An explicit `limit` stops the loop whatever the client permissions are.
fn demo<W: Write>(session: &mut Session<W>, file: Option<&str>, limit: Option<usize>) -> DumpResult<Flow>
{
    session.set_config(Config {
        adminer_database_name: Some("test".to_string()),
        adminer_username: Some("develop".to_string()),
        ..Config::default()
    });
    debug!(can_output = session.can_output(), "demo session ready");

    let nested = json!([[[[[["deeply nested"]]]]], "alpha", "beta", "gamma"]);
    let sql = "SELECT * FROM dual WHERE 1=1;";
    let sample = Sample {
        name: "child".to_string(),
        tags: vec!["demo", "nested"],
        parent: Some(Box::new(Sample {
            name: "parent".to_string(),
            tags: Vec::new(),
            parent: None,
        })),
    };
    let failure = Dumpable::error(&io::Error::new(io::ErrorKind::NotFound, "sample.json is missing"));

    for round in 1..=3 {
        if file.is_some() {
            session.set_file(file);
        }
        session.set_name(format!("Round {round}"));
        dump!(session, nested, sql, sample, failure)?;
    }

    let rows = vec!["first", "second", "third", "fourth"];
    session.set_counter("rows", &rows)?;
    for row in &rows {
        session.increment_counter("rows", 2)?;
        if let Some(limit) = limit {
            if die_after!(session, limit, true, row)?.is_halt() {
                return Ok(Flow::Halt);
            }
        }
    }

    session.echo("Demo finished", true, true, true)?;
    Ok(Flow::Continue)
}

#[cfg(test)]
mod tests
{
    use dbgr_core::Environment;

    use super::*;

    fn remote_console() -> Session<Vec<u8>>
    {
        Session::with_writer(
            Config::defaults(),
            Environment::console_with_vars([("HOSTNAME", "buildbox")]),
            Vec::new(),
        )
    }

    #[test]
    fn test_demo_limit_stops_on_unlisted_host()
    {
        let mut session = remote_console();
        assert!(!session.can_output());

        let flow = demo(&mut session, None, Some(1)).unwrap();
        assert_eq!(flow, Flow::Halt);

        let printed = String::from_utf8(session.into_writer()).unwrap();
        assert!(printed.contains("SCRIPT FORCEFULLY STOPPED AFTER 1 CALLS"));
        assert!(!printed.contains("Demo finished"));
    }

    #[test]
    fn test_demo_without_limit_finishes()
    {
        let mut session = remote_console();
        assert_eq!(demo(&mut session, None, None).unwrap(), Flow::Continue);

        let printed = String::from_utf8(session.into_writer()).unwrap();
        assert!(printed.contains("0/4 (rows)"));
        assert!(printed.contains("Demo finished"));
    }
}
