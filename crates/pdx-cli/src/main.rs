//! pdx command-line interface
//!
//! Runs read-only SQL against a directory of Paradox tables.
//!
//! # Usage
//!
//! ```bash
//! # Start interactive shell in the current directory
//! pdx
//!
//! # Execute a single command
//! pdx --dir ./data -c "SELECT * FROM AREACODES WHERE State = 'NJ'"
//!
//! # Execute statements from a file
//! pdx --dir ./data -f queries.sql
//!
//! # Inspect the catalog
//! pdx --dir ./data --tables 'cust%'
//! pdx --dir ./data --describe customer
//!
//! # Output as JSON
//! pdx -o json -c "SELECT * FROM customer"
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use pdx_sql::Engine;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod formatter;
mod repl;

use config::CliConfig;
use formatter::OutputFormat;
use repl::{Repl, Session};

/// pdx command-line interface
#[derive(Parser, Debug)]
#[command(
    name = "pdx",
    version,
    about = "Read-only SQL over Paradox table directories",
    long_about = "Query a directory of Paradox .DB files with SELECT statements.\n\n\
                  Use this tool for interactive sessions, running queries from files,\n\
                  and inspecting table and index metadata."
)]
struct Args {
    /// Directory holding the table files
    #[arg(short = 'd', long, value_name = "DIR", env = "PDX_DIR")]
    dir: Option<PathBuf>,

    /// Execute SQL and exit
    #[arg(short = 'c', long, conflicts_with_all = ["file", "tables", "describe"])]
    command: Option<String>,

    /// Execute SQL statements from file and exit
    #[arg(short = 'f', long, value_name = "FILE", conflicts_with_all = ["tables", "describe"])]
    file: Option<PathBuf>,

    /// List tables matching a LIKE pattern and exit
    #[arg(
        long,
        value_name = "PATTERN",
        num_args = 0..=1,
        default_missing_value = "%",
        conflicts_with = "describe"
    )]
    tables: Option<String>,

    /// Describe a table's fields and indexes and exit
    #[arg(long, value_name = "TABLE")]
    describe: Option<String>,

    /// Output format
    #[arg(short = 'o', long, value_enum)]
    output: Option<OutputFormatArg>,

    /// Enable verbose output
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Suppress the banner (for scripting)
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Configuration file path
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

/// Output format argument
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormatArg {
    /// Display results in a formatted table
    Table,
    /// Display results as JSON
    Json,
    /// Display results as CSV
    Csv,
    /// Display raw values
    Raw,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Table => OutputFormat::Table,
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Csv => OutputFormat::Csv,
            OutputFormatArg::Raw => OutputFormat::Raw,
        }
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose);

    let config = load_config(&args)?;
    let format = match args.output {
        Some(arg) => arg.into(),
        None => config
            .output_format
            .parse::<OutputFormat>()
            .map_err(anyhow::Error::msg)?,
    };

    let dir = config.data_dir();
    let engine = Engine::open(&dir, config.catalog.clone())
        .with_context(|| format!("cannot open {}", dir.display()))?;
    let session = Session::new(engine, format, config.timing);

    if let Some(sql) = &args.command {
        info!(sql = %sql, "executing command");
        session.execute_and_print(sql)
    } else if let Some(file) = &args.file {
        execute_file(&session, file)
    } else if let Some(pattern) = &args.tables {
        print!("{}", with_newline(commands::list_tables(session.engine(), pattern, format)?));
        Ok(())
    } else if let Some(table) = &args.describe {
        print!("{}", with_newline(commands::describe_table(session.engine(), table, format)?));
        print!("{}", with_newline(commands::describe_indexes(session.engine(), table, format)?));
        Ok(())
    } else {
        let mut repl = Repl::new(session, &config)?;
        if !args.quiet {
            repl.print_banner();
        }
        repl.run()
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("pdx=debug,pdx_sql=debug,pdx_storage=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn load_config(args: &Args) -> Result<CliConfig> {
    let mut config = if let Some(path) = &args.config {
        CliConfig::from_file(path)?
    } else {
        CliConfig::load_default()?
    };

    // Command-line arguments override the file
    if let Some(dir) = &args.dir {
        config.dir = Some(dir.clone());
    }

    Ok(config)
}

fn execute_file(session: &Session, path: &Path) -> Result<()> {
    info!(path = %path.display(), "executing file");

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    commands::run_script(session, &content)
}

// table output has no trailing newline, the other formats do
fn with_newline(mut output: String) -> String {
    if !output.ends_with('\n') {
        output.push('\n');
    }
    output
}
