//! Interactive REPL (Read-Eval-Print-Loop) over a table directory.
//!
//! Provides an interactive SQL shell with command history, line editing,
//! keyword and table name completion, and multi-line input support.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use pdx_sql::{Engine, ExecuteOutcome, QueryResult};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{CompletionType, Config, EditMode, Editor, Helper};
use tracing::{debug, error};

use crate::commands::{Command, CommandResult};
use crate::config::CliConfig;
use crate::formatter::{self, OutputFormat};

/// The REPL prompt shown when waiting for input.
const PROMPT: &str = "pdx> ";

/// The continuation prompt for multi-line input.
const CONTINUATION_PROMPT: &str = "  -> ";

const KEYWORDS: &[&str] = &[
    "SELECT", "FROM", "WHERE", "AS", "AND", "OR", "NOT", "IS", "NULL", "LIKE", "TRUE", "FALSE",
];

/// REPL helper for rustyline.
struct ReplHelper {
    /// SQL keywords and table names for completion.
    words: Vec<String>,
}

impl ReplHelper {
    fn new(tables: Vec<String>) -> Self {
        let mut words: Vec<String> = KEYWORDS.iter().map(|k| k.to_string()).collect();
        words.extend(tables);
        Self { words }
    }
}

impl Completer for ReplHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let start = line[..pos]
            .rfind(|c: char| c.is_whitespace() || c == '(' || c == ',')
            .map(|i| i + 1)
            .unwrap_or(0);

        let word = line[start..pos].to_uppercase();
        if word.is_empty() {
            return Ok((start, Vec::new()));
        }

        let matches: Vec<Pair> = self
            .words
            .iter()
            .filter(|w| w.to_uppercase().starts_with(&word))
            .map(|w| Pair {
                display: w.clone(),
                replacement: w.clone(),
            })
            .collect();

        Ok((start, matches))
    }
}

impl Hinter for ReplHelper {
    type Hint = String;
}

impl Highlighter for ReplHelper {}

impl Validator for ReplHelper {
    fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        let trimmed = ctx.input().trim();

        if trimmed.is_empty() || trimmed.starts_with('\\') || trimmed.ends_with(';') {
            return Ok(ValidationResult::Valid(None));
        }

        Ok(ValidationResult::Incomplete)
    }
}

impl Helper for ReplHelper {}

/// An open directory plus display settings.
pub struct Session {
    engine: Engine,
    format: OutputFormat,
    timing: bool,
}

impl Session {
    /// Creates a session over an open engine.
    pub fn new(engine: Engine, format: OutputFormat, timing: bool) -> Self {
        Self {
            engine,
            format,
            timing,
        }
    }

    /// The engine queries run against.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Returns the current output format.
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Returns true if timing is shown.
    pub fn timing(&self) -> bool {
        self.timing
    }

    /// Executes SQL and prints the results.
    ///
    /// SELECT statements run in order; other statements are reported on
    /// stderr and skipped.
    pub fn execute_and_print(&self, sql: &str) -> Result<()> {
        let start = Instant::now();
        let outcome = self.engine.execute(sql)?;
        let elapsed = start.elapsed();
        self.print_outcome(&outcome, elapsed);
        Ok(())
    }

    fn print_outcome(&self, outcome: &ExecuteOutcome, elapsed: Duration) {
        for result in &outcome.results {
            self.print_result(result);
        }
        for skipped in &outcome.skipped {
            eprintln!(
                "Skipped {} statement: only SELECT is executed",
                skipped.kind
            );
        }
        if self.timing {
            println!("Time: {:.3}ms", elapsed.as_secs_f64() * 1000.0);
        }
    }

    fn print_result(&self, result: &QueryResult) {
        let output = formatter::format_result(result, self.format);
        match self.format {
            OutputFormat::Table => {
                println!("{}", output);
                println!(
                    "({} row{})",
                    result.len(),
                    if result.len() == 1 { "" } else { "s" }
                );
            }
            _ => print!("{}", output),
        }
    }
}

/// Interactive shell over one directory.
pub struct Repl {
    session: Session,
    /// The rustyline editor.
    editor: Editor<ReplHelper, DefaultHistory>,
    /// History file path.
    history_file: Option<PathBuf>,
    /// Statement lines typed so far.
    buffer: String,
}

impl Repl {
    /// Creates a new REPL instance.
    pub fn new(session: Session, config: &CliConfig) -> Result<Self> {
        let rl_config = Config::builder()
            .history_ignore_space(true)
            .completion_type(CompletionType::List)
            .edit_mode(EditMode::Emacs)
            .max_history_size(config.history_size)?
            .build();

        let tables = session
            .engine()
            .list_tables("%")
            .map(|tables| tables.iter().map(|t| t.name().to_string()).collect())
            .unwrap_or_default();

        let mut editor = Editor::with_config(rl_config)?;
        editor.set_helper(Some(ReplHelper::new(tables)));

        let history_file = config.history_path();
        if let Some(ref path) = history_file {
            if path.exists() {
                if let Err(e) = editor.load_history(path) {
                    debug!(path = %path.display(), error = %e, "failed to load history");
                }
            }
        }

        Ok(Self {
            session,
            editor,
            history_file,
            buffer: String::new(),
        })
    }

    /// Prints the welcome banner.
    pub fn print_banner(&self) {
        println!("pdx v{}", env!("CARGO_PKG_VERSION"));
        println!(
            "Reading tables from {}",
            self.session.engine().catalog().root().display()
        );
        println!("Type \\? for help, \\q to quit.\n");
    }

    /// Runs the main REPL loop.
    pub fn run(&mut self) -> Result<()> {
        loop {
            let prompt = if self.buffer.is_empty() {
                PROMPT
            } else {
                CONTINUATION_PROMPT
            };

            match self.editor.readline(prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }

                    if let Err(e) = self.editor.add_history_entry(line) {
                        debug!(error = %e, "failed to record history");
                    }

                    match self.process_line(line) {
                        Ok(true) => break,
                        Ok(false) => {}
                        Err(e) => eprintln!("ERROR: {:#}", e),
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    self.buffer.clear();
                }
                Err(ReadlineError::Eof) => {
                    println!("\\q");
                    break;
                }
                Err(e) => {
                    error!(error = %e, "readline failed");
                    break;
                }
            }
        }

        self.save_history();
        Ok(())
    }

    /// Processes a single line of input. Returns true to exit.
    fn process_line(&mut self, line: &str) -> Result<bool> {
        if self.buffer.is_empty() && line.starts_with('\\') {
            return self.process_command(line);
        }

        if !self.buffer.is_empty() {
            self.buffer.push('\n');
        }
        self.buffer.push_str(line);
        if !line.ends_with(';') {
            return Ok(false);
        }

        let sql = std::mem::take(&mut self.buffer);
        self.session.execute_and_print(&sql)?;
        Ok(false)
    }

    /// Processes a backslash command.
    fn process_command(&mut self, line: &str) -> Result<bool> {
        let cmd = Command::parse(line);

        match cmd.execute(&mut self.session)? {
            CommandResult::Continue => Ok(false),
            CommandResult::Exit => Ok(true),
            CommandResult::Output(msg) => {
                println!("{}", msg);
                Ok(false)
            }
            CommandResult::SetTiming(enabled) => {
                self.session.timing = enabled;
                if enabled {
                    println!("Timing is on.");
                } else {
                    println!("Timing is off.");
                }
                Ok(false)
            }
            CommandResult::SetFormat(format) => {
                self.session.format = format;
                println!("Output format set to {:?}.", format);
                Ok(false)
            }
        }
    }

    /// Saves command history.
    fn save_history(&mut self) {
        if let Some(ref path) = self.history_file {
            if let Some(parent) = path.parent() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    debug!(path = %parent.display(), error = %e, "failed to create history directory");
                    return;
                }
            }
            if let Err(e) = self.editor.save_history(path) {
                debug!(path = %path.display(), error = %e, "failed to save history");
            }
        }
    }
}
