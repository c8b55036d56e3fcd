//! Special backslash commands for the REPL.
//!
//! Provides commands like `\d`, `\dt`, `\q`, etc., and the catalog reports
//! they share with the one-shot command-line modes.

use anyhow::{Context, Result};
use pdx_sql::Engine;
use pdx_storage::{FieldValue, IndexKind, Row};

use crate::formatter::{self, OutputFormat};
use crate::repl::Session;

/// Result of executing a command.
#[derive(Debug)]
pub enum CommandResult {
    /// Continue the REPL.
    Continue,
    /// Exit the REPL.
    Exit,
    /// Output a message.
    Output(String),
    /// Set timing mode.
    SetTiming(bool),
    /// Set output format.
    SetFormat(OutputFormat),
}

/// A parsed command.
#[derive(Debug)]
pub enum Command {
    /// Quit the REPL.
    Quit,
    /// Show help.
    Help,
    /// List tables, optionally filtered by a LIKE pattern.
    ListTables(Option<String>),
    /// Describe a table's fields, or list tables without a name.
    Describe(Option<String>),
    /// List a table's indexes.
    Indexes(Option<String>),
    /// Toggle timing, or set it with `on` / `off`.
    Timing(Option<String>),
    /// Show or set the output format.
    Format(Option<String>),
    /// Show version.
    Version,
    /// Execute a file.
    Include(String),
    /// Unknown command.
    Unknown(String),
}

impl Command {
    /// Parses a command string.
    pub fn parse(input: &str) -> Self {
        let input = input.trim().trim_end_matches(';');
        let cmd = input.strip_prefix('\\').unwrap_or(input);

        let (name, args) = match cmd.split_once(char::is_whitespace) {
            Some((name, args)) => (name, Some(args.trim().to_string())),
            None => (cmd, None),
        };
        let args = args.filter(|a| !a.is_empty());

        match name.to_lowercase().as_str() {
            "q" | "quit" | "exit" => Command::Quit,
            "?" | "h" | "help" => Command::Help,
            "dt" | "tables" => Command::ListTables(args),
            "d" => Command::Describe(args),
            "di" => Command::Indexes(args),
            "timing" | "t" => Command::Timing(args),
            "format" | "f" => Command::Format(args),
            "version" | "v" => Command::Version,
            "i" | "include" => Command::Include(args.unwrap_or_default()),
            other => Command::Unknown(other.to_string()),
        }
    }

    /// Executes the command.
    pub fn execute(&self, session: &mut Session) -> Result<CommandResult> {
        let format = session.format();
        match self {
            Command::Quit => Ok(CommandResult::Exit),

            Command::Help => Ok(CommandResult::Output(Self::help_text())),

            Command::ListTables(pattern) | Command::Describe(pattern @ None) => {
                let pattern = pattern.as_deref().unwrap_or("%");
                Ok(CommandResult::Output(list_tables(session.engine(), pattern, format)?))
            }

            Command::Describe(Some(name)) => Ok(CommandResult::Output(describe_table(
                session.engine(),
                name,
                format,
            )?)),

            Command::Indexes(None) => Ok(CommandResult::Output("Usage: \\di <table>".to_string())),

            Command::Indexes(Some(name)) => Ok(CommandResult::Output(describe_indexes(
                session.engine(),
                name,
                format,
            )?)),

            Command::Timing(arg) => match arg.as_deref().map(str::to_lowercase).as_deref() {
                None => Ok(CommandResult::SetTiming(!session.timing())),
                Some("on") => Ok(CommandResult::SetTiming(true)),
                Some("off") => Ok(CommandResult::SetTiming(false)),
                Some(other) => Ok(CommandResult::Output(format!(
                    "Unknown timing mode '{}'. Use on or off.",
                    other
                ))),
            },

            Command::Format(None) => Ok(CommandResult::Output(format!(
                "Output format is {:?}.",
                format
            ))),

            Command::Format(Some(name)) => match name.parse::<OutputFormat>() {
                Ok(format) => Ok(CommandResult::SetFormat(format)),
                Err(message) => Ok(CommandResult::Output(message)),
            },

            Command::Version => Ok(CommandResult::Output(format!(
                "pdx v{}",
                env!("CARGO_PKG_VERSION")
            ))),

            Command::Include(path) => {
                if path.is_empty() {
                    Ok(CommandResult::Output("Usage: \\i <filename>".to_string()))
                } else {
                    let content = std::fs::read_to_string(path)
                        .with_context(|| format!("cannot read {}", path))?;
                    run_script(session, &content)?;
                    Ok(CommandResult::Continue)
                }
            }

            Command::Unknown(cmd) => Ok(CommandResult::Output(format!(
                "Unknown command '\\{}'. Type \\? for help.",
                cmd
            ))),
        }
    }

    /// Returns help text.
    fn help_text() -> String {
        r#"pdx Commands
============

General:
  \q, \quit       Exit the shell
  \?, \help       Show this help
  \v, \version    Show version information

Catalog:
  \dt [PATTERN]   List tables, optionally matching a LIKE pattern
  \d [TABLE]      Describe a table's fields
  \di TABLE       List a table's indexes

Display:
  \t, \timing [on|off]   Toggle timing display
  \f, \format [FORMAT]   Show or set output format (table, json, csv, raw)

Files:
  \i FILE         Execute statements from file

Type SQL statements followed by a semicolon to execute them.
Only SELECT runs; other statements are reported and skipped.
"#
        .to_string()
    }
}

/// Renders the tables matching `pattern`.
pub fn list_tables(engine: &Engine, pattern: &str, format: OutputFormat) -> Result<String> {
    let rows: Vec<Row> = engine
        .list_tables(pattern)?
        .iter()
        .map(|table| {
            Row::new(vec![
                FieldValue::text(table.name()),
                FieldValue::text(table.file_name()),
                FieldValue::Long(table.fields().len() as i32),
                FieldValue::Long(table.row_count() as i32),
            ])
        })
        .collect();
    Ok(formatter::format_rows(
        &["Name", "File", "Fields", "Rows"],
        &rows,
        format,
    ))
}

/// Renders the fields of one table.
pub fn describe_table(engine: &Engine, name: &str, format: OutputFormat) -> Result<String> {
    let rows: Vec<Row> = engine
        .describe_table(name)?
        .iter()
        .map(|field| {
            Row::new(vec![
                FieldValue::Long(field.position as i32),
                FieldValue::text(field.name.as_str()),
                FieldValue::text(field.field_type.to_string()),
                FieldValue::Long(i32::from(field.size)),
                FieldValue::text(field.data_type().to_string()),
            ])
        })
        .collect();
    Ok(formatter::format_rows(
        &["#", "Name", "Type", "Size", "SQL Type"],
        &rows,
        format,
    ))
}

/// Renders the indexes of one table.
pub fn describe_indexes(engine: &Engine, name: &str, format: OutputFormat) -> Result<String> {
    let rows: Vec<Row> = engine
        .describe_indexes(name)?
        .iter()
        .map(|index| {
            let kind = match index.kind {
                IndexKind::Primary => "primary",
                IndexKind::Secondary => "secondary",
            };
            Row::new(vec![
                FieldValue::text(index.name.as_str()),
                FieldValue::text(kind),
                FieldValue::text(index.column_names().join(", ")),
                FieldValue::Boolean(index.unique),
                FieldValue::text(index.order.to_string()),
            ])
        })
        .collect();
    Ok(formatter::format_rows(
        &["Name", "Kind", "Columns", "Unique", "Order"],
        &rows,
        format,
    ))
}

/// Runs every statement of a script, stopping at the first failure.
pub fn run_script(session: &Session, content: &str) -> Result<()> {
    for statement in split_statements(content) {
        session.execute_and_print(&statement)?;
    }
    Ok(())
}

/// Splits SQL text into statements, dropping comments and empty
/// statements. Quoted text is kept as written.
pub fn split_statements(content: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' => {
                current.push(c);
                while let Some(inner) = chars.next() {
                    current.push(inner);
                    if inner == c {
                        // a doubled quote stays inside the string
                        if chars.peek() == Some(&c) {
                            if let Some(escaped) = chars.next() {
                                current.push(escaped);
                            }
                            continue;
                        }
                        break;
                    }
                }
            }
            '-' if chars.peek() == Some(&'-') => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        break;
                    }
                }
                current.push('\n');
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut last = ' ';
                for skipped in chars.by_ref() {
                    if last == '*' && skipped == '/' {
                        break;
                    }
                    last = skipped;
                }
                current.push(' ');
            }
            ';' => {
                push_statement(&mut statements, &current);
                current.clear();
            }
            _ => current.push(c),
        }
    }
    push_statement(&mut statements, &current);

    statements
}

fn push_statement(statements: &mut Vec<String>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        statements.push(trimmed.to_string());
    }
}
