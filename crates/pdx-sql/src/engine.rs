//! Entry points over one table directory.
//!
//! [`Engine`] is the narrow surface consumers use: list and describe
//! tables, parse SQL, and run it under one of two policies.
//!
//! - [`Engine::query`] accepts exactly one statement, which must be a
//!   SELECT.
//! - [`Engine::execute`] accepts any number of statements, runs the
//!   SELECTs in order and reports the rest as skipped.

use std::path::PathBuf;

use pdx_common::config::CatalogConfig;
use pdx_storage::{Catalog, Field, Index, Table};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::executor::{self, QueryResult};
use crate::parser::{OpaqueStatement, Parser, Statement};
use crate::planner::PlanError;

/// Outcome of [`Engine::execute`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecuteOutcome {
    /// One result per SELECT, in statement order.
    pub results: Vec<QueryResult>,
    /// Statements that were not run.
    pub skipped: Vec<OpaqueStatement>,
}

/// SQL access to one directory of Paradox tables.
#[derive(Debug, Clone)]
pub struct Engine {
    catalog: Catalog,
}

impl Engine {
    /// Opens the directory `dir`.
    pub fn open(dir: impl Into<PathBuf>, config: CatalogConfig) -> Result<Self> {
        let catalog = Catalog::open(dir, config)?;
        info!(dir = %catalog.root().display(), "opened database");
        Ok(Self::with_catalog(catalog))
    }

    /// Wraps an existing catalog.
    pub fn with_catalog(catalog: Catalog) -> Self {
        Self { catalog }
    }

    /// The underlying catalog.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Tables whose name matches the LIKE `pattern`.
    pub fn list_tables(&self, pattern: &str) -> Result<Vec<Table>> {
        Ok(self.catalog.tables(pattern)?)
    }

    /// Finds a table by name, failing if it does not exist.
    pub fn table(&self, name: &str) -> Result<Table> {
        self.catalog
            .find_table(name)?
            .ok_or_else(|| {
                PlanError::TableNotFound {
                    table: name.to_string(),
                }
                .into()
            })
    }

    /// Fields of a table, in record order.
    pub fn describe_table(&self, name: &str) -> Result<Vec<Field>> {
        Ok(self.table(name)?.fields().to_vec())
    }

    /// Indexes of a table, primary first.
    pub fn describe_indexes(&self, name: &str) -> Result<Vec<Index>> {
        let table = self.table(name)?;
        Ok(self.catalog.indexes_for(&table)?)
    }

    /// Parses SQL text into statements.
    pub fn parse_sql(&self, sql: &str) -> Result<Vec<Statement>> {
        Ok(Parser::parse(sql)?)
    }

    /// Plans and runs one parsed statement.
    pub fn plan_and_execute(&self, statement: &Statement) -> Result<QueryResult> {
        executor::plan_and_execute(statement, &self.catalog)
    }

    /// Runs SQL text that must hold exactly one SELECT.
    pub fn query(&self, sql: &str) -> Result<QueryResult> {
        let mut statements = Parser::parse(sql)?;
        if statements.len() != 1 {
            return Err(Error::MultipleStatements {
                count: statements.len(),
            });
        }
        let statement = statements.remove(0);
        if let Statement::Other(other) = &statement {
            return Err(Error::NotASelect {
                kind: other.kind.clone(),
            });
        }
        self.plan_and_execute(&statement)
    }

    /// Runs every SELECT in `sql` and skips other statements.
    ///
    /// The whole text is parsed first, so a syntax error anywhere runs
    /// nothing. Execution stops at the first failing SELECT.
    pub fn execute(&self, sql: &str) -> Result<ExecuteOutcome> {
        let statements = Parser::parse(sql)?;
        let mut outcome = ExecuteOutcome {
            results: Vec::new(),
            skipped: Vec::new(),
        };
        for statement in statements {
            match statement {
                Statement::Select(_) => {
                    outcome.results.push(self.plan_and_execute(&statement)?);
                }
                Statement::Other(other) => {
                    debug!(kind = %other.kind, "skipping statement");
                    outcome.skipped.push(other);
                }
            }
        }
        Ok(outcome)
    }
}
