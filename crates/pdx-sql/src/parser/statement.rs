//! Statement syntax tree.
//!
//! Only `SELECT` is parsed into structure. Any other statement is kept as
//! its raw text, tagged with the kind its first keyword names.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Expr;

/// A parsed SQL statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    /// SELECT query.
    Select(SelectStatement),
    /// Anything else, unparsed.
    Other(OpaqueStatement),
}

impl Statement {
    /// Returns true for SELECT statements.
    pub fn is_select(&self) -> bool {
        matches!(self, Statement::Select(_))
    }

    /// The SELECT, if this is one.
    pub fn as_select(&self) -> Option<&SelectStatement> {
        match self {
            Statement::Select(select) => Some(select),
            Statement::Other(_) => None,
        }
    }

    /// Kind of statement.
    pub fn kind(&self) -> StatementKind {
        match self {
            Statement::Select(_) => StatementKind::Select,
            Statement::Other(other) => other.kind.clone(),
        }
    }
}

/// `SELECT items FROM tables [WHERE selection]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectStatement {
    /// Projection list.
    pub items: Vec<SelectItem>,
    /// Tables, combined as a cartesian product.
    pub from: Vec<TableRef>,
    /// WHERE predicate.
    pub selection: Option<Expr>,
}

impl fmt::Display for SelectStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT ")?;
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", item)?;
        }
        write!(f, " FROM ")?;
        for (i, table) in self.from.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", table)?;
        }
        if let Some(selection) = &self.selection {
            write!(f, " WHERE {}", selection)?;
        }
        Ok(())
    }
}

/// One entry of the projection list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SelectItem {
    /// `*`
    Wildcard,
    /// `table.*`
    QualifiedWildcard(String),
    /// An expression with an optional alias.
    Expr {
        /// Projected expression.
        expr: Expr,
        /// Output name.
        alias: Option<String>,
    },
}

impl fmt::Display for SelectItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectItem::Wildcard => write!(f, "*"),
            SelectItem::QualifiedWildcard(table) => write!(f, "{}.*", table),
            SelectItem::Expr { expr, alias: None } => write!(f, "{}", expr),
            SelectItem::Expr {
                expr,
                alias: Some(alias),
            } => write!(f, "{} AS {}", expr, alias),
        }
    }
}

/// A table in the FROM list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRef {
    /// Table name as written, possibly with its extension.
    pub name: String,
    /// Optional alias.
    pub alias: Option<String>,
}

impl TableRef {
    /// Creates a table reference.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
        }
    }

    /// Adds an alias.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Returns the alias if any, else the name.
    pub fn effective_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(alias) = &self.alias {
            write!(f, " AS {}", alias)?;
        }
        Ok(())
    }
}

/// A statement that is recognized but not parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpaqueStatement {
    /// Kind named by the first keyword.
    pub kind: StatementKind,
    /// Statement text, trimmed.
    pub text: String,
}

/// Statement kinds, from the first keyword.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatementKind {
    /// SELECT
    Select,
    /// INSERT
    Insert,
    /// UPDATE
    Update,
    /// DELETE
    Delete,
    /// CREATE
    Create,
    /// DROP
    Drop,
    /// ALTER
    Alter,
    /// Any other leading word, upper-cased.
    Other(String),
}

impl StatementKind {
    /// Classifies a statement by its first word.
    pub fn from_keyword(word: &str) -> Self {
        match word.to_ascii_uppercase().as_str() {
            "SELECT" => StatementKind::Select,
            "INSERT" => StatementKind::Insert,
            "UPDATE" => StatementKind::Update,
            "DELETE" => StatementKind::Delete,
            "CREATE" => StatementKind::Create,
            "DROP" => StatementKind::Drop,
            "ALTER" => StatementKind::Alter,
            other => StatementKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementKind::Select => write!(f, "SELECT"),
            StatementKind::Insert => write!(f, "INSERT"),
            StatementKind::Update => write!(f, "UPDATE"),
            StatementKind::Delete => write!(f, "DELETE"),
            StatementKind::Create => write!(f, "CREATE"),
            StatementKind::Drop => write!(f, "DROP"),
            StatementKind::Alter => write!(f, "ALTER"),
            StatementKind::Other(word) => write!(f, "{}", word),
        }
    }
}
