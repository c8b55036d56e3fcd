//! Resolved query plans.

use std::fmt;

use pdx_storage::{DataType, Field, FieldValue, Table};
use serde::{Deserialize, Serialize};

use crate::parser::{BinaryOperator, Literal};

/// A SELECT resolved against a catalog.
///
/// Built fresh for every execution.
#[derive(Debug, Clone)]
pub struct SelectPlan {
    /// Output columns, in projection order.
    pub columns: Vec<OutputColumn>,
    /// Tables in FROM order.
    pub sources: Vec<TableSource>,
    /// One bound expression per output column.
    pub projections: Vec<BoundExpr>,
    /// WHERE predicate.
    pub filter: Option<BoundExpr>,
}

impl fmt::Display for SelectPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Project: {}", self.column_names().join(", "))?;
        if let Some(filter) = &self.filter {
            writeln!(f, "  Filter: {}", filter)?;
        }
        for source in &self.sources {
            let fields: Vec<&str> = source.fields.iter().map(|f| f.name.as_str()).collect();
            writeln!(f, "  Scan: {} [{}]", source.table.name(), fields.join(", "))?;
        }
        Ok(())
    }
}

impl SelectPlan {
    /// Display names of the output columns.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Describes one result column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputColumn {
    /// Display name: the alias, else the source field name, else the
    /// expression text.
    pub name: String,
    /// Alias given in the query.
    pub alias: Option<String>,
    /// Source table, for plain column references.
    pub table: Option<String>,
    /// Source field name, for plain column references.
    pub field: Option<String>,
    /// Inferred type.
    pub data_type: DataType,
}

impl OutputColumn {
    /// Returns true if `name` is this column's display or source field
    /// name, ignoring case.
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
            || self
                .field
                .as_deref()
                .is_some_and(|f| f.eq_ignore_ascii_case(name))
    }
}

/// A table in the plan and the fields it must decode.
#[derive(Debug, Clone)]
pub struct TableSource {
    /// The table.
    pub table: Table,
    /// Alias given in the query.
    pub alias: Option<String>,
    /// Fields the query references, in record order.
    pub fields: Vec<Field>,
}

impl TableSource {
    /// Returns true if `qualifier` names this source by alias, table name
    /// or file name.
    pub fn matches(&self, qualifier: &str) -> bool {
        self.alias
            .as_deref()
            .is_some_and(|a| a.eq_ignore_ascii_case(qualifier))
            || self.table.is_named(qualifier)
    }
}

/// An expression with column references resolved to row slots.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundExpr {
    /// Value `index` of the row decoded from source `source`.
    Column {
        /// Index into the plan's sources.
        source: usize,
        /// Index into that source's decoded fields.
        index: usize,
        /// Reference as written.
        name: String,
        /// Field type.
        data_type: DataType,
    },
    /// A constant.
    Literal(FieldValue),
    /// A comparison.
    Compare {
        /// Left operand.
        left: Box<BoundExpr>,
        /// Comparison operator.
        op: BinaryOperator,
        /// Right operand.
        right: Box<BoundExpr>,
    },
    /// Three-valued AND.
    And(Box<BoundExpr>, Box<BoundExpr>),
    /// Three-valued OR.
    Or(Box<BoundExpr>, Box<BoundExpr>),
    /// Three-valued NOT.
    Not(Box<BoundExpr>),
    /// `[NOT] LIKE`.
    Like {
        /// Value being matched.
        expr: Box<BoundExpr>,
        /// Pattern.
        pattern: Box<BoundExpr>,
        /// Whether this is NOT LIKE.
        negated: bool,
    },
    /// `IS [NOT] NULL`.
    IsNull {
        /// Value being tested.
        expr: Box<BoundExpr>,
        /// Whether this is IS NOT NULL.
        negated: bool,
    },
}

impl BoundExpr {
    /// Converts a literal to the value it compares as.
    pub fn literal(literal: &Literal) -> Self {
        BoundExpr::Literal(match literal {
            Literal::Null => FieldValue::Null,
            Literal::Boolean(b) => FieldValue::Boolean(*b),
            Literal::Integer(n) => match i32::try_from(*n) {
                Ok(n) => FieldValue::Long(n),
                Err(_) => FieldValue::Decimal((*n).into()),
            },
            Literal::Decimal(d) => FieldValue::Decimal(*d),
            Literal::String(s) => FieldValue::Text(s.clone()),
        })
    }

    /// Type of the value this expression produces.
    pub fn data_type(&self) -> DataType {
        match self {
            BoundExpr::Column { data_type, .. } => *data_type,
            BoundExpr::Literal(value) => value.data_type(),
            BoundExpr::Compare { .. }
            | BoundExpr::And(..)
            | BoundExpr::Or(..)
            | BoundExpr::Not(_)
            | BoundExpr::Like { .. }
            | BoundExpr::IsNull { .. } => DataType::Boolean,
        }
    }
}

impl fmt::Display for BoundExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundExpr::Column { name, .. } => write!(f, "{}", name),
            BoundExpr::Literal(FieldValue::Text(s)) => write!(f, "'{}'", s.replace('\'', "''")),
            BoundExpr::Literal(value) => write!(f, "{}", value),
            BoundExpr::Compare { left, op, right } => write!(f, "{} {} {}", left, op, right),
            BoundExpr::And(left, right) => write!(f, "({} AND {})", left, right),
            BoundExpr::Or(left, right) => write!(f, "({} OR {})", left, right),
            BoundExpr::Not(expr) => write!(f, "NOT {}", expr),
            BoundExpr::Like {
                expr,
                pattern,
                negated,
            } => {
                let not = if *negated { "NOT " } else { "" };
                write!(f, "{} {}LIKE {}", expr, not, pattern)
            }
            BoundExpr::IsNull { expr, negated } => {
                let not = if *negated { "NOT " } else { "" };
                write!(f, "{} IS {}NULL", expr, not)
            }
        }
    }
}
