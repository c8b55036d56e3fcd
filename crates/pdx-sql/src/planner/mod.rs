//! Query planning.
//!
//! Planning resolves a parsed SELECT against a catalog:
//!
//! 1. Each FROM entry is looked up by name. Only the matching table header
//!    is read.
//! 2. `*` and `t.*` expand to table fields, tables in FROM order and fields
//!    in record order.
//! 3. Column references resolve case-insensitively. A qualifier may be a
//!    table alias, table name or file name.
//! 4. Each table decodes only the fields the query references.

use pdx_common::ErrorCode;
use thiserror::Error;

mod builder;
mod plan;

pub use builder::plan;
pub use plan::*;

/// Errors raised while resolving a statement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[allow(missing_docs)]
pub enum PlanError {
    /// A FROM entry names no table in the catalog.
    #[error("table '{table}' not found")]
    TableNotFound { table: String },

    /// A column reference matches no field.
    #[error("column '{column}' not found")]
    ColumnNotFound { column: String },

    /// A column reference matches fields in more than one table.
    #[error("column '{column}' is ambiguous: it exists in {}", tables.join(", "))]
    AmbiguousColumn { column: String, tables: Vec<String> },
}

impl PlanError {
    /// Returns the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            PlanError::TableNotFound { .. } => ErrorCode::TableNotFound,
            PlanError::ColumnNotFound { .. } => ErrorCode::ColumnNotFound,
            PlanError::AmbiguousColumn { .. } => ErrorCode::AmbiguousColumn,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = PlanError::AmbiguousColumn {
            column: "Name".into(),
            tables: vec!["customer".into(), "employee".into()],
        };
        assert_eq!(
            err.to_string(),
            "column 'Name' is ambiguous: it exists in customer, employee"
        );
        assert_eq!(err.code(), ErrorCode::AmbiguousColumn);
        assert_eq!(
            PlanError::TableNotFound {
                table: "not_found".into()
            }
            .code()
            .category(),
            "Plan"
        );
    }
}
