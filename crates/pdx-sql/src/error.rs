//! Unified error type.

use pdx_common::ErrorCode;
use pdx_storage::StorageError;
use thiserror::Error;

use crate::executor::EvalError;
use crate::parser::{ParseError, StatementKind};
use crate::planner::PlanError;

/// Result type for SQL operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Any error a query can raise.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum Error {
    /// Reading a table, index or blob file failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The SQL text is malformed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The statement does not resolve against the catalog.
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// Evaluating an expression failed.
    #[error(transparent)]
    Eval(#[from] EvalError),

    /// A single statement was required.
    #[error("expected exactly one statement, found {count}")]
    MultipleStatements { count: usize },

    /// Only SELECT can run.
    #[error("only SELECT statements can be executed, found {kind}")]
    NotASelect { kind: StatementKind },
}

impl Error {
    /// Returns the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::Storage(e) => e.code(),
            Error::Parse(e) => e.code(),
            Error::Plan(e) => e.code(),
            Error::Eval(e) => e.code(),
            Error::MultipleStatements { .. } => ErrorCode::MultipleStatements,
            Error::NotASelect { .. } => ErrorCode::NotASelect,
        }
    }

    /// Returns true if the error came from reading files rather than from
    /// the query.
    pub fn is_storage(&self) -> bool {
        self.code().is_storage()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        let err: Error = ParseError::EmptyStatement { position: 0 }.into();
        assert_eq!(err.code(), ErrorCode::EmptyStatement);
        assert!(!err.is_storage());

        let err: Error = PlanError::TableNotFound {
            table: "not_found".into(),
        }
        .into();
        assert_eq!(err.code(), ErrorCode::TableNotFound);
        assert_eq!(err.to_string(), "table 'not_found' not found");

        let err = Error::NotASelect {
            kind: StatementKind::Insert,
        };
        assert_eq!(err.code().category(), "Plan");
        assert_eq!(
            err.to_string(),
            "only SELECT statements can be executed, found INSERT"
        );

        let err: Error = StorageError::format("/tmp/x.db", "truncated header").into();
        assert!(err.is_storage());
    }
}
