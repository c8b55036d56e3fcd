//! Error types for table, index and blob decoding.

use std::io;
use std::path::PathBuf;

use pdx_common::ErrorCode;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while reading Paradox files.
#[derive(Debug, Error)]
#[allow(missing_docs)] // Fields are documented by variant docs
pub enum StorageError {
    /// File or directory could not be opened or read.
    #[error("cannot access {path}: {source}")]
    FileAccess { path: PathBuf, source: io::Error },

    /// Path exists but is not a directory.
    #[error("not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// Header or field-descriptor block is malformed.
    #[error("malformed file {path}: {reason}")]
    Format { path: PathBuf, reason: String },

    /// Data block chain is broken.
    #[error("bad block {block} in {path}: {reason}")]
    BlockChain {
        path: PathBuf,
        block: u16,
        reason: String,
    },

    /// Field descriptor carries a type code this decoder does not know.
    #[error("table '{table}': field '{field}' has unsupported type code {code:#04x}")]
    UnsupportedFieldType {
        table: String,
        field: String,
        code: u8,
    },

    /// Header record count and decoded records disagree.
    #[error("table '{table}': header declares {declared} records but {decoded} were decoded")]
    RowCountMismatch {
        table: String,
        declared: u32,
        decoded: usize,
    },

    /// A stored value cannot be represented.
    #[error("table '{table}': invalid value in field '{field}': {reason}")]
    InvalidValue {
        table: String,
        field: String,
        reason: String,
    },

    /// Requested field does not belong to the table.
    #[error("table '{table}' has no field '{field}'")]
    UnknownField { table: String, field: String },

    /// Large-object file is malformed.
    #[error("malformed blob file {path}: {reason}")]
    Blob { path: PathBuf, reason: String },
}

impl StorageError {
    /// Creates a FileAccess error.
    pub fn file_access(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::FileAccess {
            path: path.into(),
            source,
        }
    }

    /// Creates a Format error.
    pub fn format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Format {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a BlockChain error.
    pub fn block(path: impl Into<PathBuf>, block: u16, reason: impl Into<String>) -> Self {
        Self::BlockChain {
            path: path.into(),
            block,
            reason: reason.into(),
        }
    }

    /// Creates a Blob error.
    pub fn blob(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Blob {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Returns the error code for this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::FileAccess { source, .. } => match source.kind() {
                io::ErrorKind::NotFound => ErrorCode::FileNotFound,
                io::ErrorKind::PermissionDenied => ErrorCode::PermissionDenied,
                _ => ErrorCode::Io,
            },
            Self::NotADirectory { .. } => ErrorCode::NotADirectory,
            Self::Format { .. } => ErrorCode::InvalidHeader,
            Self::BlockChain { .. } => ErrorCode::InvalidBlock,
            Self::UnsupportedFieldType { .. } => ErrorCode::UnsupportedFieldType,
            Self::RowCountMismatch { .. } => ErrorCode::RowCountMismatch,
            Self::InvalidValue { .. } => ErrorCode::InvalidValue,
            Self::UnknownField { .. } => ErrorCode::InvalidArgument,
            Self::Blob { .. } => ErrorCode::InvalidBlob,
        }
    }

    /// Returns true if the file content, rather than access to it, is at fault.
    #[must_use]
    pub fn is_format(&self) -> bool {
        self.code().category() == "Format"
    }

    /// Returns true if this is a "not found" error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::FileAccess { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}
