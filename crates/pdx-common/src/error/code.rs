//! Stable error codes.

use std::fmt;

/// Error codes for categorizing errors.
///
/// These codes can be used for programmatic error handling and
/// are stable across versions. The high byte is the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // General errors (0x0000 - 0x00FF)
    /// Unknown or unspecified error.
    Unknown = 0x0000,
    /// Internal error (bug).
    Internal = 0x0001,
    /// Operation not supported.
    NotSupported = 0x0002,
    /// Invalid argument provided.
    InvalidArgument = 0x0003,

    // File access errors (0x0100 - 0x01FF)
    /// General I/O error.
    Io = 0x0100,
    /// File or directory not found.
    FileNotFound = 0x0101,
    /// Permission denied.
    PermissionDenied = 0x0102,
    /// Path exists but is not a directory.
    NotADirectory = 0x0103,

    // Format errors (0x0200 - 0x02FF)
    /// Malformed file header or field-descriptor block.
    InvalidHeader = 0x0200,
    /// Data block out of range or block chain is broken.
    InvalidBlock = 0x0201,
    /// Field descriptor carries an unknown type code.
    UnsupportedFieldType = 0x0202,
    /// Declared record count disagrees with the decoded records.
    RowCountMismatch = 0x0203,
    /// A field value could not be decoded.
    InvalidValue = 0x0204,
    /// Large-object file is malformed.
    InvalidBlob = 0x0205,

    // Parse errors (0x0300 - 0x03FF)
    /// SQL syntax error.
    SyntaxError = 0x0300,
    /// Quoted identifier or string literal is not terminated.
    UnterminatedQuote = 0x0301,
    /// Statement contains no tokens.
    EmptyStatement = 0x0302,
    /// Numeric literal cannot be represented.
    InvalidLiteral = 0x0303,

    // Plan errors (0x0400 - 0x04FF)
    /// Table not found.
    TableNotFound = 0x0400,
    /// Column not found.
    ColumnNotFound = 0x0401,
    /// Column name matches more than one table.
    AmbiguousColumn = 0x0402,
    /// Statement is not a SELECT.
    NotASelect = 0x0403,
    /// More than one statement where exactly one was expected.
    MultipleStatements = 0x0404,

    // Evaluation errors (0x0500 - 0x05FF)
    /// Comparison between incompatible types.
    TypeMismatch = 0x0500,
    /// Predicate did not evaluate to a boolean.
    InvalidPredicate = 0x0501,
}

impl ErrorCode {
    /// Returns the numeric code.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Returns the error category name.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match (*self as u16) >> 8 {
            0x00 => "General",
            0x01 => "File",
            0x02 => "Format",
            0x03 => "Parse",
            0x04 => "Plan",
            0x05 => "Evaluation",
            _ => "Unknown",
        }
    }

    /// Returns true for codes that come from reading table files.
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!((*self as u16) >> 8, 0x01 | 0x02)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category() {
        assert_eq!(ErrorCode::Internal.category(), "General");
        assert_eq!(ErrorCode::FileNotFound.category(), "File");
        assert_eq!(ErrorCode::RowCountMismatch.category(), "Format");
        assert_eq!(ErrorCode::UnsupportedFieldType.category(), "Format");
        assert_eq!(ErrorCode::UnterminatedQuote.category(), "Parse");
        assert_eq!(ErrorCode::AmbiguousColumn.category(), "Plan");
        assert_eq!(ErrorCode::TypeMismatch.category(), "Evaluation");
    }

    #[test]
    fn test_as_u16() {
        assert_eq!(ErrorCode::Unknown.as_u16(), 0);
        assert_eq!(ErrorCode::InvalidHeader.as_u16(), 0x0200);
        assert_eq!(ErrorCode::TableNotFound.as_u16(), 0x0400);
    }

    #[test]
    fn test_is_storage() {
        assert!(ErrorCode::Io.is_storage());
        assert!(ErrorCode::InvalidBlock.is_storage());
        assert!(!ErrorCode::SyntaxError.is_storage());
    }

    #[test]
    fn test_display() {
        assert_eq!(ErrorCode::ColumnNotFound.to_string(), "ColumnNotFound");
    }
}
