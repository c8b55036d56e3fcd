//! Field descriptors.
//!
//! Each field is described in the header by a `(type, size)` byte pair,
//! followed later by its NUL-terminated name.
//!
//! ```text
//! Code  Type            On-disk width
//! ----  ----            -------------
//! 0x01  Alpha           size
//! 0x02  Date            4
//! 0x03  Short           2
//! 0x04  Long            4
//! 0x05  Currency        8
//! 0x06  Number          8
//! 0x09  Logical         1
//! 0x0C  Memo            size (inline part + 10 byte pointer)
//! 0x0D  Blob            size
//! 0x0E  FormattedMemo   size
//! 0x0F  Ole             size
//! 0x10  Graphic         size
//! 0x14  Time            4
//! 0x15  Timestamp       8
//! 0x16  AutoIncrement   4
//! 0x17  Bcd             17 (size is the number of decimal places)
//! 0x18  Bytes           size
//! ```

use std::fmt;

use pdx_common::constants::{BCD_WIDTH, BLOB_POINTER_SIZE};
use serde::{Deserialize, Serialize};

/// Paradox field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    /// Fixed-width text.
    Alpha,
    /// Calendar date.
    Date,
    /// 16-bit signed integer.
    Short,
    /// 32-bit signed integer.
    Long,
    /// Money amount stored as a double.
    Currency,
    /// Double-precision float.
    Number,
    /// Boolean.
    Logical,
    /// Text memo.
    Memo,
    /// Binary large object.
    Blob,
    /// Formatted text memo.
    FormattedMemo,
    /// OLE object.
    Ole,
    /// Image.
    Graphic,
    /// Time of day.
    Time,
    /// Date and time.
    Timestamp,
    /// Auto-incrementing 32-bit integer.
    AutoIncrement,
    /// Packed decimal.
    Bcd,
    /// Fixed-width raw bytes.
    Bytes,
}

impl FieldType {
    /// Maps a descriptor type code to a field type.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0x01 => Self::Alpha,
            0x02 => Self::Date,
            0x03 => Self::Short,
            0x04 => Self::Long,
            0x05 => Self::Currency,
            0x06 => Self::Number,
            0x09 => Self::Logical,
            0x0C => Self::Memo,
            0x0D => Self::Blob,
            0x0E => Self::FormattedMemo,
            0x0F => Self::Ole,
            0x10 => Self::Graphic,
            0x14 => Self::Time,
            0x15 => Self::Timestamp,
            0x16 => Self::AutoIncrement,
            0x17 => Self::Bcd,
            0x18 => Self::Bytes,
            _ => return None,
        })
    }

    /// Returns the descriptor type code.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Alpha => 0x01,
            Self::Date => 0x02,
            Self::Short => 0x03,
            Self::Long => 0x04,
            Self::Currency => 0x05,
            Self::Number => 0x06,
            Self::Logical => 0x09,
            Self::Memo => 0x0C,
            Self::Blob => 0x0D,
            Self::FormattedMemo => 0x0E,
            Self::Ole => 0x0F,
            Self::Graphic => 0x10,
            Self::Time => 0x14,
            Self::Timestamp => 0x15,
            Self::AutoIncrement => 0x16,
            Self::Bcd => 0x17,
            Self::Bytes => 0x18,
        }
    }

    /// Descriptor size the type requires, for types whose width is fixed.
    #[must_use]
    pub const fn fixed_size(self) -> Option<u8> {
        match self {
            Self::Logical => Some(1),
            Self::Short => Some(2),
            Self::Long | Self::AutoIncrement | Self::Date | Self::Time => Some(4),
            Self::Number | Self::Currency | Self::Timestamp => Some(8),
            _ => None,
        }
    }

    /// Returns true for types whose value may live in the `.MB` file.
    #[must_use]
    pub const fn is_blob(self) -> bool {
        matches!(
            self,
            Self::Memo | Self::Blob | Self::FormattedMemo | Self::Ole | Self::Graphic
        )
    }

    /// Returns true for blob types that hold text.
    #[must_use]
    pub const fn is_text_blob(self) -> bool {
        matches!(self, Self::Memo | Self::FormattedMemo)
    }

    /// Returns the SQL type this field decodes to.
    #[must_use]
    pub const fn data_type(self) -> DataType {
        match self {
            Self::Alpha => DataType::Varchar,
            Self::Date => DataType::Date,
            Self::Short => DataType::SmallInt,
            Self::Long | Self::AutoIncrement => DataType::Integer,
            Self::Currency => DataType::Currency,
            Self::Number => DataType::Double,
            Self::Logical => DataType::Boolean,
            Self::Memo | Self::FormattedMemo => DataType::Memo,
            Self::Blob | Self::Ole | Self::Graphic | Self::Bytes => DataType::Binary,
            Self::Time => DataType::Time,
            Self::Timestamp => DataType::Timestamp,
            Self::Bcd => DataType::Decimal,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Alpha => "Alpha",
            Self::Date => "Date",
            Self::Short => "Short",
            Self::Long => "Long",
            Self::Currency => "Currency",
            Self::Number => "Number",
            Self::Logical => "Logical",
            Self::Memo => "Memo",
            Self::Blob => "Blob",
            Self::FormattedMemo => "FormattedMemo",
            Self::Ole => "OLE",
            Self::Graphic => "Graphic",
            Self::Time => "Time",
            Self::Timestamp => "Timestamp",
            Self::AutoIncrement => "AutoIncrement",
            Self::Bcd => "BCD",
            Self::Bytes => "Bytes",
        };
        f.write_str(name)
    }
}

/// SQL data type reported for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// 16-bit integer.
    SmallInt,
    /// 32-bit integer.
    Integer,
    /// Double-precision float.
    Double,
    /// Money amount.
    Currency,
    /// Exact decimal.
    Decimal,
    /// Text.
    Varchar,
    /// Boolean.
    Boolean,
    /// Date.
    Date,
    /// Time of day.
    Time,
    /// Date and time.
    Timestamp,
    /// Long text.
    Memo,
    /// Raw bytes.
    Binary,
    /// No single source type, e.g. a comparison in the select list.
    Unknown,
}

impl DataType {
    /// Returns true for the numeric types.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::SmallInt | Self::Integer | Self::Double | Self::Currency | Self::Decimal
        )
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SmallInt => "SMALLINT",
            Self::Integer => "INTEGER",
            Self::Double => "DOUBLE",
            Self::Currency => "CURRENCY",
            Self::Decimal => "DECIMAL",
            Self::Varchar => "VARCHAR",
            Self::Boolean => "BOOLEAN",
            Self::Date => "DATE",
            Self::Time => "TIME",
            Self::Timestamp => "TIMESTAMP",
            Self::Memo => "MEMO",
            Self::Binary => "BINARY",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// A column of a Paradox table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Field name as stored in the header.
    pub name: String,
    /// 1-based position in the record.
    pub position: usize,
    /// Field type.
    pub field_type: FieldType,
    /// Declared size from the descriptor.
    pub size: u8,
}

impl Field {
    /// Creates a field.
    pub fn new(name: impl Into<String>, position: usize, field_type: FieldType, size: u8) -> Self {
        Self {
            name: name.into(),
            position,
            field_type,
            size,
        }
    }

    /// Number of bytes the field occupies in a record.
    #[must_use]
    pub fn width(&self) -> usize {
        match self.field_type {
            FieldType::Bcd => BCD_WIDTH,
            _ => usize::from(self.size),
        }
    }

    /// Number of decimal places.
    #[must_use]
    pub fn decimals(&self) -> u32 {
        match self.field_type {
            FieldType::Bcd => u32::from(self.size),
            FieldType::Currency => 2,
            _ => 0,
        }
    }

    /// Bytes of a blob field stored inside the record.
    #[must_use]
    pub fn inline_capacity(&self) -> usize {
        usize::from(self.size).saturating_sub(BLOB_POINTER_SIZE)
    }

    /// SQL type of the field.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        self.field_type.data_type()
    }

    /// Case-insensitive name comparison.
    #[must_use]
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}({})", self.name, self.field_type, self.size)
    }
}
