//! Paradox file header.
//!
//! Table (`.DB`), primary index (`.PX`) and secondary index (`.Xnn`, `.XGn`)
//! files share one header layout. All integers are little-endian.
//!
//! # Fixed Header Layout
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//!  0x00     2   record_size
//!  0x02     2   header_size (offset of data block 1)
//!  0x04     1   file_type
//!  0x05     1   block size in KiB
//!  0x06     4   num_records
//!  0x0A     2   used_blocks
//!  0x0C     2   file_blocks
//!  0x0E     2   first_block (1-based, 0 = no data)
//!  0x10     2   last_block
//!  0x21     2   num_fields
//!  0x23     2   primary_key_fields
//!  0x29     1   sort_order
//!  0x38     1   write_protected
//!  0x39     1   file_version
//!  0x49     4   auto_increment
//!  0x4D     2   first_free_block
//!  0x55     1   ref_integrity
//!  0x6A     2   code_page (extended header only)
//! ```
//!
//! Version 4+ data files (table and secondary index files with a version
//! byte of 5 or more) carry an extended header and their field descriptors
//! start at 0x78; all other files start them at 0x58.
//!
//! # Descriptor Area
//!
//! ```text
//! n x (type u8, size u8)       field descriptors
//! 4                            table name pointer
//! n x 4                        field name pointers
//! 79 or 261                    table name (261 from version 0x0C)
//! n x NUL-terminated string    field names
//! n x u16                      field numbers
//! NUL-terminated string        sort order name
//! ```
//!
//! Primary index files stop after the field descriptors.

use std::fmt;
use std::path::Path;

use pdx_common::constants::{
    BLOB_POINTER_SIZE, BLOCK_SIZE_UNIT, FIELD_INFO_OFFSET, FIELD_INFO_OFFSET_V4, HEADER_AUTO_INCREMENT,
    HEADER_BLOCK_SIZE, HEADER_CODE_PAGE, HEADER_FILE_BLOCKS, HEADER_FILE_TYPE,
    HEADER_FILE_VERSION, HEADER_FIRST_BLOCK, HEADER_FIRST_FREE_BLOCK, HEADER_HEADER_SIZE,
    HEADER_LAST_BLOCK, HEADER_NUM_FIELDS, HEADER_NUM_RECORDS, HEADER_PRIMARY_KEY_FIELDS,
    HEADER_RECORD_SIZE, HEADER_REF_INTEGRITY, HEADER_SORT_ORDER, HEADER_USED_BLOCKS,
    HEADER_WRITE_PROTECTED, POINTER_SIZE, TABLE_NAME_LENGTH, TABLE_NAME_LENGTH_LONG,
    VERSION_EXTENDED_HEADER, VERSION_LONG_TABLE_NAME,
};
use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};
use crate::field::{Field, FieldType};
use crate::file::{self, cstr_at, u16_at, u32_at, u8_at};

/// Kind of Paradox file, from header offset 0x04.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileType {
    /// Keyed table (`.DB` with a primary index).
    IndexedTable,
    /// Primary index (`.PX`).
    PrimaryIndex,
    /// Unkeyed table (`.DB`).
    NonIndexedTable,
    /// Non-incrementing secondary index (`.Xnn`).
    SecondaryIndex,
    /// Secondary index data (`.Ynn`).
    SecondaryIndexData,
    /// Incrementing secondary index (`.Xnn`).
    IncrementingSecondaryIndex,
    /// Non-incrementing composite secondary index (`.XGn`).
    CompositeIndex,
    /// Composite secondary index data (`.YGn`).
    CompositeIndexData,
    /// Incrementing composite secondary index (`.XGn`).
    IncrementingCompositeIndex,
}

impl FileType {
    /// Maps the header byte to a file type.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => Self::IndexedTable,
            1 => Self::PrimaryIndex,
            2 => Self::NonIndexedTable,
            3 => Self::SecondaryIndex,
            4 => Self::SecondaryIndexData,
            5 => Self::IncrementingSecondaryIndex,
            6 => Self::CompositeIndex,
            7 => Self::CompositeIndexData,
            8 => Self::IncrementingCompositeIndex,
            _ => return None,
        })
    }

    /// Returns the header byte.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Returns true for `.DB` table files.
    #[must_use]
    pub const fn is_table(self) -> bool {
        matches!(self, Self::IndexedTable | Self::NonIndexedTable)
    }

    /// Returns true for files that may carry the extended data header.
    #[must_use]
    pub const fn has_data_header(self) -> bool {
        matches!(
            self,
            Self::IndexedTable
                | Self::NonIndexedTable
                | Self::SecondaryIndex
                | Self::IncrementingSecondaryIndex
                | Self::IncrementingCompositeIndex
        )
    }

    /// Returns true for files whose header lists field names.
    #[must_use]
    pub const fn has_field_names(self) -> bool {
        !matches!(self, Self::PrimaryIndex)
    }
}

/// Parsed header of a Paradox file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableHeader {
    /// Bytes per record.
    pub record_size: u16,
    /// Bytes before the first data block.
    pub header_size: u16,
    /// File type.
    pub file_type: FileType,
    /// Bytes per data block.
    pub block_size: usize,
    /// Declared number of records.
    pub num_records: u32,
    /// Blocks in use.
    pub used_blocks: u16,
    /// Blocks in the file.
    pub file_blocks: u16,
    /// First data block, 1-based. Zero when the table holds no data.
    pub first_block: u16,
    /// Last data block, 1-based.
    pub last_block: u16,
    /// Number of leading fields that form the primary key.
    pub primary_key_fields: u16,
    /// Sort order identifier.
    pub sort_order: u8,
    /// Write protection flag.
    pub write_protected: bool,
    /// File version byte.
    pub version: u8,
    /// DOS code page, when the extended header is present.
    pub code_page: Option<u16>,
    /// Next auto-increment value.
    pub auto_increment: u32,
    /// First free block.
    pub first_free_block: u16,
    /// Referential integrity flag.
    pub ref_integrity: bool,
    /// Table name stored in the header.
    pub table_name: String,
    /// Field descriptors in record order.
    pub fields: Vec<Field>,
    /// Name of the sort order, when present.
    pub sort_order_name: Option<String>,
}

impl TableHeader {
    /// Parses a header.
    ///
    /// `table` names the table in field-type errors. Unknown type codes are
    /// rejected with [`StorageError::UnsupportedFieldType`]; every other
    /// inconsistency is a [`StorageError::Format`] naming `path`.
    pub fn parse(data: &[u8], path: &Path, table: &str) -> StorageResult<Self> {
        let file_type_byte = u8_at(data, HEADER_FILE_TYPE, path, "file type")?;
        let file_type = FileType::from_u8(file_type_byte).ok_or_else(|| {
            StorageError::format(path, format!("unknown file type {file_type_byte}"))
        })?;

        let record_size = u16_at(data, HEADER_RECORD_SIZE, path, "record size")?;
        let header_size = u16_at(data, HEADER_HEADER_SIZE, path, "header size")?;
        let block_kib = u8_at(data, HEADER_BLOCK_SIZE, path, "block size")?;
        let version = u8_at(data, HEADER_FILE_VERSION, path, "file version")?;
        let num_fields = usize::from(u16_at(data, HEADER_NUM_FIELDS, path, "field count")?);

        if record_size == 0 {
            return Err(StorageError::format(path, "record size is zero"));
        }
        if block_kib == 0 {
            return Err(StorageError::format(path, "block size is zero"));
        }
        if num_fields == 0 {
            return Err(StorageError::format(path, "file declares no fields"));
        }

        let extended = version >= VERSION_EXTENDED_HEADER && file_type.has_data_header();
        let code_page = if extended {
            Some(u16_at(data, HEADER_CODE_PAGE, path, "code page")?)
        } else {
            None
        };

        let descriptors_start = if extended {
            FIELD_INFO_OFFSET_V4
        } else {
            FIELD_INFO_OFFSET
        };
        let descriptors = file::slice(
            data,
            descriptors_start,
            num_fields * 2,
            path,
            "field descriptors",
        )?;

        let mut table_name = String::new();
        let mut names = Vec::with_capacity(num_fields);
        let mut sort_order_name = None;

        if file_type.has_field_names() {
            let name_len = if version >= VERSION_LONG_TABLE_NAME {
                TABLE_NAME_LENGTH_LONG
            } else {
                TABLE_NAME_LENGTH
            };
            let table_name_start = descriptors_start + num_fields * 2 + POINTER_SIZE * (num_fields + 1);
            let raw_name = file::slice(data, table_name_start, name_len, path, "table name")?;
            let end = raw_name.iter().position(|&b| b == 0).unwrap_or(name_len);
            table_name = file::latin1(&raw_name[..end]);

            let mut offset = table_name_start + name_len;
            for _ in 0..num_fields {
                let (name, next) = cstr_at(data, offset, path, "field name")?;
                names.push(name);
                offset = next;
            }

            // field numbers, then the sort order name; older writers may omit both
            offset += num_fields * 2;
            if let Ok((name, _)) = cstr_at(data, offset, path, "sort order") {
                if !name.is_empty() {
                    sort_order_name = Some(name);
                }
            }
        }

        let mut fields = Vec::with_capacity(num_fields);
        let mut width = 0usize;
        for (i, pair) in descriptors.chunks_exact(2).enumerate() {
            let name = names
                .get(i)
                .cloned()
                .unwrap_or_else(|| format!("field{}", i + 1));
            let field_type =
                FieldType::from_code(pair[0]).ok_or_else(|| StorageError::UnsupportedFieldType {
                    table: table.to_string(),
                    field: name.clone(),
                    code: pair[0],
                })?;
            let size = pair[1];
            if let Some(expected) = field_type.fixed_size() {
                if size != expected {
                    return Err(StorageError::format(
                        path,
                        format!("field '{name}' is {field_type} of {size} bytes, expected {expected}"),
                    ));
                }
            } else if field_type.is_blob() && usize::from(size) < BLOB_POINTER_SIZE {
                return Err(StorageError::format(
                    path,
                    format!("field '{name}' is {field_type} of {size} bytes, shorter than a blob pointer"),
                ));
            }
            let field = Field::new(name, i + 1, field_type, size);
            width += field.width();
            fields.push(field);
        }

        if width > usize::from(record_size) {
            return Err(StorageError::format(
                path,
                format!("fields need {width} bytes but records hold {record_size}"),
            ));
        }

        Ok(Self {
            record_size,
            header_size,
            file_type,
            block_size: usize::from(block_kib) * BLOCK_SIZE_UNIT,
            num_records: u32_at(data, HEADER_NUM_RECORDS, path, "record count")?,
            used_blocks: u16_at(data, HEADER_USED_BLOCKS, path, "used blocks")?,
            file_blocks: u16_at(data, HEADER_FILE_BLOCKS, path, "file blocks")?,
            first_block: u16_at(data, HEADER_FIRST_BLOCK, path, "first block")?,
            last_block: u16_at(data, HEADER_LAST_BLOCK, path, "last block")?,
            primary_key_fields: u16_at(data, HEADER_PRIMARY_KEY_FIELDS, path, "key fields")?,
            sort_order: u8_at(data, HEADER_SORT_ORDER, path, "sort order")?,
            write_protected: u8_at(data, HEADER_WRITE_PROTECTED, path, "write protection")? != 0,
            version,
            code_page,
            auto_increment: u32_at(data, HEADER_AUTO_INCREMENT, path, "auto increment")?,
            first_free_block: u16_at(data, HEADER_FIRST_FREE_BLOCK, path, "first free block")?,
            ref_integrity: u8_at(data, HEADER_REF_INTEGRITY, path, "ref integrity")? != 0,
            table_name,
            fields,
            sort_order_name,
        })
    }

    /// Human-readable Paradox version.
    #[must_use]
    pub fn version_label(&self) -> &'static str {
        match self.version {
            3 => "3.0",
            4 => "3.5",
            5..=9 => "4.x",
            0x0A | 0x0B => "5.x",
            0x0C => "7.x",
            _ => "unknown",
        }
    }

    /// Byte offset of a 1-based data block.
    #[must_use]
    pub fn block_offset(&self, block: u16) -> usize {
        usize::from(self.header_size) + (usize::from(block).saturating_sub(1)) * self.block_size
    }

    /// Records that fit in one data block.
    #[must_use]
    pub fn records_per_block(&self) -> usize {
        (self.block_size - pdx_common::constants::BLOCK_HEADER_SIZE) / usize::from(self.record_size)
    }
}

impl fmt::Display for TableHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} v{} ({} fields, {} records, {} byte blocks)",
            self.file_type,
            self.version_label(),
            self.fields.len(),
            self.num_records,
            self.block_size
        )
    }
}
