//! Paradox file-format constants.
//!
//! Offsets are relative to the start of the file. Header integers are
//! little-endian; record values are big-endian.

// =============================================================================
// File Naming
// =============================================================================

/// Default extension of a table file.
pub const DEFAULT_TABLE_EXTENSION: &str = "db";

/// Extension of the primary index file.
pub const PRIMARY_INDEX_EXTENSION: &str = "px";

/// Extension of the large-object companion file.
pub const BLOB_FILE_EXTENSION: &str = "mb";

// =============================================================================
// Table Header Offsets
// =============================================================================

/// Size of one record in bytes (u16).
pub const HEADER_RECORD_SIZE: usize = 0x00;

/// Size of the header, which is also the offset of block 1 (u16).
pub const HEADER_HEADER_SIZE: usize = 0x02;

/// File type (u8).
pub const HEADER_FILE_TYPE: usize = 0x04;

/// Block size in KiB (u8).
pub const HEADER_BLOCK_SIZE: usize = 0x05;

/// Declared number of records (u32).
pub const HEADER_NUM_RECORDS: usize = 0x06;

/// Number of blocks in use (u16).
pub const HEADER_USED_BLOCKS: usize = 0x0A;

/// Number of blocks in the file (u16).
pub const HEADER_FILE_BLOCKS: usize = 0x0C;

/// First data block, 1-based (u16).
pub const HEADER_FIRST_BLOCK: usize = 0x0E;

/// Last data block, 1-based (u16).
pub const HEADER_LAST_BLOCK: usize = 0x10;

/// Number of fields (u16).
pub const HEADER_NUM_FIELDS: usize = 0x21;

/// Number of leading fields forming the primary key (u16).
pub const HEADER_PRIMARY_KEY_FIELDS: usize = 0x23;

/// Sort order identifier (u8).
pub const HEADER_SORT_ORDER: usize = 0x29;

/// Write protection flag (u8).
pub const HEADER_WRITE_PROTECTED: usize = 0x38;

/// File version identifier (u8).
pub const HEADER_FILE_VERSION: usize = 0x39;

/// Next auto-increment value (u32).
pub const HEADER_AUTO_INCREMENT: usize = 0x49;

/// First free block (u16).
pub const HEADER_FIRST_FREE_BLOCK: usize = 0x4D;

/// Referential integrity flag (u8).
pub const HEADER_REF_INTEGRITY: usize = 0x55;

/// DOS code page, present in version 4+ data headers (u16).
pub const HEADER_CODE_PAGE: usize = 0x6A;

/// Start of field descriptors in version 4+ data headers.
pub const FIELD_INFO_OFFSET_V4: usize = 0x78;

/// Start of field descriptors in older and index headers.
pub const FIELD_INFO_OFFSET: usize = 0x58;

/// First file version identifier that carries the extended data header.
pub const VERSION_EXTENDED_HEADER: u8 = 5;

/// First file version identifier with a long table name.
pub const VERSION_LONG_TABLE_NAME: u8 = 0x0C;

/// Length of the stored table name before version 7.
pub const TABLE_NAME_LENGTH: usize = 79;

/// Length of the stored table name from version 7.
pub const TABLE_NAME_LENGTH_LONG: usize = 261;

/// Size of a stored pointer in the descriptor area.
pub const POINTER_SIZE: usize = 4;

// =============================================================================
// Data Blocks
// =============================================================================

/// Size of the header at the start of every data block.
///
/// next block (2), previous block (2), offset of last record (2).
pub const BLOCK_HEADER_SIZE: usize = 6;

/// Bytes per KiB unit in the block size field.
pub const BLOCK_SIZE_UNIT: usize = 0x400;

// =============================================================================
// Large Objects
// =============================================================================

/// Size of the pointer stored at the end of a memo or blob field.
///
/// offset (4), length (4), modification number (2).
pub const BLOB_POINTER_SIZE: usize = 10;

/// Index byte marking a blob that owns a whole `.MB` block.
pub const BLOB_SINGLE_INDEX: u8 = 0xFF;

/// Block type of a single-blob block.
pub const BLOB_BLOCK_SINGLE: u8 = 2;

/// Block type of a sub-allocated block.
pub const BLOB_BLOCK_SUBALLOCATED: u8 = 3;

/// Header size of a single-blob block.
pub const BLOB_SINGLE_HEADER_SIZE: usize = 9;

/// Header size of a sub-allocated block, where its index table starts.
pub const BLOB_SUBALLOCATED_HEADER_SIZE: usize = 12;

/// Size of one entry in a sub-allocated block's index table.
pub const BLOB_INDEX_ENTRY_SIZE: usize = 5;

/// Allocation unit inside a sub-allocated block.
pub const BLOB_CHUNK_SIZE: usize = 16;

// =============================================================================
// Values
// =============================================================================

/// On-disk width of a BCD field, independent of its declared size.
pub const BCD_WIDTH: usize = 17;

/// Milliseconds per day, used by timestamp values.
pub const MILLIS_PER_DAY: i64 = 86_400_000;

/// Name of the trailing field added to secondary index files.
pub const INDEX_HINT_FIELD: &str = "Hint";
