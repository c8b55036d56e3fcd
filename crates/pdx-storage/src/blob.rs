//! Memo and blob values.
//!
//! A memo or blob field holds `size - 10` bytes of inline data followed by
//! a 10-byte little-endian pointer into the `.MB` companion file:
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//!   0       4   offset (low byte: sub-allocation index, rest: block offset)
//!   4       4   length
//!   8       2   modification number
//! ```
//!
//! Values that fit inline never touch the `.MB` file.
//!
//! # `.MB` Blocks
//!
//! ```text
//! single blob (index 0xFF)      sub-allocated (any other index)
//! ------------------------      -------------------------------
//! +0  type = 2                  +0   type = 3
//! +1  block count (u16)         +1   block count (u16)
//! +3  length (u32)              +12  index table, 5 bytes per entry:
//! +7  modification (u16)             data offset / 16, length / 16,
//! +9  data                           modification (u16), length % 16
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use bytes::Buf;
use pdx_common::constants::{
    BLOB_BLOCK_SINGLE, BLOB_BLOCK_SUBALLOCATED, BLOB_CHUNK_SIZE, BLOB_INDEX_ENTRY_SIZE,
    BLOB_POINTER_SIZE, BLOB_SINGLE_HEADER_SIZE, BLOB_SINGLE_INDEX, BLOB_SUBALLOCATED_HEADER_SIZE,
};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{StorageError, StorageResult};
use crate::file;

/// Reference to a value stored in the `.MB` file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlobRef {
    /// Raw offset word: block offset plus sub-allocation index.
    pub offset: u32,
    /// Length of the value in bytes.
    pub length: u32,
    /// Modification number.
    pub modification: u16,
}

impl BlobRef {
    /// Reads the pointer from the last 10 bytes of a field.
    ///
    /// Returns `None` if the field is shorter than a pointer.
    #[must_use]
    pub fn from_field(raw: &[u8]) -> Option<Self> {
        let start = raw.len().checked_sub(BLOB_POINTER_SIZE)?;
        let mut buf = &raw[start..];
        Some(Self {
            offset: buf.get_u32_le(),
            length: buf.get_u32_le(),
            modification: buf.get_u16_le(),
        })
    }

    /// Sub-allocation index, or 0xFF for a single-blob block.
    #[must_use]
    pub const fn index(&self) -> u8 {
        (self.offset & 0xFF) as u8
    }

    /// Offset of the `.MB` block holding the value.
    #[must_use]
    pub const fn block_offset(&self) -> usize {
        (self.offset & 0xFFFF_FF00) as usize
    }

    /// Returns true if the value owns a whole block.
    #[must_use]
    pub const fn is_single(&self) -> bool {
        self.index() == BLOB_SINGLE_INDEX
    }
}

impl fmt::Display for BlobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<blob {} bytes at {:#x}#{}>",
            self.length,
            self.block_offset(),
            self.index()
        )
    }
}

/// Contents of a `.MB` file, read once per decode call.
#[derive(Debug)]
pub struct BlobFile {
    path: PathBuf,
    data: Vec<u8>,
}

impl BlobFile {
    /// Reads a `.MB` file.
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        let data = file::read_all(&path)?;
        trace!(path = %path.display(), bytes = data.len(), "read blob file");
        Ok(Self { path, data })
    }

    /// Path of the file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the bytes a reference points to.
    pub fn read(&self, blob: &BlobRef) -> StorageResult<Vec<u8>> {
        let block = blob.block_offset();
        let length = blob.length as usize;
        let block_type = self.byte(block)?;

        let start = if blob.is_single() {
            if block_type != BLOB_BLOCK_SINGLE {
                return Err(self.error(format!(
                    "block at {block:#x} has type {block_type}, expected a single-blob block"
                )));
            }
            block + BLOB_SINGLE_HEADER_SIZE
        } else {
            if block_type != BLOB_BLOCK_SUBALLOCATED {
                return Err(self.error(format!(
                    "block at {block:#x} has type {block_type}, expected a sub-allocated block"
                )));
            }
            let entry = block
                + BLOB_SUBALLOCATED_HEADER_SIZE
                + usize::from(blob.index()) * BLOB_INDEX_ENTRY_SIZE;
            let data_offset = usize::from(self.byte(entry)?);
            let chunks = usize::from(self.byte(entry + 1)?);
            if data_offset == 0 {
                return Err(self.error(format!(
                    "slot {} of block {block:#x} is empty",
                    blob.index()
                )));
            }
            if length > chunks * BLOB_CHUNK_SIZE {
                return Err(self.error(format!(
                    "slot {} holds {} bytes, pointer wants {length}",
                    blob.index(),
                    chunks * BLOB_CHUNK_SIZE
                )));
            }
            block + data_offset * BLOB_CHUNK_SIZE
        };

        start
            .checked_add(length)
            .and_then(|end| self.data.get(start..end))
            .map(<[u8]>::to_vec)
            .ok_or_else(|| {
                self.error(format!(
                    "{length} bytes at {start:#x} run past the end of the file"
                ))
            })
    }

    fn byte(&self, offset: usize) -> StorageResult<u8> {
        self.data
            .get(offset)
            .copied()
            .ok_or_else(|| self.error(format!("offset {offset:#x} is beyond the end of the file")))
    }

    fn error(&self, reason: String) -> StorageError {
        StorageError::blob(&self.path, reason)
    }
}

/// Reads the value a blob reference points to, given the owning table file.
pub fn read_blob(table_path: &Path, blob: &BlobRef) -> StorageResult<Vec<u8>> {
    let path = blob_path(table_path)?;
    BlobFile::open(path)?.read(blob)
}

/// Locates the `.MB` companion of a table file.
pub(crate) fn blob_path(table_path: &Path) -> StorageResult<PathBuf> {
    file::companions(table_path)?
        .into_iter()
        .find(|(_, ext)| ext.eq_ignore_ascii_case(pdx_common::constants::BLOB_FILE_EXTENSION))
        .map(|(path, _)| path)
        .ok_or_else(|| {
            StorageError::file_access(
                table_path.with_extension(pdx_common::constants::BLOB_FILE_EXTENSION),
                std::io::Error::new(std::io::ErrorKind::NotFound, "blob file not found"),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::BlobWriter;

    fn pointer(offset: u32, length: u32, modification: u16) -> Vec<u8> {
        let mut raw = vec![b'x'; 6];
        raw.extend_from_slice(&offset.to_le_bytes());
        raw.extend_from_slice(&length.to_le_bytes());
        raw.extend_from_slice(&modification.to_le_bytes());
        raw
    }

    #[test]
    fn test_pointer_layout() {
        let blob = BlobRef::from_field(&pointer(0x1003, 300, 7)).unwrap();
        assert_eq!(blob.index(), 3);
        assert_eq!(blob.block_offset(), 0x1000);
        assert_eq!(blob.length, 300);
        assert_eq!(blob.modification, 7);
        assert!(!blob.is_single());
        assert_eq!(blob.to_string(), "<blob 300 bytes at 0x1000#3>");

        assert!(BlobRef::from_field(&[0u8; 4]).is_none());
    }

    #[test]
    fn test_read_single_block() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = BlobWriter::new();
        let text = "A long memo ".repeat(40);
        let blob = writer.single(text.as_bytes());
        let path = dir.path().join("notes.mb");
        std::fs::write(&path, writer.finish()).unwrap();

        assert!(blob.is_single());
        let file = BlobFile::open(&path).unwrap();
        assert_eq!(file.read(&blob).unwrap(), text.as_bytes());
    }

    #[test]
    fn test_read_suballocated_block() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = BlobWriter::new();
        let first = writer.suballocated(b"first small value");
        let second = writer.suballocated(b"the second small value, a bit longer");
        let path = dir.path().join("notes.mb");
        std::fs::write(&path, writer.finish()).unwrap();

        let file = BlobFile::open(&path).unwrap();
        assert_eq!(first.index(), 0);
        assert_eq!(second.index(), 1);
        assert_eq!(file.read(&first).unwrap(), b"first small value");
        assert_eq!(
            file.read(&second).unwrap(),
            b"the second small value, a bit longer"
        );
    }

    #[test]
    fn test_wrong_block_type() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = BlobWriter::new();
        let blob = writer.single(b"payload");
        let path = dir.path().join("notes.mb");
        std::fs::write(&path, writer.finish()).unwrap();

        // same block, but addressed as a sub-allocated slot
        let wrong = BlobRef {
            offset: blob.offset & 0xFFFF_FF00,
            ..blob
        };
        let err = BlobFile::open(&path).unwrap().read(&wrong).unwrap_err();
        assert!(matches!(err, StorageError::Blob { .. }));
    }

    #[test]
    fn test_length_past_end() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = BlobWriter::new();
        let blob = writer.single(b"payload");
        let path = dir.path().join("notes.mb");
        std::fs::write(&path, writer.finish()).unwrap();

        let long = BlobRef {
            length: 1_000_000,
            ..blob
        };
        assert!(BlobFile::open(&path).unwrap().read(&long).is_err());
    }

    #[test]
    fn test_missing_blob_file() {
        let dir = tempfile::tempdir().unwrap();
        let table = dir.path().join("notes.db");
        std::fs::write(&table, b"").unwrap();
        let blob = BlobRef {
            offset: 0x1000 | 0xFF,
            length: 10,
            modification: 1,
        };
        let err = read_blob(&table, &blob).unwrap_err();
        assert!(err.is_not_found());
    }
}
