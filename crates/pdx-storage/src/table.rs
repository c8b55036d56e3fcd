//! Table files.
//!
//! Listing a table reads only its header. Loading rows reads the whole file
//! and walks the data block chain:
//!
//! ```text
//! header (header_size bytes)
//! block 1  | next u16 | prev u16 | last record offset i16 | records ...
//! block 2  | ...
//! ```
//!
//! Block `n` starts at `header_size + (n - 1) * block_size`. A block holds
//! `last_record_offset / record_size + 1` records, or none when the offset
//! is negative. The chain starts at the header's first block and ends at a
//! next pointer of zero.

use std::fmt;
use std::path::{Path, PathBuf};

use bytes::Buf;
use pdx_common::config::{BlobPolicy, CatalogConfig};
use pdx_common::constants::BLOCK_HEADER_SIZE;
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::blob::{self, BlobFile};
use crate::error::{StorageError, StorageResult};
use crate::field::Field;
use crate::file;
use crate::header::TableHeader;
use crate::pattern::like_match;
use crate::value::{Decoder, Row};

/// A table file and its parsed header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    name: String,
    path: PathBuf,
    header: TableHeader,
}

impl Table {
    /// Opens a table file and parses its header.
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        let bytes = file::read_header(&path)?;
        let header = TableHeader::parse(&bytes, &path, &name)?;
        if !header.file_type.is_table() {
            return Err(StorageError::format(
                &path,
                format!("expected a table file, found {:?}", header.file_type),
            ));
        }
        trace!(table = %name, fields = header.fields.len(), records = header.num_records, "opened table");
        Ok(Self { name, path, header })
    }

    /// Table name: the file name without its extension.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File name including its extension.
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.name)
    }

    /// Path of the table file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parsed header.
    pub fn header(&self) -> &TableHeader {
        &self.header
    }

    /// Fields in record order.
    pub fn fields(&self) -> &[Field] {
        &self.header.fields
    }

    /// Declared number of records.
    pub fn row_count(&self) -> u32 {
        self.header.num_records
    }

    /// Looks up a field by name, ignoring case.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields().iter().find(|f| f.is_named(name))
    }

    /// Fields forming the primary key, in key order.
    pub fn primary_key(&self) -> &[Field] {
        let count = usize::from(self.header.primary_key_fields).min(self.fields().len());
        &self.fields()[..count]
    }

    /// Returns true if `name` refers to this table.
    ///
    /// Matches the table name or the file name, ignoring case.
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name) || self.file_name().eq_ignore_ascii_case(name)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.header)
    }
}

/// Lists the tables in `dir` whose file name or name matches `pattern`.
///
/// `pattern` uses LIKE syntax. Only files with the configured table
/// extension are considered, and only their headers are read. No match is
/// an empty list.
pub fn list_tables(dir: &Path, pattern: &str, config: &CatalogConfig) -> StorageResult<Vec<Table>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| StorageError::file_access(dir, e))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| config.is_table_extension(ext))
                .unwrap_or(false)
        })
        .filter(|p| {
            let file_name = p.file_name().and_then(|s| s.to_str()).unwrap_or_default();
            let stem = p.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
            like_match(file_name, pattern) || like_match(stem, pattern)
        })
        .collect();
    paths.sort();

    let tables = paths
        .into_iter()
        .map(Table::open)
        .collect::<StorageResult<Vec<_>>>()?;
    debug!(dir = %dir.display(), pattern, tables = tables.len(), "listed tables");
    Ok(tables)
}

/// Decodes every record of `table`, keeping only `fields` in the given order.
///
/// The file is read afresh, so the header is parsed again and the record
/// count checked against what the block chain actually holds.
pub fn load_data(table: &Table, fields: &[Field], config: &CatalogConfig) -> StorageResult<Vec<Row>> {
    let path = table.path();
    let data = file::read_all(path)?;
    let header = TableHeader::parse(&data, path, table.name())?;

    // byte offset of each requested field inside a record
    let mut offsets = Vec::with_capacity(header.fields.len());
    let mut offset = 0usize;
    for field in &header.fields {
        offsets.push(offset);
        offset += field.width();
    }
    let layout = fields
        .iter()
        .map(|requested| {
            header
                .fields
                .iter()
                .position(|f| f.position == requested.position && f.is_named(&requested.name))
                .map(|i| (&header.fields[i], offsets[i]))
                .ok_or_else(|| StorageError::UnknownField {
                    table: table.name().to_string(),
                    field: requested.name.clone(),
                })
        })
        .collect::<StorageResult<Vec<_>>>()?;

    let blobs = open_blobs(table, &layout, config);
    let decoder = Decoder {
        table: table.name(),
        encoding: config.text_encoding,
        policy: config.blob_policy,
        blobs: blobs.as_ref(),
    };

    let record_size = usize::from(header.record_size);
    let data_start = usize::from(header.header_size);
    let max_block = data.len().saturating_sub(data_start).div_ceil(header.block_size);
    let mut visited = vec![false; max_block + 1];
    // the declared count is only trusted as far as the file could hold it
    let plausible = data.len().saturating_sub(data_start) / record_size;
    let mut rows = Vec::with_capacity(plausible.min(header.num_records as usize));
    let mut block = header.first_block;

    while block != 0 {
        let index = usize::from(block);
        if index > max_block {
            return Err(StorageError::block(
                path,
                block,
                format!("file holds only {max_block} blocks"),
            ));
        }
        if visited[index] {
            return Err(StorageError::block(path, block, "block chain loops"));
        }
        visited[index] = true;

        let start = header.block_offset(block);
        let mut block_header = file::slice(&data, start, BLOCK_HEADER_SIZE, path, "block header")?;
        let next = block_header.get_u16_le();
        let _prev = block_header.get_u16_le();
        let last_record = block_header.get_i16_le();

        let count = if last_record < 0 {
            0
        } else {
            usize::try_from(last_record).unwrap_or(0) / record_size + 1
        };
        if count > header.records_per_block() {
            return Err(StorageError::block(
                path,
                block,
                format!("{count} records do not fit in a {} byte block", header.block_size),
            ));
        }
        let records = file::slice(
            &data,
            start + BLOCK_HEADER_SIZE,
            count * record_size,
            path,
            "block records",
        )?;
        trace!(table = table.name(), block, next, records = count, "decoding block");

        for record in records.chunks_exact(record_size) {
            let values = layout
                .iter()
                .map(|(field, at)| decoder.decode(field, &record[*at..*at + field.width()]))
                .collect::<StorageResult<Vec<_>>>()?;
            rows.push(Row::new(values));
        }

        block = next;
    }

    if rows.len() != header.num_records as usize {
        return Err(StorageError::RowCountMismatch {
            table: table.name().to_string(),
            declared: header.num_records,
            decoded: rows.len(),
        });
    }

    debug!(table = table.name(), rows = rows.len(), fields = fields.len(), "loaded table");
    Ok(rows)
}

/// Reads the `.MB` file when blob values must be resolved.
///
/// A missing or unreadable file leaves every out-of-record value
/// unavailable instead of failing the load.
fn open_blobs(table: &Table, layout: &[(&Field, usize)], config: &CatalogConfig) -> Option<BlobFile> {
    if config.blob_policy != BlobPolicy::Resolve
        || !layout.iter().any(|(f, _)| f.field_type.is_blob())
    {
        return None;
    }
    match blob::blob_path(table.path()).and_then(BlobFile::open) {
        Ok(file) => Some(file),
        Err(e) => {
            warn!(table = table.name(), error = %e, "blob file unavailable");
            None
        }
    }
}
