//! Byte-exact Paradox file writers for tests.
//!
//! [`TableBuilder`] writes a table file together with its optional primary
//! index, secondary indexes and blob file, using the same layout the
//! decoder reads.
//!
//! ```rust,ignore
//! let dir = tempfile::tempdir()?;
//! TableBuilder::new("CUSTOMER")
//!     .extension("DB")
//!     .field("CustNo", FieldType::Long, 4)
//!     .field("City", FieldType::Alpha, 20)
//!     .primary_key(1)
//!     .secondary_index("X02", &["City"])
//!     .row(vec![FieldValue::Long(1), FieldValue::text("Kapaa Kauai")])
//!     .write(dir.path())?;
//! ```

use std::io;
use std::path::{Path, PathBuf};

use bytes::BufMut;
use chrono::{Datelike, Timelike};
use pdx_common::constants::{
    BCD_WIDTH, BLOB_BLOCK_SINGLE, BLOB_BLOCK_SUBALLOCATED, BLOB_CHUNK_SIZE, BLOB_INDEX_ENTRY_SIZE,
    BLOB_POINTER_SIZE, BLOB_SINGLE_HEADER_SIZE, BLOB_SINGLE_INDEX, BLOB_SUBALLOCATED_HEADER_SIZE,
    BLOCK_HEADER_SIZE, BLOCK_SIZE_UNIT, FIELD_INFO_OFFSET, FIELD_INFO_OFFSET_V4,
    HEADER_AUTO_INCREMENT, HEADER_BLOCK_SIZE, HEADER_CODE_PAGE, HEADER_FILE_BLOCKS,
    HEADER_FILE_TYPE, HEADER_FILE_VERSION, HEADER_FIRST_BLOCK, HEADER_HEADER_SIZE,
    HEADER_LAST_BLOCK, HEADER_NUM_FIELDS, HEADER_NUM_RECORDS, HEADER_PRIMARY_KEY_FIELDS,
    HEADER_RECORD_SIZE, HEADER_USED_BLOCKS, INDEX_HINT_FIELD, MILLIS_PER_DAY, POINTER_SIZE,
    TABLE_NAME_LENGTH, TABLE_NAME_LENGTH_LONG, VERSION_EXTENDED_HEADER, VERSION_LONG_TABLE_NAME,
};

use crate::blob::BlobRef;
use crate::field::{Field, FieldType};
use crate::header::FileType;
use crate::value::FieldValue;

/// Paradox 3.0 file version.
pub const V3: u8 = 3;
/// Paradox 4.x file version, the first with the extended header.
pub const V4: u8 = 5;
/// Paradox 7.x file version.
pub const V7: u8 = 0x0C;

const HEADER_ALIGN: usize = 0x800;
const BLOB_BLOCK_SIZE: usize = 0x1000;
const BLOB_SLOTS: usize = 64;
const CODE_PAGE: u16 = 437;

/// Writes a table and its companion files.
#[derive(Debug, Clone)]
pub struct TableBuilder {
    name: String,
    extension: String,
    version: u8,
    block_kib: u8,
    fields: Vec<Field>,
    primary_key: u16,
    rows: Vec<Vec<FieldValue>>,
    reverse_blocks: bool,
    declared_records: Option<u32>,
    primary_index: bool,
    secondary: Vec<(String, Vec<String>)>,
}

impl TableBuilder {
    /// Starts a version 7 table with 2 KiB blocks.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extension: "db".to_string(),
            version: V7,
            block_kib: 2,
            fields: Vec::new(),
            primary_key: 0,
            rows: Vec::new(),
            reverse_blocks: false,
            declared_records: None,
            primary_index: false,
            secondary: Vec::new(),
        }
    }

    /// Table name, used as the file stem.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the table file extension. Companion files follow its case.
    pub fn extension(mut self, extension: &str) -> Self {
        self.extension = extension.to_string();
        self
    }

    /// Sets the file version byte.
    pub fn version(mut self, version: u8) -> Self {
        self.version = version;
        self
    }

    /// Sets the block size in KiB.
    pub fn block_kib(mut self, kib: u8) -> Self {
        self.block_kib = kib;
        self
    }

    /// Appends a field.
    pub fn field(mut self, name: &str, field_type: FieldType, size: u8) -> Self {
        let position = self.fields.len() + 1;
        self.fields.push(Field::new(name, position, field_type, size));
        self
    }

    /// Marks the first `count` fields as the primary key and writes a `.PX` file.
    pub fn primary_key(mut self, count: u16) -> Self {
        self.primary_key = count;
        self.primary_index = count > 0;
        self
    }

    /// Adds a secondary index file such as `X06` or `XG0` over `columns`.
    pub fn secondary_index(mut self, suffix: &str, columns: &[&str]) -> Self {
        self.secondary.push((
            suffix.to_string(),
            columns.iter().map(|c| c.to_string()).collect(),
        ));
        self
    }

    /// Appends a record.
    pub fn row(mut self, values: Vec<FieldValue>) -> Self {
        self.rows.push(values);
        self
    }

    /// Links data blocks from the last physical block to the first.
    pub fn reverse_blocks(mut self) -> Self {
        self.reverse_blocks = true;
        self
    }

    /// Overrides the record count stored in the header.
    pub fn declared_records(mut self, count: u32) -> Self {
        self.declared_records = Some(count);
        self
    }

    /// Writes every file into `dir` and returns the table file path.
    pub fn write(&self, dir: &Path) -> io::Result<PathBuf> {
        let upper = self.extension.chars().any(|c| c.is_ascii_uppercase());
        let companion = |ext: &str| {
            let ext = if upper {
                ext.to_ascii_uppercase()
            } else {
                ext.to_ascii_lowercase()
            };
            dir.join(format!("{}.{}", self.name, ext))
        };

        let mut blobs = BlobWriter::new();
        let record_size: usize = self.fields.iter().map(Field::width).sum();
        let mut records = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            if row.len() != self.fields.len() {
                return Err(invalid(format!(
                    "row has {} values for {} fields",
                    row.len(),
                    self.fields.len()
                )));
            }
            let mut record = Vec::with_capacity(record_size);
            for (field, value) in self.fields.iter().zip(row) {
                record.extend(encode(field, value, Some(&mut blobs))?);
            }
            records.push(record);
        }

        let file_type = if self.primary_key > 0 {
            FileType::IndexedTable
        } else {
            FileType::NonIndexedTable
        };
        let block_size = usize::from(self.block_kib) * BLOCK_SIZE_UNIT;
        let per_block = (block_size - BLOCK_HEADER_SIZE) / record_size.max(1);
        if per_block == 0 {
            return Err(invalid("record does not fit in a block".to_string()));
        }
        let chunks: Vec<&[Vec<u8>]> = records.chunks(per_block).collect();
        let count = chunks.len();

        // chain position i lives in physical block chain[i]
        let chain: Vec<usize> = if self.reverse_blocks {
            (1..=count).rev().collect()
        } else {
            (1..=count).collect()
        };

        let spec = HeaderSpec {
            file_type,
            version: self.version,
            block_kib: self.block_kib,
            record_size,
            num_records: self
                .declared_records
                .unwrap_or(self.rows.len() as u32),
            first_block: chain.first().copied().unwrap_or(0),
            last_block: chain.last().copied().unwrap_or(0),
            blocks: count,
            primary_key: self.primary_key,
            table_name: format!("{}.{}", self.name, self.extension),
            fields: self.fields.clone(),
        };
        let mut file = spec.write()?;
        let header_size = file.len();
        file.resize(header_size + count * block_size, 0);

        for (i, rows) in chunks.iter().enumerate() {
            let physical = chain[i];
            let next = chain.get(i + 1).copied().unwrap_or(0);
            let prev = if i == 0 { 0 } else { chain[i - 1] };
            let start = header_size + (physical - 1) * block_size;
            let mut block = &mut file[start..start + block_size];
            block.put_u16_le(next as u16);
            block.put_u16_le(prev as u16);
            block.put_i16_le(((rows.len() - 1) * record_size) as i16);
            for record in rows.iter() {
                block.put_slice(record);
            }
        }

        let path = dir.join(format!("{}.{}", self.name, self.extension));
        std::fs::write(&path, &file)?;

        if !blobs.is_empty() {
            std::fs::write(companion("mb"), blobs.finish())?;
        }
        if self.primary_index {
            std::fs::write(companion("px"), self.primary_index_file()?)?;
        }
        for (suffix, columns) in &self.secondary {
            std::fs::write(companion(suffix), self.secondary_index_file(suffix, columns)?)?;
        }
        Ok(path)
    }

    fn key_fields(&self) -> &[Field] {
        &self.fields[..usize::from(self.primary_key).min(self.fields.len())]
    }

    fn primary_index_file(&self) -> io::Result<Vec<u8>> {
        let mut fields = self.key_fields().to_vec();
        for i in 0..3 {
            let position = fields.len() + 1;
            fields.push(Field::new(format!("px{i}"), position, FieldType::Short, 2));
        }
        HeaderSpec {
            file_type: FileType::PrimaryIndex,
            version: self.version,
            block_kib: self.block_kib,
            record_size: fields.iter().map(Field::width).sum(),
            num_records: 0,
            first_block: 0,
            last_block: 0,
            blocks: 0,
            primary_key: self.primary_key,
            table_name: String::new(),
            fields,
        }
        .write()
    }

    fn secondary_index_file(&self, suffix: &str, columns: &[String]) -> io::Result<Vec<u8>> {
        let mut fields = Vec::new();
        for column in columns {
            let field = self
                .fields
                .iter()
                .find(|f| f.is_named(column))
                .cloned()
                .unwrap_or_else(|| Field::new(column.clone(), 0, FieldType::Alpha, 10));
            fields.push(field);
        }
        fields.extend(self.key_fields().iter().cloned());
        fields.push(Field::new(INDEX_HINT_FIELD, 0, FieldType::Short, 2));
        for (i, field) in fields.iter_mut().enumerate() {
            field.position = i + 1;
        }

        let composite = suffix.to_ascii_uppercase().starts_with("XG");
        HeaderSpec {
            file_type: if composite {
                FileType::IncrementingCompositeIndex
            } else {
                FileType::SecondaryIndex
            },
            version: self.version,
            block_kib: self.block_kib,
            record_size: fields.iter().map(Field::width).sum(),
            num_records: 0,
            first_block: 0,
            last_block: 0,
            blocks: 0,
            primary_key: 0,
            table_name: format!("{}.{}", self.name, suffix),
            fields,
        }
        .write()
    }
}

struct HeaderSpec {
    file_type: FileType,
    version: u8,
    block_kib: u8,
    record_size: usize,
    num_records: u32,
    first_block: usize,
    last_block: usize,
    blocks: usize,
    primary_key: u16,
    table_name: String,
    fields: Vec<Field>,
}

impl HeaderSpec {
    fn write(&self) -> io::Result<Vec<u8>> {
        let extended = self.version >= VERSION_EXTENDED_HEADER && self.file_type.has_data_header();
        let mut descriptors = Vec::new();
        for field in &self.fields {
            descriptors.put_u8(field.field_type.code());
            descriptors.put_u8(field.size);
        }

        let mut names = Vec::new();
        if self.file_type.has_field_names() {
            let name_len = if self.version >= VERSION_LONG_TABLE_NAME {
                TABLE_NAME_LENGTH_LONG
            } else {
                TABLE_NAME_LENGTH
            };
            names.put_bytes(0, POINTER_SIZE * (self.fields.len() + 1));
            let mut table_name = self.table_name.as_bytes().to_vec();
            table_name.truncate(name_len - 1);
            table_name.resize(name_len, 0);
            names.put_slice(&table_name);
            for field in &self.fields {
                names.put_slice(field.name.as_bytes());
                names.put_u8(0);
            }
            for i in 1..=self.fields.len() {
                names.put_u16_le(i as u16);
            }
            names.put_slice(b"ascii\0");
        }

        let start = if extended {
            FIELD_INFO_OFFSET_V4
        } else {
            FIELD_INFO_OFFSET
        };
        let used = start + descriptors.len() + names.len();
        let header_size = used.div_ceil(HEADER_ALIGN).max(1) * HEADER_ALIGN;
        let record_size = u16::try_from(self.record_size)
            .map_err(|_| invalid(format!("record size {} is too large", self.record_size)))?;

        let mut header = vec![0u8; header_size];
        put_u16(&mut header, HEADER_RECORD_SIZE, record_size);
        put_u16(&mut header, HEADER_HEADER_SIZE, header_size as u16);
        header[HEADER_FILE_TYPE] = self.file_type.as_u8();
        header[HEADER_BLOCK_SIZE] = self.block_kib;
        put_u32(&mut header, HEADER_NUM_RECORDS, self.num_records);
        put_u16(&mut header, HEADER_USED_BLOCKS, self.blocks as u16);
        put_u16(&mut header, HEADER_FILE_BLOCKS, self.blocks as u16);
        put_u16(&mut header, HEADER_FIRST_BLOCK, self.first_block as u16);
        put_u16(&mut header, HEADER_LAST_BLOCK, self.last_block as u16);
        put_u16(&mut header, HEADER_NUM_FIELDS, self.fields.len() as u16);
        put_u16(&mut header, HEADER_PRIMARY_KEY_FIELDS, self.primary_key);
        header[HEADER_FILE_VERSION] = self.version;
        put_u32(&mut header, HEADER_AUTO_INCREMENT, self.num_records + 1);
        if extended {
            put_u16(&mut header, HEADER_CODE_PAGE, CODE_PAGE);
        }
        header[start..start + descriptors.len()].copy_from_slice(&descriptors);
        let names_start = start + descriptors.len();
        header[names_start..names_start + names.len()].copy_from_slice(&names);
        Ok(header)
    }
}

/// Encodes a value the way it is stored in a record.
///
/// Blob values must fit inline; use [`TableBuilder`] for larger ones.
pub fn encode_value(field: &Field, value: &FieldValue) -> io::Result<Vec<u8>> {
    encode(field, value, None)
}

fn encode(field: &Field, value: &FieldValue, blobs: Option<&mut BlobWriter>) -> io::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(field.width());
    match (field.field_type, value) {
        (_, FieldValue::Null) => out.put_bytes(0, field.width()),
        (FieldType::Alpha, FieldValue::Text(s)) => {
            let mut bytes = latin1(s);
            bytes.truncate(field.width());
            out.put_slice(&bytes);
            out.put_bytes(0, field.width() - bytes.len());
        }
        (FieldType::Short, FieldValue::SmallInt(v)) => out.put_u16((*v as u16) ^ 0x8000),
        (FieldType::Long | FieldType::AutoIncrement, FieldValue::Long(v)) => {
            out.put_u32((*v as u32) ^ 0x8000_0000)
        }
        (FieldType::Number, FieldValue::Number(v))
        | (FieldType::Currency, FieldValue::Currency(v)) => out.put_slice(&encode_double(*v)),
        (FieldType::Logical, FieldValue::Boolean(b)) => out.put_u8(0x80 | u8::from(*b)),
        (FieldType::Date, FieldValue::Date(d)) => {
            out.put_u32((d.num_days_from_ce() as u32) ^ 0x8000_0000)
        }
        (FieldType::Time, FieldValue::Time(t)) => {
            let millis = t.num_seconds_from_midnight() * 1000 + t.nanosecond() / 1_000_000;
            out.put_u32(millis ^ 0x8000_0000)
        }
        (FieldType::Timestamp, FieldValue::Timestamp(ts)) => {
            let days = i64::from(ts.date().num_days_from_ce());
            let time = ts.time();
            let millis = days * MILLIS_PER_DAY
                + i64::from(time.num_seconds_from_midnight()) * 1000
                + i64::from(time.nanosecond() / 1_000_000);
            out.put_slice(&encode_double(millis as f64))
        }
        (FieldType::Bcd, FieldValue::Decimal(d)) => out.put_slice(&encode_bcd(field, *d)?),
        (FieldType::Bytes, FieldValue::Binary(b)) => {
            let len = b.len().min(field.width());
            out.put_slice(&b[..len]);
            out.put_bytes(0, field.width() - len);
        }
        (ty, FieldValue::Text(s)) if ty.is_text_blob() => {
            out = encode_blob(field, &latin1(s), blobs)?;
        }
        (ty, FieldValue::Binary(b)) if ty.is_blob() => {
            out = encode_blob(field, b, blobs)?;
        }
        (ty, value) => {
            return Err(invalid(format!("cannot store {value:?} in a {ty} field")));
        }
    }
    Ok(out)
}

fn encode_blob(field: &Field, data: &[u8], blobs: Option<&mut BlobWriter>) -> io::Result<Vec<u8>> {
    let capacity = field.inline_capacity();
    let mut out = Vec::with_capacity(field.width());
    let blob = if data.len() <= capacity {
        out.put_slice(data);
        BlobRef {
            offset: 0,
            length: data.len() as u32,
            modification: 0,
        }
    } else {
        let writer = blobs.ok_or_else(|| invalid("blob does not fit inline".to_string()))?;
        out.put_slice(&data[..capacity]);
        if data.len() < 2048 {
            writer.suballocated(data)
        } else {
            writer.single(data)
        }
    };
    out.put_bytes(0, capacity - out.len());
    out.put_u32_le(blob.offset);
    out.put_u32_le(blob.length);
    out.put_u16_le(blob.modification);
    debug_assert_eq!(out.len(), capacity + BLOB_POINTER_SIZE);
    Ok(out)
}

fn encode_double(v: f64) -> [u8; 8] {
    let mut bytes = v.to_be_bytes();
    if bytes[0] & 0x80 == 0 {
        bytes[0] |= 0x80;
    } else {
        for b in &mut bytes {
            *b = !*b;
        }
    }
    bytes
}

fn encode_bcd(field: &Field, value: rust_decimal::Decimal) -> io::Result<[u8; BCD_WIDTH]> {
    let mut value = value;
    value.rescale(field.decimals());
    let mantissa = value.mantissa();
    let negative = mantissa < 0;
    let digits = format!("{:032}", mantissa.unsigned_abs());
    if digits.len() > 32 {
        return Err(invalid(format!("{value} has too many digits")));
    }

    let mut out = [0u8; BCD_WIDTH];
    out[0] = (if negative { 0 } else { 0x80 }) | (field.size & 0x3F);
    for (i, digit) in digits.bytes().enumerate() {
        let mut nibble = digit - b'0';
        if negative {
            nibble ^= 0x0F;
        }
        let position = i + 2;
        if position % 2 == 0 {
            out[position / 2] |= nibble << 4;
        } else {
            out[position / 2] |= nibble;
        }
    }
    Ok(out)
}

/// Builds the contents of a `.MB` file.
#[derive(Debug)]
pub struct BlobWriter {
    data: Vec<u8>,
    stored: usize,
    // (block offset, next free slot, next free chunk)
    open_block: Option<(usize, usize, usize)>,
}

impl Default for BlobWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobWriter {
    /// Starts a file with an empty header block.
    pub fn new() -> Self {
        Self {
            data: vec![0u8; BLOB_BLOCK_SIZE],
            stored: 0,
            open_block: None,
        }
    }

    /// Returns true if no value has been stored.
    pub fn is_empty(&self) -> bool {
        self.stored == 0
    }

    /// Stores a value in a block of its own.
    pub fn single(&mut self, value: &[u8]) -> BlobRef {
        let offset = self.data.len();
        let total = BLOB_SINGLE_HEADER_SIZE + value.len();
        let blocks = total.div_ceil(BLOB_BLOCK_SIZE);
        self.data.resize(offset + blocks * BLOB_BLOCK_SIZE, 0);

        let mut block = &mut self.data[offset..];
        block.put_u8(BLOB_BLOCK_SINGLE);
        block.put_u16_le(blocks as u16);
        block.put_u32_le(value.len() as u32);
        block.put_u16_le(1);
        block.put_slice(value);

        self.stored += 1;
        BlobRef {
            offset: offset as u32 | u32::from(BLOB_SINGLE_INDEX),
            length: value.len() as u32,
            modification: 1,
        }
    }

    /// Stores a small value in a shared, sub-allocated block.
    ///
    /// # Panics
    ///
    /// Panics if the value needs more than one block.
    pub fn suballocated(&mut self, value: &[u8]) -> BlobRef {
        let chunks = value.len().div_ceil(BLOB_CHUNK_SIZE).max(1);
        let first_data_chunk = (BLOB_SUBALLOCATED_HEADER_SIZE + BLOB_SLOTS * BLOB_INDEX_ENTRY_SIZE)
            .div_ceil(BLOB_CHUNK_SIZE);
        let per_block = BLOB_BLOCK_SIZE / BLOB_CHUNK_SIZE;
        assert!(
            first_data_chunk + chunks <= per_block,
            "value too large for a sub-allocated block"
        );

        let (offset, slot, chunk) = match self.open_block {
            Some((offset, slot, chunk)) if slot < BLOB_SLOTS && chunk + chunks <= per_block => {
                (offset, slot, chunk)
            }
            _ => {
                let offset = self.data.len();
                self.data.resize(offset + BLOB_BLOCK_SIZE, 0);
                let mut block = &mut self.data[offset..];
                block.put_u8(BLOB_BLOCK_SUBALLOCATED);
                block.put_u16_le(1);
                (offset, 0, first_data_chunk)
            }
        };

        let entry = offset + BLOB_SUBALLOCATED_HEADER_SIZE + slot * BLOB_INDEX_ENTRY_SIZE;
        let mut index = &mut self.data[entry..entry + BLOB_INDEX_ENTRY_SIZE];
        index.put_u8(chunk as u8);
        index.put_u8(chunks as u8);
        index.put_u16_le(1);
        index.put_u8((value.len() % BLOB_CHUNK_SIZE) as u8);

        let start = offset + chunk * BLOB_CHUNK_SIZE;
        self.data[start..start + value.len()].copy_from_slice(value);

        self.open_block = Some((offset, slot + 1, chunk + chunks));
        self.stored += 1;
        BlobRef {
            offset: (offset | slot) as u32,
            length: value.len() as u32,
            modification: 1,
        }
    }

    /// Returns the file contents.
    pub fn finish(self) -> Vec<u8> {
        self.data
    }
}

fn put_u16(buf: &mut [u8], offset: usize, value: u16) {
    (&mut buf[offset..]).put_u16_le(value);
}

fn put_u32(buf: &mut [u8], offset: usize, value: u32) {
    (&mut buf[offset..]).put_u32_le(value);
}

fn latin1(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

fn invalid(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, message)
}
