//! Decoded field values and rows.
//!
//! Record values are big-endian. Integer types store the value with its
//! sign bit flipped so that byte order equals numeric order; floating point
//! types set the sign bit for positive values and invert every bit for
//! negative ones. A field whose bytes are all zero is NULL.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use pdx_common::config::{BlobPolicy, TextEncoding};
use pdx_common::constants::{BCD_WIDTH, MILLIS_PER_DAY};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::blob::{BlobFile, BlobRef};
use crate::error::{StorageError, StorageResult};
use crate::field::{DataType, Field, FieldType};

/// One decoded field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// NULL.
    Null,
    /// Short field.
    SmallInt(i16),
    /// Long or auto-increment field.
    Long(i32),
    /// Number field.
    Number(f64),
    /// Currency field.
    Currency(f64),
    /// BCD field.
    Decimal(Decimal),
    /// Alpha or memo field.
    Text(String),
    /// Logical field.
    Boolean(bool),
    /// Date field.
    Date(NaiveDate),
    /// Time field.
    Time(NaiveTime),
    /// Timestamp field.
    Timestamp(NaiveDateTime),
    /// Bytes field, or blob data.
    Binary(Vec<u8>),
    /// A value in the `.MB` file that was not read.
    Unavailable(BlobRef),
}

impl FieldValue {
    /// Creates a text value.
    pub fn text(v: impl Into<String>) -> Self {
        FieldValue::Text(v.into())
    }

    /// Returns true if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Returns the text of a text value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Converts numeric values to an f64.
    #[must_use]
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            FieldValue::SmallInt(i) => Some(f64::from(*i)),
            FieldValue::Long(i) => Some(f64::from(*i)),
            FieldValue::Number(v) | FieldValue::Currency(v) => Some(*v),
            FieldValue::Decimal(d) => d.to_f64(),
            _ => None,
        }
    }

    /// Converts integer values to an i64.
    #[must_use]
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            FieldValue::SmallInt(i) => Some(i64::from(*i)),
            FieldValue::Long(i) => Some(i64::from(*i)),
            _ => None,
        }
    }

    /// Returns the SQL type of this value.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        match self {
            FieldValue::Null | FieldValue::Unavailable(_) => DataType::Unknown,
            FieldValue::SmallInt(_) => DataType::SmallInt,
            FieldValue::Long(_) => DataType::Integer,
            FieldValue::Number(_) => DataType::Double,
            FieldValue::Currency(_) => DataType::Currency,
            FieldValue::Decimal(_) => DataType::Decimal,
            FieldValue::Text(_) => DataType::Varchar,
            FieldValue::Boolean(_) => DataType::Boolean,
            FieldValue::Date(_) => DataType::Date,
            FieldValue::Time(_) => DataType::Time,
            FieldValue::Timestamp(_) => DataType::Timestamp,
            FieldValue::Binary(_) => DataType::Binary,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "NULL"),
            FieldValue::SmallInt(i) => write!(f, "{}", i),
            FieldValue::Long(i) => write!(f, "{}", i),
            FieldValue::Number(v) => write!(f, "{}", v),
            FieldValue::Currency(v) => write!(f, "{:.2}", v),
            FieldValue::Decimal(d) => write!(f, "{}", d),
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::Boolean(b) => write!(f, "{}", if *b { "true" } else { "false" }),
            FieldValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            FieldValue::Time(t) => write!(f, "{}", t.format("%H:%M:%S%.3f")),
            FieldValue::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S%.3f")),
            FieldValue::Binary(b) => write!(f, "0x{}", hex::encode(b)),
            FieldValue::Unavailable(blob) => write!(f, "{}", blob),
        }
    }
}

/// A single row of values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Row {
    values: Vec<FieldValue>,
}

impl Row {
    /// Creates a new row with the given values.
    pub fn new(values: Vec<FieldValue>) -> Self {
        Self { values }
    }

    /// Returns the number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the row has no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Gets the value at the given index.
    pub fn get(&self, index: usize) -> Option<&FieldValue> {
        self.values.get(index)
    }

    /// Returns an iterator over the values.
    pub fn iter(&self) -> impl Iterator<Item = &FieldValue> {
        self.values.iter()
    }

    /// Returns the values as a slice.
    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    /// Consumes the row and returns the values.
    pub fn into_values(self) -> Vec<FieldValue> {
        self.values
    }

    /// Concatenates this row with another row.
    pub fn concat(&self, other: &Row) -> Row {
        let mut values = Vec::with_capacity(self.len() + other.len());
        values.extend(self.values.iter().cloned());
        values.extend(other.values.iter().cloned());
        Row { values }
    }
}

impl From<Vec<FieldValue>> for Row {
    fn from(values: Vec<FieldValue>) -> Self {
        Self::new(values)
    }
}

impl IntoIterator for Row {
    type Item = FieldValue;
    type IntoIter = std::vec::IntoIter<FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, ")")
    }
}

/// Settings and resources shared by every value decoded in one call.
pub(crate) struct Decoder<'a> {
    pub table: &'a str,
    pub encoding: TextEncoding,
    pub policy: BlobPolicy,
    pub blobs: Option<&'a BlobFile>,
}

impl Decoder<'_> {
    /// Decodes one field from its bytes in the record.
    pub fn decode(&self, field: &Field, raw: &[u8]) -> StorageResult<FieldValue> {
        // an all-zero blob pointer has length 0, so blobs are NULL here too
        if raw.iter().all(|&b| b == 0) {
            return Ok(FieldValue::Null);
        }

        let value = match field.field_type {
            FieldType::Alpha => {
                let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
                let text = self.text(&raw[..end]);
                FieldValue::Text(text.trim_end_matches(' ').to_string())
            }
            FieldType::Short => FieldValue::SmallInt((be_u16(raw) ^ 0x8000) as i16),
            FieldType::Long | FieldType::AutoIncrement => {
                FieldValue::Long((be_u32(raw) ^ 0x8000_0000) as i32)
            }
            FieldType::Number => FieldValue::Number(decode_double(raw)),
            FieldType::Currency => FieldValue::Currency(decode_double(raw)),
            FieldType::Logical => FieldValue::Boolean(raw[0] & 0x7F != 0),
            FieldType::Date => {
                let days = (be_u32(raw) ^ 0x8000_0000) as i32;
                let date = NaiveDate::from_num_days_from_ce_opt(days)
                    .ok_or_else(|| self.invalid(field, format!("day {days} is out of range")))?;
                FieldValue::Date(date)
            }
            FieldType::Time => {
                let millis = (be_u32(raw) ^ 0x8000_0000) as i32;
                FieldValue::Time(self.time_of_day(field, i64::from(millis))?)
            }
            FieldType::Timestamp => {
                let millis = decode_double(raw);
                if !millis.is_finite() {
                    return Err(self.invalid(field, "timestamp is not finite".to_string()));
                }
                let millis = millis as i64;
                let days = millis.div_euclid(MILLIS_PER_DAY);
                let date = i32::try_from(days)
                    .ok()
                    .and_then(NaiveDate::from_num_days_from_ce_opt)
                    .ok_or_else(|| self.invalid(field, format!("day {days} is out of range")))?;
                let time = self.time_of_day(field, millis.rem_euclid(MILLIS_PER_DAY))?;
                FieldValue::Timestamp(date.and_time(time))
            }
            FieldType::Bcd => FieldValue::Decimal(self.decode_bcd(field, raw)?),
            FieldType::Bytes => FieldValue::Binary(raw.to_vec()),
            FieldType::Memo
            | FieldType::Blob
            | FieldType::FormattedMemo
            | FieldType::Ole
            | FieldType::Graphic => return self.decode_blob(field, raw),
        };
        Ok(value)
    }

    fn decode_blob(&self, field: &Field, raw: &[u8]) -> StorageResult<FieldValue> {
        let Some(blob) = BlobRef::from_field(raw) else {
            return Err(self.invalid(field, "field is smaller than a blob pointer".to_string()));
        };
        if blob.length == 0 {
            return Ok(FieldValue::Null);
        }

        let inline = &raw[..field.inline_capacity()];
        if blob.length as usize <= inline.len() {
            return Ok(self.blob_value(field, &inline[..blob.length as usize]));
        }

        match (self.policy, self.blobs) {
            (BlobPolicy::Resolve, Some(file)) => match file.read(&blob) {
                Ok(bytes) => Ok(self.blob_value(field, &bytes)),
                Err(e) => {
                    warn!(table = self.table, field = %field.name, error = %e, "blob left unresolved");
                    Ok(FieldValue::Unavailable(blob))
                }
            },
            _ => Ok(FieldValue::Unavailable(blob)),
        }
    }

    fn blob_value(&self, field: &Field, bytes: &[u8]) -> FieldValue {
        if field.field_type.is_text_blob() {
            let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
            FieldValue::Text(self.text(&bytes[..end]))
        } else {
            FieldValue::Binary(bytes.to_vec())
        }
    }

    /// Packed decimal: byte 0 holds the sign in bit 7, then 32 digit
    /// nibbles follow, complemented for negative values.
    fn decode_bcd(&self, field: &Field, raw: &[u8]) -> StorageResult<Decimal> {
        if raw.len() < BCD_WIDTH {
            return Err(self.invalid(field, format!("BCD needs {BCD_WIDTH} bytes")));
        }
        let negative = raw[0] & 0x80 == 0;
        let mut mantissa: i128 = 0;
        for nibble_index in 2..(BCD_WIDTH * 2) {
            let byte = raw[nibble_index / 2];
            let mut digit = if nibble_index % 2 == 0 {
                byte >> 4
            } else {
                byte & 0x0F
            };
            if negative {
                digit ^= 0x0F;
            }
            if digit > 9 {
                return Err(self.invalid(field, format!("invalid BCD digit {digit:#x}")));
            }
            mantissa = mantissa * 10 + i128::from(digit);
        }
        if negative {
            mantissa = -mantissa;
        }
        Decimal::try_from_i128_with_scale(mantissa, field.decimals())
            .map_err(|e| self.invalid(field, e.to_string()))
    }

    fn time_of_day(&self, field: &Field, millis: i64) -> StorageResult<NaiveTime> {
        u32::try_from(millis)
            .ok()
            .and_then(|ms| NaiveTime::from_num_seconds_from_midnight_opt(ms / 1000, (ms % 1000) * 1_000_000))
            .ok_or_else(|| self.invalid(field, format!("{millis} ms is not a time of day")))
    }

    fn text(&self, bytes: &[u8]) -> String {
        match self.encoding {
            TextEncoding::Latin1 => crate::file::latin1(bytes),
            TextEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
        }
    }

    fn invalid(&self, field: &Field, reason: String) -> StorageError {
        StorageError::InvalidValue {
            table: self.table.to_string(),
            field: field.name.clone(),
            reason,
        }
    }
}

fn be_u16(raw: &[u8]) -> u16 {
    u16::from_be_bytes([raw[0], raw[1]])
}

fn be_u32(raw: &[u8]) -> u32 {
    u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]])
}

fn decode_double(raw: &[u8]) -> f64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&raw[..8]);
    if bytes[0] & 0x80 != 0 {
        bytes[0] &= 0x7F;
    } else {
        for b in &mut bytes {
            *b = !*b;
        }
    }
    f64::from_be_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::encode_value;
    use std::str::FromStr;

    fn decoder() -> Decoder<'static> {
        Decoder {
            table: "t",
            encoding: TextEncoding::Latin1,
            policy: BlobPolicy::Reference,
            blobs: None,
        }
    }

    fn roundtrip(field: &Field, value: FieldValue) -> FieldValue {
        let raw = encode_value(field, &value).unwrap();
        assert_eq!(raw.len(), field.width());
        decoder().decode(field, &raw).unwrap()
    }

    #[test]
    fn test_short_and_long() {
        let short = Field::new("Qty", 1, FieldType::Short, 2);
        assert_eq!(
            decoder().decode(&short, &[0x80, 0x05]).unwrap(),
            FieldValue::SmallInt(5)
        );
        assert_eq!(
            decoder().decode(&short, &[0x7F, 0xFF]).unwrap(),
            FieldValue::SmallInt(-1)
        );

        let long = Field::new("Id", 1, FieldType::Long, 4);
        assert_eq!(
            decoder().decode(&long, &[0x93, 0xDE, 0x43, 0x55]).unwrap(),
            FieldValue::Long(333_333_333)
        );
        assert_eq!(
            decoder().decode(&long, &[0, 0, 0, 0]).unwrap(),
            FieldValue::Null
        );
    }

    #[test]
    fn test_number_encoding() {
        let number = Field::new("Amount", 1, FieldType::Number, 8);
        // 100.0 with the sign bit set
        let raw = [0xC0, 0x59, 0, 0, 0, 0, 0, 0];
        assert_eq!(
            decoder().decode(&number, &raw).unwrap(),
            FieldValue::Number(100.0)
        );
        assert_eq!(roundtrip(&number, FieldValue::Number(-2.5)), FieldValue::Number(-2.5));
        assert_eq!(roundtrip(&number, FieldValue::Number(0.0)), FieldValue::Number(0.0));

        let currency = Field::new("Price", 1, FieldType::Currency, 8);
        assert_eq!(
            roundtrip(&currency, FieldValue::Currency(75.0)),
            FieldValue::Currency(75.0)
        );
    }

    #[test]
    fn test_alpha_trimming() {
        let alpha = Field::new("Name", 1, FieldType::Alpha, 8);
        assert_eq!(
            decoder().decode(&alpha, b"Mari    ").unwrap(),
            FieldValue::text("Mari")
        );
        assert_eq!(
            decoder().decode(&alpha, b"Katty\0\0\0").unwrap(),
            FieldValue::text("Katty")
        );
        assert_eq!(
            decoder().decode(&alpha, &[0u8; 8]).unwrap(),
            FieldValue::Null
        );
        assert_eq!(
            decoder().decode(&alpha, &[0xC7, b'a', 0, 0, 0, 0, 0, 0]).unwrap(),
            FieldValue::text("\u{c7}a")
        );
    }

    #[test]
    fn test_utf8_text() {
        let alpha = Field::new("Name", 1, FieldType::Alpha, 6);
        let d = Decoder {
            encoding: TextEncoding::Utf8,
            ..decoder()
        };
        assert_eq!(
            d.decode(&alpha, "Zoë\0\0".as_bytes()).unwrap(),
            FieldValue::text("Zoë")
        );
    }

    #[test]
    fn test_logical() {
        let flag = Field::new("Active", 1, FieldType::Logical, 1);
        assert_eq!(decoder().decode(&flag, &[0x81]).unwrap(), FieldValue::Boolean(true));
        assert_eq!(decoder().decode(&flag, &[0x80]).unwrap(), FieldValue::Boolean(false));
        assert_eq!(decoder().decode(&flag, &[0x00]).unwrap(), FieldValue::Null);
    }

    #[test]
    fn test_date_epoch() {
        let date = Field::new("Since", 1, FieldType::Date, 4);
        // day 1 is 0001-01-01
        assert_eq!(
            decoder().decode(&date, &[0x80, 0, 0, 1]).unwrap(),
            FieldValue::Date(NaiveDate::from_ymd_opt(1, 1, 1).unwrap())
        );
        let d = NaiveDate::from_ymd_opt(1997, 3, 15).unwrap();
        assert_eq!(roundtrip(&date, FieldValue::Date(d)), FieldValue::Date(d));
    }

    #[test]
    fn test_time_and_timestamp() {
        let time = Field::new("At", 1, FieldType::Time, 4);
        let t = NaiveTime::from_hms_milli_opt(13, 45, 10, 250).unwrap();
        assert_eq!(roundtrip(&time, FieldValue::Time(t)), FieldValue::Time(t));

        let stamp = Field::new("When", 1, FieldType::Timestamp, 8);
        let ts = NaiveDate::from_ymd_opt(2004, 2, 29)
            .unwrap()
            .and_hms_milli_opt(23, 59, 58, 500)
            .unwrap();
        assert_eq!(
            roundtrip(&stamp, FieldValue::Timestamp(ts)),
            FieldValue::Timestamp(ts)
        );
    }

    #[test]
    fn test_bcd() {
        let bcd = Field::new("Amount", 1, FieldType::Bcd, 2);
        let positive = Decimal::from_str("1234.56").unwrap();
        let negative = Decimal::from_str("-0.05").unwrap();
        assert_eq!(
            roundtrip(&bcd, FieldValue::Decimal(positive)),
            FieldValue::Decimal(positive)
        );
        assert_eq!(
            roundtrip(&bcd, FieldValue::Decimal(negative)),
            FieldValue::Decimal(negative)
        );
        assert_eq!(decoder().decode(&bcd, &[0u8; 17]).unwrap(), FieldValue::Null);

        let mut bad = encode_value(&bcd, &FieldValue::Decimal(positive)).unwrap();
        bad[16] = 0xFA;
        assert!(matches!(
            decoder().decode(&bcd, &bad),
            Err(StorageError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_blob_inline_and_reference() {
        let memo = Field::new("Notes", 1, FieldType::Memo, 20);
        assert_eq!(
            roundtrip(&memo, FieldValue::text("short")),
            FieldValue::text("short")
        );
        assert_eq!(roundtrip(&memo, FieldValue::Null), FieldValue::Null);

        let mut raw = vec![0u8; 20];
        raw[10..14].copy_from_slice(&0x1000_00FFu32.to_le_bytes());
        raw[14..18].copy_from_slice(&500u32.to_le_bytes());
        match decoder().decode(&memo, &raw).unwrap() {
            FieldValue::Unavailable(blob) => {
                assert_eq!(blob.length, 500);
                assert!(blob.is_single());
            }
            other => panic!("unexpected value: {other:?}"),
        }

        let graphic = Field::new("Logo", 1, FieldType::Graphic, 14);
        assert_eq!(
            roundtrip(&graphic, FieldValue::Binary(vec![1, 2, 3])),
            FieldValue::Binary(vec![1, 2, 3])
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(FieldValue::Currency(100.0).to_string(), "100.00");
        assert_eq!(FieldValue::Binary(vec![0xAB, 0x01]).to_string(), "0xab01");
        assert_eq!(
            FieldValue::Date(NaiveDate::from_ymd_opt(2001, 9, 9).unwrap()).to_string(),
            "2001-09-09"
        );
        assert_eq!(FieldValue::Null.to_string(), "NULL");
    }

    #[test]
    fn test_numeric_conversions() {
        assert_eq!(FieldValue::Decimal(Decimal::new(-12350, 2)).to_f64(), Some(-123.5));
        assert_eq!(FieldValue::SmallInt(-7).to_f64(), Some(-7.0));
        assert_eq!(FieldValue::Currency(75.5).to_f64(), Some(75.5));
        assert_eq!(FieldValue::text("1").to_f64(), None);
        assert_eq!(FieldValue::Long(9).to_i64(), Some(9));
        assert_eq!(FieldValue::Number(9.0).to_i64(), None);
    }

    #[test]
    fn test_row() {
        let left = Row::new(vec![FieldValue::Long(1), FieldValue::text("a")]);
        let right = Row::new(vec![FieldValue::Null]);
        let both = left.concat(&right);
        assert_eq!(both.len(), 3);
        assert_eq!(both.get(2), Some(&FieldValue::Null));
        assert_eq!(both.to_string(), "(1, a, NULL)");
    }
}
