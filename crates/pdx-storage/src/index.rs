//! Primary and secondary index metadata.
//!
//! Index files sit next to their table and share its stem:
//!
//! - `<stem>.PX` is the primary index over the table's leading key fields.
//! - `<stem>.Xhh` is a secondary index over one field, `hh` being the
//!   field number in hex.
//! - `<stem>.XGh` is a composite secondary index.
//!
//! Secondary index files are laid out like tables: their field list holds
//! the indexed columns, then the table's primary key, then a `Hint` field.
//! Statistics are not read; cardinality and page counts are always zero.

use std::fmt;
use std::path::Path;

use pdx_common::constants::{INDEX_HINT_FIELD, PRIMARY_INDEX_EXTENSION};
use serde::Serialize;
use tracing::debug;

use crate::error::{StorageError, StorageResult};
use crate::field::Field;
use crate::file;
use crate::header::TableHeader;
use crate::table::Table;

/// Sort direction of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SortOrder {
    /// Ascending.
    Ascending,
    /// Descending.
    Descending,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Ascending => write!(f, "A"),
            SortOrder::Descending => write!(f, "D"),
        }
    }
}

/// Whether an index is the table's primary index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IndexKind {
    /// The `.PX` file.
    Primary,
    /// An `.Xnn` or `.XGn` file.
    Secondary,
}

/// Index metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Index {
    /// Index file name, e.g. `CUSTOMER.X06`.
    pub name: String,
    /// Owning table name.
    pub table: String,
    /// Indexed columns in key order.
    pub columns: Vec<Field>,
    /// Sort direction.
    pub order: SortOrder,
    /// Primary or secondary.
    pub kind: IndexKind,
    /// Whether keys are unique.
    pub unique: bool,
    /// Distinct keys. Not computed.
    pub cardinality: u64,
    /// Pages used. Not computed.
    pub pages: u64,
}

impl Index {
    /// Returns true for the primary index.
    pub fn is_primary(&self) -> bool {
        self.kind == IndexKind::Primary
    }

    /// Names of the indexed columns.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|f| f.name.as_str()).collect()
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} on {}({}) {}",
            self.name,
            self.table,
            self.column_names().join(", "),
            self.order
        )?;
        if self.unique {
            write!(f, " unique")?;
        }
        Ok(())
    }
}

/// Secondary index file suffix, parsed from an extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Suffix {
    /// `Xhh`: single-field index on field number `hh`.
    Single(usize),
    /// `XGh`: composite index.
    Composite,
}

impl Suffix {
    fn parse(extension: &str) -> Option<Self> {
        let upper = extension.to_ascii_uppercase();
        let rest = upper.strip_prefix('X')?;
        if let Some(digit) = rest.strip_prefix('G') {
            return (digit.len() == 1 && digit.chars().all(|c| c.is_ascii_hexdigit()))
                .then_some(Suffix::Composite);
        }
        if rest.len() != 2 {
            return None;
        }
        usize::from_str_radix(rest, 16).ok().map(Suffix::Single)
    }
}

/// Lists the indexes of a table: the primary index first, then secondary
/// indexes by file name.
pub fn list_indexes(table: &Table) -> StorageResult<Vec<Index>> {
    let mut indexes = Vec::new();
    for (path, extension) in file::companions(table.path())? {
        if extension.eq_ignore_ascii_case(PRIMARY_INDEX_EXTENSION) {
            indexes.insert(0, primary_index(table, &path)?);
        } else if let Some(suffix) = Suffix::parse(&extension) {
            indexes.push(secondary_index(table, &path, suffix)?);
        }
    }
    debug!(table = table.name(), indexes = indexes.len(), "listed indexes");
    Ok(indexes)
}

fn primary_index(table: &Table, path: &Path) -> StorageResult<Index> {
    let header = read_index_header(table, path)?;
    if !matches!(header.file_type, crate::header::FileType::PrimaryIndex) {
        return Err(StorageError::format(
            path,
            format!("expected a primary index, found {:?}", header.file_type),
        ));
    }
    Ok(Index {
        name: file_name(path),
        table: table.name().to_string(),
        columns: table.primary_key().to_vec(),
        order: SortOrder::Ascending,
        kind: IndexKind::Primary,
        unique: true,
        cardinality: 0,
        pages: 0,
    })
}

fn secondary_index(table: &Table, path: &Path, suffix: Suffix) -> StorageResult<Index> {
    let header = read_index_header(table, path)?;
    let mut names: Vec<&str> = header.fields.iter().map(|f| f.name.as_str()).collect();

    if names
        .last()
        .is_some_and(|n| n.eq_ignore_ascii_case(INDEX_HINT_FIELD))
    {
        names.pop();
    }
    let key: Vec<&str> = table.primary_key().iter().map(|f| f.name.as_str()).collect();
    if names.len() > key.len() && !key.is_empty() {
        let tail = &names[names.len() - key.len()..];
        if tail.iter().zip(&key).all(|(a, b)| a.eq_ignore_ascii_case(b)) {
            names.truncate(names.len() - key.len());
        }
    }

    let mapped: Option<Vec<Field>> = names
        .iter()
        .map(|name| table.field(name).cloned())
        .collect();
    let columns = match (mapped, suffix) {
        (Some(columns), _) if !columns.is_empty() => columns,
        // the extension carries the field number
        (_, Suffix::Single(number)) => table
            .fields()
            .get(number.wrapping_sub(1))
            .cloned()
            .into_iter()
            .collect(),
        (_, Suffix::Composite) => Vec::new(),
    };
    if columns.is_empty() {
        return Err(StorageError::format(
            path,
            "index columns do not match any table field",
        ));
    }

    Ok(Index {
        name: file_name(path),
        table: table.name().to_string(),
        columns,
        order: SortOrder::Ascending,
        kind: IndexKind::Secondary,
        unique: false,
        cardinality: 0,
        pages: 0,
    })
}

fn read_index_header(table: &Table, path: &Path) -> StorageResult<TableHeader> {
    let bytes = file::read_header(path)?;
    TableHeader::parse(&bytes, path, table.name())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldType;
    use crate::fixture::{TableBuilder, V3, V7};
    use crate::value::FieldValue;

    fn customer(version: u8) -> TableBuilder {
        TableBuilder::new("CUSTOMER")
            .extension("DB")
            .version(version)
            .field("CustNo", FieldType::Number, 8)
            .field("Name", FieldType::Alpha, 30)
            .field("Street", FieldType::Alpha, 30)
            .field("Email", FieldType::Alpha, 40)
            .field("State", FieldType::Alpha, 2)
            .field("City", FieldType::Alpha, 20)
            .primary_key(1)
            .secondary_index("X06", &["City"])
            .row(vec![
                FieldValue::Number(1221.0),
                FieldValue::text("Kauai Dive Shoppe"),
                FieldValue::text("4-976 Sugarloaf Hwy"),
                FieldValue::Null,
                FieldValue::text("HI"),
                FieldValue::text("Kapaa Kauai"),
            ])
    }

    fn open(builder: &TableBuilder) -> (tempfile::TempDir, Table) {
        let dir = tempfile::tempdir().unwrap();
        let path = builder.write(dir.path()).unwrap();
        let table = Table::open(path).unwrap();
        (dir, table)
    }

    #[test]
    fn test_primary_and_secondary() {
        for version in [V3, V7] {
            let (_dir, table) = open(&customer(version));
            let indexes = list_indexes(&table).unwrap();
            assert_eq!(indexes.len(), 2);

            let primary = &indexes[0];
            assert_eq!(primary.name, "CUSTOMER.PX");
            assert!(primary.is_primary());
            assert!(primary.unique);
            assert_eq!(primary.column_names(), ["CustNo"]);

            let city = &indexes[1];
            assert_eq!(city.name, "CUSTOMER.X06");
            assert_eq!(city.kind, IndexKind::Secondary);
            assert!(!city.unique);
            assert_eq!(city.order, SortOrder::Ascending);
            assert_eq!(city.column_names(), ["City"]);
            assert_eq!(city.cardinality, 0);
            assert_eq!(city.pages, 0);
        }
    }

    #[test]
    fn test_composite_index() {
        let (_dir, table) = open(&customer(V7).secondary_index("XG0", &["State", "City"]));
        let indexes = list_indexes(&table).unwrap();
        let composite = indexes.iter().find(|i| i.name == "CUSTOMER.XG0").unwrap();
        assert_eq!(composite.column_names(), ["State", "City"]);
    }

    #[test]
    fn test_field_number_fallback() {
        let (_dir, table) = open(&customer(V7).secondary_index("X05", &["Renamed"]));
        let indexes = list_indexes(&table).unwrap();
        let state = indexes.iter().find(|i| i.name == "CUSTOMER.X05").unwrap();
        assert_eq!(state.column_names(), ["State"]);
    }

    #[test]
    fn test_no_indexes() {
        let (_dir, table) = open(
            &TableBuilder::new("plain")
                .field("A", FieldType::Long, 4)
                .row(vec![FieldValue::Long(1)]),
        );
        assert!(list_indexes(&table).unwrap().is_empty());
    }

    #[test]
    fn test_unrelated_companions_ignored() {
        let (dir, table) = open(&customer(V7));
        std::fs::write(dir.path().join("CUSTOMER.TV"), b"view settings").unwrap();
        std::fs::write(dir.path().join("CUSTOMER.XYZ"), b"").unwrap();
        assert_eq!(list_indexes(&table).unwrap().len(), 2);
    }

    #[test]
    fn test_corrupt_primary_index() {
        let (dir, table) = open(&customer(V7));
        std::fs::write(dir.path().join("CUSTOMER.PX"), [1u8, 2]).unwrap();
        assert!(list_indexes(&table).unwrap_err().is_format());
    }

    #[test]
    fn test_suffix_parse() {
        assert_eq!(Suffix::parse("X06"), Some(Suffix::Single(6)));
        assert_eq!(Suffix::parse("x0a"), Some(Suffix::Single(10)));
        assert_eq!(Suffix::parse("XG0"), Some(Suffix::Composite));
        assert_eq!(Suffix::parse("XYZ"), None);
        assert_eq!(Suffix::parse("X6"), None);
        assert_eq!(Suffix::parse("PX"), None);
    }
}
