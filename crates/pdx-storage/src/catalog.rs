//! The set of tables in one directory.
//!
//! A [`Catalog`] holds only the directory path and its configuration.
//! Every lookup lists the directory again, so files added or removed
//! between calls are seen by the next call.

use std::path::{Path, PathBuf};

use pdx_common::config::CatalogConfig;
use tracing::debug;

use crate::blob::{self, BlobRef};
use crate::error::{StorageError, StorageResult};
use crate::field::Field;
use crate::index::{self, Index};
use crate::table::{self, Table};
use crate::value::Row;

/// A directory of Paradox tables.
#[derive(Debug, Clone)]
pub struct Catalog {
    root: PathBuf,
    config: CatalogConfig,
}

impl Catalog {
    /// Opens the catalog rooted at `dir`.
    ///
    /// Fails if `dir` is missing or is not a directory.
    pub fn open(dir: impl Into<PathBuf>, config: CatalogConfig) -> StorageResult<Self> {
        let root = dir.into();
        let metadata = std::fs::metadata(&root).map_err(|e| StorageError::file_access(&root, e))?;
        if !metadata.is_dir() {
            return Err(StorageError::NotADirectory { path: root });
        }
        debug!(dir = %root.display(), "opened catalog");
        Ok(Self { root, config })
    }

    /// Directory this catalog reads.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Catalog configuration.
    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Tables whose name or file name matches the LIKE `pattern`.
    pub fn tables(&self, pattern: &str) -> StorageResult<Vec<Table>> {
        table::list_tables(&self.root, pattern, &self.config)
    }

    /// Finds a table by name, ignoring case.
    ///
    /// `name` may carry the table extension (`customer.db`) or not
    /// (`CUSTOMER`). Only the matching file's header is read.
    pub fn find_table(&self, name: &str) -> StorageResult<Option<Table>> {
        let wanted = self.strip_extension(name);
        let mut candidates: Vec<PathBuf> = std::fs::read_dir(&self.root)
            .map_err(|e| StorageError::file_access(&self.root, e))?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .filter(|p| {
                let ext_ok = p
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| self.config.is_table_extension(ext));
                let stem_ok = p
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .is_some_and(|stem| stem.eq_ignore_ascii_case(wanted));
                ext_ok && stem_ok
            })
            .collect();
        candidates.sort();

        match candidates.into_iter().next() {
            Some(path) => Table::open(path).map(Some),
            None => Ok(None),
        }
    }

    /// Index metadata for a table, primary index first.
    pub fn indexes_for(&self, table: &Table) -> StorageResult<Vec<Index>> {
        index::list_indexes(table)
    }

    /// Fields forming the table's primary key.
    pub fn primary_key<'t>(&self, table: &'t Table) -> &'t [Field] {
        table.primary_key()
    }

    /// Decodes every record with every field.
    pub fn load(&self, table: &Table) -> StorageResult<Vec<Row>> {
        table::load_data(table, table.fields(), &self.config)
    }

    /// Decodes every record, keeping only `fields` in the given order.
    pub fn load_fields(&self, table: &Table, fields: &[Field]) -> StorageResult<Vec<Row>> {
        table::load_data(table, fields, &self.config)
    }

    /// Reads the value behind a blob reference of `table`.
    pub fn read_blob(&self, table: &Table, blob: &BlobRef) -> StorageResult<Vec<u8>> {
        blob::read_blob(table.path(), blob)
    }

    fn strip_extension<'n>(&self, name: &'n str) -> &'n str {
        match name.rsplit_once('.') {
            Some((stem, ext)) if self.config.is_table_extension(ext) => stem,
            _ => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldType;
    use crate::fixture::TableBuilder;
    use crate::value::FieldValue;

    fn catalog() -> (tempfile::TempDir, Catalog) {
        let dir = tempfile::tempdir().unwrap();
        TableBuilder::new("CUSTOMER")
            .extension("DB")
            .field("CustNo", FieldType::Long, 4)
            .field("City", FieldType::Alpha, 20)
            .primary_key(1)
            .secondary_index("X02", &["City"])
            .row(vec![FieldValue::Long(1221), FieldValue::text("Kapaa Kauai")])
            .row(vec![FieldValue::Long(1231), FieldValue::text("Freeport")])
            .write(dir.path())
            .unwrap();
        TableBuilder::new("areacodes")
            .field("Code", FieldType::Alpha, 3)
            .field("State", FieldType::Alpha, 2)
            .row(vec![FieldValue::text("201"), FieldValue::text("NJ")])
            .write(dir.path())
            .unwrap();
        std::fs::write(dir.path().join("readme.txt"), b"not a table").unwrap();
        let catalog = Catalog::open(dir.path(), CatalogConfig::default()).unwrap();
        (dir, catalog)
    }

    #[test]
    fn test_open_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = Catalog::open(dir.path().join("nope"), CatalogConfig::default()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_open_file_is_not_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.txt");
        std::fs::write(&path, b"x").unwrap();
        let err = Catalog::open(&path, CatalogConfig::default()).unwrap_err();
        assert!(matches!(err, StorageError::NotADirectory { .. }));
    }

    #[test]
    fn test_tables() {
        let (_dir, catalog) = catalog();
        let names: Vec<_> = catalog
            .tables("%")
            .unwrap()
            .iter()
            .map(|t| t.name().to_string())
            .collect();
        assert_eq!(names, ["CUSTOMER", "areacodes"]);
        assert_eq!(catalog.tables("cust%").unwrap().len(), 1);
        assert!(catalog.tables("orders").unwrap().is_empty());
    }

    #[test]
    fn test_find_table() {
        let (_dir, catalog) = catalog();
        for name in ["customer", "CUSTOMER", "Customer.db", "CUSTOMER.DB"] {
            let table = catalog.find_table(name).unwrap().unwrap();
            assert_eq!(table.name(), "CUSTOMER");
        }
        assert!(catalog.find_table("AREACODES").unwrap().is_some());
        assert!(catalog.find_table("orders").unwrap().is_none());
        assert!(catalog.find_table("readme").unwrap().is_none());
    }

    #[test]
    fn test_load_and_indexes() {
        let (_dir, catalog) = catalog();
        let table = catalog.find_table("customer").unwrap().unwrap();

        let rows = catalog.load(&table).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get(1), Some(&FieldValue::text("Freeport")));

        let city = table.field("city").unwrap().clone();
        let rows = catalog.load_fields(&table, &[city]).unwrap();
        assert_eq!(rows[0].values(), [FieldValue::text("Kapaa Kauai")]);

        let key: Vec<_> = catalog
            .primary_key(&table)
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(key, ["CustNo"]);

        let indexes = catalog.indexes_for(&table).unwrap();
        assert_eq!(indexes.len(), 2);
        assert!(indexes[0].is_primary());
        assert_eq!(indexes[1].column_names(), ["City"]);
    }

    #[test]
    fn test_sees_new_files() {
        let (dir, catalog) = catalog();
        assert!(catalog.find_table("orders").unwrap().is_none());
        TableBuilder::new("orders")
            .field("OrderNo", FieldType::Long, 4)
            .write(dir.path())
            .unwrap();
        assert!(catalog.find_table("orders").unwrap().is_some());
    }
}
