//! Table discovery, index metadata and blob handling seen through the engine.

mod common;

use pdx_common::config::{BlobPolicy, CatalogConfig};
use pdx_common::constants::{
    FIELD_INFO_OFFSET, FIELD_INFO_OFFSET_V4, HEADER_NUM_RECORDS, VERSION_EXTENDED_HEADER,
};
use pdx_common::ErrorCode;
use pdx_sql::Engine;
use pdx_storage::{load_data, FieldValue, IndexKind};

#[test]
fn test_list_tables() {
    let dir = common::sample_dir();
    let engine = common::open(&dir);

    let names: Vec<String> = engine
        .list_tables("%")
        .unwrap()
        .iter()
        .map(|t| t.name().to_string())
        .collect();
    assert_eq!(names, ["AREACODES", "customer", "general", "orders"]);

    let matched = engine.list_tables("c%").unwrap();
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].name(), "customer");

    assert!(engine.list_tables("nothing_like_this%").unwrap().is_empty());

    let empty = tempfile::tempdir().unwrap();
    let engine = Engine::open(empty.path(), CatalogConfig::default()).unwrap();
    assert!(engine.list_tables("%").unwrap().is_empty());
}

#[test]
fn test_load_data_row_counts() {
    let dir = common::sample_dir();
    let engine = common::open(&dir);
    let config = engine.catalog().config().clone();

    for table in engine.list_tables("%").unwrap() {
        let rows = load_data(&table, table.fields(), &config).unwrap();
        assert_eq!(rows.len(), table.row_count() as usize, "{}", table.name());
        for row in &rows {
            assert_eq!(row.len(), table.fields().len());
        }
    }
}

#[test]
fn test_describe_indexes() {
    let dir = common::sample_dir();
    let engine = common::open(&dir);

    let indexes = engine.describe_indexes("customer").unwrap();
    assert_eq!(indexes.len(), 2);

    assert!(indexes[0].is_primary());
    assert!(indexes[0].unique);
    assert_eq!(indexes[0].column_names(), ["CustNo"]);

    assert_eq!(indexes[1].kind, IndexKind::Secondary);
    assert!(!indexes[1].unique);
    assert_eq!(indexes[1].column_names(), ["Name"]);

    // no companion files, no indexes
    assert!(engine.describe_indexes("general").unwrap().is_empty());
}

#[test]
fn test_blob_reference_policy() {
    let dir = common::sample_dir();
    let engine = common::open(&dir);

    let result = engine.query("SELECT CustNo, Notes FROM customer").unwrap();
    assert_eq!(result.value(0, "Notes"), Some(&FieldValue::text("prepaid")));
    assert_eq!(result.value(2, "Notes"), Some(&FieldValue::Null));

    let Some(FieldValue::Unavailable(blob)) = result.value(1, "Notes") else {
        panic!("expected an unresolved memo, got {:?}", result.value(1, "Notes"));
    };
    assert_eq!(blob.length as usize, common::LONG_MEMO.len());

    // the reference can still be resolved on demand
    let table = engine.table("customer").unwrap();
    let bytes = engine.catalog().read_blob(&table, blob).unwrap();
    assert_eq!(bytes, common::LONG_MEMO.as_bytes());
}

#[test]
fn test_blob_resolve_policy() {
    let dir = common::sample_dir();
    let config = CatalogConfig::default().with_blob_policy(BlobPolicy::Resolve);
    let engine = Engine::open(dir.path(), config).unwrap();

    let result = engine
        .query("SELECT Notes FROM customer WHERE CustNo = 1231")
        .unwrap();
    assert_eq!(
        result.value(0, "Notes"),
        Some(&FieldValue::text(common::LONG_MEMO))
    );

    let like = engine
        .query("SELECT CustNo FROM customer WHERE Notes LIKE '%gate access%'")
        .unwrap();
    assert_eq!(like.value(0, "CustNo"), Some(&FieldValue::Long(1231)));
}

#[test]
fn test_blob_resolve_without_companion() {
    let dir = common::sample_dir();
    let config = CatalogConfig::default().with_blob_policy(BlobPolicy::Resolve);
    std::fs::remove_file(dir.path().join("customer.mb")).unwrap();
    let engine = Engine::open(dir.path(), config).unwrap();

    let result = engine.query("SELECT Notes FROM customer").unwrap();
    assert_eq!(result.value(0, "Notes"), Some(&FieldValue::text("prepaid")));
    assert!(matches!(
        result.value(1, "Notes"),
        Some(FieldValue::Unavailable(_))
    ));
}

#[test]
fn test_corrupt_table_is_an_error() {
    let dir = common::sample_dir();
    let engine = common::open(&dir);
    let orders = engine.catalog().find_table("orders").unwrap().unwrap();
    let pristine = std::fs::read(orders.path()).unwrap();

    let mut bytes = pristine.clone();
    bytes[HEADER_NUM_RECORDS..HEADER_NUM_RECORDS + 4].copy_from_slice(&0xFFFF_FFF0u32.to_le_bytes());
    std::fs::write(orders.path(), &bytes).unwrap();
    let err = engine.query("SELECT * FROM orders").unwrap_err();
    assert_eq!(err.code(), ErrorCode::RowCountMismatch);

    // OrderNo is a Long; claim it is two bytes wide
    let descriptors = if orders.header().version >= VERSION_EXTENDED_HEADER {
        FIELD_INFO_OFFSET_V4
    } else {
        FIELD_INFO_OFFSET
    };
    let mut bytes = pristine;
    assert_eq!(bytes[descriptors + 1], 4);
    bytes[descriptors + 1] = 2;
    std::fs::write(orders.path(), &bytes).unwrap();
    let err = engine.query("SELECT OrderNo FROM orders").unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidHeader);
    assert!(err.is_storage());

    assert_eq!(engine.query("SELECT * FROM general").unwrap().len(), 3);
}
