//! Fixture directories shared by the integration tests.

#![allow(dead_code)]

use pdx_common::config::CatalogConfig;
use pdx_sql::Engine;
use pdx_storage::fixture::TableBuilder;
use pdx_storage::{FieldType, FieldValue};
use tempfile::TempDir;

pub const LONG_MEMO: &str = "Ships to the north shore office every second Tuesday, \
                             call ahead for gate access.";

/// A directory holding AREACODES, general, customer and orders.
pub fn sample_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();

    TableBuilder::new("AREACODES")
        .extension("DB")
        .version(pdx_storage::fixture::V4)
        .field("AC", FieldType::Alpha, 3)
        .field("State", FieldType::Alpha, 2)
        .field("CITIES", FieldType::Alpha, 80)
        .primary_key(1)
        .row(vec![
            FieldValue::text("201"),
            FieldValue::text("NJ"),
            FieldValue::text("Hackensack, Jersey City (201/551 overlay)"),
        ])
        .row(vec![
            FieldValue::text("202"),
            FieldValue::text("DC"),
            FieldValue::text("Washington"),
        ])
        .row(vec![
            FieldValue::text("203"),
            FieldValue::text("CT"),
            FieldValue::text("New Haven, Stamford, Bridgeport"),
        ])
        .row(vec![
            FieldValue::text("732"),
            FieldValue::text("NJ"),
            FieldValue::text("New Brunswick"),
        ])
        .write(dir.path())
        .unwrap();

    TableBuilder::new("general")
        .field("id", FieldType::Long, 4)
        .field("name", FieldType::Alpha, 20)
        .field("moneys", FieldType::Currency, 8)
        .row(vec![
            FieldValue::Long(1),
            FieldValue::text("Mari"),
            FieldValue::Currency(100.0),
        ])
        .row(vec![
            FieldValue::Long(2),
            FieldValue::text("Katty"),
            FieldValue::Currency(150.0),
        ])
        .row(vec![
            FieldValue::Long(333333333),
            FieldValue::text("Elizabet"),
            FieldValue::Currency(75.0),
        ])
        .write(dir.path())
        .unwrap();

    TableBuilder::new("customer")
        .field("CustNo", FieldType::Long, 4)
        .field("Name", FieldType::Alpha, 30)
        .field("Email", FieldType::Alpha, 40)
        .field("Notes", FieldType::Memo, 20)
        .primary_key(1)
        .secondary_index("X02", &["Name"])
        .row(vec![
            FieldValue::Long(1221),
            FieldValue::text("Kauai Dive Shoppe"),
            FieldValue::text("info@kauaidive.example"),
            FieldValue::text("prepaid"),
        ])
        .row(vec![
            FieldValue::Long(1231),
            FieldValue::text("Unisco"),
            FieldValue::Null,
            FieldValue::text(LONG_MEMO),
        ])
        .row(vec![
            FieldValue::Long(1351),
            FieldValue::text("Sight Diver"),
            FieldValue::text("sales@sightdiver.example"),
            FieldValue::Null,
        ])
        .write(dir.path())
        .unwrap();

    TableBuilder::new("orders")
        .field("OrderNo", FieldType::Long, 4)
        .field("CustNo", FieldType::Long, 4)
        .field("Total", FieldType::Number, 8)
        .primary_key(1)
        .row(vec![
            FieldValue::Long(1003),
            FieldValue::Long(1351),
            FieldValue::Number(1250.5),
        ])
        .row(vec![
            FieldValue::Long(1004),
            FieldValue::Long(1221),
            FieldValue::Number(7885.0),
        ])
        .row(vec![
            FieldValue::Long(1005),
            FieldValue::Long(1221),
            FieldValue::Number(4674.0),
        ])
        .write(dir.path())
        .unwrap();

    dir
}

pub fn open(dir: &TempDir) -> Engine {
    Engine::open(dir.path(), CatalogConfig::default()).unwrap()
}
