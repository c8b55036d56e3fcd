//! Configuration for pdxsql.
//!
//! This module provides the settings that control how a directory of
//! table files is discovered and decoded.

mod catalog;

pub use catalog::{BlobPolicy, CatalogConfig, TextEncoding};
