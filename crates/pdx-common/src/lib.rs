//! # pdx-common
//!
//! Common types, error codes, and constants for pdxsql.
//!
//! This crate provides the pieces shared by every pdxsql component:
//!
//! - **Errors**: stable [`ErrorCode`] values grouped by category
//! - **Config**: catalog configuration (table extension, text encoding, blob policy)
//! - **Constants**: Paradox file-format offsets and sizes
//!
//! ## Example
//!
//! ```rust
//! use pdx_common::config::{BlobPolicy, CatalogConfig};
//!
//! let config = CatalogConfig::default();
//! assert_eq!(config.table_extension, "db");
//! assert_eq!(config.blob_policy, BlobPolicy::Reference);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod constants;
pub mod error;

pub use config::{BlobPolicy, CatalogConfig, TextEncoding};
pub use error::ErrorCode;
