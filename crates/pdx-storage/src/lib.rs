//! # pdx-storage
//!
//! Read-only decoding of Paradox table directories.
//!
//! This crate turns the files of a Paradox database directory into typed
//! metadata and rows:
//!
//! - **Tables**: `.DB` headers, field descriptors and chained data blocks
//! - **Indexes**: primary (`.PX`) and secondary (`.Xnn`, `.XGn`) index metadata
//! - **Blobs**: memo and binary values stored in the `.MB` companion file
//! - **Catalog**: the set of tables found in one directory
//!
//! Every call opens the files it needs, reads them, and releases them before
//! returning. Nothing is cached between calls.
//!
//! ## Example
//!
//! ```rust,no_run
//! use pdx_common::config::CatalogConfig;
//! use pdx_storage::Catalog;
//!
//! # fn main() -> pdx_storage::StorageResult<()> {
//! let catalog = Catalog::open("./data", CatalogConfig::default())?;
//! for table in catalog.tables("%")? {
//!     let rows = catalog.load(&table)?;
//!     println!("{}: {} rows", table.name(), rows.len());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod file;

/// Large-object (`.MB`) references and resolution
pub mod blob;

/// Directory-level table discovery
pub mod catalog;

/// Error types
pub mod error;

/// Field descriptors and type codes
pub mod field;

/// File header layout
pub mod header;

/// Index metadata
pub mod index;

/// LIKE-style name patterns
pub mod pattern;

/// Table listing and row decoding
pub mod table;

/// Decoded values and rows
pub mod value;

/// Writers for byte-exact test files
#[cfg(any(test, feature = "test-utils"))]
pub mod fixture;

pub use blob::BlobRef;
pub use catalog::Catalog;
pub use error::{StorageError, StorageResult};
pub use field::{DataType, Field, FieldType};
pub use header::{FileType, TableHeader};
pub use index::{Index, IndexKind, SortOrder};
pub use table::{list_tables, load_data, Table};
pub use value::{FieldValue, Row};
