//! # pdx-sql
//!
//! Read-only SQL over directories of Paradox tables.
//!
//! This crate implements:
//! - SQL parsing (`SELECT ... FROM ... WHERE`, other statements kept opaque)
//! - Planning: table and column resolution against a catalog
//! - Execution: cartesian product, three-valued filtering, projection
//! - An [`Engine`] facade with single- and multi-statement policies
//!
//! ## Example
//!
//! ```rust,no_run
//! use pdx_common::config::CatalogConfig;
//! use pdx_sql::Engine;
//!
//! # fn main() -> pdx_sql::Result<()> {
//! let engine = Engine::open("./data", CatalogConfig::default())?;
//! let result = engine.query("SELECT AC AS 'ACode', State FROM AREACODES")?;
//! for row in &result.rows {
//!     println!("{}", row);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Unified error type
pub mod error;

/// Query execution
pub mod executor;

/// SQL tokenizer and parser
pub mod parser;

/// Statement resolution against a catalog
pub mod planner;

mod engine;

pub use engine::{Engine, ExecuteOutcome};
pub use error::{Error, Result};
pub use executor::QueryResult;
