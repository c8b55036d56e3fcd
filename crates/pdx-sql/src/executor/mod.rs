//! Query execution.
//!
//! Execution materializes every result row. There is no streaming and no
//! caching: each run decodes its tables from disk again.
//!
//! # Example
//!
//! ```no_run
//! use pdx_common::config::CatalogConfig;
//! use pdx_sql::executor::plan_and_execute;
//! use pdx_sql::parser::Parser;
//! use pdx_storage::Catalog;
//!
//! # fn main() -> pdx_sql::Result<()> {
//! let catalog = Catalog::open("./data", CatalogConfig::default())?;
//! for statement in Parser::parse("SELECT * FROM customer")? {
//!     let result = plan_and_execute(&statement, &catalog)?;
//!     println!("{} rows", result.len());
//! }
//! # Ok(())
//! # }
//! ```

mod engine;
mod evaluator;

pub use engine::*;
pub use evaluator::*;
