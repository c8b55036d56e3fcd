//! Error codes shared across pdxsql.
//!
//! Each crate defines its own error enum; all of them map onto the
//! [`ErrorCode`] values defined here so callers can branch on a stable
//! numeric code without matching every variant.

mod code;

pub use code::ErrorCode;
