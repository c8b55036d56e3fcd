//! Catalog configuration structures.

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_TABLE_EXTENSION;

/// Configuration for opening a directory of tables.
///
/// # Example
///
/// ```rust
/// use pdx_common::config::{CatalogConfig, TextEncoding};
///
/// let config = CatalogConfig::default().with_text_encoding(TextEncoding::Utf8);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// File extension (without the dot) that marks a table file.
    /// Matched case-insensitively.
    /// Default: "db"
    pub table_extension: String,

    /// Character set used to decode Alpha and memo fields.
    /// Default: latin1
    pub text_encoding: TextEncoding,

    /// What to do with memo and blob values stored outside the record.
    /// Default: reference
    pub blob_policy: BlobPolicy,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            table_extension: DEFAULT_TABLE_EXTENSION.to_string(),
            text_encoding: TextEncoding::default(),
            blob_policy: BlobPolicy::default(),
        }
    }
}

impl CatalogConfig {
    /// Returns a copy of this configuration with a different text encoding.
    #[must_use]
    pub fn with_text_encoding(mut self, encoding: TextEncoding) -> Self {
        self.text_encoding = encoding;
        self
    }

    /// Returns a copy of this configuration with a different blob policy.
    #[must_use]
    pub fn with_blob_policy(mut self, policy: BlobPolicy) -> Self {
        self.blob_policy = policy;
        self
    }

    /// Returns true if `extension` names a table file.
    #[must_use]
    pub fn is_table_extension(&self, extension: &str) -> bool {
        extension.eq_ignore_ascii_case(&self.table_extension)
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.table_extension.is_empty() {
            return Err("table_extension must not be empty".to_string());
        }

        if self.table_extension.starts_with('.') {
            return Err("table_extension must not start with a dot".to_string());
        }

        if !self.table_extension.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err("table_extension must be alphanumeric".to_string());
        }

        Ok(())
    }
}

/// Character set of text stored in table files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextEncoding {
    /// ISO-8859-1. Every byte maps to one character.
    #[default]
    Latin1,
    /// UTF-8, with invalid sequences replaced.
    Utf8,
}

/// Handling of memo and blob values that live in the `.MB` companion file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobPolicy {
    /// Surface out-of-record values as unavailable references.
    #[default]
    Reference,
    /// Read out-of-record values from the `.MB` file while decoding.
    Resolve,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CatalogConfig::default();
        assert_eq!(config.table_extension, "db");
        assert_eq!(config.text_encoding, TextEncoding::Latin1);
        assert_eq!(config.blob_policy, BlobPolicy::Reference);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = CatalogConfig::default();
        config.table_extension = String::new();
        assert!(config.validate().is_err());

        config.table_extension = ".db".to_string();
        assert!(config.validate().is_err());

        config.table_extension = "d b".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_table_extension_case() {
        let config = CatalogConfig::default();
        assert!(config.is_table_extension("DB"));
        assert!(config.is_table_extension("db"));
        assert!(!config.is_table_extension("PX"));
    }

    #[test]
    fn test_builders() {
        let config = CatalogConfig::default()
            .with_text_encoding(TextEncoding::Utf8)
            .with_blob_policy(BlobPolicy::Resolve);
        assert_eq!(config.text_encoding, TextEncoding::Utf8);
        assert_eq!(config.blob_policy, BlobPolicy::Resolve);
    }

    #[test]
    fn test_from_toml() {
        let config: CatalogConfig = toml::from_str(
            r#"
            text_encoding = "utf8"
            blob_policy = "resolve"
            "#,
        )
        .unwrap();
        assert_eq!(config.table_extension, "db");
        assert_eq!(config.text_encoding, TextEncoding::Utf8);
        assert_eq!(config.blob_policy, BlobPolicy::Resolve);
    }
}
