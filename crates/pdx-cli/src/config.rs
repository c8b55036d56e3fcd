//! `pdx` settings file.
//!
//! A TOML file with the directory to open, display defaults and a
//! `[catalog]` table passed through to the engine. Command-line flags win
//! over anything set here.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use pdx_common::config::CatalogConfig;
use serde::{Deserialize, Serialize};

const APP_DIR: &str = "pdxsql";
const CONFIG_FILE: &str = "config.toml";

/// Settings read from the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Directory holding the table files.
    pub dir: Option<PathBuf>,

    /// One of table, json, csv or raw.
    pub output_format: String,

    /// Print elapsed time after each statement.
    pub timing: bool,

    /// Where the shell keeps its history.
    pub history_file: Option<PathBuf>,

    /// Entries kept in history.
    pub history_size: usize,

    /// How table files are discovered and decoded.
    pub catalog: CatalogConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            dir: None,
            output_format: "table".to_string(),
            timing: false,
            history_file: None,
            history_size: 1000,
            catalog: CatalogConfig::default(),
        }
    }
}

impl CliConfig {
    /// Reads and validates the file at `path`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        config
            .catalog
            .validate()
            .map_err(|reason| anyhow::anyhow!("invalid config file {}: {reason}", path.display()))?;
        Ok(config)
    }

    /// Reads the first config file that exists, trying the platform config
    /// directory and then `~/.pdxsql/`. Defaults apply when neither exists.
    pub fn load_default() -> Result<Self> {
        let candidates = [
            Self::default_config_path(),
            dirs::home_dir().map(|home| home.join(format!(".{APP_DIR}")).join(CONFIG_FILE)),
        ];
        match candidates.into_iter().flatten().find(|path| path.exists()) {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// `<config dir>/pdxsql/config.toml`.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// History file to use, configured or under the local data directory.
    pub fn history_path(&self) -> Option<PathBuf> {
        self.history_file
            .clone()
            .or_else(|| dirs::data_local_dir().map(|dir| dir.join(APP_DIR).join("history")))
    }

    /// Directory to open, the current one if none is configured.
    pub fn data_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdx_common::config::{BlobPolicy, TextEncoding};
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = CliConfig::default();
        assert!(config.dir.is_none());
        assert_eq!(config.data_dir(), PathBuf::from("."));
        assert_eq!(config.output_format, "table");
        assert_eq!(config.history_size, 1000);
        assert_eq!(config.catalog, CatalogConfig::default());

        // an empty file is all defaults
        let parsed: CliConfig = toml::from_str("").unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_written_config_reads_back() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        let config = CliConfig {
            dir: Some(PathBuf::from("/srv/paradox")),
            timing: true,
            catalog: CatalogConfig::default().with_blob_policy(BlobPolicy::Resolve),
            ..CliConfig::default()
        };
        std::fs::write(&path, toml::to_string(&config).unwrap()).unwrap();

        assert_eq!(CliConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_catalog_section() {
        let text = r#"
            dir = "data"
            output_format = "json"
            timing = true

            [catalog]
            text_encoding = "utf8"
            blob_policy = "resolve"
        "#;

        let config: CliConfig = toml::from_str(text).unwrap();
        assert_eq!(config.dir, Some(PathBuf::from("data")));
        assert_eq!(config.output_format, "json");
        assert!(config.timing);
        assert_eq!(config.catalog.text_encoding, TextEncoding::Utf8);
        assert_eq!(config.catalog.blob_policy, BlobPolicy::Resolve);
        assert_eq!(config.catalog.table_extension, "db");
        assert_eq!(config.history_size, 1000);
    }

    #[test]
    fn test_invalid_catalog_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[catalog]\ntable_extension = \".db\"\n").unwrap();
        assert!(CliConfig::from_file(&path).is_err());

        assert!(CliConfig::from_file(&temp.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_history_path() {
        let config = CliConfig {
            history_file: Some(PathBuf::from("/tmp/pdx-history")),
            ..CliConfig::default()
        };
        assert_eq!(config.history_path(), Some(PathBuf::from("/tmp/pdx-history")));
    }
}
