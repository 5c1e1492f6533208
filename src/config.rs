//! YAML configuration.
//!
//! Everything has a sensible default; a missing config file is not an
//! error, but an explicitly passed path that cannot be read is.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// SQLite database path.
    pub database: PathBuf,

    /// Country prefix applied when normalizing restored phone numbers.
    pub country_prefix: String,

    /// Plaintext seeded into replacement credentials on restore.
    /// Operators are expected to force a change on first login.
    pub default_password: String,

    /// Report unresolved snapshot references as row errors instead of
    /// skipping the rows.
    pub strict_references: bool,

    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory for exported snapshot blobs.
    pub dir: PathBuf,

    /// Snapshots kept after rotation; 0 disables pruning.
    pub keep: usize,
}

impl Default for Config {
    fn default() -> Self {
        let data = default_data_dir();
        Self {
            database: data.join("ispsnap.db"),
            country_prefix: "880".to_string(),
            default_password: "changeme123".to_string(),
            strict_references: false,
            storage: StorageConfig::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: default_data_dir().join("snapshots"),
            keep: 10,
        }
    }
}

impl Config {
    /// Load from an explicit path, or from the default location when it
    /// exists, or fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) if p.exists() => p,
                _ => return Ok(Self::default()),
            },
        };

        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&text)
            .with_context(|| format!("invalid config file: {}", path.display()))?;
        Ok(config)
    }

    /// Default config file location: `<config dir>/ispsnap/config.yaml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("ispsnap").join("config.yaml"))
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ispsnap")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.country_prefix, "880");
        assert_eq!(config.default_password, "changeme123");
        assert!(!config.strict_references);
        assert_eq!(config.storage.keep, 10);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let config: Config = serde_yaml::from_str("database: /tmp/test.db\n").unwrap();
        assert_eq!(config.database, PathBuf::from("/tmp/test.db"));
        assert_eq!(config.country_prefix, "880");
    }

    #[test]
    fn test_full_yaml() {
        let yaml = "\
database: /var/lib/isp/isp.db
country_prefix: \"91\"
default_password: letmein
strict_references: true
storage:
  dir: /var/backups/isp
  keep: 3
";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.country_prefix, "91");
        assert!(config.strict_references);
        assert_eq!(config.storage.dir, PathBuf::from("/var/backups/isp"));
        assert_eq!(config.storage.keep, 3);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: std::result::Result<Config, _> =
            serde_yaml::from_str("databse: /tmp/oops.db\n");
        assert!(result.is_err());
    }
}
