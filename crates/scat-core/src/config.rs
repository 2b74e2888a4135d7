//! Configuration
//!
//! Loaded from TOML; every field has a default so an empty file is valid.
//!
//! ```toml
//! log_filter = "scat=debug"
//!
//! [session]
//! autosave_interval_secs = 30
//! gateway_timeout_secs = 10
//!
//! [storage]
//! data_dir = ".scat"
//!
//! [catalog]
//! link_table = "links.json"
//! ```

use crate::error::ConfigError;
use crate::lifecycle::StorageKeys;
use crate::session::SessionConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Editing session settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Seconds between autosave ticks
    pub autosave_interval_secs: u64,
    /// Bound on each gateway call; 0 disables
    pub gateway_timeout_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            autosave_interval_secs: 30,
            gateway_timeout_secs: 10,
        }
    }
}

/// Durable storage settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Directory holding one JSON file per key
    pub data_dir: PathBuf,
    /// Key of the active project list
    pub active_key: String,
    /// Key of the trash list
    pub trash_key: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".scat"),
            active_key: "scat.projects.active".to_string(),
            trash_key: "scat.projects.trash".to_string(),
        }
    }
}

/// Catalog settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// Causal link JSON replacing the bundled table
    pub link_table: Option<PathBuf>,
}

/// SCAT configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScatConfig {
    /// Session settings
    pub session: SessionSettings,
    /// Storage settings
    pub storage: StorageSettings,
    /// Catalog settings
    pub catalog: CatalogSettings,
    /// `tracing` filter directive used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for ScatConfig {
    fn default() -> Self {
        Self {
            session: SessionSettings::default(),
            storage: StorageSettings::default(),
            catalog: CatalogSettings::default(),
            log_filter: "info".to_string(),
        }
    }
}

impl ScatConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate TOML
    ///
    /// # Errors
    /// Parse failures and values rejected by [`ScatConfig::validate`]
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    /// I/O failures plus everything [`ScatConfig::from_toml_str`] rejects
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// With autosave interval
    #[inline]
    #[must_use]
    pub fn with_autosave_interval_secs(mut self, secs: u64) -> Self {
        self.session.autosave_interval_secs = secs;
        self
    }

    /// With gateway timeout (0 disables)
    #[inline]
    #[must_use]
    pub fn with_gateway_timeout_secs(mut self, secs: u64) -> Self {
        self.session.gateway_timeout_secs = secs;
        self
    }

    /// With data directory
    #[inline]
    #[must_use]
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage.data_dir = dir.into();
        self
    }

    /// With causal link table file
    #[inline]
    #[must_use]
    pub fn with_link_table(mut self, path: impl Into<PathBuf>) -> Self {
        self.catalog.link_table = Some(path.into());
        self
    }

    /// With log filter
    #[inline]
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Check value ranges
    ///
    /// # Errors
    /// [`ConfigError::Invalid`] naming the first bad field
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.autosave_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "session.autosave_interval_secs",
                reason: "must be greater than zero",
            });
        }
        if self.storage.active_key.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "storage.active_key",
                reason: "must not be empty",
            });
        }
        if self.storage.trash_key.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "storage.trash_key",
                reason: "must not be empty",
            });
        }
        if self.storage.active_key == self.storage.trash_key {
            return Err(ConfigError::Invalid {
                field: "storage.trash_key",
                reason: "must differ from storage.active_key",
            });
        }
        Ok(())
    }

    /// Session timings
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            autosave_interval: Duration::from_secs(self.session.autosave_interval_secs),
            gateway_timeout: (self.session.gateway_timeout_secs > 0)
                .then(|| Duration::from_secs(self.session.gateway_timeout_secs)),
        }
    }

    /// Lifecycle storage keys
    #[must_use]
    pub fn storage_keys(&self) -> StorageKeys {
        StorageKeys {
            active: self.storage.active_key.clone(),
            trash: self.storage.trash_key.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_file_gives_defaults() {
        let config = ScatConfig::from_toml_str("").unwrap();
        assert_eq!(config, ScatConfig::default());
        assert_eq!(
            config.session_config().autosave_interval,
            Duration::from_secs(30)
        );
        assert_eq!(
            config.session_config().gateway_timeout,
            Some(Duration::from_secs(10))
        );
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = ScatConfig::from_toml_str(
            r#"
            log_filter = "scat=debug"

            [session]
            gateway_timeout_secs = 0

            [catalog]
            link_table = "links.json"
            "#,
        )
        .unwrap();
        assert_eq!(config.log_filter, "scat=debug");
        assert_eq!(config.session.autosave_interval_secs, 30);
        assert_eq!(config.session_config().gateway_timeout, None);
        assert_eq!(config.catalog.link_table, Some(PathBuf::from("links.json")));
    }

    #[test]
    fn zero_autosave_interval_is_rejected() {
        let err = ScatConfig::from_toml_str("[session]\nautosave_interval_secs = 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "session.autosave_interval_secs",
                ..
            }
        ));
    }

    #[test]
    fn keys_must_be_distinct_and_non_empty() {
        let mut config = ScatConfig::new();
        config.storage.trash_key = config.storage.active_key.clone();
        assert!(config.validate().is_err());
        config.storage.trash_key = " ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_types_fail_to_parse() {
        assert!(matches!(
            ScatConfig::from_toml_str("[session]\nautosave_interval_secs = \"soon\"\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn builders_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scat.toml");
        std::fs::write(&path, "[storage]\ndata_dir = \"/var/lib/scat\"\n").unwrap();
        let loaded = ScatConfig::load(&path).unwrap();
        assert_eq!(
            loaded,
            ScatConfig::new().with_data_dir("/var/lib/scat")
        );
        assert!(matches!(
            ScatConfig::load(&dir.path().join("missing.toml")),
            Err(ConfigError::Io { .. })
        ));
    }
}
