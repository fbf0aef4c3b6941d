//! Store configuration

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use sia_model::value::FieldMap;
use sia_tables::TableConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Names of the durable storage buckets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketKeys {
    /// Flat field record
    pub flat_record: String,
    /// Sidebar expansion list
    pub expanded: String,
    /// Last section visited
    pub last_section: String,
    /// Manual-clear flag
    pub manual_clear: String,
}

impl Default for BucketKeys {
    fn default() -> Self {
        Self {
            flat_record: "formularioDatos".to_string(),
            expanded: "sidebarExpandido".to_string(),
            last_section: "ultimaSeccion".to_string(),
            manual_clear: "limpiezaManual".to_string(),
        }
    }
}

/// Configuration of a [`PersistenceCoordinator`](crate::PersistenceCoordinator)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory of the file backend; `None` keeps everything in memory
    pub storage_dir: Option<PathBuf>,
    /// Bucket key names
    pub buckets: BucketKeys,
    /// Quiet period of debounced writes in milliseconds
    pub debounce_ms: u64,
    /// Time budget of a backend section load in milliseconds
    pub load_timeout_ms: u64,
    /// Registered tables
    pub tables: Vec<TableConfig>,
    /// Session defaults of the global bucket
    pub global_defaults: FieldMap,
}

impl StoreConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document
    ///
    /// # Errors
    /// Returns error if the document is not valid TOML or has the wrong shape
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// With file storage directory
    #[inline]
    #[must_use]
    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = Some(dir.into());
        self
    }

    /// With debounce period
    #[inline]
    #[must_use]
    pub fn with_debounce_ms(mut self, millis: u64) -> Self {
        self.debounce_ms = millis;
        self
    }

    /// With load timeout
    #[inline]
    #[must_use]
    pub fn with_load_timeout_ms(mut self, millis: u64) -> Self {
        self.load_timeout_ms = millis;
        self
    }

    /// With an additional registered table
    #[must_use]
    pub fn with_table(mut self, table: TableConfig) -> Self {
        self.tables.retain(|existing| existing.key != table.key);
        self.tables.push(table);
        self
    }

    /// With a global-bucket default
    #[must_use]
    pub fn with_global_default(
        mut self,
        field: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.global_defaults.insert(field.into(), value.into());
        self
    }

    /// Debounce period
    #[inline]
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Load timeout
    #[inline]
    #[must_use]
    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    /// Registered table stored under `key`
    #[must_use]
    pub fn table(&self, key: &str) -> Option<&TableConfig> {
        self.tables.iter().find(|table| table.key == key)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_dir: None,
            buckets: BucketKeys::default(),
            debounce_ms: 300,
            load_timeout_ms: 3000,
            tables: Vec::new(),
            global_defaults: FieldMap::new(),
        }
    }
}
