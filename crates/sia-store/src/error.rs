//! Error types for the store layer
//!
//! These errors stay inside the crate boundary where possible: the public
//! entry points of the coordinator log them and fall back to a safe default.
//! They surface only from constructors and explicit loaders.

use std::path::PathBuf;

/// Errors from a durable storage backend
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// IO error on a storage file
    #[error("io error on {path}: {source}")]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Value could not be serialized
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Stored document is not what the bucket expects
    #[error("malformed document under '{key}': {reason}")]
    Malformed {
        /// Bucket key
        key: String,
        /// What was wrong
        reason: String,
    },
}

impl StorageError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create malformed-document error
    pub fn malformed(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Errors from a backend section data source
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Source reachable but failed
    #[error("data source unavailable: {0}")]
    Unavailable(String),

    /// Load exceeded its time budget
    #[error("load of section '{section}' timed out after {millis}ms")]
    Timeout {
        /// Section id being loaded
        section: String,
        /// Time budget in milliseconds
        millis: u64,
    },

    /// Dataset could not be parsed
    #[error("dataset parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// IO error reading a dataset file
    #[error("io error reading {path}: {source}")]
    Io {
        /// File being read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl LoadError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading the config file
    #[error("io error reading {path}: {source}")]
    Io {
        /// File being read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// TOML syntax or shape error
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Combined store error
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Durable storage failed
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Section load failed
    #[error("load error: {0}")]
    Load(#[from] LoadError),

    /// Configuration could not be loaded
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_error_display() {
        let err = StorageError::malformed("formularioDatos", "expected object");
        assert_eq!(
            err.to_string(),
            "malformed document under 'formularioDatos': expected object"
        );
    }

    #[test]
    fn load_error_display() {
        let err = LoadError::Timeout {
            section: "3.1.4.A.1".to_string(),
            millis: 3000,
        };
        assert!(err.to_string().contains("timed out after 3000ms"));
    }

    #[test]
    fn error_conversions() {
        let err: StoreError = LoadError::Unavailable("offline".to_string()).into();
        assert!(matches!(err, StoreError::Load(_)));
    }
}
