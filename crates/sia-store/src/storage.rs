//! Durable key/value storage
//!
//! A [`StorageBackend`] holds one serialized JSON document per bucket key,
//! the way browser local storage does. Two backends ship with the crate:
//! [`MemoryStorage`] for tests and ephemeral sessions, and [`FileStorage`]
//! which keeps one file per key in a directory.

use crate::error::StorageError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt::Debug;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Durable string storage keyed by bucket name
pub trait StorageBackend: Debug + Send + Sync {
    /// Stored document, `None` when the key was never written
    ///
    /// # Errors
    /// Returns error if the backend cannot be read
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the document under `key`
    ///
    /// # Errors
    /// Returns error if the write did not reach durable storage
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete the document under `key` (missing keys are fine)
    ///
    /// # Errors
    /// Returns error if the backend cannot be modified
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// In-process storage
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create empty storage
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// True when nothing is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

impl StorageBackend for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.items.lock().remove(key);
        Ok(())
    }
}

/// Directory-backed storage: `<dir>/<key>.json`
///
/// Writes go through a temporary file in the same directory and are
/// renamed into place, so a crash never leaves a half-written document.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Open (and create if needed) a storage directory
    ///
    /// # Errors
    /// Returns error if the directory cannot be created
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| StorageError::io_error(&dir, e))?;
        Ok(Self { dir })
    }

    /// Storage directory
    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding the document of `key`
    ///
    /// ASCII letters, digits, `-` and `_` are kept; every other byte is
    /// written as `%XX`, so distinct keys never share a file.
    #[must_use]
    pub fn path_for(&self, key: &str) -> PathBuf {
        let mut name = String::with_capacity(key.len());
        for byte in key.bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
                name.push(char::from(byte));
            } else {
                name.push_str(&format!("%{byte:02X}"));
            }
        }
        self.dir.join(format!("{name}.json"))
    }
}

impl StorageBackend for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io_error(path, e)),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)
            .map_err(|e| StorageError::io_error(&self.dir, e))?;
        tmp.write_all(value.as_bytes())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| StorageError::io_error(tmp.path(), e))?;
        tmp.persist(&path)
            .map_err(|e| StorageError::io_error(&path, e.error))?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io_error(path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_roundtrip() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get_item("k").unwrap(), None);

        storage.set_item("k", "{}").unwrap();
        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("{}"));
        assert_eq!(storage.len(), 1);

        storage.remove_item("k").unwrap();
        assert!(storage.is_empty());
    }

    #[test]
    fn file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path().join("store")).unwrap();

        assert_eq!(storage.get_item("formularioDatos").unwrap(), None);
        storage.set_item("formularioDatos", r#"{"a":1}"#).unwrap();
        assert_eq!(
            storage.get_item("formularioDatos").unwrap().as_deref(),
            Some(r#"{"a":1}"#)
        );

        storage.remove_item("formularioDatos").unwrap();
        storage.remove_item("formularioDatos").unwrap();
        assert_eq!(storage.get_item("formularioDatos").unwrap(), None);
    }

    #[test]
    fn file_names_are_sanitized() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();
        let path = storage.path_for("../etc/passwd");
        assert_eq!(path.parent(), Some(dir.path()));
        assert!(path.ends_with("%2E%2E%2Fetc%2Fpasswd.json"));
    }

    #[test]
    fn distinct_keys_get_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();
        assert_ne!(storage.path_for("a.b"), storage.path_for("a_b"));
        assert_ne!(storage.path_for("a%2Eb"), storage.path_for("a.b"));
        assert!(storage.path_for("formularioDatos").ends_with("formularioDatos.json"));

        storage.set_item("a.b", "1").unwrap();
        storage.set_item("a_b", "2").unwrap();
        assert_eq!(storage.get_item("a.b").unwrap().as_deref(), Some("1"));
        assert_eq!(storage.get_item("a_b").unwrap().as_deref(), Some("2"));
    }
}
