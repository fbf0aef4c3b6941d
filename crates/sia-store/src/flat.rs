//! The flat field record
//!
//! One JSON object mapping concrete field keys to values. It is the store
//! that survives a restart: every [`FlatFieldStore::set_many`] rewrites the
//! whole record to durable storage before returning.

use crate::error::StorageError;
use crate::storage::StorageBackend;
use parking_lot::RwLock;
use serde_json::Value;
use sia_model::value::FieldMap;
use std::sync::Arc;

/// Snapshot of the flat record
pub type FlatRecord = FieldMap;

/// Persisted flat key/value record
#[derive(Debug)]
pub struct FlatFieldStore {
    backend: Arc<dyn StorageBackend>,
    bucket: String,
    record: RwLock<FlatRecord>,
}

impl FlatFieldStore {
    /// Load the record stored under `bucket`
    ///
    /// A missing, unreadable or corrupt record yields an empty store; the
    /// problem is logged, never returned.
    #[must_use]
    pub fn load(backend: Arc<dyn StorageBackend>, bucket: impl Into<String>) -> Self {
        let bucket = bucket.into();
        let record = match read_record(backend.as_ref(), &bucket) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(bucket = %bucket, error = %e, "persisted record unusable, starting empty");
                FlatRecord::new()
            }
        };
        tracing::debug!(bucket = %bucket, fields = record.len(), "flat record loaded");

        Self {
            backend,
            bucket,
            record: RwLock::new(record),
        }
    }

    /// Bucket key of the record
    #[inline]
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Value under a concrete key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.record.read().get(key).cloned()
    }

    /// True when `key` is present
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.record.read().contains_key(key)
    }

    /// Shallow-merge `patch` into the record and persist it
    ///
    /// Returns the keys whose value actually changed. A failed persist is
    /// logged; the in-memory record keeps the new values.
    pub fn set_many(&self, patch: FieldMap) -> Vec<String> {
        if patch.is_empty() {
            return Vec::new();
        }

        let (changed, serialized) = {
            let mut record = self.record.write();
            let mut changed = Vec::new();
            for (key, value) in patch {
                if record.get(&key) != Some(&value) {
                    changed.push(key.clone());
                }
                record.insert(key, value);
            }
            (changed, serde_json::to_string(&*record))
        };

        match serialized {
            Ok(json) => {
                if let Err(e) = self.backend.set_item(&self.bucket, &json) {
                    tracing::warn!(bucket = %self.bucket, error = %e, "failed to persist flat record");
                }
            }
            Err(e) => {
                tracing::warn!(bucket = %self.bucket, error = %e, "failed to serialize flat record");
            }
        }
        changed
    }

    /// Copy of the whole record
    #[must_use]
    pub fn get_all(&self) -> FlatRecord {
        self.record.read().clone()
    }

    /// Number of stored keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.record.read().len()
    }

    /// True when the record is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.record.read().is_empty()
    }

    /// Drop every field and the persisted record
    pub fn clear(&self) {
        self.record.write().clear();
        if let Err(e) = self.backend.remove_item(&self.bucket) {
            tracing::warn!(bucket = %self.bucket, error = %e, "failed to remove flat record");
        }
    }

    /// Replace the in-memory record with what durable storage holds
    pub fn reload(&self) {
        let record = read_record(self.backend.as_ref(), &self.bucket).unwrap_or_else(|e| {
            tracing::warn!(bucket = %self.bucket, error = %e, "persisted record unusable on reload");
            FlatRecord::new()
        });
        *self.record.write() = record;
    }
}

fn read_record(backend: &dyn StorageBackend, bucket: &str) -> Result<FlatRecord, StorageError> {
    let Some(raw) = backend.get_item(bucket)? else {
        return Ok(FlatRecord::new());
    };
    if raw.trim().is_empty() {
        return Ok(FlatRecord::new());
    }
    match serde_json::from_str::<Value>(&raw)? {
        Value::Object(record) => Ok(record),
        other => Err(StorageError::malformed(
            bucket,
            format!("expected object, found {}", json_kind(&other)),
        )),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
