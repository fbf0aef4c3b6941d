//! Dual-key table writes
//!
//! A grouped table is written to its prefixed key and, for views that still
//! read the bare key, to the unprefixed key as well. The bare key therefore
//! always holds whichever group was written last.

use serde_json::Value;
use sia_model::value::FieldMap;
use sia_model::{FieldKey, GroupSuffix};

/// Writes table values under their group key and the legacy bare key
#[derive(Debug, Clone, Copy, Default)]
pub struct TableSyncEngine;

impl TableSyncEngine {
    /// Create sync engine
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Write `table` into `datos` under `key_base + group` (and `key_base`)
    ///
    /// Does nothing unless `table` is a JSON array. Every stored value is an
    /// independent copy; `on_change` is called once per written key, prefixed
    /// key first. When `previous` is given it receives another copy under
    /// the prefixed key for later change detection.
    ///
    /// Returns the keys written.
    pub fn sync_dual<F>(
        &self,
        datos: &mut FieldMap,
        key_base: &str,
        group: GroupSuffix,
        table: Option<&Value>,
        mut on_change: F,
        previous: Option<&mut FieldMap>,
    ) -> Vec<String>
    where
        F: FnMut(&str, &Value),
    {
        let Some(rows @ Value::Array(_)) = table else {
            tracing::debug!(key = key_base, "table sync skipped: value is not an array");
            return Vec::new();
        };

        let mut written = Vec::with_capacity(2);

        let key = FieldKey::compose(key_base, group);
        let copy = rows.clone();
        on_change(&key, &copy);
        datos.insert(key.clone(), copy);
        written.push(key.clone());

        if group.is_grouped() {
            let bare = rows.clone();
            on_change(key_base, &bare);
            datos.insert(key_base.to_string(), bare);
            written.push(key_base.to_string());
        }

        if let Some(snapshot) = previous {
            snapshot.insert(key, rows.clone());
        }

        tracing::debug!(key = key_base, group = %group, keys = written.len(), "table synced");
        written
    }
}
