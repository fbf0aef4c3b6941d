//! Session buckets
//!
//! Navigation state kept next to the field record: which sidebar sections
//! are expanded, the last section visited, and whether the user cleared the
//! form by hand. Each lives in its own JSON document.

use crate::config::BucketKeys;
use crate::storage::StorageBackend;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Navigation buckets of one questionnaire session
#[derive(Debug)]
pub struct SessionBuckets {
    backend: Arc<dyn StorageBackend>,
    keys: BucketKeys,
}

impl SessionBuckets {
    /// Buckets stored in `backend` under `keys`
    #[must_use]
    pub fn new(backend: Arc<dyn StorageBackend>, keys: BucketKeys) -> Self {
        Self { backend, keys }
    }

    /// Expanded sidebar sections
    #[must_use]
    pub fn expanded_sections(&self) -> Vec<String> {
        self.read(&self.keys.expanded).unwrap_or_default()
    }

    /// Replace the expanded sidebar sections
    pub fn set_expanded_sections(&self, sections: &[String]) {
        self.write(&self.keys.expanded, &sections);
    }

    /// Flip one sidebar section; returns whether it is now expanded
    pub fn toggle_expanded(&self, section: &str) -> bool {
        let mut sections = self.expanded_sections();
        let expanded = if let Some(pos) = sections.iter().position(|s| s == section) {
            sections.remove(pos);
            false
        } else {
            sections.push(section.to_string());
            true
        };
        self.set_expanded_sections(&sections);
        expanded
    }

    /// Last section visited
    #[must_use]
    pub fn last_section(&self) -> Option<String> {
        self.read(&self.keys.last_section)
    }

    /// Remember the last section visited
    pub fn set_last_section(&self, section: &str) {
        self.write(&self.keys.last_section, &section);
    }

    /// True when the form was cleared by hand
    #[must_use]
    pub fn manual_clear(&self) -> bool {
        self.read(&self.keys.manual_clear).unwrap_or(false)
    }

    /// Set or reset the manual-clear flag
    pub fn set_manual_clear(&self, cleared: bool) {
        self.write(&self.keys.manual_clear, &cleared);
    }

    /// Forget expansion and last section
    pub fn reset(&self) {
        for key in [&self.keys.expanded, &self.keys.last_section] {
            if let Err(e) = self.backend.remove_item(key) {
                tracing::warn!(bucket = %key, error = %e, "failed to reset session bucket");
            }
        }
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.backend.get_item(key) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(bucket = %key, error = %e, "session bucket unreadable");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(bucket = %key, error = %e, "session bucket corrupt, ignoring");
                None
            }
        }
    }

    fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let result = serde_json::to_string(value)
            .map_err(crate::error::StorageError::from)
            .and_then(|json| self.backend.set_item(key, &json));
        if let Err(e) = result {
            tracing::warn!(bucket = %key, error = %e, "failed to persist session bucket");
        }
    }
}
