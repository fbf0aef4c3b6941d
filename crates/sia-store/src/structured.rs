//! In-memory section/group cache
//!
//! Fields are grouped by [`SectionKey`] (section root plus group), so two
//! groups of the same page never share an entry. The cache is derived from
//! the flat record and may be dropped and rebuilt at any time; writes are
//! crate-private so that every structured write has a matching flat write.

use parking_lot::RwLock;
use serde_json::Value;
use sia_model::value::FieldMap;
use sia_model::{GroupSuffix, SectionKey};
use std::collections::BTreeMap;

/// Section/group keyed field cache
#[derive(Debug, Default)]
pub struct StructuredSectionStore {
    sections: RwLock<BTreeMap<SectionKey, FieldMap>>,
}

impl StructuredSectionStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry key for a section id, optionally forcing the group
    #[must_use]
    pub fn key_for(section_id: &str, group_override: Option<GroupSuffix>) -> SectionKey {
        let key = SectionKey::from_section_str(section_id);
        match group_override {
            Some(group) if !key.is_global() => key.with_group(group),
            _ => key,
        }
    }

    /// Copy of every field stored for a section
    ///
    /// `group_override` replaces the group derived from the section id.
    #[must_use]
    pub fn get_section_fields(
        &self,
        section_id: &str,
        group_override: Option<GroupSuffix>,
    ) -> FieldMap {
        self.section(&Self::key_for(section_id, group_override))
    }

    /// Copy of an entry's fields (empty when the entry does not exist)
    #[must_use]
    pub fn section(&self, key: &SectionKey) -> FieldMap {
        self.sections.read().get(key).cloned().unwrap_or_default()
    }

    /// One field of an entry
    #[must_use]
    pub fn field(&self, key: &SectionKey, field: &str) -> Option<Value> {
        self.sections
            .read()
            .get(key)
            .and_then(|fields| fields.get(field).cloned())
    }

    /// Keys of every non-empty entry, ordered
    #[must_use]
    pub fn sections(&self) -> Vec<SectionKey> {
        self.sections
            .read()
            .iter()
            .filter(|(_, fields)| !fields.is_empty())
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// True when no entry holds a field
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.read().values().all(FieldMap::is_empty)
    }

    pub(crate) fn set_field(&self, key: &SectionKey, field: &str, value: Value) {
        self.sections
            .write()
            .entry(key.clone())
            .or_default()
            .insert(field.to_string(), value);
    }

    /// Insert all of `fields`, overwriting; returns how many were written
    pub(crate) fn merge_fields(&self, key: &SectionKey, fields: FieldMap) -> usize {
        if fields.is_empty() {
            return 0;
        }
        let written = fields.len();
        let mut sections = self.sections.write();
        let entry = sections.entry(key.clone()).or_default();
        for (field, value) in fields {
            entry.insert(field, value);
        }
        written
    }

    pub(crate) fn replace_section(&self, key: &SectionKey, fields: FieldMap) {
        self.sections.write().insert(key.clone(), fields);
    }

    pub(crate) fn clear(&self) {
        self.sections.write().clear();
    }
}
