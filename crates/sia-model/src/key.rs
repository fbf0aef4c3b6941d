//! Field key resolution
//!
//! A logical field (`grupoAISD`) is stored under a concrete key that carries
//! the group suffix (`grupoAISD_A1`). [`FieldKeyResolver`] builds the ordered
//! chain of places a read may look, most specific first.

use crate::group::GroupSuffix;
use crate::section::SectionKey;
use crate::value::{is_meaningful, FieldValue};

/// Concrete storage keys
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldKey;

impl FieldKey {
    /// `base + suffix`
    #[must_use]
    pub fn compose(base: &str, group: GroupSuffix) -> String {
        let mut key = String::with_capacity(base.len() + 4);
        key.push_str(base);
        key.push_str(&group.as_storage());
        key
    }

    /// Base name of `key` when it carries `group`'s suffix
    ///
    /// Ungrouped: the key itself. Grouped: `None` unless the key ends with
    /// that exact suffix.
    #[must_use]
    pub fn strip_group(key: &str, group: GroupSuffix) -> Option<&str> {
        if !group.is_grouped() {
            return Some(key);
        }
        let suffix = group.as_storage();
        key.strip_suffix(suffix.as_str()).filter(|base| !base.is_empty())
    }
}

/// One place a field value can be read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyCandidate {
    /// Key in the flat store
    Flat(String),
    /// Field of a structured-store section entry
    Section {
        /// Section entry
        section: SectionKey,
        /// Base field name
        field: String,
    },
    /// Field of the global bucket
    Global(String),
}

/// Read access used to walk a [`LookupChain`]
pub trait FieldReader {
    /// Value stored under a flat key
    fn flat_value(&self, key: &str) -> Option<FieldValue>;

    /// Value of a field in a structured section entry
    fn section_value(&self, section: &SectionKey, field: &str) -> Option<FieldValue>;
}

/// Ordered lookup candidates for one field in one section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupChain {
    base: String,
    group: GroupSuffix,
    candidates: Vec<KeyCandidate>,
}

impl LookupChain {
    /// Base field name
    #[inline]
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Group of the section the chain was built for
    #[inline]
    #[must_use]
    pub fn group(&self) -> GroupSuffix {
        self.group
    }

    /// Candidates, most specific first
    #[inline]
    #[must_use]
    pub fn candidates(&self) -> &[KeyCandidate] {
        &self.candidates
    }

    /// Flat key writes go to (the most specific candidate)
    #[must_use]
    pub fn write_key(&self) -> String {
        FieldKey::compose(&self.base, self.group)
    }

    /// First defined, non-empty value along the chain
    pub fn resolve<R: FieldReader + ?Sized>(&self, reader: &R) -> Option<FieldValue> {
        self.candidates.iter().find_map(|candidate| {
            let value = match candidate {
                KeyCandidate::Flat(key) => reader.flat_value(key),
                KeyCandidate::Section { section, field } => reader.section_value(section, field),
                KeyCandidate::Global(field) => reader.section_value(&SectionKey::global(), field),
            };
            value.filter(is_meaningful)
        })
    }
}

/// Builds lookup chains
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldKeyResolver;

impl FieldKeyResolver {
    /// Create resolver
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Lookup chain for `base` in `section_id`
    ///
    /// Order: prefixed flat key (grouped sections only), unprefixed flat
    /// key, structured section entry, global bucket.
    #[must_use]
    pub fn lookup_chain(&self, base: &str, section_id: &str) -> LookupChain {
        self.lookup_chain_for(base, &SectionKey::from_section_str(section_id))
    }

    /// Lookup chain for `base` in an already resolved section entry
    #[must_use]
    pub fn lookup_chain_for(&self, base: &str, section: &SectionKey) -> LookupChain {
        let mut candidates = Vec::with_capacity(4);
        if section.group.is_grouped() {
            candidates.push(KeyCandidate::Flat(FieldKey::compose(base, section.group)));
        }
        candidates.push(KeyCandidate::Flat(base.to_string()));
        if !section.is_global() {
            candidates.push(KeyCandidate::Section {
                section: section.clone(),
                field: base.to_string(),
            });
        }
        candidates.push(KeyCandidate::Global(base.to_string()));

        LookupChain {
            base: base.to_string(),
            group: section.group,
            candidates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::collections::HashMap;

    #[derive(Default)]
    struct MapReader {
        flat: HashMap<String, Value>,
        sections: HashMap<(SectionKey, String), Value>,
    }

    impl FieldReader for MapReader {
        fn flat_value(&self, key: &str) -> Option<FieldValue> {
            self.flat.get(key).cloned()
        }

        fn section_value(&self, section: &SectionKey, field: &str) -> Option<FieldValue> {
            self.sections
                .get(&(section.clone(), field.to_string()))
                .cloned()
        }
    }

    #[test]
    fn chain_order_for_grouped_section() {
        let chain = FieldKeyResolver::new().lookup_chain("grupoAISD", "3.1.4.A.2.1");
        let candidates = chain.candidates();

        assert_eq!(candidates.len(), 4);
        assert_eq!(candidates[0], KeyCandidate::Flat("grupoAISD_A2".into()));
        assert_eq!(candidates[1], KeyCandidate::Flat("grupoAISD".into()));
        assert!(matches!(candidates[2], KeyCandidate::Section { .. }));
        assert_eq!(candidates[3], KeyCandidate::Global("grupoAISD".into()));
        assert_eq!(chain.write_key(), "grupoAISD_A2");
    }

    #[test]
    fn chain_for_ungrouped_section_skips_prefixed_key() {
        let chain = FieldKeyResolver::new().lookup_chain("titulo", "3.1.1");
        assert_eq!(chain.candidates()[0], KeyCandidate::Flat("titulo".into()));
        assert_eq!(chain.write_key(), "titulo");
    }

    #[test]
    fn resolve_skips_empty_values() {
        let mut reader = MapReader::default();
        reader.flat.insert("grupoAISD_A1".into(), json!(""));
        reader.flat.insert("grupoAISD".into(), json!("CC Ayroca"));

        let chain = FieldKeyResolver::new().lookup_chain("grupoAISD", "3.1.4.A.1");
        assert_eq!(chain.resolve(&reader), Some(json!("CC Ayroca")));
    }

    #[test]
    fn resolve_falls_back_to_global_bucket() {
        let mut reader = MapReader::default();
        reader
            .sections
            .insert((SectionKey::global(), "proyecto".into()), json!("Proyecto X"));

        let chain = FieldKeyResolver::new().lookup_chain("proyecto", "3.1.2");
        assert_eq!(chain.resolve(&reader), Some(json!("Proyecto X")));
    }

    #[test]
    fn strip_group_only_matches_own_suffix() {
        let a1 = "3.1.4.A.1".parse::<crate::SectionId>().unwrap().suffix();
        assert_eq!(FieldKey::strip_group("grupoAISD_A1", a1), Some("grupoAISD"));
        assert_eq!(FieldKey::strip_group("grupoAISD_A2", a1), None);
        assert_eq!(FieldKey::strip_group("_A1", a1), None);
        assert_eq!(
            FieldKey::strip_group("grupoAISD_A2", GroupSuffix::NONE),
            Some("grupoAISD_A2")
        );
    }
}
