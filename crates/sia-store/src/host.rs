//! View-side state holder
//!
//! A [`SectionHost`] is what a questionnaire page owns: its section id, the
//! field bag it renders from, and an optional handle to the shared
//! coordinator. Without a handle every persistence call is a no-op, which
//! keeps detached views (previews, tests) usable.

use crate::coordinator::PersistenceCoordinator;
use crate::loader::SectionLoader;
use crate::overlay::OverlayReport;
use serde_json::Value;
use sia_model::value::FieldMap;
use sia_model::{FieldKey, GroupSuffix, SectionKey};
use std::sync::Arc;

/// Field bag of one section view plus its store handle
#[derive(Debug, Clone)]
pub struct SectionHost {
    section_id: Option<String>,
    key: SectionKey,
    /// Fields the view renders from
    pub datos: FieldMap,
    pub(crate) previous: FieldMap,
    store: Option<Arc<PersistenceCoordinator>>,
}

impl SectionHost {
    /// Host of `section_id` backed by `store`
    #[must_use]
    pub fn new(section_id: impl Into<String>, store: Arc<PersistenceCoordinator>) -> Self {
        Self::build(Some(section_id.into()), Some(store))
    }

    /// Host without a section id; writes go to the global bucket
    #[must_use]
    pub fn global(store: Arc<PersistenceCoordinator>) -> Self {
        Self::build(None, Some(store))
    }

    /// Host with no store handle
    #[must_use]
    pub fn detached(section_id: impl Into<String>) -> Self {
        Self::build(Some(section_id.into()), None)
    }

    fn build(section_id: Option<String>, store: Option<Arc<PersistenceCoordinator>>) -> Self {
        let key = section_id
            .as_deref()
            .map_or_else(SectionKey::global, SectionKey::from_section_str);
        Self {
            section_id,
            key,
            datos: FieldMap::new(),
            previous: FieldMap::new(),
            store,
        }
    }

    /// Section id, `None` for a global host
    #[inline]
    #[must_use]
    pub fn section_id(&self) -> Option<&str> {
        self.section_id.as_deref()
    }

    /// Structured entry the host reads and writes
    #[inline]
    #[must_use]
    pub fn section_key(&self) -> &SectionKey {
        &self.key
    }

    /// Group of the section
    #[inline]
    #[must_use]
    pub fn group(&self) -> GroupSuffix {
        self.key.group
    }

    /// Store handle
    #[inline]
    #[must_use]
    pub fn store(&self) -> Option<&Arc<PersistenceCoordinator>> {
        self.store.as_ref()
    }

    /// Last synced table values, keyed by their prefixed key
    #[inline]
    #[must_use]
    pub fn previous(&self) -> &FieldMap {
        &self.previous
    }

    /// Flat key this host writes `base` to
    #[must_use]
    pub fn key_for(&self, base: &str) -> String {
        FieldKey::compose(base, self.group())
    }

    /// Value of a logical field as the view should show it
    ///
    /// With a store: the lookup chain. Without: the bag's group key, then
    /// the bare key.
    #[must_use]
    pub fn read(&self, base: &str) -> Option<Value> {
        if let Some(store) = &self.store {
            return store.read(self.section_id.as_deref().unwrap_or_default(), base);
        }
        self.datos
            .get(&self.key_for(base))
            .or_else(|| self.datos.get(base))
            .cloned()
    }

    /// Persist a change made in this view; returns whether the value changed
    pub fn persist_field_change(&mut self, field_id: &str, value: Option<Value>) -> bool {
        match self.store.clone() {
            Some(store) => store.persist_field_change(self, field_id, value),
            None => false,
        }
    }

    /// Fill the bag from persisted state
    pub fn restore_persisted_state(&mut self) {
        if let Some(store) = self.store.clone() {
            store.restore_persisted_section_state(self);
        }
    }

    /// Write a table under its group key and bare key; returns the keys written
    pub fn sync_table(&mut self, key_base: &str, table: &Value) -> Vec<String> {
        match self.store.clone() {
            Some(store) => store.sync_table(self, key_base, table),
            None => Vec::new(),
        }
    }

    /// Load backend data for this section and overlay it on the bag
    pub async fn load_from(
        &mut self,
        loader: &SectionLoader,
        fields: &[String],
    ) -> Option<OverlayReport> {
        let store = self.store.clone()?;
        store.load_section(self, loader, fields).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn detached_host_is_inert() {
        let mut host = SectionHost::detached("3.1.4.A.1.2");
        assert!(!host.persist_field_change("grupoAISD_A1", Some(json!("x"))));
        host.restore_persisted_state();
        assert!(host.sync_table("tabla", &json!([])).is_empty());
        assert!(host.datos.is_empty());
        assert_eq!(host.key_for("grupoAISD"), "grupoAISD_A1");
    }

    #[test]
    fn detached_read_prefers_group_key() {
        let mut host = SectionHost::detached("3.1.4.B.2.1");
        host.datos.insert("centroPoblado".into(), json!("bare"));
        assert_eq!(host.read("centroPoblado"), Some(json!("bare")));

        host.datos.insert("centroPoblado_B2".into(), json!("grouped"));
        assert_eq!(host.read("centroPoblado"), Some(json!("grouped")));
    }

    #[test]
    fn global_host_uses_global_bucket() {
        let store = Arc::new(PersistenceCoordinator::in_memory());
        let host = SectionHost::global(store);
        assert!(host.section_key().is_global());
        assert_eq!(host.section_id(), None);
        assert!(!host.group().is_grouped());
    }
}
