//! Overlay of backend data onto a section
//!
//! Backend values never replace user input. A scalar is written only when
//! the group's own key is still empty; a registered table is merged only
//! when its current content is a placeholder or untouched external data.

use crate::coordinator::PersistenceCoordinator;
use crate::host::SectionHost;
use serde::Serialize;
use serde_json::Value;
use sia_model::value::{is_meaningful, FieldMap};
use sia_tables::{rows_from_value, rows_to_value, MergeOutcome};

/// What an overlay did with each loaded field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OverlayReport {
    /// Scalars written into empty fields
    pub filled: Vec<String>,
    /// Tables merged into a placeholder or external table
    pub merged_tables: Vec<String>,
    /// Fields left alone because they hold user data
    pub kept: Vec<String>,
}

impl OverlayReport {
    /// True when nothing was written
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.filled.is_empty() && self.merged_tables.is_empty()
    }
}

impl PersistenceCoordinator {
    /// Overlay loaded backend values onto `host`
    ///
    /// Keys of `loaded` are base field names. Everything written goes
    /// through [`Self::persist_field_change`] or [`Self::sync_table`].
    pub fn apply_overlay(&self, host: &mut SectionHost, loaded: FieldMap) -> OverlayReport {
        let mut report = OverlayReport::default();

        for (base, incoming) in loaded {
            let key = host.key_for(&base);

            if let Some(table) = self.config().table(&base) {
                let Some(incoming_rows) = rows_from_value(&incoming) else {
                    tracing::warn!(table = %base, "backend table is not an array, ignored");
                    report.kept.push(base);
                    continue;
                };
                let current = self
                    .current_value(host, &key)
                    .as_ref()
                    .and_then(rows_from_value)
                    .unwrap_or_default();

                match self
                    .merger
                    .merge_if_allowed(&current, &table.skeleton, Some(&incoming_rows), table)
                {
                    MergeOutcome::Merged(rows) => {
                        self.sync_table(host, &base, &rows_to_value(&rows));
                        report.merged_tables.push(base);
                    }
                    MergeOutcome::Kept => report.kept.push(base),
                }
                continue;
            }

            if self.current_value(host, &key).is_some() {
                report.kept.push(base);
                continue;
            }
            self.persist_field_change(host, &key, Some(incoming));
            report.filled.push(base);
        }

        tracing::debug!(
            section = host.section_id().unwrap_or_default(),
            filled = report.filled.len(),
            merged = report.merged_tables.len(),
            kept = report.kept.len(),
            "backend overlay applied"
        );
        report
    }

    /// Meaningful value of `key`: the host bag first, then the flat record
    ///
    /// A host that was never restored still sees what the user saved.
    fn current_value(&self, host: &SectionHost, key: &str) -> Option<Value> {
        host.datos
            .get(key)
            .filter(|value| is_meaningful(value))
            .cloned()
            .or_else(|| self.flat().get(key).filter(is_meaningful))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::storage::MemoryStorage;
    use serde_json::json;
    use sia_tables::{TableConfig, TableRow};
    use std::sync::Arc;

    fn store() -> Arc<PersistenceCoordinator> {
        let config = StoreConfig::new().with_table(
            TableConfig::new("peaOcupacionesTabla").with_skeleton(vec![
                TableRow::new()
                    .with("categoria", "Agricultura")
                    .with("casos", 0)
                    .with("porcentaje", ""),
                TableRow::new()
                    .with("categoria", "Minería")
                    .with("casos", 0)
                    .with("porcentaje", ""),
            ]),
        );
        Arc::new(PersistenceCoordinator::new(config, Arc::new(MemoryStorage::new())))
    }

    fn loaded(value: Value) -> FieldMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn scalars_fill_only_empty_fields() {
        let store = store();
        let mut host = SectionHost::new("3.1.4.A.1.2", Arc::clone(&store));
        host.persist_field_change("grupoAISD_A1", Some(json!("CC Ayroca")));

        let report = store.apply_overlay(
            &mut host,
            loaded(json!({"grupoAISD": "Otro", "distrito": "Cahuacho"})),
        );

        assert_eq!(report.filled, vec!["distrito"]);
        assert_eq!(report.kept, vec!["grupoAISD"]);
        assert_eq!(host.datos["grupoAISD_A1"], json!("CC Ayroca"));
        assert_eq!(store.flat().get("distrito_A1"), Some(json!("Cahuacho")));
    }

    #[test]
    fn empty_table_merges_into_configured_skeleton() {
        let store = store();
        let mut host = SectionHost::new("3.1.4.A.1.5", Arc::clone(&store));

        let report = store.apply_overlay(
            &mut host,
            loaded(json!({"peaOcupacionesTabla": [
                {"categoria": "agricultura", "casos": "35"},
                {"categoria": "Pesca", "casos": 3}
            ]})),
        );

        assert_eq!(report.merged_tables, vec!["peaOcupacionesTabla"]);
        let expected = json!([
            {"categoria": "Agricultura", "casos": 35, "porcentaje": ""},
            {"categoria": "Minería", "casos": 0, "porcentaje": ""}
        ]);
        assert_eq!(host.datos["peaOcupacionesTabla_A1"], expected);
        assert_eq!(host.datos["peaOcupacionesTabla"], expected);
        assert_eq!(store.flat().get("peaOcupacionesTabla_A1"), Some(expected));
    }

    #[test]
    fn edited_table_is_kept() {
        let store = store();
        let mut host = SectionHost::new("3.1.4.A.1.5", Arc::clone(&store));
        let edited = json!([
            {"categoria": "Agricultura", "casos": 12, "porcentaje": "100,00 %"}
        ]);
        host.sync_table("peaOcupacionesTabla", &edited);

        let report = store.apply_overlay(
            &mut host,
            loaded(json!({"peaOcupacionesTabla": [{"categoria": "Agricultura", "casos": 99}]})),
        );

        assert!(report.is_noop());
        assert_eq!(host.datos["peaOcupacionesTabla_A1"], edited);
    }

    #[test]
    fn saved_table_is_kept_for_unrestored_host() {
        let store = store();
        let edited = json!([
            {"categoria": "Agricultura", "casos": 12, "porcentaje": "60,00 %"},
            {"categoria": "Minería", "casos": 8, "porcentaje": "40,00 %"}
        ]);
        SectionHost::new("3.1.4.A.1.5", Arc::clone(&store)).sync_table("peaOcupacionesTabla", &edited);

        let mut fresh = SectionHost::new("3.1.4.A.1.5", Arc::clone(&store));
        let report = store.apply_overlay(
            &mut fresh,
            loaded(json!({
                "peaOcupacionesTabla": [{"categoria": "Agricultura", "casos": 35}],
                "distrito": "Cahuacho"
            })),
        );

        assert_eq!(report.kept, vec!["peaOcupacionesTabla"]);
        assert!(report.merged_tables.is_empty());
        assert_eq!(store.flat().get("peaOcupacionesTabla_A1"), Some(edited));
        assert!(!fresh.datos.contains_key("peaOcupacionesTabla_A1"));
    }
}
