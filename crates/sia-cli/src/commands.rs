//! Subcommand implementations
//!
//! Each command works on a coordinator opened from the configured storage
//! directory and returns a JSON-serializable result; printing is left to
//! `main`.

use anyhow::{Context, Result};
use serde_json::Value;
use sia_model::value::FieldMap;
use sia_model::GroupSuffix;
use sia_store::{
    MockDataSource, OverlayReport, PersistenceCoordinator, SectionHost, SectionLoader, StoreConfig,
};
use sia_tables::{recompute_percentages, rows_from_value, rows_to_value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Storage directory used when neither the config nor the command line names one
pub const DEFAULT_STORE_DIR: &str = ".sia";

/// Label of keys without a group suffix in [`sections`]
pub const UNGROUPED: &str = "ungrouped";

/// Open the coordinator described by `config_path` and `store_dir`
///
/// `store_dir` overrides the config's directory.
///
/// # Errors
/// Returns error if the config cannot be read or the directory created
pub fn open_store(
    config_path: Option<&Path>,
    store_dir: Option<&Path>,
) -> Result<Arc<PersistenceCoordinator>> {
    let mut config = match config_path {
        Some(path) => StoreConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => StoreConfig::default(),
    };
    if let Some(dir) = store_dir {
        config = config.with_storage_dir(dir);
    }
    if config.storage_dir.is_none() {
        config = config.with_storage_dir(PathBuf::from(DEFAULT_STORE_DIR));
    }

    let store = PersistenceCoordinator::open(config).context("failed to open store")?;
    Ok(Arc::new(store))
}

/// Parse a command-line value: JSON when it parses, a plain string otherwise
#[must_use]
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Value of a field as a section sees it (`null` when unset)
#[must_use]
pub fn get(store: &PersistenceCoordinator, section: &str, field: &str) -> Value {
    store.read(section, field).unwrap_or(Value::Null)
}

/// Set a field from a section; returns the concrete key written
pub fn set(store: &Arc<PersistenceCoordinator>, section: &str, field: &str, raw: &str) -> String {
    let mut host = SectionHost::new(section, Arc::clone(store));
    host.restore_persisted_state();
    let key = host.key_for(field);
    host.persist_field_change(&key, Some(parse_value(raw)));
    store.session().set_last_section(section);
    key
}

/// Field bag of a section, or its structured entry when `structured`
#[must_use]
pub fn show(store: &Arc<PersistenceCoordinator>, section: &str, structured: bool) -> FieldMap {
    let mut host = SectionHost::new(section, Arc::clone(store));
    host.restore_persisted_state();
    if structured {
        store.get_section_fields(section, None)
    } else {
        host.datos
    }
}

/// Overlay a JSON dataset onto a section
///
/// With `recompute`, percentages of every merged table are filled in again.
///
/// # Errors
/// Returns error if the dataset cannot be read or the load fails
pub async fn merge(
    store: &Arc<PersistenceCoordinator>,
    section: &str,
    dataset: &Path,
    fields: &[String],
    recompute: bool,
) -> Result<OverlayReport> {
    let source = MockDataSource::from_file(dataset)
        .with_context(|| format!("failed to load dataset {}", dataset.display()))?;
    let loader = SectionLoader::new(Arc::new(source), store.config().load_timeout());

    let mut host = SectionHost::new(section, Arc::clone(store));
    host.restore_persisted_state();
    let report = host
        .load_from(&loader, fields)
        .await
        .with_context(|| format!("no data loaded for section {section}"))?;

    if recompute {
        for table_key in &report.merged_tables {
            let Some(table) = store.config().table(table_key) else {
                continue;
            };
            let key = host.key_for(table_key);
            let Some(mut rows) = host.datos.get(&key).and_then(rows_from_value) else {
                continue;
            };
            recompute_percentages(&mut rows, table);
            host.sync_table(table_key, &rows_to_value(&rows));
        }
    }
    Ok(report)
}

/// Base field names stored per group suffix
#[must_use]
pub fn sections(store: &PersistenceCoordinator) -> BTreeMap<String, Vec<String>> {
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for key in store.flat().get_all().keys() {
        let (base, suffix) = GroupSuffix::split_key(key);
        let label = if suffix.is_grouped() {
            suffix.to_string()
        } else {
            UNGROUPED.to_string()
        };
        groups.entry(label).or_default().push(base.to_string());
    }
    for fields in groups.values_mut() {
        fields.sort_unstable();
        fields.dedup();
    }
    groups
}

/// Forget every answer
pub fn clear(store: &PersistenceCoordinator) {
    store.clear_all();
}

/// Finished flat record
#[must_use]
pub fn export(store: &PersistenceCoordinator) -> FieldMap {
    store.export_snapshot()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn values_parse_as_json_or_text() {
        assert_eq!(parse_value("35"), json!(35));
        assert_eq!(parse_value("[1,2]"), json!([1, 2]));
        assert_eq!(parse_value("CC Ayroca"), json!("CC Ayroca"));
        assert_eq!(parse_value("\"35\""), json!("35"));
    }
}
