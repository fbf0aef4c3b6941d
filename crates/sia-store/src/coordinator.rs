//! Keeps the flat record and the structured cache in step
//!
//! Every write enters through [`PersistenceCoordinator`]. The structured
//! entry of the writing section is updated first, then the flat record
//! (which is persisted before the call returns), then the host bag; a
//! change notification follows only when the value actually changed.
//!
//! Reads walk the [`LookupChain`](sia_model::LookupChain) of the field:
//! group key, bare key, structured entry, global bucket.

use crate::config::StoreConfig;
use crate::debounce::Debouncer;
use crate::error::StoreResult;
use crate::flat::{FlatFieldStore, FlatRecord};
use crate::host::SectionHost;
use crate::loader::SectionLoader;
use crate::notify::{ChangeBus, FieldChange};
use crate::overlay::OverlayReport;
use crate::session::SessionBuckets;
use crate::storage::{FileStorage, MemoryStorage, StorageBackend};
use crate::structured::StructuredSectionStore;
use serde_json::Value;
use sia_model::value::{is_restorable, normalize_incoming, FieldMap, FieldValue};
use sia_model::{FieldKey, FieldKeyResolver, FieldReader, GroupSuffix, SectionKey};
use sia_tables::{ActiveRowsRegistry, TableMergeService, TableRow, TableSyncEngine};
use std::sync::Arc;

/// Single entry point for reads and writes of questionnaire fields
#[derive(Debug)]
pub struct PersistenceCoordinator {
    config: StoreConfig,
    flat: FlatFieldStore,
    structured: StructuredSectionStore,
    session: SessionBuckets,
    changes: ChangeBus,
    debouncer: Debouncer,
    active_rows: ActiveRowsRegistry,
    resolver: FieldKeyResolver,
    tables: TableSyncEngine,
    pub(crate) merger: TableMergeService,
}

impl PersistenceCoordinator {
    /// Coordinator over an explicit storage backend
    #[must_use]
    pub fn new(config: StoreConfig, backend: Arc<dyn StorageBackend>) -> Self {
        let flat = FlatFieldStore::load(Arc::clone(&backend), config.buckets.flat_record.clone());
        let session = SessionBuckets::new(backend, config.buckets.clone());
        let coordinator = Self {
            debouncer: Debouncer::new(config.debounce()),
            flat,
            structured: StructuredSectionStore::new(),
            session,
            changes: ChangeBus::new(),
            active_rows: ActiveRowsRegistry::new(),
            resolver: FieldKeyResolver::new(),
            tables: TableSyncEngine::new(),
            merger: TableMergeService::new(),
            config,
        };
        coordinator.load_global_defaults();
        coordinator
    }

    /// Coordinator over the backend named by `config`
    ///
    /// File storage when `storage_dir` is set, memory otherwise.
    ///
    /// # Errors
    /// Returns error if the storage directory cannot be created
    pub fn open(config: StoreConfig) -> StoreResult<Self> {
        let backend: Arc<dyn StorageBackend> = match &config.storage_dir {
            Some(dir) => Arc::new(FileStorage::open(dir)?),
            None => Arc::new(MemoryStorage::new()),
        };
        Ok(Self::new(config, backend))
    }

    /// Coordinator with default configuration and memory storage
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(StoreConfig::default(), Arc::new(MemoryStorage::new()))
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Flat record store
    #[inline]
    #[must_use]
    pub fn flat(&self) -> &FlatFieldStore {
        &self.flat
    }

    /// Structured cache
    #[inline]
    #[must_use]
    pub fn structured(&self) -> &StructuredSectionStore {
        &self.structured
    }

    /// Navigation buckets
    #[inline]
    #[must_use]
    pub fn session(&self) -> &SessionBuckets {
        &self.session
    }

    /// Change notifications
    #[inline]
    #[must_use]
    pub fn changes(&self) -> &ChangeBus {
        &self.changes
    }

    /// Active-row selections
    #[inline]
    #[must_use]
    pub fn active_rows(&self) -> &ActiveRowsRegistry {
        &self.active_rows
    }

    /// Debouncer of deferred writes
    #[inline]
    #[must_use]
    pub fn debouncer(&self) -> &Debouncer {
        &self.debouncer
    }

    /// Persist a change made in `host`'s view
    ///
    /// `field_id` is the concrete key (`grupoAISD_A1`). A missing value or
    /// the literal `"undefined"` is stored as `""`. Returns whether the
    /// host's value changed.
    pub fn persist_field_change(
        &self,
        host: &mut SectionHost,
        field_id: &str,
        value: Option<Value>,
    ) -> bool {
        let value = normalize_incoming(value);
        self.apply(host.section_key(), field_id, &value);

        let changed = host.datos.get(field_id) != Some(&value);
        host.datos.insert(field_id.to_string(), value.clone());
        if changed {
            self.changes.emit(FieldChange {
                key: field_id.to_string(),
                value,
                section: host.section_id().map(str::to_string),
            });
        }
        changed
    }

    /// Write a logical field of a section without a view
    ///
    /// Returns the concrete key written.
    pub fn write(&self, section_id: &str, base: &str, value: Option<Value>) -> String {
        let key = self.resolver.lookup_chain(base, section_id).write_key();
        self.write_field(section_id, &key, value);
        key
    }

    /// Write a concrete key of a section without a view
    ///
    /// Returns whether the flat record changed.
    pub fn write_field(&self, section_id: &str, field_id: &str, value: Option<Value>) -> bool {
        let value = normalize_incoming(value);
        let section = SectionKey::from_section_str(section_id);
        let changed = !self.apply(&section, field_id, &value).is_empty();
        if changed {
            self.changes.emit(FieldChange {
                key: field_id.to_string(),
                value,
                section: (!section.is_global()).then(|| section_id.trim().to_string()),
            });
        }
        changed
    }

    /// Persist a write after the debounce quiet period (last value wins)
    ///
    /// Outside a tokio runtime the write happens immediately.
    pub fn persist_debounced(
        self: &Arc<Self>,
        section_id: &str,
        field_id: &str,
        value: Option<Value>,
    ) {
        let coordinator = Arc::downgrade(self);
        let section_id = section_id.to_string();
        let field_id = field_id.to_string();
        self.debouncer.schedule(field_id.clone(), move || {
            if let Some(coordinator) = coordinator.upgrade() {
                coordinator.write_field(&section_id, &field_id, value);
            }
        });
    }

    /// Value of a logical field as seen from a section
    #[must_use]
    pub fn read(&self, section_id: &str, base: &str) -> Option<Value> {
        self.resolver.lookup_chain(base, section_id).resolve(self)
    }

    /// Write one structured field and its flat counterpart
    ///
    /// `group_override` replaces the group derived from the section id.
    pub fn set_section_field(
        &self,
        section_id: &str,
        group_override: Option<GroupSuffix>,
        field: &str,
        value: Option<Value>,
    ) -> bool {
        let value = normalize_incoming(value);
        let section = StructuredSectionStore::key_for(section_id, group_override);
        let flat_key = FieldKey::compose(field, section.group);
        let changed = !self.apply(&section, &flat_key, &value).is_empty();
        if changed {
            self.changes.emit(FieldChange {
                key: flat_key,
                value,
                section: Some(section_id.trim().to_string()),
            });
        }
        changed
    }

    /// Structured fields of a section
    #[must_use]
    pub fn get_section_fields(
        &self,
        section_id: &str,
        group_override: Option<GroupSuffix>,
    ) -> FieldMap {
        self.structured.get_section_fields(section_id, group_override)
    }

    /// Rebuild `host`'s bag and structured entry from the flat record
    ///
    /// 1. the whole flat record is copied into the bag
    /// 2. the host's structured entry is back-filled from it: keys of this
    ///    group under their base name, bare keys where the group key gave
    ///    nothing, keys of other groups skipped
    /// 3. structured fields the bag still lacks are added under the
    ///    group key
    /// 4. a bag that is still empty receives the global bucket
    pub fn restore_persisted_section_state(&self, host: &mut SectionHost) {
        let snapshot = self.flat.get_all();
        for (key, value) in &snapshot {
            host.datos.insert(key.clone(), value.clone());
        }

        let section = host.section_key().clone();
        if !section.is_global() {
            let backfill = backfill_fields(&snapshot, section.group);
            let written = self.structured.merge_fields(&section, backfill);
            tracing::debug!(section = %section, written, "structured entry back-filled");
        }

        let mut added = 0usize;
        for (base, value) in self.structured.section(&section) {
            let flat_key = FieldKey::compose(&base, section.group);
            if host.datos.contains_key(&flat_key) || host.datos.contains_key(&base) {
                continue;
            }
            host.datos.insert(flat_key, value);
            added += 1;
        }

        if host.datos.is_empty() {
            host.datos = self.structured.section(&SectionKey::global());
            tracing::debug!(section = %section, fields = host.datos.len(), "restored from global bucket");
        } else {
            tracing::debug!(
                section = %section,
                fields = host.datos.len(),
                from_structured = added,
                "section state restored"
            );
        }
    }

    /// Write a table under the host group's key and the bare key
    ///
    /// Each written key goes through [`Self::persist_field_change`]; the
    /// prefixed value is also kept in the host's previous snapshot.
    pub fn sync_table(
        &self,
        host: &mut SectionHost,
        key_base: &str,
        table: &Value,
    ) -> Vec<String> {
        let mut staged = FieldMap::new();
        let mut emitted: Vec<(String, Value)> = Vec::new();
        let written = self.tables.sync_dual(
            &mut staged,
            key_base,
            host.group(),
            Some(table),
            |key, value| emitted.push((key.to_string(), value.clone())),
            Some(&mut host.previous),
        );
        for (key, value) in emitted {
            self.persist_field_change(host, &key, Some(value));
        }
        written
    }

    /// Candidate rows of a table restricted to the host's active selection
    #[must_use]
    pub fn active_candidates(
        &self,
        host: &SectionHost,
        table_key: &str,
        candidates: &[TableRow],
    ) -> Vec<TableRow> {
        let Some(id_field) = self.config.table(table_key).and_then(|t| t.id_field.as_deref())
        else {
            return candidates.to_vec();
        };
        let stale = self
            .active_rows
            .prune_stale(host.section_key(), candidates, id_field);
        if !stale.is_empty() {
            tracing::debug!(table = table_key, stale = ?stale, "dropped stale selections");
        }
        self.active_rows.filter_for(host.section_key(), candidates, id_field)
    }

    /// Load backend data for `host` and overlay it
    ///
    /// `None` when the host has no section id or the load failed.
    pub async fn load_section(
        &self,
        host: &mut SectionHost,
        loader: &SectionLoader,
        fields: &[String],
    ) -> Option<OverlayReport> {
        let section_id = host.section_id()?.to_string();
        let loaded = loader.load(&section_id, fields).await?;
        Some(self.apply_overlay(host, loaded))
    }

    /// Finished copy of the flat record, pending debounced writes included
    #[must_use]
    pub fn export_snapshot(&self) -> FlatRecord {
        self.debouncer.flush();
        self.flat.get_all()
    }

    /// Commit every pending debounced write now
    pub fn flush(&self) -> usize {
        self.debouncer.flush()
    }

    /// Drop the structured cache; it is rebuilt as sections are restored
    pub fn discard_structured_cache(&self) {
        self.structured.clear();
        self.load_global_defaults();
    }

    /// Forget every answer and navigation state
    pub fn clear_all(&self) {
        let cancelled = self.debouncer.cancel_all();
        self.flat.clear();
        self.structured.clear();
        self.active_rows.clear_all();
        self.session.reset();
        self.session.set_manual_clear(true);
        self.load_global_defaults();
        tracing::info!(cancelled, "questionnaire cleared");
    }

    fn load_global_defaults(&self) {
        if self.config.global_defaults.is_empty() {
            return;
        }
        self.structured
            .replace_section(&SectionKey::global(), self.config.global_defaults.clone());
    }

    /// Structured first, then flat; returns the flat keys that changed
    fn apply(&self, section: &SectionKey, field_id: &str, value: &Value) -> Vec<String> {
        let field = FieldKey::strip_group(field_id, section.group).unwrap_or(field_id);
        self.structured.set_field(section, field, value.clone());

        let mut patch = FieldMap::new();
        patch.insert(field_id.to_string(), value.clone());
        let changed = self.flat.set_many(patch);
        tracing::debug!(
            section = %section,
            key = field_id,
            changed = !changed.is_empty(),
            "field persisted"
        );
        changed
    }
}

impl FieldReader for PersistenceCoordinator {
    fn flat_value(&self, key: &str) -> Option<FieldValue> {
        self.flat.get(key)
    }

    fn section_value(&self, section: &SectionKey, field: &str) -> Option<FieldValue> {
        self.structured.field(section, field)
    }
}

/// Structured fields a flat snapshot implies for one group
fn backfill_fields(snapshot: &FieldMap, group: GroupSuffix) -> FieldMap {
    let mut own = FieldMap::new();
    let mut bare = FieldMap::new();
    for (key, value) in snapshot {
        if !is_restorable(value) {
            continue;
        }
        let (base, suffix) = GroupSuffix::split_key(key);
        if !suffix.is_grouped() {
            bare.insert(key.clone(), value.clone());
        } else if suffix == group {
            own.insert(base.to_string(), value.clone());
        }
    }
    for (key, value) in bare {
        if !own.contains_key(&key) {
            own.insert(key, value);
        }
    }
    own
}
