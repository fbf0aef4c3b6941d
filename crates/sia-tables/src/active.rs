//! Active rows of dynamically populated tables
//!
//! Some tables are filled from an external candidate set (e.g. the census
//! points of an area). The user selects which candidates are live; the
//! registry remembers that selection per section root and group.

use crate::row::TableRow;
use dashmap::DashMap;
use sia_model::SectionKey;

/// Selected external row ids per `(section root, group)`
#[derive(Debug, Default)]
pub struct ActiveRowsRegistry {
    entries: DashMap<SectionKey, Vec<String>>,
}

impl ActiveRowsRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the selection of a section entry
    pub fn set_active(&self, key: &SectionKey, ids: impl IntoIterator<Item = String>) {
        let mut unique: Vec<String> = Vec::new();
        for id in ids {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        self.entries.insert(key.clone(), unique);
    }

    /// Selected ids of a section entry (empty when nothing is selected)
    #[must_use]
    pub fn active_ids(&self, key: &SectionKey) -> Vec<String> {
        self.entries
            .get(key)
            .map(|ids| ids.value().clone())
            .unwrap_or_default()
    }

    /// Flip one id; returns whether it is now selected
    pub fn toggle(&self, key: &SectionKey, id: &str) -> bool {
        let mut ids = self.entries.entry(key.clone()).or_default();
        if let Some(pos) = ids.iter().position(|existing| existing == id) {
            ids.remove(pos);
            false
        } else {
            ids.push(id.to_string());
            true
        }
    }

    /// Forget the selection of a section entry
    pub fn clear(&self, key: &SectionKey) {
        self.entries.remove(key);
    }

    /// Forget every selection
    pub fn clear_all(&self) {
        self.entries.clear();
    }

    /// Drop selected ids that no longer appear among `candidates`
    ///
    /// Returns the removed (stale) ids.
    pub fn prune_stale(
        &self,
        key: &SectionKey,
        candidates: &[TableRow],
        id_field: &str,
    ) -> Vec<String> {
        let Some(mut ids) = self.entries.get_mut(key) else {
            return Vec::new();
        };
        let live: Vec<String> = candidates.iter().map(|row| row.text(id_field)).collect();
        let (kept, stale): (Vec<String>, Vec<String>) =
            ids.drain(..).partition(|id| live.contains(id));
        *ids = kept;
        if !stale.is_empty() {
            tracing::debug!(section = %key, stale = stale.len(), "pruned stale active rows");
        }
        stale
    }

    /// Candidates restricted to the current selection of a section entry
    #[must_use]
    pub fn filter_for(
        &self,
        key: &SectionKey,
        candidates: &[TableRow],
        id_field: &str,
    ) -> Vec<TableRow> {
        filter_to_active(candidates, &self.active_ids(key), id_field)
    }
}

/// Candidates whose id is in `active_ids`, in candidate order
///
/// An empty selection means "no filter": every candidate is returned, so a
/// fresh group shows all available rows until the user narrows it down.
#[must_use]
pub fn filter_to_active(
    candidates: &[TableRow],
    active_ids: &[String],
    id_field: &str,
) -> Vec<TableRow> {
    if active_ids.is_empty() {
        return candidates.to_vec();
    }
    candidates
        .iter()
        .filter(|row| active_ids.contains(&row.text(id_field)))
        .cloned()
        .collect()
}
