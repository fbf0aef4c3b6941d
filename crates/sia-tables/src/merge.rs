//! Skeleton-preserving table merges
//!
//! The skeleton (user-defined or configured rows) decides which
//! categories exist. An external dataset only fills the count field of
//! matching categories; it never adds or removes rows.

use crate::normalize::normalize_category;
use crate::placeholder::{table_state, PlaceholderState};
use crate::row::{TableConfig, TableRow};
use serde_json::Value;
use sia_model::value::{coerce_number, is_blank_or_zero, number_value};
use std::collections::HashMap;

/// Result of a guarded merge
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    /// The external data was merged
    Merged(Vec<TableRow>),
    /// The current table holds user data and was left alone
    Kept,
}

impl MergeOutcome {
    /// Merged rows, if any
    #[inline]
    #[must_use]
    pub fn merged(self) -> Option<Vec<TableRow>> {
        match self {
            Self::Merged(rows) => Some(rows),
            Self::Kept => None,
        }
    }
}

/// Reconciles table skeletons with external datasets
#[derive(Debug, Clone, Copy, Default)]
pub struct TableMergeService;

impl TableMergeService {
    /// Create merge service
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Combine a skeleton with an incoming dataset
    ///
    /// - empty skeleton: the incoming rows, unchanged
    /// - no incoming rows: a clone of the skeleton
    /// - otherwise: one clone per skeleton row, in skeleton order; rows whose
    ///   normalized category matches an incoming row get that row's count
    ///   (coerced to a number, `0` on failure) and a blank percentage
    ///
    /// Skeleton rows sharing a normalized category all take the same
    /// incoming value.
    #[must_use]
    pub fn combine(
        &self,
        skeleton: &[TableRow],
        incoming: Option<&[TableRow]>,
        config: &TableConfig,
    ) -> Vec<TableRow> {
        let incoming = incoming.unwrap_or_default();
        if skeleton.is_empty() {
            return incoming.to_vec();
        }
        if incoming.is_empty() {
            return skeleton.to_vec();
        }

        let mut lookup: HashMap<String, &TableRow> = HashMap::with_capacity(incoming.len());
        for row in incoming {
            let key = normalize_category(&row.text(&config.category_field));
            if !key.is_empty() {
                lookup.entry(key).or_insert(row);
            }
        }

        let mut matched = 0usize;
        let merged = skeleton
            .iter()
            .map(|row| {
                let mut out = row.clone();
                let key = normalize_category(&row.text(&config.category_field));
                if let Some(source) = lookup.get(&key) {
                    let count = source.get(&config.count_field).map_or(0.0, coerce_number);
                    out.set(config.count_field.clone(), number_value(count));
                    out.set(config.percentage_field.clone(), Value::String(String::new()));
                    matched += 1;
                }
                out
            })
            .collect();

        tracing::debug!(
            table = %config.key,
            rows = skeleton.len(),
            matched,
            "merged external dataset into skeleton"
        );
        merged
    }

    /// True when a table looks like untouched external data
    ///
    /// Every percentage blank or zero while at least one count is non-zero.
    /// Hand-edited tables carry real percentages and fail this check.
    #[must_use]
    pub fn looks_like_external_merge_candidate(
        &self,
        table: &[TableRow],
        config: &TableConfig,
    ) -> bool {
        let percentages_blank = table
            .iter()
            .all(|row| is_blank_or_zero(row.get(&config.percentage_field)));
        let any_count = table
            .iter()
            .any(|row| !is_blank_or_zero(row.get(&config.count_field)));
        percentages_blank && any_count
    }

    /// Merge only when the current table may be overwritten
    ///
    /// Allowed when `current` is empty, a placeholder, has no counts or
    /// percentages at all, or still looks like external data. The skeleton
    /// is `current` itself unless it has no categories, in which case
    /// `fallback_skeleton` is used.
    #[must_use]
    pub fn merge_if_allowed(
        &self,
        current: &[TableRow],
        fallback_skeleton: &[TableRow],
        incoming: Option<&[TableRow]>,
        config: &TableConfig,
    ) -> MergeOutcome {
        let state = table_state(current, config);
        let allowed = state.allows_overwrite()
            || carries_no_data(current, config)
            || self.looks_like_external_merge_candidate(current, config);
        if !allowed {
            tracing::debug!(table = %config.key, "table holds user data, merge skipped");
            return MergeOutcome::Kept;
        }

        let skeleton = match state {
            PlaceholderState::Populated => current,
            PlaceholderState::Empty | PlaceholderState::Placeholder => fallback_skeleton,
        };
        MergeOutcome::Merged(self.combine(skeleton, incoming, config))
    }
}

/// True when every count and percentage of the table is blank or zero
fn carries_no_data(table: &[TableRow], config: &TableConfig) -> bool {
    table.iter().all(|row| {
        is_blank_or_zero(row.get(&config.count_field))
            && is_blank_or_zero(row.get(&config.percentage_field))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TableConfig {
        TableConfig::new("peaOcupacionesTabla")
    }

    fn row(categoria: &str, casos: impl Into<Value>, porcentaje: &str) -> TableRow {
        TableRow::new()
            .with("categoria", categoria)
            .with("casos", casos)
            .with("porcentaje", porcentaje)
    }

    #[test]
    fn fills_count_for_matching_category() {
        let skeleton = vec![row("Agricultura", 0, "")];
        let incoming = vec![TableRow::new()
            .with("categoria", "agricultura")
            .with("casos", "35")];

        let merged = TableMergeService::new().combine(&skeleton, Some(&incoming), &config());

        assert_eq!(merged, vec![row("Agricultura", 35, "")]);
    }

    #[test]
    fn empty_skeleton_returns_incoming() {
        let incoming = vec![row("Pesca", 3, "")];
        let service = TableMergeService::new();
        assert_eq!(service.combine(&[], Some(&incoming), &config()), incoming);
        assert!(service.combine(&[], None, &config()).is_empty());
    }

    #[test]
    fn missing_incoming_returns_skeleton_clone() {
        let skeleton = vec![row("Comercio", 2, "50,00 %")];
        let service = TableMergeService::new();
        assert_eq!(service.combine(&skeleton, None, &config()), skeleton);
        assert_eq!(service.combine(&skeleton, Some(&[]), &config()), skeleton);
    }

    #[test]
    fn unmatched_rows_untouched_and_extra_incoming_ignored() {
        let skeleton = vec![row("Agricultura", 1, "10,00 %"), row("Minería", 5, "50,00 %")];
        let incoming = vec![row(" MINERIA ", "x", "99"), row("Turismo", 40, "")];

        let merged = TableMergeService::new().combine(&skeleton, Some(&incoming), &config());

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0], skeleton[0]);
        assert_eq!(merged[1], row("Minería", 0, ""));
    }

    #[test]
    fn duplicate_skeleton_categories_share_value() {
        let skeleton = vec![row("Hombre", 0, ""), row("hombre ", 0, "")];
        let incoming = vec![row("HOMBRE", 12, "")];

        let merged = TableMergeService::new().combine(&skeleton, Some(&incoming), &config());
        assert_eq!(merged[0].number("casos"), 12.0);
        assert_eq!(merged[1].number("casos"), 12.0);
        assert_eq!(merged[1].text("categoria"), "hombre ");
    }

    #[test]
    fn merge_candidate_heuristic() {
        let service = TableMergeService::new();
        let config = config();

        assert!(service.looks_like_external_merge_candidate(
            &[row("A", 3, ""), row("B", 0, "0")],
            &config
        ));
        assert!(!service.looks_like_external_merge_candidate(
            &[row("A", 3, "60,00 %"), row("B", 2, "")],
            &config
        ));
        assert!(!service.looks_like_external_merge_candidate(&[row("A", 0, "")], &config));
        assert!(!service.looks_like_external_merge_candidate(&[], &config));
    }

    #[test]
    fn guarded_merge_keeps_hand_edited_table() {
        let current = vec![row("Hombre", 7, "70,00 %"), row("Mujer", 3, "30,00 %")];
        let incoming = vec![row("Hombre", 100, "")];

        let outcome =
            TableMergeService::new().merge_if_allowed(&current, &[], Some(&incoming), &config());
        assert_eq!(outcome, MergeOutcome::Kept);
    }

    #[test]
    fn guarded_merge_uses_fallback_for_placeholder() {
        let current = vec![row("", 0, "")];
        let fallback = vec![row("Hombre", 0, ""), row("Mujer", 0, "")];
        let incoming = vec![row("mujer", "8", "")];

        let merged = TableMergeService::new()
            .merge_if_allowed(&current, &fallback, Some(&incoming), &config())
            .merged()
            .unwrap();
        assert_eq!(merged, vec![row("Hombre", 0, ""), row("Mujer", 8, "")]);
    }

    #[test]
    fn guarded_merge_is_idempotent() {
        let service = TableMergeService::new();
        let config = config();
        let skeleton = vec![row("Hombre", 0, ""), row("Mujer", 0, "")];
        let incoming = vec![row("hombre", 4, ""), row("mujer", "6", "")];

        let first = service
            .merge_if_allowed(&skeleton, &[], Some(&incoming), &config)
            .merged()
            .unwrap();
        let second = service
            .merge_if_allowed(&first, &[], Some(&incoming), &config)
            .merged()
            .unwrap();
        assert_eq!(first, second);
    }
}
