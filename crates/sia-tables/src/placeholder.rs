//! Placeholder detection
//!
//! A placeholder carries no user-entered data and may be overwritten by an
//! external merge. The state is derived on demand and never stored.

use crate::row::{TableConfig, TableRow};
use sia_model::value::is_blank_or_zero;

/// Derived placeholder state of a row or table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderState {
    /// No rows at all
    Empty,
    /// Rows exist but none carries data
    Placeholder,
    /// At least one row carries user or external data
    Populated,
}

impl PlaceholderState {
    /// True when an external merge may overwrite the table
    #[inline]
    #[must_use]
    pub fn allows_overwrite(self) -> bool {
        matches!(self, Self::Empty | Self::Placeholder)
    }
}

/// True when a row's category is blank and its numeric fields are zero or absent
#[must_use]
pub fn is_placeholder_row(row: &TableRow, config: &TableConfig) -> bool {
    row.text(&config.category_field).trim().is_empty()
        && is_blank_or_zero(row.get(&config.count_field))
        && is_blank_or_zero(row.get(&config.percentage_field))
}

/// Placeholder state of a whole table
#[must_use]
pub fn table_state(rows: &[TableRow], config: &TableConfig) -> PlaceholderState {
    if rows.is_empty() {
        PlaceholderState::Empty
    } else if rows.iter().all(|row| is_placeholder_row(row, config)) {
        PlaceholderState::Placeholder
    } else {
        PlaceholderState::Populated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TableConfig {
        TableConfig::new("tabla")
    }

    #[test]
    fn blank_row_is_placeholder() {
        let row = TableRow::new()
            .with("categoria", " ")
            .with("casos", 0)
            .with("porcentaje", "");
        assert!(is_placeholder_row(&row, &config()));
    }

    #[test]
    fn named_category_is_not_placeholder() {
        let row = TableRow::new().with("categoria", "Hombre").with("casos", 0);
        assert!(!is_placeholder_row(&row, &config()));
    }

    #[test]
    fn count_makes_row_populated() {
        let row = TableRow::new().with("categoria", "").with("casos", "4");
        assert!(!is_placeholder_row(&row, &config()));
    }

    #[test]
    fn table_states() {
        let config = config();
        assert_eq!(table_state(&[], &config), PlaceholderState::Empty);
        assert_eq!(
            table_state(&[TableRow::new().with("casos", 0)], &config),
            PlaceholderState::Placeholder
        );
        assert_eq!(
            table_state(
                &[
                    TableRow::new(),
                    TableRow::new().with("categoria", "Mujer").with("casos", 10)
                ],
                &config
            ),
            PlaceholderState::Populated
        );
        assert!(PlaceholderState::Placeholder.allows_overwrite());
        assert!(!PlaceholderState::Populated.allows_overwrite());
    }
}
