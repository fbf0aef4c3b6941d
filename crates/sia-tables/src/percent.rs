//! Percentage recomputation
//!
//! Merges blank the percentage field; this fills it back from the counts.

use crate::normalize::is_total_label;
use crate::row::{TableConfig, TableRow};
use serde_json::Value;
use sia_model::value::number_value;

/// Format a percentage the way the document prints it (`"35,50 %"`)
#[must_use]
pub fn format_percentage(value: f64) -> String {
    format!("{value:.2} %").replace('.', ",")
}

/// Recompute the percentage of every row from its count
///
/// Rows labelled `Total` are excluded from the sum; they receive the sum as
/// their count and `100,00 %`. With a zero sum every percentage is
/// `0,00 %`.
pub fn recompute_percentages(rows: &mut [TableRow], config: &TableConfig) {
    let is_total = |row: &TableRow| is_total_label(&row.text(&config.category_field));

    let total: f64 = rows
        .iter()
        .filter(|&row| !is_total(row))
        .map(|row| row.number(&config.count_field))
        .sum();

    for row in rows.iter_mut() {
        if is_total(&*row) {
            row.set(config.count_field.clone(), number_value(total));
            let label = if total > 0.0 { 100.0 } else { 0.0 };
            row.set(
                config.percentage_field.clone(),
                Value::String(format_percentage(label)),
            );
            continue;
        }

        let share = if total > 0.0 {
            row.number(&config.count_field) / total * 100.0
        } else {
            0.0
        };
        row.set(
            config.percentage_field.clone(),
            Value::String(format_percentage(share)),
        );
    }
}
