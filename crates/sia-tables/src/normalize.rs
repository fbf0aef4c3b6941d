//! Category normalization for table matching

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Normalized matching key of a category label
///
/// Trimmed, accent-stripped and lowercased: `" Agrícola "` → `"agricola"`.
#[must_use]
pub fn normalize_category(label: &str) -> String {
    label
        .trim()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// True when a label names a totals row
#[must_use]
pub fn is_total_label(label: &str) -> bool {
    normalize_category(label) == "total"
}
