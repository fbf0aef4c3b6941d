//! SIA Tables
//!
//! Tabular fields of grouped questionnaire sections.
//!
//! # Core Concepts
//!
//! - [`TableRow`] / [`TableConfig`]: Rows and the role of each field
//! - [`TableSyncEngine`]: Writes a table under its group key and the bare key
//! - [`TableMergeService`]: Fills a user skeleton from an external dataset
//!   without ever dropping skeleton categories
//! - [`PlaceholderState`]: Whether a table may be overwritten by a merge
//! - [`ActiveRowsRegistry`]: Per-group selection of external candidate rows
//! - [`recompute_percentages`]: Refills percentages blanked by a merge
//!
//! # Example
//!
//! ```rust
//! use sia_tables::{TableConfig, TableMergeService, TableRow};
//!
//! let config = TableConfig::new("peaOcupacionesTabla");
//! let skeleton = vec![TableRow::new().with("categoria", "Agricultura").with("casos", 0)];
//! let incoming = vec![TableRow::new().with("categoria", "agricultura").with("casos", "35")];
//!
//! let merged = TableMergeService::new().combine(&skeleton, Some(&incoming), &config);
//! assert_eq!(merged[0].number("casos"), 35.0);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod active;
mod merge;
mod normalize;
mod percent;
mod placeholder;
mod row;
mod sync;

// Re-exports
pub use active::{filter_to_active, ActiveRowsRegistry};
pub use merge::{MergeOutcome, TableMergeService};
pub use normalize::{is_total_label, normalize_category};
pub use percent::{format_percentage, recompute_percentages};
pub use placeholder::{is_placeholder_row, table_state, PlaceholderState};
pub use row::{rows_from_value, rows_to_value, TableConfig, TableRow};
pub use sync::TableSyncEngine;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
