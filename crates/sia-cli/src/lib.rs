//! SIA CLI
//!
//! Command line access to a questionnaire store: read and write fields as
//! a given section sees them, overlay backend datasets, inspect groups.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod commands;
pub mod logging;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
