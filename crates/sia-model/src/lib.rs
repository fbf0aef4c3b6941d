//! SIA Model
//!
//! Identifiers and key rules for questionnaires whose answers are split into
//! repeatable social-influence-area groups (A.1, A.2, B.1, ...).
//!
//! # Core Concepts
//!
//! - [`SectionId`]: Dotted page id (`3.1.4.A.1.6`) encoding an optional group
//! - [`GroupKey`] / [`GroupSuffix`]: Typed group instance and its storage tag
//! - [`PrefixResolver`]: Section id → group suffix (total, idempotent)
//! - [`FieldKeyResolver`]: Ordered lookup chain for a field in a section
//! - [`value`]: Coercion rules applied to every stored value
//!
//! # Example
//!
//! ```rust
//! use sia_model::{FieldKeyResolver, PrefixResolver};
//!
//! let suffix = PrefixResolver::new().resolve("3.1.4.A.2.6");
//! assert_eq!(suffix.as_storage(), "_A2");
//!
//! let chain = FieldKeyResolver::new().lookup_chain("grupoAISD", "3.1.4.A.2.6");
//! assert_eq!(chain.write_key(), "grupoAISD_A2");
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod group;
mod key;
mod prefix;
mod section;
pub mod value;

// Re-exports
pub use group::{GroupKey, GroupKeyError, GroupLetter, GroupSuffix};
pub use key::{FieldKey, FieldKeyResolver, FieldReader, KeyCandidate, LookupChain};
pub use prefix::PrefixResolver;
pub use section::{SectionId, SectionIdError, SectionKey, GLOBAL_BUCKET};
pub use value::{FieldMap, FieldValue};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
