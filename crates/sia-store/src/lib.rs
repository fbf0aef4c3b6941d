//! SIA Store
//!
//! Persistence for grouped questionnaire sections. Two stores hold the same
//! answers in different shapes and are kept consistent by a single
//! coordinator:
//!
//! - [`FlatFieldStore`]: concrete keys (`grupoAISD_A1`) to values, persisted
//!   on every write; the source of truth
//! - [`StructuredSectionStore`]: the same fields keyed by section root and
//!   group; an in-memory cache rebuilt from the flat record
//!
//! # Core Concepts
//!
//! - [`PersistenceCoordinator`]: Every read and write goes through it
//! - [`SectionHost`]: A view's section id and field bag
//! - [`ChangeBus`] / [`UpdateGuard`]: Change notification without re-entrancy
//! - [`Debouncer`]: Collapses bursts of writes per key
//! - [`SectionLoader`]: Time-bounded backend loads, overlaid by
//!   [`PersistenceCoordinator::apply_overlay`]
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use sia_store::{PersistenceCoordinator, SectionHost};
//! use std::sync::Arc;
//!
//! let store = Arc::new(PersistenceCoordinator::in_memory());
//!
//! let mut a1 = SectionHost::new("3.1.4.A.1.2", Arc::clone(&store));
//! a1.persist_field_change("grupoAISD_A1", Some(json!("CC Ayroca")));
//!
//! let mut a2 = SectionHost::new("3.1.4.A.2.2", Arc::clone(&store));
//! a2.persist_field_change("grupoAISD_A2", Some(json!("CC Sondor")));
//!
//! assert_eq!(store.read("3.1.4.A.1.2", "grupoAISD"), Some(json!("CC Ayroca")));
//! assert_eq!(store.read("3.1.4.A.2.2", "grupoAISD"), Some(json!("CC Sondor")));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod config;
mod coordinator;
mod debounce;
mod error;
mod flat;
mod guard;
mod host;
mod loader;
mod notify;
mod overlay;
mod session;
mod storage;
mod structured;

// Re-exports
pub use config::{BucketKeys, StoreConfig};
pub use coordinator::PersistenceCoordinator;
pub use debounce::Debouncer;
pub use error::{ConfigError, LoadError, StorageError, StoreError, StoreResult};
pub use flat::{FlatFieldStore, FlatRecord};
pub use guard::UpdateGuard;
pub use host::SectionHost;
pub use loader::{MockDataSource, SectionDataSource, SectionLoader, WILDCARD_SECTION};
pub use notify::{ChangeBus, FieldChange, Listener, SubscriptionId};
pub use overlay::OverlayReport;
pub use session::SessionBuckets;
pub use storage::{FileStorage, MemoryStorage, StorageBackend};
pub use structured::StructuredSectionStore;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
