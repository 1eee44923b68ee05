//! Configuration orchestration layer for the entity-resolution config tool
//!
//! This crate owns the in-memory configuration document and everything that
//! edits it:
//!
//! - **Document**: the parsed `G2_CONFIG` document, unknown sections preserved
//! - **Base manager**: per-kind lookup, id reservation and uniqueness checks
//! - **Change journal**: ordered record of every mutation since the last save
//! - **Integrity**: reference checks, delete planning and whole-document validation
//! - **Domain managers**: data sources, features, functions, rules and system settings
//! - **ConfigManager**: the orchestrator tying them to a [`cfgtool_store::ConfigStore`]
//!
//! # Architecture
//!
//! ```text
//!                 cfgtool-shell
//!                       |
//!                 ConfigManager
//!                       |
//!     +---------+-------+--------+---------+
//!     |         |       |        |         |
//! DataSource Feature Function  Rules    System      (domain managers)
//!     +---------+-------+--------+---------+
//!                       |
//!           Scope -> ConfigDocument + Journal
//!                       |
//!                cfgtool-schema
//! ```
//!
//! # Example
//!
//! ```
//! use cfgtool_core::{ConfigManager, EntityKind};
//! use cfgtool_store::{DEFAULT_TEMPLATE, MemoryStore};
//! use serde_json::json;
//!
//! fn example() -> cfgtool_core::Result<()> {
//!     let store = MemoryStore::with_document(DEFAULT_TEMPLATE);
//!     let mut manager = ConfigManager::open(Box::new(store))?;
//!     let fields = json!({"dataSource": "CUSTOMERS"}).as_object().cloned().unwrap_or_default();
//!     manager.create(EntityKind::DataSource, &fields)?;
//!     manager.save("add customers")?;
//!     Ok(())
//! }
//! # example().unwrap();
//! ```

pub mod base;
pub mod document;
pub mod error;
pub mod integrity;
pub mod journal;
pub mod manager;
pub mod managers;
pub mod scope;

pub use base::{BaseManager, Filter, Selector};
pub use cfgtool_schema::{ApiRecord, Domain, EntityKind, Record};
pub use document::{ConfigDocument, SUPPORTED_SCHEMA_VERSIONS};
pub use error::{Dependent, Error, Result};
pub use integrity::{Issue, ValidationReport};
pub use journal::{Journal, JournalEntry, JournalOp};
pub use manager::{ConfigManager, Deleted, SessionState, Statistics, TableCount};
pub use managers::{CallFamily, FeatureRequest, TEMPLATES, WRITE_ONCE_SETTINGS};
pub use scope::Session;
