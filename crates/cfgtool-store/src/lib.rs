//! Configuration store for the configuration tool
//!
//! Defines the contract the tool uses to reach the engine's configuration
//! registry, plus a directory-backed implementation with atomic writes and an
//! in-memory one for tests.

pub mod checksum;
pub mod error;
pub mod file;
pub mod io;
pub mod memory;
pub mod store;
pub mod template;

pub use error::{Error, Result};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use store::{ConfigId, ConfigStore, RegistryEntry, check_envelope};
pub use template::DEFAULT_TEMPLATE;
