//! Shared test fixtures for the configuration tool workspace.
//!
//! A dev-dependency only; never published.
//!
//! # Modules
//!
//! - [`config`]: [`TestConfig`] builder for configuration documents
//! - [`store`]: [`TestStore`], a file store in a temporary directory

pub mod config;
pub mod store;

pub use config::TestConfig;
pub use store::TestStore;
