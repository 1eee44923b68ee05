//! The engine collaborator contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::{Error, Result};

/// Identifier the engine assigns to each saved configuration.
pub type ConfigId = u64;

/// One saved configuration in the store's registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub config_id: ConfigId,
    pub comment: String,
    pub created: DateTime<Utc>,
    pub checksum: String,
}

/// Where configuration documents are loaded from and saved to.
///
/// Documents cross this boundary serialized; the store checks only that they
/// are JSON objects with a `G2_CONFIG` section and never interprets tables.
pub trait ConfigStore: fmt::Debug {
    /// Load the current default configuration.
    fn load_configuration(&self) -> Result<String>;

    /// Load a specific saved configuration.
    fn load_configuration_id(&self, id: ConfigId) -> Result<String>;

    /// Persist a document, make it the default, and return its new id.
    fn save_configuration(&mut self, document: &str, comment: &str) -> Result<ConfigId>;

    fn default_config_id(&self) -> Result<Option<ConfigId>>;

    /// Every saved configuration, oldest first.
    fn registry(&self) -> Result<Vec<RegistryEntry>>;
}

/// Check the envelope of a serialized document.
pub fn check_envelope(document: &str) -> std::result::Result<(), String> {
    let value: Value = serde_json::from_str(document).map_err(|e| format!("invalid JSON: {e}"))?;
    match value.get("G2_CONFIG") {
        Some(Value::Object(_)) => Ok(()),
        Some(_) => Err("G2_CONFIG is not an object".to_string()),
        None => Err("missing G2_CONFIG section".to_string()),
    }
}

pub(crate) fn ensure_loadable(document: &str) -> Result<()> {
    check_envelope(document).map_err(Error::malformed)
}

pub(crate) fn ensure_saveable(document: &str) -> Result<()> {
    check_envelope(document).map_err(Error::rejected)
}
