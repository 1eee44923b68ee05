//! Directory-backed store.
//!
//! Layout:
//!
//! ```text
//! <dir>/registry.json       default id and one entry per saved configuration
//! <dir>/config_<id>.json    the saved documents
//! <dir>/.lock               advisory lock for registry updates
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::checksum::{compute_content_checksum, verify_content_checksum};
use crate::io::{DirLock, read_text, write_atomic};
use crate::store::{ConfigId, ConfigStore, RegistryEntry, ensure_loadable, ensure_saveable};
use crate::template::DEFAULT_TEMPLATE;
use crate::{Error, Result};

const REGISTRY_FILE: &str = "registry.json";
const LOCK_FILE: &str = ".lock";

#[derive(Debug, Default, Serialize, Deserialize)]
struct Registry {
    default_id: Option<ConfigId>,
    #[serde(default)]
    configs: Vec<RegistryEntry>,
}

/// A store that keeps each saved configuration as a JSON file.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open a store directory, creating it and seeding the default
    /// configuration from the built-in template when it is empty.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let store = Self { root: root.into() };
        if !store.registry_path().exists() {
            info!(dir = %store.root.display(), "Bootstrapping configuration store from template");
            store.write_new(DEFAULT_TEMPLATE, "Default configuration")?;
        }
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn registry_path(&self) -> PathBuf {
        self.root.join(REGISTRY_FILE)
    }

    fn config_path(&self, id: ConfigId) -> PathBuf {
        self.root.join(format!("config_{id}.json"))
    }

    fn read_registry(&self) -> Result<Registry> {
        let path = self.registry_path();
        if !path.exists() {
            return Ok(Registry::default());
        }
        let text = read_text(&path)?;
        serde_json::from_str(&text).map_err(|e| Error::malformed(format!("{}: {e}", path.display())))
    }

    fn write_new(&self, document: &str, comment: &str) -> Result<ConfigId> {
        let _lock = DirLock::acquire(&self.root.join(LOCK_FILE))?;
        let mut registry = self.read_registry()?;

        let config_id = registry.configs.iter().map(|e| e.config_id).max().unwrap_or(0) + 1;
        write_atomic(&self.config_path(config_id), document.as_bytes())?;

        registry.configs.push(RegistryEntry {
            config_id,
            comment: comment.to_string(),
            created: Utc::now(),
            checksum: compute_content_checksum(document),
        });
        registry.default_id = Some(config_id);

        let text = serde_json::to_string_pretty(&registry)
            .map_err(|e| Error::rejected(format!("registry serialization failed: {e}")))?;
        write_atomic(&self.registry_path(), text.as_bytes())?;
        debug!(config_id, "Wrote configuration");
        Ok(config_id)
    }
}

impl ConfigStore for FileStore {
    fn load_configuration(&self) -> Result<String> {
        match self.read_registry()?.default_id {
            Some(id) => self.load_configuration_id(id),
            None => Err(Error::EngineUnavailable {
                reason: format!("no default configuration in {}", self.root.display()),
            }),
        }
    }

    fn load_configuration_id(&self, id: ConfigId) -> Result<String> {
        let registry = self.read_registry()?;
        let entry = registry
            .configs
            .iter()
            .find(|e| e.config_id == id)
            .ok_or(Error::UnknownConfigId { id })?;

        let path = self.config_path(id);
        let document = read_text(&path)?;
        if !verify_content_checksum(&document, &entry.checksum) {
            return Err(Error::malformed(format!(
                "{} does not match its registry checksum",
                path.display()
            )));
        }
        ensure_loadable(&document)?;
        debug!(config_id = id, "Loaded configuration");
        Ok(document)
    }

    fn save_configuration(&mut self, document: &str, comment: &str) -> Result<ConfigId> {
        ensure_saveable(document)?;
        self.write_new(document, comment)
    }

    fn default_config_id(&self) -> Result<Option<ConfigId>> {
        Ok(self.read_registry()?.default_id)
    }

    fn registry(&self) -> Result<Vec<RegistryEntry>> {
        Ok(self.read_registry()?.configs)
    }
}
