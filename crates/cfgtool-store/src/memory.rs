//! In-memory store used by tests and dry runs.

use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::checksum::compute_content_checksum;
use crate::store::{ConfigId, ConfigStore, RegistryEntry, ensure_loadable, ensure_saveable};
use crate::{Error, Result};

#[derive(Debug, Default)]
struct Inner {
    configs: Vec<(RegistryEntry, String)>,
    default_id: Option<ConfigId>,
    unavailable: bool,
    reject_reason: Option<String>,
    save_count: usize,
}

/// A store that keeps documents in memory.
///
/// Clones share state, so a test can keep a handle after giving the store
/// to a manager and flip failure switches or inspect what was saved.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose default configuration is `document`.
    pub fn with_document(document: impl Into<String>) -> Self {
        let store = Self::new();
        {
            let mut inner = store.lock();
            let document = document.into();
            let entry = RegistryEntry {
                config_id: 1,
                comment: "initial".to_string(),
                created: Utc::now(),
                checksum: compute_content_checksum(&document),
            };
            inner.configs.push((entry, document));
            inner.default_id = Some(1);
        }
        store
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned lock only means a test thread panicked; the data is still usable.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Make every subsequent save fail with `EngineRejected(reason)`.
    pub fn reject_saves(&self, reason: Option<&str>) {
        self.lock().reject_reason = reason.map(str::to_string);
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.lock().save_count
    }

    /// The document most recently saved or seeded.
    pub fn last_document(&self) -> Option<String> {
        self.lock().configs.last().map(|(_, doc)| doc.clone())
    }

    fn check_available(inner: &Inner) -> Result<()> {
        if inner.unavailable {
            return Err(Error::EngineUnavailable {
                reason: "memory store switched off".to_string(),
            });
        }
        Ok(())
    }
}

impl ConfigStore for MemoryStore {
    fn load_configuration(&self) -> Result<String> {
        let id = {
            let inner = self.lock();
            Self::check_available(&inner)?;
            inner.default_id
        };
        match id {
            Some(id) => self.load_configuration_id(id),
            None => Err(Error::EngineUnavailable {
                reason: "no default configuration".to_string(),
            }),
        }
    }

    fn load_configuration_id(&self, id: ConfigId) -> Result<String> {
        let inner = self.lock();
        Self::check_available(&inner)?;
        let document = inner
            .configs
            .iter()
            .find(|(entry, _)| entry.config_id == id)
            .map(|(_, doc)| doc.clone())
            .ok_or(Error::UnknownConfigId { id })?;
        ensure_loadable(&document)?;
        Ok(document)
    }

    fn save_configuration(&mut self, document: &str, comment: &str) -> Result<ConfigId> {
        let mut inner = self.lock();
        Self::check_available(&inner)?;
        if let Some(reason) = &inner.reject_reason {
            return Err(Error::rejected(reason.clone()));
        }
        ensure_saveable(document)?;

        let config_id = inner.configs.iter().map(|(e, _)| e.config_id).max().unwrap_or(0) + 1;
        let entry = RegistryEntry {
            config_id,
            comment: comment.to_string(),
            created: Utc::now(),
            checksum: compute_content_checksum(document),
        };
        inner.configs.push((entry, document.to_string()));
        inner.default_id = Some(config_id);
        inner.save_count += 1;
        Ok(config_id)
    }

    fn default_config_id(&self) -> Result<Option<ConfigId>> {
        let inner = self.lock();
        Self::check_available(&inner)?;
        Ok(inner.default_id)
    }

    fn registry(&self) -> Result<Vec<RegistryEntry>> {
        let inner = self.lock();
        Self::check_available(&inner)?;
        Ok(inner.configs.iter().map(|(e, _)| e.clone()).collect())
    }
}
