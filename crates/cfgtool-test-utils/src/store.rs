//! [`TestStore`]: a file store in a temporary directory.

use cfgtool_store::{ConfigStore, FileStore};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// A [`FileStore`] rooted in a temporary directory that lives as long as
/// this value.
pub struct TestStore {
    temp_dir: TempDir,
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TestStore {
    /// An empty directory; the store bootstraps from the template on first open.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    /// A store whose default configuration is `document`.
    pub fn seeded(document: &str) -> Self {
        let store = Self::new();
        store
            .open()
            .save_configuration(document, "seed")
            .expect("TestStore::seeded: seed document rejected");
        store
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn open(&self) -> FileStore {
        FileStore::open(self.root()).expect("TestStore::open: cannot open store")
    }

    /// Ids of the saved configuration files in the directory.
    pub fn saved_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = fs::read_dir(self.root())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().to_string();
                name.strip_prefix("config_")?.strip_suffix(".json")?.parse().ok()
            })
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Write a file into the store directory, e.g. to corrupt it.
    pub fn write_file(&self, name: &str, content: &str) {
        fs::write(self.root().join(name), content).unwrap();
    }
}
