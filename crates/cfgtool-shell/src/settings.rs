//! Shell settings file
//!
//! Settings come from a TOML file found, in order, at the `--config` path
//! (or `$SZ_CONFIGTOOL_CONFIG`), then at `<config_dir>/sz_configtool/sz_configtool.toml`.
//! Command-line flags override whatever the file says.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CliError, Result};
use crate::render::OutputFormat;

const APP_DIR: &str = "sz_configtool";
const FILE_NAME: &str = "sz_configtool.toml";

/// When to colour output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

/// Effective shell settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Directory of the file-backed configuration store
    pub store_dir: Option<PathBuf>,
    /// Skip delete confirmations
    pub force: bool,
    pub color: ColorChoice,
    /// Where interactive history is kept; `None` disables it
    pub history_file: Option<PathBuf>,
    pub history_limit: usize,
    /// Output format for list and get commands until changed per command
    pub default_format: OutputFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_dir: None,
            force: false,
            color: ColorChoice::Auto,
            history_file: dirs::home_dir().map(|home| home.join(".sz_configtool_history")),
            history_limit: 1000,
            default_format: OutputFormat::Json,
        }
    }
}

impl Settings {
    pub fn parse(content: &str, origin: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|source| CliError::Settings {
            path: origin.display().to_string(),
            source,
        })
    }

    /// Store directory, falling back to the user data directory.
    pub fn store_dir(&self) -> PathBuf {
        self.store_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join(APP_DIR).join("store")))
            .unwrap_or_else(|| PathBuf::from("sz_configtool_store"))
    }
}

/// Finds and reads the settings file.
#[derive(Debug, Default)]
pub struct SettingsResolver {
    explicit: Option<PathBuf>,
    /// Override for the user config directory (used for testing)
    config_dir_override: Option<PathBuf>,
}

impl SettingsResolver {
    pub fn new(explicit: Option<PathBuf>) -> Self {
        Self {
            explicit,
            config_dir_override: None,
        }
    }

    pub fn with_config_dir(explicit: Option<PathBuf>, config_dir: PathBuf) -> Self {
        Self {
            explicit,
            config_dir_override: Some(config_dir),
        }
    }

    fn default_path(&self) -> Option<PathBuf> {
        match &self.config_dir_override {
            Some(dir) => Some(dir.join(FILE_NAME)),
            None => dirs::config_dir().map(|d| d.join(APP_DIR).join(FILE_NAME)),
        }
    }

    /// Read the settings file, or defaults when there is none.
    ///
    /// # Errors
    ///
    /// An explicitly named file that does not exist, or any file that is
    /// not valid settings TOML.
    pub fn resolve(&self) -> Result<Settings> {
        if let Some(path) = &self.explicit {
            if !path.is_file() {
                return Err(CliError::user(format!("Settings file not found: {}", path.display())));
            }
            tracing::debug!(?path, "Loading settings");
            return Settings::parse(&fs::read_to_string(path)?, path);
        }
        match self.default_path() {
            Some(path) if path.is_file() => {
                tracing::debug!(?path, "Loading settings");
                Settings::parse(&fs::read_to_string(&path)?, &path)
            }
            path => {
                tracing::debug!(?path, "No settings file; using defaults");
                Ok(Settings::default())
            }
        }
    }
}
