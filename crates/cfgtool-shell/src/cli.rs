//! CLI argument parsing using clap derive

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::render::{OutputFormat, Theme};
use crate::settings::{ColorChoice, Settings};

/// Edit the entity-resolution configuration stored in a configuration store.
///
/// Without a script or `-c`, starts an interactive shell when stdin is a
/// terminal and otherwise reads commands from stdin.
#[derive(Parser, Debug)]
#[command(name = "sz_configtool")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// File of commands to run, one per line
    pub file: Option<PathBuf>,

    /// Run a command and exit; repeat to run several in order
    #[arg(short = 'c', long = "command", value_name = "COMMAND")]
    pub commands: Vec<String>,

    /// Skip confirmations for deletes
    #[arg(short, long)]
    pub force: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Do not read or write the history file
    #[arg(short = 'H', long)]
    pub no_history: bool,

    /// Settings file
    #[arg(long, value_name = "PATH", env = "SZ_CONFIGTOOL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Configuration store directory
    #[arg(long, value_name = "DIR", env = "SZ_CONFIGTOOL_STORE")]
    pub store_dir: Option<PathBuf>,

    /// Initial output format for list and get commands
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Colour theme
    #[arg(long, value_name = "THEME", default_value = "default")]
    pub theme: Theme,

    /// When to colour output
    #[arg(long, value_enum, value_name = "WHEN")]
    pub color: Option<ColorArg>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorArg {
    Auto,
    Always,
    Never,
}

impl From<ColorArg> for ColorChoice {
    fn from(value: ColorArg) -> Self {
        match value {
            ColorArg::Auto => ColorChoice::Auto,
            ColorArg::Always => ColorChoice::Always,
            ColorArg::Never => ColorChoice::Never,
        }
    }
}

impl Cli {
    /// Lay the command-line flags over settings read from file.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(dir) = &self.store_dir {
            settings.store_dir = Some(dir.clone());
        }
        if self.force {
            settings.force = true;
        }
        if self.no_history {
            settings.history_file = None;
        }
        if let Some(format) = self.format {
            settings.default_format = format;
        }
        if let Some(color) = self.color {
            settings.color = color.into();
        }
    }

    /// Whether commands come from somewhere other than stdin.
    pub fn is_batch(&self) -> bool {
        !self.commands.is_empty() || self.file.is_some()
    }
}
