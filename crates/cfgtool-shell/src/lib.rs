//! Command shell for editing entity-resolution configurations
//!
//! The shell reads command lines (typed, from a script, or from `-c`), runs
//! them against a [`cfgtool_core::ConfigManager`] and renders the results as
//! JSON, JSON lines or tables.

pub mod cli;
pub mod commands;
pub mod error;
pub mod interactive;
pub mod logging;
pub mod render;
pub mod settings;
pub mod shell;
pub mod suggest;

pub use error::{CliError, Result};
pub use render::{Output, OutputFormat, Theme};
pub use shell::{LineStatus, Shell, ShellOptions};
