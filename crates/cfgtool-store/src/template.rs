//! Built-in default configuration.

/// The document a fresh store starts from: engine reference data (feature
/// classes, rule types, a handful of elements and parameters) and empty
/// tables for everything users add.
pub const DEFAULT_TEMPLATE: &str = include_str!("default_config.json");
