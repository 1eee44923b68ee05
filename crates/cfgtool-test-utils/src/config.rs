//! [`TestConfig`] builder for configuration documents.

use cfgtool_store::{DEFAULT_TEMPLATE, MemoryStore};
use serde_json::{Map, Value, json};

/// Builds a configuration document for a test, starting from the built-in
/// template or from an empty shell.
///
/// # Example
///
/// ```rust
/// use cfgtool_test_utils::TestConfig;
/// use serde_json::json;
///
/// let text = TestConfig::template()
///     .with_row("CFG_DSRC", json!({"DSRC_ID": 1000, "DSRC_CODE": "CUSTOMERS"}))
///     .to_json();
/// assert!(text.contains("CUSTOMERS"));
/// ```
#[derive(Debug, Clone)]
pub struct TestConfig {
    root: Value,
}

impl TestConfig {
    /// The built-in default configuration.
    pub fn template() -> Self {
        let root = serde_json::from_str(DEFAULT_TEMPLATE).unwrap();
        Self { root }
    }

    /// A document with only a version section and no tables.
    pub fn empty() -> Self {
        Self {
            root: json!({
                "G2_CONFIG": {
                    "CONFIG_BASE_VERSION": {
                        "VERSION": "4.0.0",
                        "COMPATIBILITY_VERSION": {"CONFIG_VERSION": "11"}
                    }
                }
            }),
        }
    }

    fn config_mut(&mut self) -> &mut Map<String, Value> {
        self.root
            .get_mut("G2_CONFIG")
            .and_then(Value::as_object_mut)
            .expect("TestConfig: G2_CONFIG is not an object")
    }

    /// Replace a whole section.
    pub fn with_section(mut self, name: &str, value: Value) -> Self {
        self.config_mut().insert(name.to_string(), value);
        self
    }

    /// Append one row to a table, creating the table when missing.
    pub fn with_row(mut self, table: &str, row: Value) -> Self {
        let rows = self
            .config_mut()
            .entry(table)
            .or_insert_with(|| Value::Array(Vec::new()));
        rows.as_array_mut()
            .unwrap_or_else(|| panic!("TestConfig: {table} is not a table"))
            .push(row);
        self
    }

    /// Remove rows of `table` whose `field` equals `value`.
    pub fn without_rows(mut self, table: &str, field: &str, value: Value) -> Self {
        if let Some(rows) = self.config_mut().get_mut(table).and_then(Value::as_array_mut) {
            rows.retain(|row| row.get(field) != Some(&value));
        }
        self
    }

    pub fn without_section(mut self, name: &str) -> Self {
        self.config_mut().shift_remove(name);
        self
    }

    /// Set the declared schema version.
    pub fn with_version(mut self, version: &str) -> Self {
        let base = self
            .config_mut()
            .entry("CONFIG_BASE_VERSION")
            .or_insert_with(|| json!({}));
        base["COMPATIBILITY_VERSION"] = json!({"CONFIG_VERSION": version});
        self
    }

    /// A rule whose qualifier fragment does not exist.
    pub fn with_broken_rule(self, code: &str) -> Self {
        self.with_row(
            "CFG_ERRULE",
            json!({
                "ERRULE_ID": 900,
                "ERRULE_CODE": code,
                "ERRULE_DESC": code,
                "RESOLVE": "Yes",
                "RELATE": "No",
                "RTYPE_ID": 1,
                "QUAL_ERFRAG_CODE": "NO_SUCH_FRAGMENT",
                "DISQ_ERFRAG_CODE": null,
                "ERRULE_TIER": 90
            }),
        )
    }

    pub fn to_value(&self) -> Value {
        self.root.clone()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.root).unwrap()
    }

    /// An in-memory store whose default configuration is this document.
    pub fn memory_store(&self) -> MemoryStore {
        MemoryStore::with_document(self.to_json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_edits_tables() {
        let value = TestConfig::empty()
            .with_row("CFG_DSRC", json!({"DSRC_ID": 1, "DSRC_CODE": "A"}))
            .with_row("CFG_DSRC", json!({"DSRC_ID": 2, "DSRC_CODE": "B"}))
            .without_rows("CFG_DSRC", "DSRC_CODE", json!("A"))
            .to_value();
        assert_eq!(value["G2_CONFIG"]["CFG_DSRC"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn version_can_be_overridden() {
        let value = TestConfig::template().with_version("9").to_value();
        assert_eq!(
            value["G2_CONFIG"]["CONFIG_BASE_VERSION"]["COMPATIBILITY_VERSION"]["CONFIG_VERSION"],
            json!("9")
        );
    }
}
