//! The in-memory configuration document.

use cfgtool_schema::{EntityKind, Record};
use serde_json::{Map, Value};

use crate::journal::Change;
use crate::{Error, Result};

pub const ROOT_SECTION: &str = "G2_CONFIG";
pub const VERSION_SECTION: &str = "CONFIG_BASE_VERSION";

/// Schema versions this tool knows how to edit.
pub const SUPPORTED_SCHEMA_VERSIONS: &[&str] = &["10", "11"];

/// A parsed `{"G2_CONFIG": {...}}` document.
///
/// Sections the catalog does not describe are carried through untouched so a
/// newer engine's additions survive a load/save cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigDocument {
    config: Map<String, Value>,
    /// Top-level keys beside `G2_CONFIG`
    extra: Map<String, Value>,
}

impl ConfigDocument {
    /// Parse and check a serialized document.
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text).map_err(|e| Error::load(format!("invalid JSON: {e}")))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut extra) = value else {
            return Err(Error::load("document is not a JSON object"));
        };
        let config = match extra.shift_remove(ROOT_SECTION) {
            Some(Value::Object(config)) => config,
            Some(_) => return Err(Error::load(format!("{ROOT_SECTION} is not an object"))),
            None => return Err(Error::load(format!("missing {ROOT_SECTION} section"))),
        };
        let doc = Self { config, extra };
        doc.check_shape()?;
        Ok(doc)
    }

    fn check_shape(&self) -> Result<()> {
        match self.schema_version() {
            Some(version) if SUPPORTED_SCHEMA_VERSIONS.contains(&version) => {}
            Some(version) => {
                return Err(Error::load(format!(
                    "unsupported schema version {version} (supported: {})",
                    SUPPORTED_SCHEMA_VERSIONS.join(", ")
                )));
            }
            None => return Err(Error::load("document does not declare a schema version")),
        }

        for kind in EntityKind::ALL {
            if let Some(table) = self.config.get(kind.table())
                && !is_table(table)
            {
                return Err(Error::load(format!("{} is not an array of objects", kind.table())));
            }
        }
        Ok(())
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_value())?)
    }

    pub fn to_value(&self) -> Value {
        let mut root = Map::with_capacity(self.extra.len() + 1);
        root.insert(ROOT_SECTION.to_string(), Value::Object(self.config.clone()));
        root.extend(self.extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        Value::Object(root)
    }

    /// Declared schema version (`CONFIG_BASE_VERSION.COMPATIBILITY_VERSION.CONFIG_VERSION`).
    pub fn schema_version(&self) -> Option<&str> {
        self.config
            .get(VERSION_SECTION)?
            .get("COMPATIBILITY_VERSION")?
            .get("CONFIG_VERSION")?
            .as_str()
    }

    pub fn section(&self, name: &str) -> Option<&Value> {
        self.config.get(name)
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.config.keys().map(String::as_str)
    }

    /// Rows of the table holding `kind`, in document order.
    pub fn rows(&self, kind: EntityKind) -> impl Iterator<Item = &Record> + Clone {
        self.config
            .get(kind.table())
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .filter_map(Value::as_object)
    }

    pub fn row_count(&self, kind: EntityKind) -> usize {
        self.rows(kind).count()
    }

    fn table_mut(&mut self, kind: EntityKind) -> Result<&mut Vec<Value>> {
        self.config
            .entry(kind.table())
            .or_insert_with(|| Value::Array(Vec::new()))
            .as_array_mut()
            .ok_or_else(|| Error::load(format!("{} is not a table", kind.table())))
    }

    /// Apply one change. Row changes locate their row by full equality with
    /// the recorded before-state.
    pub(crate) fn apply(&mut self, change: &Change) -> Result<()> {
        match change {
            Change::Create { kind, record } => {
                self.table_mut(*kind)?.push(Value::Object(record.clone()));
            }
            Change::Update { kind, before, after } => {
                let rows = self.table_mut(*kind)?;
                let slot = rows
                    .iter_mut()
                    .find(|row| row.as_object() == Some(before))
                    .ok_or_else(|| Error::not_found(*kind, "row changed underneath update"))?;
                *slot = Value::Object(after.clone());
            }
            Change::Delete { kind, record } => {
                let rows = self.table_mut(*kind)?;
                let position = rows
                    .iter()
                    .position(|row| row.as_object() == Some(record))
                    .ok_or_else(|| Error::not_found(*kind, "row already removed"))?;
                rows.remove(position);
            }
            Change::AddSection { name, value } | Change::ReplaceSection { name, value } => {
                self.config.insert(name.clone(), value.clone());
            }
            Change::RemoveSection { name } => {
                self.config.shift_remove(name);
            }
            Change::SetVersion { version } => {
                let base = self
                    .config
                    .entry(VERSION_SECTION)
                    .or_insert_with(|| Value::Object(Map::new()));
                if let Value::Object(base) = base {
                    let compat = base
                        .entry("COMPATIBILITY_VERSION")
                        .or_insert_with(|| Value::Object(Map::new()));
                    if let Value::Object(compat) = compat {
                        compat.insert("CONFIG_VERSION".to_string(), Value::String(version.clone()));
                    }
                }
            }
            Change::ReplaceDocument { document } => {
                *self = (**document).clone();
            }
        }
        Ok(())
    }
}

/// Whether a section value has table shape: an array of objects.
pub fn is_table(value: &Value) -> bool {
    value.as_array().is_some_and(|rows| rows.iter().all(Value::is_object))
}
