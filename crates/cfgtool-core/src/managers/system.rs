//! System parameters, compatibility version and raw config sections.

use cfgtool_schema::{ApiRecord, Domain, EntityKind, Record, to_api};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

use super::{DomainManager, create_record, update_record};
use crate::base::{BaseManager, Selector, record_code};
use crate::document::{ConfigDocument, SUPPORTED_SCHEMA_VERSIONS, VERSION_SECTION, is_table};
use crate::journal::Change;
use crate::scope::Scope;
use crate::{Error, Result};

/// Settings that cannot change once a document holding them was persisted.
pub const WRITE_ONCE_SETTINGS: &[&str] = &["IDENTIFYING_FIELDS", "RECORD_KEY_FIELDS", "HASH_ALGORITHM"];

/// One entry of the section listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionInfo {
    pub name: String,
    /// Row count for table sections
    pub rows: Option<usize>,
    /// Whether the catalog knows this section
    pub managed: bool,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemManager;

/// Write-once settings present in `doc`.
pub fn locked_settings(doc: &ConfigDocument) -> BTreeSet<String> {
    let spec = EntityKind::SystemParameter.spec();
    doc.rows(EntityKind::SystemParameter)
        .filter_map(|r| record_code(spec, r))
        .map(str::to_uppercase)
        .filter(|code| WRITE_ONCE_SETTINGS.contains(&code.as_str()))
        .collect()
}

fn check_unlocked(scope: &Scope<'_>, code: &str) -> Result<()> {
    let code = code.trim().to_uppercase();
    if scope.session().locked_settings.contains(&code) {
        return Err(Error::ImmutableSetting { setting: code });
    }
    Ok(())
}

impl DomainManager for SystemManager {
    fn domain(&self) -> Domain {
        Domain::System
    }

    fn validate(&self, kind: EntityKind, _doc: &ConfigDocument, record: &Record, _before: Option<&Record>) -> Result<()> {
        if kind == EntityKind::SystemParameter && record.get("PARAM_VALUE").is_some_and(|v| v.is_array() || v.is_object()) {
            return Err(Error::invalid(kind, "value", "must be a scalar"));
        }
        Ok(())
    }

    fn update(
        &self,
        scope: &mut Scope<'_>,
        kind: EntityKind,
        selector: &Selector,
        fields: &ApiRecord,
    ) -> Result<ApiRecord> {
        let before = scope.base(kind).resolve(selector)?.clone();
        if kind == EntityKind::SystemParameter {
            let changes = cfgtool_schema::to_internal(kind, fields)?;
            let mut after = before.clone();
            after.extend(changes.clone());
            if after != before {
                check_unlocked(scope, record_code(kind.spec(), &before).unwrap_or_default())?;
            }
            let after = update_record(self, scope, kind, before, changes)?;
            return Ok(to_api(kind, &after));
        }
        super::update(self, scope, kind, selector, fields)
    }

    fn delete(&self, scope: &mut Scope<'_>, kind: EntityKind, selector: &Selector) -> Result<Record> {
        let record = scope.base(kind).resolve(selector)?.clone();
        if kind == EntityKind::SystemParameter {
            check_unlocked(scope, record_code(kind.spec(), &record).unwrap_or_default())?;
        }
        super::delete_record(scope, kind, record)
    }
}

impl SystemManager {
    /// Create or overwrite a system parameter.
    pub fn set_parameter(&self, scope: &mut Scope<'_>, code: &str, value: Value) -> Result<ApiRecord> {
        let kind = EntityKind::SystemParameter;
        let existing = scope.base(kind).find_by_code(code).cloned();
        let record = match existing {
            Some(before) => {
                if before.get("PARAM_VALUE") == Some(&value) {
                    return Ok(to_api(kind, &before));
                }
                check_unlocked(scope, code)?;
                let mut changes = Record::new();
                changes.insert("PARAM_VALUE".to_string(), value);
                update_record(self, scope, kind, before, changes)?
            }
            None => {
                let mut record = Record::new();
                record.insert("PARAM_CODE".to_string(), Value::from(code));
                record.insert("PARAM_VALUE".to_string(), value);
                create_record(self, scope, kind, record)?
            }
        };
        Ok(to_api(kind, &record))
    }

    pub fn get_parameter(&self, doc: &ConfigDocument, code: &str) -> Result<ApiRecord> {
        let kind = EntityKind::SystemParameter;
        let record = BaseManager::new(kind, doc).get_by_code(code)?;
        Ok(to_api(kind, record))
    }

    pub fn compatibility_version(&self, doc: &ConfigDocument) -> Option<String> {
        doc.schema_version().map(str::to_string)
    }

    pub fn update_compatibility_version(&self, scope: &mut Scope<'_>, version: &str) -> Result<()> {
        let version = version.trim();
        if !SUPPORTED_SCHEMA_VERSIONS.contains(&version) {
            return Err(Error::invalid(
                "compatibility version",
                "version",
                format!("{version} is not one of {}", SUPPORTED_SCHEMA_VERSIONS.join(", ")),
            ));
        }
        if scope.doc().schema_version() == Some(version) {
            return Ok(());
        }
        scope.commit(Change::SetVersion {
            version: version.to_string(),
        })?;
        Ok(())
    }

    pub fn verify_compatibility_version(&self, doc: &ConfigDocument, expected: &str) -> bool {
        doc.schema_version() == Some(expected.trim())
    }

    pub fn list_sections(&self, doc: &ConfigDocument) -> Vec<SectionInfo> {
        doc.section_names()
            .map(|name| {
                let value = doc.section(name);
                SectionInfo {
                    name: name.to_string(),
                    rows: value.filter(|v| is_table(v)).and_then(Value::as_array).map(Vec::len),
                    managed: EntityKind::from_table(name).is_some() || name == VERSION_SECTION,
                }
            })
            .collect()
    }

    pub fn get_section<'d>(&self, doc: &'d ConfigDocument, name: &str) -> Result<&'d Value> {
        doc.section(name.trim()).ok_or_else(|| missing_section(name))
    }

    /// Add a new section; an empty table unless `value` is given.
    pub fn add_section(&self, scope: &mut Scope<'_>, name: &str, value: Option<Value>) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::invalid("configuration", "section", "name is required"));
        }
        if scope.doc().section(name).is_some() {
            return Err(Error::invalid("configuration", "section", format!("{name} already exists")));
        }
        let value = value.unwrap_or_else(|| Value::Array(Vec::new()));
        if EntityKind::from_table(name).is_some() && value.as_array().is_none_or(|rows| !rows.is_empty()) {
            return Err(Error::invalid(
                name,
                "section",
                "a managed table starts empty; add its rows with the entity commands",
            ));
        }
        scope.commit(Change::AddSection {
            name: name.to_string(),
            value,
        })?;
        Ok(())
    }

    /// Remove a section. Managed tables go only when empty; the version
    /// section never does.
    pub fn remove_section(&self, scope: &mut Scope<'_>, name: &str) -> Result<()> {
        let name = name.trim();
        let value = scope.doc().section(name).ok_or_else(|| missing_section(name))?;
        if name == VERSION_SECTION {
            return Err(Error::invalid(name, "section", "cannot be removed"));
        }
        if EntityKind::from_table(name).is_some() && value.as_array().is_some_and(|rows| !rows.is_empty()) {
            return Err(Error::invalid(name, "section", "still holds rows"));
        }
        scope.commit(Change::RemoveSection { name: name.to_string() })?;
        Ok(())
    }

    /// Add `field` to an object section, or to every row of a table section.
    pub fn add_section_field(&self, scope: &mut Scope<'_>, name: &str, field: &str, value: Value) -> Result<()> {
        let name = name.trim();
        let field = field.trim();
        if let Some(kind) = EntityKind::from_table(name)
            && kind.spec().structural_fields().iter().any(|f| f.eq_ignore_ascii_case(field))
        {
            return Err(Error::invalid(name, field, "is an id, code, key or reference field"));
        }
        let mut section = scope.doc().section(name).ok_or_else(|| missing_section(name))?.clone();
        match &mut section {
            Value::Object(map) => {
                if map.contains_key(field) {
                    return Err(Error::invalid(name, field, "already exists"));
                }
                map.insert(field.to_string(), value);
            }
            Value::Array(rows) if rows.iter().all(Value::is_object) => {
                let rows: Vec<&mut Map<String, Value>> = rows.iter_mut().filter_map(Value::as_object_mut).collect();
                if rows.iter().any(|r| r.contains_key(field)) {
                    return Err(Error::invalid(name, field, "already exists"));
                }
                for row in rows {
                    row.insert(field.to_string(), value.clone());
                }
            }
            _ => return Err(Error::invalid(name, "section", "holds neither fields nor rows")),
        }
        scope.commit(Change::ReplaceSection {
            name: name.to_string(),
            value: section,
        })?;
        Ok(())
    }

    /// Remove `field` from an object section or from every row of a table.
    /// Fields the catalog relies on stay.
    pub fn remove_section_field(&self, scope: &mut Scope<'_>, name: &str, field: &str) -> Result<()> {
        let name = name.trim();
        let field = field.trim();
        if let Some(kind) = EntityKind::from_table(name)
            && kind.spec().structural_fields().iter().any(|f| f.eq_ignore_ascii_case(field))
        {
            return Err(Error::invalid(name, field, "is an id, code, key or reference field"));
        }
        let mut section = scope.doc().section(name).ok_or_else(|| missing_section(name))?.clone();
        let removed = match &mut section {
            Value::Object(map) => map.shift_remove(field).is_some(),
            Value::Array(rows) => rows
                .iter_mut()
                .filter_map(Value::as_object_mut)
                .fold(false, |any, row| row.shift_remove(field).is_some() || any),
            _ => false,
        };
        if !removed {
            return Err(Error::invalid(name, field, "no such field"));
        }
        scope.commit(Change::ReplaceSection {
            name: name.to_string(),
            value: section,
        })?;
        Ok(())
    }

    /// Stamp `LAST_UPDATED` in the version section; returns the stamp.
    pub fn touch(&self, scope: &mut Scope<'_>) -> Result<String> {
        let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let mut section = scope
            .doc()
            .section(VERSION_SECTION)
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));
        if let Value::Object(map) = &mut section {
            map.insert("LAST_UPDATED".to_string(), Value::from(stamp.clone()));
        }
        scope.commit(Change::ReplaceSection {
            name: VERSION_SECTION.to_string(),
            value: section,
        })?;
        Ok(stamp)
    }
}

fn missing_section(name: &str) -> Error {
    Error::invalid("configuration", "section", format!("no section named {}", name.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::Journal;
    use crate::scope::Session;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn doc() -> ConfigDocument {
        ConfigDocument::parse(cfgtool_store::DEFAULT_TEMPLATE).unwrap()
    }

    #[test]
    fn set_parameter_upserts() {
        let mut doc = doc();
        let mut journal = Journal::new();
        let mut session = Session::default();
        let mut scope = Scope::new(Domain::System, &mut doc, &mut journal, &mut session);
        SystemManager
            .set_parameter(&mut scope, "max_related_entities", json!("100"))
            .unwrap();
        let view = SystemManager.set_parameter(&mut scope, "NEW_PARAM", json!("x")).unwrap();
        assert_eq!(view["parameter"], json!("NEW_PARAM"));
        assert_eq!(view["id"], json!(2));
        let view = SystemManager.get_parameter(scope.doc(), "MAX_RELATED_ENTITIES").unwrap();
        assert_eq!(view["value"], json!("100"));
        assert_eq!(journal.len(), 2);
    }

    #[test]
    fn locked_setting_cannot_change() {
        let mut doc = doc();
        let mut journal = Journal::new();
        let mut session = Session::default();
        {
            let mut scope = Scope::new(Domain::System, &mut doc, &mut journal, &mut session);
            SystemManager
                .set_parameter(&mut scope, "HASH_ALGORITHM", json!("SHA256"))
                .unwrap();
            // Not yet persisted, so still editable.
            SystemManager
                .set_parameter(&mut scope, "HASH_ALGORITHM", json!("SHA512"))
                .unwrap();
        }
        session.locked_settings = locked_settings(&doc);
        let mut scope = Scope::new(Domain::System, &mut doc, &mut journal, &mut session);
        SystemManager
            .set_parameter(&mut scope, "HASH_ALGORITHM", json!("SHA512"))
            .unwrap();
        let err = SystemManager
            .set_parameter(&mut scope, "HASH_ALGORITHM", json!("MD5"))
            .unwrap_err();
        assert!(matches!(err, Error::ImmutableSetting { .. }));
        let err = SystemManager
            .delete(&mut scope, EntityKind::SystemParameter, &Selector::Code("HASH_ALGORITHM".into()))
            .unwrap_err();
        assert_eq!(err.code(), "CFG005");
    }

    #[test]
    fn compatibility_version_round() {
        let mut doc = doc();
        let mut journal = Journal::new();
        let mut session = Session::default();
        let mut scope = Scope::new(Domain::System, &mut doc, &mut journal, &mut session);
        assert_eq!(SystemManager.compatibility_version(scope.doc()).as_deref(), Some("11"));
        assert!(SystemManager.update_compatibility_version(&mut scope, "99").is_err());
        SystemManager.update_compatibility_version(&mut scope, "10").unwrap();
        assert!(SystemManager.verify_compatibility_version(scope.doc(), "10"));
        assert!(!SystemManager.verify_compatibility_version(scope.doc(), "11"));
    }

    #[test]
    fn section_lifecycle() {
        let mut doc = doc();
        let mut journal = Journal::new();
        let mut session = Session::default();
        let mut scope = Scope::new(Domain::System, &mut doc, &mut journal, &mut session);
        SystemManager.add_section(&mut scope, "CFG_CUSTOM", None).unwrap();
        assert!(SystemManager.add_section(&mut scope, "CFG_CUSTOM", None).is_err());
        SystemManager
            .add_section_field(&mut scope, "CFG_DSRC", "DSRC_NOTE", json!(""))
            .unwrap();
        assert!(scope.doc().rows(EntityKind::DataSource).all(|r| r.contains_key("DSRC_NOTE")));
        SystemManager.remove_section_field(&mut scope, "CFG_DSRC", "DSRC_NOTE").unwrap();

        let err = SystemManager.remove_section_field(&mut scope, "CFG_DSRC", "DSRC_CODE").unwrap_err();
        assert!(err.to_string().contains("key"), "{err}");
        assert!(SystemManager.remove_section(&mut scope, "CFG_DSRC").is_err());
        assert!(SystemManager.remove_section(&mut scope, VERSION_SECTION).is_err());
        SystemManager.remove_section(&mut scope, "CFG_CUSTOM").unwrap();

        let sections = SystemManager.list_sections(scope.doc());
        assert!(sections.iter().any(|s| s.name == "CFG_ATTR" && s.managed && s.rows == Some(12)));
        assert!(!sections.iter().any(|s| s.name == "CFG_CUSTOM"));
    }

    #[test]
    fn touch_stamps_version_section() {
        let mut doc = doc();
        let mut journal = Journal::new();
        let mut session = Session::default();
        let mut scope = Scope::new(Domain::System, &mut doc, &mut journal, &mut session);
        let stamp = SystemManager.touch(&mut scope).unwrap();
        assert_eq!(scope.doc().section(VERSION_SECTION).unwrap()["LAST_UPDATED"], json!(stamp));
        assert_eq!(journal.len(), 1);
    }
}
