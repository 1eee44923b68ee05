//! Domain managers
//!
//! Each manager owns the entity kinds of one [`Domain`] and enforces that
//! domain's rules. The generic create/update/delete flow lives in the
//! free functions of this module; managers customise it through the
//! [`DomainManager::prepare`] and [`DomainManager::validate`] hooks and add
//! their own composite operations on top.

mod data_source;
mod feature;
mod function;
mod rules;
mod system;

pub use data_source::DataSourceManager;
pub(crate) use feature::check_removal_keeps_activation;
pub use feature::{ElementSpec, FeatureManager, FeatureRequest, TEMPLATES, Template, active_rules_using, feature_view};
pub use function::{CallFamily, FunctionManager, call_view, threshold_selector};
pub use rules::RulesManager;
pub use system::{SectionInfo, SystemManager, WRITE_ONCE_SETTINGS, locked_settings};

use cfgtool_schema::{ApiRecord, Domain, EntityKind, RefBy, Record, to_api, to_internal, value_key};
use serde_json::Value;
use std::fmt;

use crate::base::{Filter, Selector, record_code, record_id};
use crate::document::ConfigDocument;
use crate::integrity;
use crate::journal::Change;
use crate::scope::Scope;
use crate::{Error, Result};

/// Uniform entry points every domain manager offers.
///
/// The default methods implement the generic flow; a manager overrides them
/// only where its kinds need something different.
pub trait DomainManager: fmt::Debug {
    fn domain(&self) -> Domain;

    /// Fill defaults on a record about to be created.
    fn prepare(&self, _kind: EntityKind, _record: &mut Record, _doc: &ConfigDocument) -> Result<()> {
        Ok(())
    }

    /// Domain rules for a record about to be written. `before` is the
    /// current row on update.
    fn validate(
        &self,
        _kind: EntityKind,
        _doc: &ConfigDocument,
        _record: &Record,
        _before: Option<&Record>,
    ) -> Result<()> {
        Ok(())
    }

    fn create(&self, scope: &mut Scope<'_>, kind: EntityKind, fields: &ApiRecord) -> Result<ApiRecord> {
        create(self, scope, kind, fields)
    }

    fn update(
        &self,
        scope: &mut Scope<'_>,
        kind: EntityKind,
        selector: &Selector,
        fields: &ApiRecord,
    ) -> Result<ApiRecord> {
        update(self, scope, kind, selector, fields)
    }

    fn delete(&self, scope: &mut Scope<'_>, kind: EntityKind, selector: &Selector) -> Result<Record> {
        delete(scope, kind, selector)
    }

    fn get(&self, doc: &ConfigDocument, kind: EntityKind, selector: &Selector) -> Result<ApiRecord> {
        let record = crate::base::BaseManager::new(kind, doc).resolve(selector)?;
        Ok(to_api(kind, record))
    }

    fn list(&self, doc: &ConfigDocument, kind: EntityKind, filter: &Filter) -> Result<Vec<ApiRecord>> {
        Ok(crate::base::BaseManager::new(kind, doc)
            .list(filter)
            .map(|r| to_api(kind, r))
            .collect())
    }
}

/// Upper-case codes, code references and string key fields in place.
pub(crate) fn normalize(kind: EntityKind, record: &mut Record) {
    let spec = kind.spec();
    let mut fields: Vec<&str> = spec.code_field.into_iter().collect();
    fields.extend(spec.key_fields.iter().copied());
    fields.extend(
        spec.references
            .iter()
            .filter(|r| r.by == RefBy::Code)
            .map(|r| r.field),
    );
    for field in fields {
        if let Some(Value::String(text)) = record.get_mut(field) {
            *text = text.trim().to_uppercase();
        }
    }
}

/// Insert `value` only when `field` is absent or null.
pub(crate) fn set_default(record: &mut Record, field: &str, value: impl Into<Value>) {
    if record.get(field).is_none_or(Value::is_null) {
        record.insert(field.to_string(), value.into());
    }
}

/// Generic create: translate, normalise, fill defaults, assign an id, check
/// uniqueness and references, then commit.
pub fn create<M: DomainManager + ?Sized>(
    manager: &M,
    scope: &mut Scope<'_>,
    kind: EntityKind,
    fields: &ApiRecord,
) -> Result<ApiRecord> {
    let record = to_internal(kind, fields)?;
    let record = create_record(manager, scope, kind, record)?;
    Ok(to_api(kind, &record))
}

/// [`create`] for a record already in internal names.
pub(crate) fn create_record<M: DomainManager + ?Sized>(
    manager: &M,
    scope: &mut Scope<'_>,
    kind: EntityKind,
    mut record: Record,
) -> Result<Record> {
    let spec = kind.spec();
    if spec.read_only {
        return Err(Error::invalid(kind, spec.table, "reference data cannot be modified"));
    }
    normalize(kind, &mut record);
    manager.prepare(kind, &mut record, scope.doc())?;

    if let Some(code_field) = spec.code_field {
        if record_code(spec, &record).is_none_or(|c| c.is_empty()) {
            let name = spec.code_api_name().unwrap_or(code_field);
            return Err(Error::invalid(kind, name, "is required"));
        }
    } else {
        let optional = |field: &str| spec.references.iter().any(|r| r.field == field && r.optional);
        for field in spec.key_fields.iter().filter(|f| !optional(**f)) {
            if record.get(*field).and_then(value_key).is_none() {
                let name = cfgtool_schema::api_name(kind, field).unwrap_or(field);
                return Err(Error::invalid(kind, name, "is required"));
            }
        }
    }

    if let Some(id_field) = spec.id_field {
        match record.get(id_field) {
            Some(value) if !value.is_null() => {
                let id = record_id(spec, &record)
                    .ok_or_else(|| Error::invalid(kind, "id", "must be an integer"))?;
                if scope.base(kind).find_by_id(id).is_some() {
                    return Err(Error::invalid(kind, "id", format!("{id} is already in use")));
                }
                if id < spec.id_floor {
                    return Err(Error::invalid(
                        kind,
                        "id",
                        format!("{id} is below the reserved floor {}", spec.id_floor),
                    ));
                }
                if scope.session().retired.contains(kind, id) {
                    return Err(Error::invalid(
                        kind,
                        "id",
                        format!("{id} belonged to a row deleted this session"),
                    ));
                }
                record.insert(id_field.to_string(), Value::from(id));
            }
            _ => {
                let id = scope.reserve_next_id(kind);
                record.insert(id_field.to_string(), Value::from(id));
            }
        }
    }

    let base = scope.base(kind);
    match record_code(spec, &record) {
        Some(code) => base.assert_unique_code(code)?,
        None => base.assert_unique_key(&record, None)?,
    }
    integrity::check_references(scope.doc(), kind, &record)?;
    manager.validate(kind, scope.doc(), &record, None)?;

    scope.commit(Change::Create {
        kind,
        record: record.clone(),
    })?;
    Ok(record)
}

/// Generic partial update. Identity fields (id, code, key) cannot change.
pub fn update<M: DomainManager + ?Sized>(
    manager: &M,
    scope: &mut Scope<'_>,
    kind: EntityKind,
    selector: &Selector,
    fields: &ApiRecord,
) -> Result<ApiRecord> {
    let changes = to_internal(kind, fields)?;
    let before = scope.base(kind).resolve(selector)?.clone();
    let after = update_record(manager, scope, kind, before, changes)?;
    Ok(to_api(kind, &after))
}

/// [`update`] for changes already in internal names.
pub(crate) fn update_record<M: DomainManager + ?Sized>(
    manager: &M,
    scope: &mut Scope<'_>,
    kind: EntityKind,
    before: Record,
    mut changes: Record,
) -> Result<Record> {
    let spec = kind.spec();
    if spec.read_only {
        return Err(Error::invalid(kind, spec.table, "reference data cannot be modified"));
    }
    normalize(kind, &mut changes);

    let mut identity: Vec<&str> = spec.id_field.into_iter().chain(spec.code_field).collect();
    identity.extend(spec.key_fields.iter().copied());

    let mut after = before.clone();
    for (field, value) in changes {
        if identity.contains(&field.as_str()) {
            let same = match (before.get(&field).and_then(value_key), value_key(&value)) {
                (Some(a), Some(b)) => a.eq_ignore_ascii_case(&b),
                (None, None) => true,
                _ => false,
            };
            if !same {
                let name = cfgtool_schema::api_name(kind, &field).unwrap_or(&field);
                return Err(Error::invalid(kind, name, "cannot be changed"));
            }
            continue;
        }
        after.insert(field, value);
    }

    if after == before {
        return Ok(after);
    }
    integrity::check_references(scope.doc(), kind, &after)?;
    manager.validate(kind, scope.doc(), &after, Some(&before))?;
    scope.commit(Change::Update {
        kind,
        before,
        after: after.clone(),
    })?;
    Ok(after)
}

/// Generic delete: refused while anything still references the row.
pub fn delete(scope: &mut Scope<'_>, kind: EntityKind, selector: &Selector) -> Result<Record> {
    let record = scope.base(kind).resolve(selector)?.clone();
    delete_record(scope, kind, record)
}

pub(crate) fn delete_record(scope: &mut Scope<'_>, kind: EntityKind, record: Record) -> Result<Record> {
    if kind.spec().read_only {
        return Err(Error::invalid(kind, kind.table(), "reference data cannot be modified"));
    }
    let dependents = integrity::dependents(scope.doc(), kind, &record);
    if !dependents.is_empty() {
        return Err(Error::ReferentialIntegrity {
            kind,
            key: crate::base::describe(kind, &record),
            dependents,
        });
    }
    scope.commit(Change::Delete {
        kind,
        record: record.clone(),
    })?;
    Ok(record)
}

/// A string field of an API record, trimmed.
pub(crate) fn text_arg<'r>(fields: &'r ApiRecord, name: &str) -> Option<&'r str> {
    fields.get(name).and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty())
}

/// Like [`text_arg`], failing with `InvalidField` when absent.
pub(crate) fn require_text<'r>(subject: impl fmt::Display, fields: &'r ApiRecord, name: &str) -> Result<&'r str> {
    text_arg(fields, name).ok_or_else(|| Error::invalid(subject, name, "is required"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::Journal;
    use crate::scope::Session;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[derive(Debug)]
    struct Plain;

    impl DomainManager for Plain {
        fn domain(&self) -> Domain {
            Domain::DataSources
        }
    }

    fn doc() -> ConfigDocument {
        ConfigDocument::from_value(json!({
            "G2_CONFIG": {
                "CONFIG_BASE_VERSION": {"COMPATIBILITY_VERSION": {"CONFIG_VERSION": "11"}},
                "CFG_DSRC": [{"DSRC_ID": 1000, "DSRC_CODE": "TEST", "DSRC_DESC": "Test"}]
            }
        }))
        .unwrap()
    }

    fn api(value: Value) -> ApiRecord {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn create_assigns_id_and_normalises_code() {
        let mut doc = doc();
        let mut journal = Journal::new();
        let mut session = Session::default();
        let mut scope = Scope::new(Domain::DataSources, &mut doc, &mut journal, &mut session);
        let view = Plain
            .create(&mut scope, EntityKind::DataSource, &api(json!({"dataSource": " customers "})))
            .unwrap();
        assert_eq!(view["id"], json!(1001));
        assert_eq!(view["dataSource"], json!("CUSTOMERS"));
        assert_eq!(journal.len(), 1);
    }

    #[test]
    fn create_rejects_missing_code_and_taken_id() {
        let mut doc = doc();
        let mut journal = Journal::new();
        let mut session = Session::default();
        let mut scope = Scope::new(Domain::DataSources, &mut doc, &mut journal, &mut session);
        let err = Plain
            .create(&mut scope, EntityKind::DataSource, &api(json!({"description": "x"})))
            .unwrap_err();
        assert!(err.to_string().contains("dataSource"), "{err}");

        let err = Plain
            .create(&mut scope, EntityKind::DataSource, &api(json!({"dataSource": "B", "id": 1000})))
            .unwrap_err();
        assert!(err.to_string().contains("already in use"), "{err}");
    }

    #[test]
    fn update_keeps_identity_and_drops_noops() {
        let mut doc = doc();
        let mut journal = Journal::new();
        let mut session = Session::default();
        let mut scope = Scope::new(Domain::DataSources, &mut doc, &mut journal, &mut session);
        let selector = Selector::Code("test".into());

        let err = Plain
            .update(&mut scope, EntityKind::DataSource, &selector, &api(json!({"dataSource": "OTHER"})))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidField { .. }));

        Plain
            .update(&mut scope, EntityKind::DataSource, &selector, &api(json!({"description": "Test"})))
            .unwrap();
        assert!(journal.is_empty());
    }

    #[test]
    fn read_only_kinds_refuse_writes() {
        let mut doc = doc();
        let mut journal = Journal::new();
        let mut session = Session::default();
        let mut scope = Scope::new(Domain::Rules, &mut doc, &mut journal, &mut session);
        let err = Plain
            .create(&mut scope, EntityKind::RuleType, &api(json!({"ruleType": "NEW"})))
            .unwrap_err();
        assert!(err.to_string().contains("reference data"), "{err}");
    }
}
