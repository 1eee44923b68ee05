//! ConfigManager implementation
//!
//! The orchestrator owns the loaded document, its change journal and the
//! session state, and coordinates the domain managers. Every mutating call
//! runs as a transaction: on error the document, journal and session are
//! restored to what they were before the call.

use std::path::Path;

use cfgtool_schema::{ApiRecord, Domain, EntityKind, Record, internal_name, to_api};
use cfgtool_store::{ConfigId, ConfigStore, RegistryEntry};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::base::{BaseManager, Filter, Selector, describe, record_code};
use crate::document::ConfigDocument;
use crate::integrity::{self, ValidationReport};
use crate::journal::{Change, Journal};
use crate::managers::{
    CallFamily, DataSourceManager, DomainManager, FeatureManager, FeatureRequest, FunctionManager, RulesManager,
    SectionInfo, SystemManager, check_removal_keeps_activation, feature_view, locked_settings,
};
use crate::scope::{Scope, Session};
use crate::{Error, Result};

/// Lifecycle state of the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Unloaded,
    Clean,
    Dirty,
}

/// Row count of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableCount {
    pub kind: EntityKind,
    pub table: &'static str,
    pub rows: usize,
}

/// Summary of the loaded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub config_id: Option<ConfigId>,
    pub schema_version: Option<String>,
    pub pending_changes: usize,
    pub tables: Vec<TableCount>,
}

/// Result of a delete: the removed row and the owned rows removed with it.
#[derive(Debug, Clone, PartialEq)]
pub struct Deleted {
    pub record: ApiRecord,
    pub cascaded: Vec<(EntityKind, String)>,
}

/// The manager handling one domain.
pub fn domain_manager(domain: Domain) -> &'static dyn DomainManager {
    match domain {
        Domain::DataSources => &DataSourceManager,
        Domain::Features => &FeatureManager,
        Domain::Functions => &FunctionManager,
        Domain::Rules => &RulesManager,
        Domain::System => &SystemManager,
    }
}

#[derive(Debug, Clone)]
struct Loaded {
    doc: ConfigDocument,
    journal: Journal,
    session: Session,
    config_id: Option<ConfigId>,
}

impl Loaded {
    fn scope(&mut self, domain: Domain) -> Scope<'_> {
        Scope::new(domain, &mut self.doc, &mut self.journal, &mut self.session)
    }
}

/// Coordinates the domain managers over one configuration document.
///
/// The manager starts unloaded; [`ConfigManager::load`] fetches the default
/// configuration from the store. Changes accumulate in the journal until
/// [`ConfigManager::save`] persists them.
#[derive(Debug)]
pub struct ConfigManager {
    store: Box<dyn ConfigStore>,
    loaded: Option<Loaded>,
}

impl ConfigManager {
    pub fn new(store: Box<dyn ConfigStore>) -> Self {
        Self { store, loaded: None }
    }

    /// Create a manager and load the store's default configuration.
    ///
    /// # Errors
    ///
    /// Returns `Load` for a malformed or unsupported document and
    /// `Persistence` when the store cannot be reached.
    pub fn open(store: Box<dyn ConfigStore>) -> Result<Self> {
        let mut manager = Self::new(store);
        manager.load()?;
        Ok(manager)
    }

    // ---- lifecycle -------------------------------------------------------

    /// Load the store's default configuration, discarding any pending changes.
    pub fn load(&mut self) -> Result<()> {
        let text = self.store.load_configuration().map_err(load_error)?;
        let config_id = self.store.default_config_id()?;
        self.install(&text, config_id)
    }

    /// Discard pending changes and load the default configuration again.
    pub fn reload(&mut self) -> Result<()> {
        if let Some(loaded) = &self.loaded
            && !loaded.journal.is_empty()
        {
            info!(discarded = loaded.journal.len(), "Discarding pending changes");
        }
        self.load()
    }

    /// Load one saved configuration by id.
    pub fn load_config_id(&mut self, id: ConfigId) -> Result<()> {
        let text = self.store.load_configuration_id(id).map_err(load_error)?;
        self.install(&text, Some(id))
    }

    fn install(&mut self, text: &str, config_id: Option<ConfigId>) -> Result<()> {
        let doc = ConfigDocument::parse(text)?;
        let session = Session {
            locked_settings: locked_settings(&doc),
            ..Session::default()
        };
        info!(
            config_id = ?config_id,
            version = doc.schema_version().unwrap_or_default(),
            "Loaded configuration"
        );
        self.loaded = Some(Loaded {
            doc,
            journal: Journal::new(),
            session,
            config_id,
        });
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        match &self.loaded {
            None => SessionState::Unloaded,
            Some(loaded) if loaded.journal.is_empty() => SessionState::Clean,
            Some(_) => SessionState::Dirty,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.state() == SessionState::Dirty
    }

    fn loaded(&self) -> Result<&Loaded> {
        self.loaded.as_ref().ok_or(Error::NotLoaded)
    }

    pub fn document(&self) -> Result<&ConfigDocument> {
        Ok(&self.loaded()?.doc)
    }

    pub fn journal(&self) -> Result<&Journal> {
        Ok(&self.loaded()?.journal)
    }

    /// Pending changes rendered with line diffs.
    pub fn pending_changes(&self) -> Result<String> {
        Ok(self.loaded()?.journal.render_report())
    }

    /// Id of the configuration the document was loaded from or last saved as.
    pub fn current_config_id(&self) -> Result<Option<ConfigId>> {
        Ok(self.loaded()?.config_id)
    }

    /// Dry-run validation of the whole document.
    pub fn validate(&self) -> Result<ValidationReport> {
        Ok(integrity::validate(&self.loaded()?.doc))
    }

    /// Validate, then persist the document as the store's new default.
    ///
    /// # Errors
    ///
    /// Returns `Validation` with the full report when the document is
    /// inconsistent, and `Persistence` when the store refuses the document.
    /// In both cases nothing is written and the journal is kept.
    pub fn save(&mut self, comment: &str) -> Result<ConfigId> {
        let loaded = self.loaded.as_mut().ok_or(Error::NotLoaded)?;
        let report = integrity::validate(&loaded.doc);
        if !report.is_clean() {
            warn!(issues = report.len(), "Refusing to save invalid configuration");
            return Err(Error::Validation { report });
        }

        let text = loaded.doc.to_json_string()?;
        let id = self.store.save_configuration(&text, comment)?;
        info!(config_id = id, changes = loaded.journal.len(), "Saved configuration");

        loaded.journal.clear();
        loaded.config_id = Some(id);
        loaded.session.locked_settings = locked_settings(&loaded.doc);
        Ok(id)
    }

    pub fn default_config_id(&self) -> Result<Option<ConfigId>> {
        Ok(self.store.default_config_id()?)
    }

    pub fn config_registry(&self) -> Result<Vec<RegistryEntry>> {
        Ok(self.store.registry()?)
    }

    /// Write the current document to `path`.
    pub fn export_to_file(&self, path: &Path) -> Result<()> {
        let text = self.loaded()?.doc.to_json_string()?;
        cfgtool_store::io::write_atomic(path, text.as_bytes())?;
        info!(path = %path.display(), "Exported configuration");
        Ok(())
    }

    /// Replace the document with the one in `path`. The replacement is a
    /// pending change like any other.
    pub fn import_from_file(&mut self, path: &Path) -> Result<()> {
        let text = cfgtool_store::io::read_text(path)?;
        let imported = ConfigDocument::parse(&text)?;
        self.transaction(|loaded| {
            for setting in &loaded.session.locked_settings {
                if parameter_value(&loaded.doc, setting) != parameter_value(&imported, setting) {
                    return Err(Error::ImmutableSetting {
                        setting: setting.clone(),
                    });
                }
            }
            loaded.scope(Domain::System).commit(Change::ReplaceDocument {
                document: Box::new(imported),
            })?;
            info!(path = %path.display(), "Imported configuration");
            Ok(())
        })
    }

    pub fn statistics(&self) -> Result<Statistics> {
        let loaded = self.loaded()?;
        let tables = EntityKind::ALL
            .into_iter()
            .map(|kind| TableCount {
                kind,
                table: kind.table(),
                rows: loaded.doc.row_count(kind),
            })
            .collect();
        Ok(Statistics {
            config_id: loaded.config_id,
            schema_version: loaded.doc.schema_version().map(str::to_string),
            pending_changes: loaded.journal.len(),
            tables,
        })
    }

    /// Rows of the read-only reference tables, tagged with their type.
    pub fn reference_codes(&self) -> Result<Vec<ApiRecord>> {
        let doc = &self.loaded()?.doc;
        let mut rows = Vec::new();
        for kind in EntityKind::ALL.into_iter().filter(|k| k.spec().read_only) {
            for record in doc.rows(kind) {
                let mut row = ApiRecord::new();
                row.insert("type".to_string(), Value::from(kind.spec().api_name));
                row.extend(to_api(kind, record));
                rows.push(row);
            }
        }
        Ok(rows)
    }

    /// Run `op` against the loaded state, restoring it if `op` fails.
    fn transaction<T>(&mut self, op: impl FnOnce(&mut Loaded) -> Result<T>) -> Result<T> {
        let loaded = self.loaded.as_mut().ok_or(Error::NotLoaded)?;
        let snapshot = loaded.clone();
        let result = op(&mut *loaded);
        if let Err(err) = &result {
            debug!(code = err.code(), "Rolling back failed command");
            *loaded = snapshot;
        }
        result
    }

    // ---- generic entity operations ----------------------------------------

    /// List rows of `kind`. A field filter may name the field by its API name.
    pub fn list(&self, kind: EntityKind, filter: &Filter) -> Result<Vec<ApiRecord>> {
        let filter = match filter {
            Filter::Field { field, value } => {
                Filter::field(internal_name(kind, field).unwrap_or(field), value.as_str())
            }
            other => other.clone(),
        };
        domain_manager(kind.domain()).list(&self.loaded()?.doc, kind, &filter)
    }

    pub fn get(&self, kind: EntityKind, selector: &Selector) -> Result<ApiRecord> {
        let doc = &self.loaded()?.doc;
        if let Some(family) = CallFamily::of(kind).filter(|f| f.call_kind() == kind) {
            let call = BaseManager::new(kind, doc).resolve(selector)?;
            return Ok(crate::managers::call_view(doc, family, call));
        }
        domain_manager(kind.domain()).get(doc, kind, selector)
    }

    /// Create one entity. Features, calls, call elements and behavior
    /// overrides go through their composite operations.
    pub fn create(&mut self, kind: EntityKind, fields: &ApiRecord) -> Result<ApiRecord> {
        match kind {
            EntityKind::Feature => self.add_feature(&FeatureRequest::from_api(fields)?),
            EntityKind::BehaviorOverride => self.add_behavior_override(fields),
            _ => match CallFamily::of(kind) {
                Some(family) if family.call_kind() == kind => self.add_call(family, fields),
                Some(family) if family.element_kind() == Some(kind) => self.add_call_element(family, fields),
                _ => self.transaction(|loaded| {
                    let mut scope = loaded.scope(kind.domain());
                    domain_manager(kind.domain()).create(&mut scope, kind, fields)
                }),
            },
        }
    }

    pub fn update(&mut self, kind: EntityKind, selector: &Selector, fields: &ApiRecord) -> Result<ApiRecord> {
        self.transaction(|loaded| {
            let mut scope = loaded.scope(kind.domain());
            domain_manager(kind.domain()).update(&mut scope, kind, selector, fields)
        })
    }

    /// Delete one entity together with the rows it owns.
    ///
    /// # Errors
    ///
    /// Returns `ReferentialIntegrity` listing every row outside the cascade
    /// that still references the entity or one of its owned rows.
    pub fn delete(&mut self, kind: EntityKind, selector: &Selector) -> Result<Deleted> {
        if kind == EntityKind::FeatureElement {
            let record = BaseManager::new(kind, self.document()?).resolve(selector)?;
            let feature = record.get("FTYPE_CODE").and_then(Value::as_str).unwrap_or_default().to_string();
            let element = record.get("FELEM_CODE").and_then(Value::as_str).unwrap_or_default().to_string();
            return self.delete_element_from_feature(&feature, &element);
        }
        self.transaction(|loaded| {
            let record = BaseManager::new(kind, &loaded.doc).resolve(selector)?.clone();
            let plan = integrity::plan_delete(&loaded.doc, kind, &record)?;
            let mut removed: Vec<(EntityKind, &Record)> = vec![(kind, &record)];
            removed.extend(plan.cascade.iter().map(|(k, r)| (*k, r)));
            check_removal_keeps_activation(&loaded.doc, kind, &record, &removed)?;
            let mut cascaded = Vec::with_capacity(plan.cascade.len());
            for (child_kind, child) in plan.cascade {
                cascaded.push((child_kind, describe(child_kind, &child)));
                loaded.scope(child_kind.domain()).commit(Change::Delete {
                    kind: child_kind,
                    record: child,
                })?;
            }
            let mut scope = loaded.scope(kind.domain());
            let removed = domain_manager(kind.domain()).delete(&mut scope, kind, selector)?;
            if !cascaded.is_empty() {
                debug!(kind = %kind, cascaded = cascaded.len(), "Removed owned rows");
            }
            Ok(Deleted {
                record: to_api(kind, &removed),
                cascaded,
            })
        })
    }

    // ---- features ---------------------------------------------------------

    /// Create a feature with its element bindings and function calls.
    ///
    /// Every referenced element and function is checked before anything is
    /// written.
    pub fn add_feature(&mut self, request: &FeatureRequest) -> Result<ApiRecord> {
        self.transaction(|loaded| {
            let feature = FeatureManager.add_feature(&mut loaded.scope(Domain::Features), request)?;
            let code = record_code(EntityKind::Feature.spec(), &feature)
                .unwrap_or_default()
                .to_string();
            FunctionManager.bind_feature(&mut loaded.scope(Domain::Functions), &code, request)?;
            let feature = BaseManager::new(EntityKind::Feature, &loaded.doc).get_by_code(&code)?;
            Ok(feature_view(&loaded.doc, feature))
        })
    }

    pub fn set_feature_active(&mut self, feature: &str, active: bool) -> Result<ApiRecord> {
        self.transaction(|loaded| FeatureManager.set_active(&mut loaded.scope(Domain::Features), feature, active))
    }

    pub fn update_feature_version(&mut self, feature: &str, version: i64) -> Result<ApiRecord> {
        self.transaction(|loaded| {
            FeatureManager.update_feature_version(&mut loaded.scope(Domain::Features), feature, version)
        })
    }

    pub fn add_element_to_feature(&mut self, feature: &str, element: &str, fields: &ApiRecord) -> Result<ApiRecord> {
        self.transaction(|loaded| {
            FeatureManager.add_element_to_feature(&mut loaded.scope(Domain::Features), feature, element, fields)
        })
    }

    pub fn delete_element_from_feature(&mut self, feature: &str, element: &str) -> Result<Deleted> {
        self.transaction(|loaded| {
            let removed =
                FeatureManager.delete_element_from_feature(&mut loaded.scope(Domain::Features), feature, element)?;
            Ok(Deleted {
                record: to_api(EntityKind::FeatureElement, &removed),
                cascaded: Vec::new(),
            })
        })
    }

    pub fn set_feature_element(&mut self, feature: &str, element: &str, fields: &ApiRecord) -> Result<ApiRecord> {
        self.transaction(|loaded| {
            FeatureManager.set_feature_element(&mut loaded.scope(Domain::Features), feature, element, fields)
        })
    }

    pub fn add_behavior_override(&mut self, fields: &ApiRecord) -> Result<ApiRecord> {
        self.transaction(|loaded| FeatureManager.add_behavior_override(&mut loaded.scope(Domain::Features), fields))
    }

    /// Build a feature, its elements, bindings and attributes from a template.
    pub fn template_add(&mut self, template: &str, feature: &str) -> Result<ApiRecord> {
        self.transaction(|loaded| FeatureManager.apply_template(&mut loaded.scope(Domain::Features), template, feature))
    }

    // ---- functions --------------------------------------------------------

    pub fn add_call(&mut self, family: CallFamily, fields: &ApiRecord) -> Result<ApiRecord> {
        self.transaction(|loaded| FunctionManager.add_call(&mut loaded.scope(Domain::Functions), family, fields))
    }

    pub fn add_call_element(&mut self, family: CallFamily, fields: &ApiRecord) -> Result<ApiRecord> {
        self.transaction(|loaded| {
            FunctionManager.add_call_element(&mut loaded.scope(Domain::Functions), family, fields)
        })
    }

    pub fn delete_call_element(&mut self, family: CallFamily, fields: &ApiRecord) -> Result<Deleted> {
        self.transaction(|loaded| {
            let removed = FunctionManager.delete_call_element(&mut loaded.scope(Domain::Functions), family, fields)?;
            let kind = family.element_kind().unwrap_or(family.call_kind());
            Ok(Deleted {
                record: to_api(kind, &removed),
                cascaded: Vec::new(),
            })
        })
    }

    pub fn add_to_namehash(&mut self, feature: &str, element: &str) -> Result<ApiRecord> {
        self.transaction(|loaded| FunctionManager.add_to_namehash(&mut loaded.scope(Domain::Functions), feature, element))
    }

    pub fn delete_from_namehash(&mut self, feature: &str, element: &str) -> Result<ApiRecord> {
        self.transaction(|loaded| {
            let removed = FunctionManager.delete_from_namehash(&mut loaded.scope(Domain::Functions), feature, element)?;
            Ok(to_api(EntityKind::ExpressionCallElement, &removed))
        })
    }

    pub fn add_to_ssn_last4_hash(&mut self, feature: &str, element: &str) -> Result<ApiRecord> {
        self.transaction(|loaded| {
            FunctionManager.add_to_ssn_last4_hash(&mut loaded.scope(Domain::Functions), feature, element)
        })
    }

    pub fn delete_from_ssn_last4_hash(&mut self, feature: &str, element: &str) -> Result<ApiRecord> {
        self.transaction(|loaded| {
            let removed =
                FunctionManager.delete_from_ssn_last4_hash(&mut loaded.scope(Domain::Functions), feature, element)?;
            Ok(to_api(EntityKind::ExpressionCallElement, &removed))
        })
    }

    // ---- rules ------------------------------------------------------------

    pub fn reorder_rules(&mut self, rule_type: &str, codes: &[String]) -> Result<Vec<ApiRecord>> {
        self.transaction(|loaded| RulesManager.reorder_rules(&mut loaded.scope(Domain::Rules), rule_type, codes))
    }

    pub fn clone_generic_plan(&mut self, source: &str, new_code: &str, description: Option<&str>) -> Result<ApiRecord> {
        self.transaction(|loaded| {
            RulesManager.clone_generic_plan(&mut loaded.scope(Domain::Rules), source, new_code, description)
        })
    }

    // ---- system -----------------------------------------------------------

    pub fn set_parameter(&mut self, code: &str, value: Value) -> Result<ApiRecord> {
        self.transaction(|loaded| SystemManager.set_parameter(&mut loaded.scope(Domain::System), code, value))
    }

    pub fn get_parameter(&self, code: &str) -> Result<ApiRecord> {
        SystemManager.get_parameter(self.document()?, code)
    }

    pub fn compatibility_version(&self) -> Result<Option<String>> {
        Ok(SystemManager.compatibility_version(self.document()?))
    }

    pub fn update_compatibility_version(&mut self, version: &str) -> Result<()> {
        self.transaction(|loaded| SystemManager.update_compatibility_version(&mut loaded.scope(Domain::System), version))
    }

    pub fn verify_compatibility_version(&self, expected: &str) -> Result<bool> {
        Ok(SystemManager.verify_compatibility_version(self.document()?, expected))
    }

    pub fn list_sections(&self) -> Result<Vec<SectionInfo>> {
        Ok(SystemManager.list_sections(self.document()?))
    }

    pub fn get_section(&self, name: &str) -> Result<Value> {
        SystemManager.get_section(self.document()?, name).cloned()
    }

    pub fn add_section(&mut self, name: &str, value: Option<Value>) -> Result<()> {
        self.transaction(|loaded| SystemManager.add_section(&mut loaded.scope(Domain::System), name, value))
    }

    pub fn remove_section(&mut self, name: &str) -> Result<()> {
        self.transaction(|loaded| SystemManager.remove_section(&mut loaded.scope(Domain::System), name))
    }

    pub fn add_section_field(&mut self, name: &str, field: &str, value: Value) -> Result<()> {
        self.transaction(|loaded| {
            SystemManager.add_section_field(&mut loaded.scope(Domain::System), name, field, value)
        })
    }

    pub fn remove_section_field(&mut self, name: &str, field: &str) -> Result<()> {
        self.transaction(|loaded| SystemManager.remove_section_field(&mut loaded.scope(Domain::System), name, field))
    }

    pub fn touch(&mut self) -> Result<String> {
        self.transaction(|loaded| SystemManager.touch(&mut loaded.scope(Domain::System)))
    }
}

/// A document the store hands back but cannot be parsed is a load failure,
/// not a persistence one.
fn load_error(err: cfgtool_store::Error) -> Error {
    match err {
        cfgtool_store::Error::MalformedDocument { reason } => Error::load(reason),
        other => Error::Persistence(other),
    }
}

fn parameter_value<'d>(doc: &'d ConfigDocument, code: &str) -> Option<&'d Value> {
    BaseManager::new(EntityKind::SystemParameter, doc)
        .find_by_code(code)
        .and_then(|r| r.get("PARAM_VALUE"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfgtool_store::MemoryStore;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn api(value: Value) -> ApiRecord {
        value.as_object().cloned().unwrap()
    }

    fn manager() -> (ConfigManager, MemoryStore) {
        let store = MemoryStore::with_document(cfgtool_store::DEFAULT_TEMPLATE);
        let manager = ConfigManager::open(Box::new(store.clone())).unwrap();
        (manager, store)
    }

    #[test]
    fn unloaded_manager_refuses_work() {
        let manager = ConfigManager::new(Box::new(MemoryStore::new()));
        assert_eq!(manager.state(), SessionState::Unloaded);
        assert!(matches!(manager.validate(), Err(Error::NotLoaded)));
    }

    #[test]
    fn failed_command_leaves_no_trace() {
        let (mut manager, _) = manager();
        let before = manager.document().unwrap().clone();
        let request = api(json!({
            "feature": "PASSPORT",
            "elementList": [{"element": "ID_NUM", "compared": "Yes"}, {"element": "MISSING"}],
            "comparison": "EXACT_COMP"
        }));
        let err = manager.create(EntityKind::Feature, &request).unwrap_err();
        assert!(err.to_string().contains("MISSING"), "{err}");
        assert_eq!(manager.document().unwrap(), &before);
        assert_eq!(manager.state(), SessionState::Clean);
    }

    #[test]
    fn delete_feature_cascades_owned_rows() {
        let (mut manager, _) = manager();
        manager
            .create(EntityKind::Element, &api(json!({"element": "PASSPORT_NUM"})))
            .unwrap();
        manager
            .create(
                EntityKind::Feature,
                &api(json!({"feature": "PASSPORT", "elementList": ["PASSPORT_NUM"]})),
            )
            .unwrap();
        let deleted = manager
            .delete(EntityKind::Feature, &Selector::Code("PASSPORT".into()))
            .unwrap();
        assert_eq!(deleted.cascaded.len(), 1);
        assert_eq!(deleted.cascaded[0].0, EntityKind::FeatureElement);
        assert!(manager.get(EntityKind::Feature, &Selector::Code("PASSPORT".into())).is_err());
    }

    #[test]
    fn delete_blocked_by_other_references() {
        let (mut manager, _) = manager();
        let err = manager
            .delete(EntityKind::Feature, &Selector::Code("SSN".into()))
            .unwrap_err();
        let Error::ReferentialIntegrity { dependents, .. } = err else {
            panic!("expected referential integrity error");
        };
        assert!(dependents.iter().any(|d| d.kind == EntityKind::Fragment));
        assert!(!manager.is_dirty());
    }

    #[test]
    fn save_clears_journal_and_moves_default() {
        let (mut manager, store) = manager();
        manager
            .create(EntityKind::DataSource, &api(json!({"dataSource": "CUSTOMERS"})))
            .unwrap();
        assert!(manager.is_dirty());
        let id = manager.save("add customers").unwrap();
        assert_eq!(id, 2);
        assert_eq!(manager.default_config_id().unwrap(), Some(2));
        assert!(!manager.is_dirty());
        assert_eq!(store.save_count(), 1);
    }

    #[test]
    fn rejected_save_keeps_pending_changes() {
        let (mut manager, store) = manager();
        manager
            .create(EntityKind::DataSource, &api(json!({"dataSource": "CUSTOMERS"})))
            .unwrap();
        store.reject_saves(Some("engine busy"));
        let err = manager.save("attempt").unwrap_err();
        assert_eq!(err.code(), "CFG007");
        assert_eq!(manager.journal().unwrap().len(), 1);
    }

    #[test]
    fn saved_write_once_setting_is_locked() {
        let (mut manager, _) = manager();
        manager.set_parameter("IDENTIFYING_FIELDS", json!("NAME,DOB")).unwrap();
        manager.set_parameter("IDENTIFYING_FIELDS", json!("NAME")).unwrap();
        manager.save("identity").unwrap();
        let err = manager.set_parameter("IDENTIFYING_FIELDS", json!("SSN")).unwrap_err();
        assert!(matches!(err, Error::ImmutableSetting { .. }));
    }

    #[test]
    fn ids_retired_before_a_save_stay_retired() {
        let (mut manager, _) = manager();
        manager
            .create(EntityKind::DataSource, &api(json!({"dataSource": "A"})))
            .unwrap();
        manager
            .delete(EntityKind::DataSource, &Selector::Code("A".into()))
            .unwrap();
        manager.save("churn").unwrap();
        let view = manager
            .create(EntityKind::DataSource, &api(json!({"dataSource": "B"})))
            .unwrap();
        assert_eq!(view["id"], json!(1001));
    }

    #[test]
    fn import_replaces_document_as_pending_change() {
        let (mut manager, _) = manager();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");
        manager
            .create(EntityKind::DataSource, &api(json!({"dataSource": "EXPORTED"})))
            .unwrap();
        manager.export_to_file(&path).unwrap();
        manager.reload().unwrap();
        assert!(manager.get(EntityKind::DataSource, &Selector::Code("EXPORTED".into())).is_err());

        manager.import_from_file(&path).unwrap();
        assert!(manager.get(EntityKind::DataSource, &Selector::Code("EXPORTED".into())).is_ok());
        assert_eq!(manager.journal().unwrap().len(), 1);
    }

    #[test]
    fn statistics_count_tables() {
        let (manager, _) = manager();
        let stats = manager.statistics().unwrap();
        let rules = stats.tables.iter().find(|t| t.kind == EntityKind::Rule).unwrap();
        assert_eq!(rules.rows, 3);
        assert_eq!(stats.config_id, Some(1));
        assert_eq!(stats.pending_changes, 0);
    }
}
