use cfgtool_schema::{Domain, EntityKind, Record};
use serde_json::Value;

use super::{DomainManager, set_default};
use crate::Result;
use crate::document::ConfigDocument;

/// Data sources: codes are upper case and describe themselves by default.
#[derive(Debug, Default, Clone, Copy)]
pub struct DataSourceManager;

impl DomainManager for DataSourceManager {
    fn domain(&self) -> Domain {
        Domain::DataSources
    }

    fn prepare(&self, kind: EntityKind, record: &mut Record, _doc: &ConfigDocument) -> Result<()> {
        if kind == EntityKind::DataSource
            && let Some(code) = record.get("DSRC_CODE").and_then(Value::as_str).map(str::to_string)
        {
            set_default(record, "DSRC_DESC", code);
            set_default(record, "DSRC_RELY", 1);
            set_default(record, "RETENTION_LEVEL", "Remember");
            set_default(record, "CONVERSATIONAL", "No");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::Selector;
    use crate::journal::Journal;
    use crate::scope::{Scope, Session};
    use crate::Error;
    use serde_json::json;

    fn doc() -> ConfigDocument {
        ConfigDocument::from_value(json!({
            "G2_CONFIG": {
                "CONFIG_BASE_VERSION": {"COMPATIBILITY_VERSION": {"CONFIG_VERSION": "11"}},
                "CFG_DSRC": [],
                "CFG_ATTR": []
            }
        }))
        .unwrap()
    }

    #[test]
    fn description_defaults_to_code() {
        let mut doc = doc();
        let mut journal = Journal::new();
        let mut session = Session::default();
        let mut scope = Scope::new(Domain::DataSources, &mut doc, &mut journal, &mut session);
        let fields = json!({"dataSource": "customers"}).as_object().cloned().unwrap();
        let view = DataSourceManager.create(&mut scope, EntityKind::DataSource, &fields).unwrap();
        assert_eq!(view["description"], json!("CUSTOMERS"));
        assert_eq!(view["id"], json!(1000));
    }

    #[test]
    fn duplicate_code_is_case_insensitive() {
        let mut doc = doc();
        let mut journal = Journal::new();
        let mut session = Session::default();
        let mut scope = Scope::new(Domain::DataSources, &mut doc, &mut journal, &mut session);
        let fields = json!({"dataSource": "WATCHLIST"}).as_object().cloned().unwrap();
        DataSourceManager.create(&mut scope, EntityKind::DataSource, &fields).unwrap();
        let again = json!({"dataSource": "watchlist"}).as_object().cloned().unwrap();
        let err = DataSourceManager
            .create(&mut scope, EntityKind::DataSource, &again)
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateCode { .. }));
        assert_eq!(scope.doc().row_count(EntityKind::DataSource), 1);
    }

    #[test]
    fn delete_then_recreate_gets_fresh_id() {
        let mut doc = doc();
        let mut journal = Journal::new();
        let mut session = Session::default();
        let mut scope = Scope::new(Domain::DataSources, &mut doc, &mut journal, &mut session);
        let fields = json!({"dataSource": "A"}).as_object().cloned().unwrap();
        DataSourceManager.create(&mut scope, EntityKind::DataSource, &fields).unwrap();
        DataSourceManager
            .delete(&mut scope, EntityKind::DataSource, &Selector::Code("A".into()))
            .unwrap();
        let view = DataSourceManager.create(&mut scope, EntityKind::DataSource, &fields).unwrap();
        assert_eq!(view["id"], json!(1001));
    }
}
