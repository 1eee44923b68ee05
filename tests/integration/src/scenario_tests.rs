//! Cross-crate scenarios: orchestrator, domain managers and a file-backed store.

use cfgtool_core::{ApiRecord, ConfigManager, EntityKind, Error, Filter, JournalOp, Selector, SessionState};
use cfgtool_test_utils::{TestConfig, TestStore};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

fn api(value: Value) -> ApiRecord {
    value.as_object().cloned().unwrap()
}

fn open(store: &TestStore) -> ConfigManager {
    ConfigManager::open(Box::new(store.open())).unwrap()
}

#[test]
fn created_data_source_is_listed_by_api_name() {
    let store = TestStore::new();
    let mut manager = open(&store);
    manager
        .create(EntityKind::DataSource, &api(json!({"dataSource": "customers"})))
        .unwrap();

    let rows = manager.list(EntityKind::DataSource, &Filter::All).unwrap();
    let customers: Vec<_> = rows.iter().filter(|r| r["dataSource"] == json!("CUSTOMERS")).collect();
    assert_eq!(customers.len(), 1);
    assert_eq!(manager.state(), SessionState::Dirty);

    manager.save("add customers").unwrap();
    let reopened = open(&store);
    assert!(reopened
        .get(EntityKind::DataSource, &Selector::Code("CUSTOMERS".into()))
        .is_ok());
}

#[test]
fn feature_with_unknown_element_changes_nothing() {
    let store = TestStore::new();
    let mut manager = open(&store);
    let before = manager.document().unwrap().to_json_string().unwrap();

    let err = manager
        .create(
            EntityKind::Feature,
            &api(json!({"feature": "LOYALTY_ID", "elementList": ["ELEM_X"]})),
        )
        .unwrap_err();

    assert!(err.to_string().contains("ELEM_X"), "{err}");
    assert_eq!(manager.state(), SessionState::Clean);
    assert_eq!(manager.document().unwrap().to_json_string().unwrap(), before);
    assert!(manager
        .get(EntityKind::Feature, &Selector::Code("LOYALTY_ID".into()))
        .is_err());
}

#[test]
fn referenced_data_source_cannot_be_deleted() {
    let store = TestStore::new();
    let mut manager = open(&store);
    manager
        .create(EntityKind::DataSource, &api(json!({"dataSource": "CUSTOMERS"})))
        .unwrap();
    manager
        .create(
            EntityKind::Attribute,
            &api(json!({
                "attribute": "CUSTOMER_NAME",
                "class": "NAME",
                "feature": "NAME",
                "element": "FULL_NAME",
                "dataSource": "CUSTOMERS"
            })),
        )
        .unwrap();
    let pending = manager.journal().unwrap().len();

    let err = manager
        .delete(EntityKind::DataSource, &Selector::Code("CUSTOMERS".into()))
        .unwrap_err();
    match &err {
        Error::ReferentialIntegrity { dependents, .. } => {
            assert!(
                dependents
                    .iter()
                    .any(|d| d.kind == EntityKind::Attribute && d.key.contains("CUSTOMER_NAME")),
                "{err}"
            );
        }
        other => panic!("expected a referential integrity error, got {other}"),
    }
    assert_eq!(err.code(), "CFG004");
    assert_eq!(manager.journal().unwrap().len(), pending);
    assert!(manager
        .get(EntityKind::DataSource, &Selector::Code("CUSTOMERS".into()))
        .is_ok());
}

#[test]
fn invalid_document_is_not_saved_and_journal_is_kept() {
    let store = TestStore::seeded(&TestConfig::template().with_broken_rule("BROKEN").to_json());
    let saved = store.saved_ids();
    let mut manager = open(&store);

    manager
        .create(EntityKind::DataSource, &api(json!({"dataSource": "CUSTOMERS"})))
        .unwrap();
    manager
        .update(
            EntityKind::DataSource,
            &Selector::Code("CUSTOMERS".into()),
            &api(json!({"description": "Customer master"})),
        )
        .unwrap();
    manager
        .set_parameter("MAX_RELATED_ENTITIES", json!(250))
        .unwrap();

    let err = manager.save("should fail").unwrap_err();
    assert!(matches!(err, Error::Validation { .. }), "{err}");

    let journal = manager.journal().unwrap();
    assert_eq!(journal.len(), 3);
    assert_eq!(journal.entries()[0].op, JournalOp::Create);
    assert_eq!(manager.state(), SessionState::Dirty);
    assert_eq!(store.saved_ids(), saved);
}

#[test]
fn saved_configuration_becomes_the_default_for_the_next_session() {
    let store = TestStore::new();
    let first = {
        let mut manager = open(&store);
        manager
            .create(EntityKind::DataSource, &api(json!({"dataSource": "WATCHLIST"})))
            .unwrap();
        manager.save("add watchlist").unwrap()
    };

    let manager = open(&store);
    assert_eq!(manager.default_config_id().unwrap(), Some(first));
    let registry = manager.config_registry().unwrap();
    assert_eq!(registry.len(), 2);
    assert_eq!(registry.last().map(|e| e.comment.as_str()), Some("add watchlist"));
}
