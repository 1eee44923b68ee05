use cfgtool_core::{ApiRecord, ConfigManager, EntityKind, Selector};
use cfgtool_test_utils::TestConfig;
use proptest::prelude::*;
use serde_json::{Value, json};
use std::collections::BTreeSet;

fn api(value: Value) -> ApiRecord {
    value.as_object().cloned().unwrap()
}

fn manager() -> ConfigManager {
    ConfigManager::open(Box::new(TestConfig::template().memory_store())).unwrap()
}

#[derive(Debug, Clone)]
enum Op {
    Add(u8),
    Remove(u8),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![(0u8..12).prop_map(Op::Add), (0u8..12).prop_map(Op::Remove)]
}

proptest! {
    #[test]
    fn ids_are_fresh_above_floor(ops in prop::collection::vec(op(), 1..40)) {
        let mut manager = manager();
        let mut handed_out: BTreeSet<i64> = BTreeSet::new();

        for op in ops {
            match op {
                Op::Add(n) => {
                    let fields = api(json!({"dataSource": format!("SRC_{n}")}));
                    if let Ok(view) = manager.create(EntityKind::DataSource, &fields) {
                        let id = view["id"].as_i64().unwrap();
                        // Never below the reserved floor, never handed out twice.
                        prop_assert!(id >= 1000);
                        prop_assert!(handed_out.insert(id), "id {} reused", id);
                    }
                }
                Op::Remove(n) => {
                    let _ = manager.delete(EntityKind::DataSource, &Selector::Code(format!("SRC_{n}")));
                }
            }
        }
    }

    #[test]
    fn repeated_update_journals_once(desc in "[A-Za-z ]{1,20}") {
        let mut manager = manager();
        let fields = api(json!({"description": desc}));
        let selector = Selector::Code("TEST".into());
        let first = manager.update(EntityKind::DataSource, &selector, &fields).unwrap();
        let after_first = manager.journal().unwrap().len();
        let second = manager.update(EntityKind::DataSource, &selector, &fields).unwrap();
        prop_assert_eq!(first, second);
        prop_assert_eq!(manager.journal().unwrap().len(), after_first);
        prop_assert!(after_first <= 1);
    }

    #[test]
    fn deletes_never_break_references(picks in prop::collection::vec((0usize..6, 0usize..16), 1..12)) {
        let kinds = [
            EntityKind::Feature,
            EntityKind::Element,
            EntityKind::Fragment,
            EntityKind::ComparisonFunction,
            EntityKind::ExpressionFunction,
            EntityKind::GenericPlan,
        ];
        let mut manager = manager();
        for (kind_index, row_index) in picks {
            let kind = kinds[kind_index];
            let spec = kind.spec();
            let id = manager
                .document()
                .unwrap()
                .rows(kind)
                .nth(row_index)
                .and_then(|r| spec.id_field.and_then(|f| r.get(f)).and_then(Value::as_i64));
            if let Some(id) = id {
                let _ = manager.delete(kind, &Selector::Id(id));
            }
            let report = manager.validate().unwrap();
            prop_assert!(report.is_clean(), "{}", report);
        }
    }
}
