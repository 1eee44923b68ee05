//! Round-trip properties of the field translator.

use cfgtool_schema::{EntityKind, FieldAccess, Record, to_api, to_internal};
use proptest::prelude::*;
use serde_json::Value;

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        "[A-Z_]{1,12}".prop_map(Value::from),
        any::<i32>().prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
        Just(Value::Null),
    ]
}

/// A canonical internal record: a random subset of the kind's mapped fields.
fn canonical_record() -> impl Strategy<Value = (EntityKind, Record)> {
    (0..EntityKind::ALL.len()).prop_flat_map(|idx| {
        let kind = EntityKind::ALL[idx];
        let mapped: Vec<&'static str> = kind
            .spec()
            .fields
            .iter()
            .filter(|f| matches!(f.access, FieldAccess::Mapped(_)))
            .map(|f| f.internal)
            .collect();
        let len = mapped.len();
        (
            Just(kind),
            proptest::collection::vec((any::<bool>(), scalar()), len).prop_map(move |cells| {
                let mut record = Record::new();
                for (field, (present, value)) in mapped.iter().zip(cells) {
                    if present {
                        record.insert(field.to_string(), value);
                    }
                }
                record
            }),
        )
    })
}

proptest! {
    #[test]
    fn internal_to_api_and_back((kind, record) in canonical_record()) {
        let api = to_api(kind, &record);
        let back = to_internal(kind, &api).unwrap();
        prop_assert_eq!(back, record);
    }

    #[test]
    fn api_to_internal_and_back((kind, record) in canonical_record()) {
        let api = to_api(kind, &record);
        let internal = to_internal(kind, &api).unwrap();
        prop_assert_eq!(to_api(kind, &internal), api);
    }
}
