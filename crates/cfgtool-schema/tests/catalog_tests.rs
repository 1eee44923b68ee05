//! Completeness checks over the static catalog.

use cfgtool_schema::{EntityKind, FieldAccess, OnDelete, RefBy};
use rstest::rstest;

#[test]
fn structural_fields_are_mapped_or_internal_only() {
    for kind in EntityKind::ALL {
        let spec = kind.spec();
        for field in spec.structural_fields() {
            assert!(
                spec.field(field).is_some(),
                "{kind:?}: structural field {field} has no field-table entry"
            );
        }
    }
}

#[test]
fn structural_fields_are_visible_in_the_api() {
    for kind in EntityKind::ALL {
        let spec = kind.spec();
        for field in spec.structural_fields() {
            let entry = spec.field(field).unwrap();
            assert!(
                matches!(entry.access, FieldAccess::Mapped(_)),
                "{kind:?}: {field} is used for identity or references but hidden"
            );
        }
    }
}

#[test]
fn api_names_are_unique_per_kind() {
    for kind in EntityKind::ALL {
        let mut names: Vec<&str> = kind.spec().fields.iter().filter_map(|f| f.api()).collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(total, names.len(), "{kind:?} maps two fields to one API name");
    }
}

#[test]
fn id_references_point_at_kinds_with_ids() {
    for kind in EntityKind::ALL {
        for reference in kind.spec().references {
            let target = reference.target.spec();
            match reference.by {
                RefBy::Id => assert!(target.id_field.is_some(), "{kind:?}.{}", reference.field),
                RefBy::Code | RefBy::Expression(_) => {
                    assert!(target.code_field.is_some(), "{kind:?}.{}", reference.field)
                }
            }
        }
    }
}

#[test]
fn read_only_kinds_are_never_cascaded() {
    for kind in EntityKind::ALL {
        for reference in kind.spec().references {
            if reference.on_delete == OnDelete::Cascade {
                assert!(!kind.spec().read_only, "{kind:?} is read-only but owned by another kind");
            }
        }
    }
}

#[rstest]
#[case(EntityKind::DataSource, 1000)]
#[case(EntityKind::Feature, 1000)]
#[case(EntityKind::FeatureClass, 1)]
#[case(EntityKind::RuleType, 1)]
#[case(EntityKind::SystemParameter, 1)]
fn id_floors(#[case] kind: EntityKind, #[case] floor: i64) {
    assert_eq!(kind.spec().id_floor, floor);
}

#[rstest]
#[case("CFG_DSRC", EntityKind::DataSource)]
#[case("CFG_FBOM", EntityKind::FeatureElement)]
#[case("CFG_GENERIC_THRESHOLD", EntityKind::GenericThreshold)]
#[case("SYS_PARAMS", EntityKind::SystemParameter)]
fn kinds_resolve_from_tables(#[case] table: &str, #[case] kind: EntityKind) {
    assert_eq!(EntityKind::from_table(table), Some(kind));
}
