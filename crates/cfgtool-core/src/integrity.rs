//! Reference checking across the whole document.
//!
//! Nothing here is cached: every question is answered by scanning the tables,
//! which keeps the answers correct after any sequence of commits.

use cfgtool_schema::{EntityKind, OnDelete, RefBy, Record, Reference, api_name, value_key};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::base::{BaseManager, describe, record_code, record_id};
use crate::document::ConfigDocument;
use crate::error::Dependent;
use crate::{Error, Result};

/// One problem found by whole-document validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Issue {
    BrokenReference {
        kind: EntityKind,
        row: String,
        field: String,
        target: EntityKind,
        value: String,
    },
    MissingReference {
        kind: EntityKind,
        row: String,
        field: String,
    },
    DuplicateCode {
        kind: EntityKind,
        code: String,
    },
    DuplicateKey {
        kind: EntityKind,
        key: String,
    },
    DuplicateTier {
        rule_type: String,
        tier: String,
        rules: Vec<String>,
    },
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::BrokenReference {
                kind,
                row,
                field,
                target,
                value,
            } => write!(f, "{kind} {row}: {field} refers to missing {target} '{value}'"),
            Issue::MissingReference { kind, row, field } => write!(f, "{kind} {row}: {field} is required"),
            Issue::DuplicateCode { kind, code } => write!(f, "{kind} code {code} is used more than once"),
            Issue::DuplicateKey { kind, key } => write!(f, "{kind} {key} appears more than once"),
            Issue::DuplicateTier { rule_type, tier, rules } => {
                write!(f, "rule type {rule_type} tier {tier} is shared by {}", rules.join(", "))
            }
        }
    }
}

/// Result of a dry-run validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    issues: Vec<Issue>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.issues.is_empty() {
            return writeln!(f, "Configuration is valid");
        }
        for issue in &self.issues {
            writeln!(f, "- {issue}")?;
        }
        Ok(())
    }
}

fn field_label(kind: EntityKind, field: &str) -> String {
    api_name(kind, field).unwrap_or(field).to_string()
}

/// Whether `key` names an existing row of the reference's target kind.
fn target_exists(doc: &ConfigDocument, reference: &Reference, key: &str) -> bool {
    let base = BaseManager::new(reference.target, doc);
    match reference.by {
        RefBy::Id => key.parse::<i64>().is_ok_and(|id| base.find_by_id(id).is_some()),
        RefBy::Code | RefBy::Expression(_) => base.find_by_code(key).is_some(),
    }
}

fn requires_value(reference: &Reference) -> bool {
    !reference.optional && !matches!(reference.by, RefBy::Expression(_))
}

fn is_absent(record: &Record, reference: &Reference) -> bool {
    match record.get(reference.field).and_then(value_key) {
        None => true,
        Some(v) => Some(v.as_str()) == reference.wildcard && !reference.optional,
    }
}

/// Check the outgoing references of a record about to be written.
///
/// The first unresolved reference becomes an `InvalidField` naming the
/// missing code.
pub fn check_references(doc: &ConfigDocument, kind: EntityKind, record: &Record) -> Result<()> {
    for reference in kind.spec().references {
        if requires_value(reference) && is_absent(record, reference) {
            return Err(Error::invalid(kind, field_label(kind, reference.field), "is required"));
        }
        for key in reference.targets(record) {
            if !target_exists(doc, reference, &key) {
                return Err(Error::invalid(
                    kind,
                    field_label(kind, reference.field),
                    format!("unknown {} '{key}'", reference.target),
                ));
            }
        }
    }
    Ok(())
}

/// Every row whose references point at `record`, with the reference used.
pub fn referencing_rows<'d>(
    doc: &'d ConfigDocument,
    kind: EntityKind,
    record: &Record,
) -> Vec<(EntityKind, &'d Record, &'static Reference)> {
    let spec = kind.spec();
    let code = record_code(spec, record);
    let id = record_id(spec, record).map(|id| id.to_string());

    let mut found = Vec::new();
    for source in EntityKind::ALL {
        for reference in source.spec().references.iter().filter(|r| r.target == kind) {
            let wanted = match reference.by {
                RefBy::Id => id.as_deref(),
                RefBy::Code | RefBy::Expression(_) => code,
            };
            let Some(wanted) = wanted else { continue };
            for row in doc.rows(source) {
                if source == kind && row == record {
                    continue;
                }
                if reference
                    .targets(row)
                    .iter()
                    .any(|t| t.eq_ignore_ascii_case(wanted))
                {
                    found.push((source, row, reference));
                }
            }
        }
    }
    found
}

/// Rows that reference `record`, as user-facing dependents.
pub fn dependents(doc: &ConfigDocument, kind: EntityKind, record: &Record) -> Vec<Dependent> {
    let mut out: Vec<Dependent> = Vec::new();
    for (source, row, reference) in referencing_rows(doc, kind, record) {
        let dependent = Dependent {
            kind: source,
            key: describe(source, row),
            field: field_label(source, reference.field),
        };
        if !out.contains(&dependent) {
            out.push(dependent);
        }
    }
    out
}

/// What a delete will remove besides its target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeletePlan {
    /// Owned rows, children before parents
    pub cascade: Vec<(EntityKind, Record)>,
}

/// Work out the cascade for deleting `record`.
///
/// Rows owned through `Cascade` references are collected transitively. Any
/// other row that references the target or one of the owned rows blocks the
/// delete with `ReferentialIntegrity`.
pub fn plan_delete(doc: &ConfigDocument, kind: EntityKind, record: &Record) -> Result<DeletePlan> {
    let mut members: Vec<(EntityKind, Record)> = vec![(kind, record.clone())];
    let mut next = 0;
    while next < members.len() {
        let (member_kind, member) = members[next].clone();
        for (source, row, reference) in referencing_rows(doc, member_kind, &member) {
            if reference.on_delete == OnDelete::Cascade && !contains(&members, source, row) {
                members.push((source, row.clone()));
            }
        }
        next += 1;
    }

    let mut blockers: Vec<Dependent> = Vec::new();
    for (member_kind, member) in &members {
        for (source, row, reference) in referencing_rows(doc, *member_kind, member) {
            if contains(&members, source, row) {
                continue;
            }
            let dependent = Dependent {
                kind: source,
                key: describe(source, row),
                field: field_label(source, reference.field),
            };
            if !blockers.contains(&dependent) {
                blockers.push(dependent);
            }
        }
    }
    if !blockers.is_empty() {
        return Err(Error::ReferentialIntegrity {
            kind,
            key: describe(kind, record),
            dependents: blockers,
        });
    }

    let cascade = members.into_iter().skip(1).rev().collect();
    Ok(DeletePlan { cascade })
}

fn contains(members: &[(EntityKind, Record)], kind: EntityKind, row: &Record) -> bool {
    members.iter().any(|(k, r)| *k == kind && r == row)
}

/// Whole-document dry run: broken references, duplicate codes and keys,
/// and rule tiers shared within a rule type.
pub fn validate(doc: &ConfigDocument) -> ValidationReport {
    let mut issues = Vec::new();

    for kind in EntityKind::ALL {
        let spec = kind.spec();
        for row in doc.rows(kind) {
            for reference in spec.references {
                if requires_value(reference) && is_absent(row, reference) {
                    issues.push(Issue::MissingReference {
                        kind,
                        row: describe(kind, row),
                        field: field_label(kind, reference.field),
                    });
                    continue;
                }
                for key in reference.targets(row) {
                    if !target_exists(doc, reference, &key) {
                        issues.push(Issue::BrokenReference {
                            kind,
                            row: describe(kind, row),
                            field: field_label(kind, reference.field),
                            target: reference.target,
                            value: key,
                        });
                    }
                }
            }
        }

        let mut seen: BTreeMap<String, usize> = BTreeMap::new();
        for row in doc.rows(kind) {
            let key = match spec.code_field {
                Some(_) => record_code(spec, row).map(str::to_uppercase),
                None if !spec.key_fields.is_empty() => Some(describe(kind, row).to_uppercase()),
                None => None,
            };
            if let Some(key) = key {
                *seen.entry(key).or_default() += 1;
            }
        }
        for (key, _) in seen.into_iter().filter(|(_, n)| *n > 1) {
            issues.push(match spec.code_field {
                Some(_) => Issue::DuplicateCode { kind, code: key },
                None => Issue::DuplicateKey { kind, key },
            });
        }
    }

    let mut tiers: BTreeMap<(String, String), Vec<String>> = BTreeMap::new();
    for rule in doc.rows(EntityKind::Rule) {
        let rule_type = rule.get("RTYPE_ID").and_then(value_key);
        let tier = rule.get("ERRULE_TIER").and_then(value_key);
        if let (Some(rule_type), Some(tier)) = (rule_type, tier) {
            tiers
                .entry((rule_type, tier))
                .or_default()
                .push(describe(EntityKind::Rule, rule));
        }
    }
    for ((rule_type, tier), rules) in tiers.into_iter().filter(|(_, r)| r.len() > 1) {
        issues.push(Issue::DuplicateTier { rule_type, tier, rules });
    }

    ValidationReport { issues }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    fn doc(tables: Value) -> ConfigDocument {
        let mut config = tables.as_object().cloned().unwrap();
        config.insert(
            "CONFIG_BASE_VERSION".into(),
            json!({"COMPATIBILITY_VERSION": {"CONFIG_VERSION": "11"}}),
        );
        ConfigDocument::from_value(json!({ "G2_CONFIG": config })).unwrap()
    }

    fn feature_doc() -> ConfigDocument {
        doc(json!({
            "CFG_FTYPE": [{"FTYPE_ID": 1000, "FTYPE_CODE": "LOYALTY"}],
            "CFG_FELEM": [{"FELEM_ID": 1000, "FELEM_CODE": "ID_NUM"}],
            "CFG_FBOM": [{"FTYPE_CODE": "LOYALTY", "FELEM_CODE": "ID_NUM"}],
            "CFG_CFUNC": [{"CFUNC_ID": 1000, "CFUNC_CODE": "EXACT_COMP"}],
            "CFG_CFCALL": [{"CFCALL_ID": 1000, "FTYPE_CODE": "LOYALTY", "CFUNC_CODE": "EXACT_COMP"}],
            "CFG_CFBOM": [{"CFCALL_ID": 1000, "FTYPE_CODE": "LOYALTY", "FELEM_CODE": "ID_NUM"}],
            "CFG_DSRC": [{"DSRC_ID": 1000, "DSRC_CODE": "CUSTOMERS"}],
            "CFG_ATTR": []
        }))
    }

    fn first(doc: &ConfigDocument, kind: EntityKind) -> Record {
        doc.rows(kind).next().cloned().unwrap()
    }

    #[test]
    fn feature_delete_cascades_owned_rows() {
        let doc = feature_doc();
        let feature = first(&doc, EntityKind::Feature);
        let plan = plan_delete(&doc, EntityKind::Feature, &feature).unwrap();
        let kinds: Vec<EntityKind> = plan.cascade.iter().map(|(k, _)| *k).collect();
        assert_eq!(kinds.len(), 3);
        assert!(kinds.contains(&EntityKind::FeatureElement));
        assert!(kinds.contains(&EntityKind::ComparisonCall));
        assert!(kinds.contains(&EntityKind::ComparisonCallElement));
        // The call element is removed before its call.
        let call = kinds.iter().position(|k| *k == EntityKind::ComparisonCall).unwrap();
        let element = kinds.iter().position(|k| *k == EntityKind::ComparisonCallElement).unwrap();
        assert!(element < call);
    }

    #[test]
    fn element_delete_is_denied_while_bound() {
        let doc = feature_doc();
        let element = first(&doc, EntityKind::Element);
        let err = plan_delete(&doc, EntityKind::Element, &element).unwrap_err();
        let Error::ReferentialIntegrity { dependents, .. } = err else {
            panic!("expected referential integrity error");
        };
        let kinds: Vec<EntityKind> = dependents.iter().map(|d| d.kind).collect();
        assert!(kinds.contains(&EntityKind::FeatureElement));
        assert!(kinds.contains(&EntityKind::ComparisonCallElement));
    }

    #[test]
    fn data_source_with_attribute_is_blocked() {
        let doc = doc(json!({
            "CFG_DSRC": [{"DSRC_ID": 1000, "DSRC_CODE": "CUSTOMERS"}],
            "CFG_ATTR": [{"ATTR_ID": 1000, "ATTR_CODE": "CUST_ID", "DSRC_CODE": "CUSTOMERS",
                          "FTYPE_CODE": "X", "FELEM_CODE": "Y"}]
        }));
        let dsrc = first(&doc, EntityKind::DataSource);
        let deps = dependents(&doc, EntityKind::DataSource, &dsrc);
        assert_eq!(
            deps,
            vec![Dependent {
                kind: EntityKind::Attribute,
                key: "CUST_ID".into(),
                field: "dataSource".into()
            }]
        );
    }

    #[test]
    fn check_references_names_missing_code() {
        let doc = feature_doc();
        let record = json!({"FTYPE_CODE": "LOYALTY", "FELEM_CODE": "ELEM_X"}).as_object().cloned().unwrap();
        let err = check_references(&doc, EntityKind::FeatureElement, &record).unwrap_err();
        assert!(err.to_string().contains("ELEM_X"), "{err}");
    }

    #[test]
    fn validate_reports_every_problem() {
        let doc = doc(json!({
            "CFG_FTYPE": [{"FTYPE_ID": 1, "FTYPE_CODE": "A"}, {"FTYPE_ID": 2, "FTYPE_CODE": "a"}],
            "CFG_FBOM": [{"FTYPE_CODE": "A", "FELEM_CODE": "GONE"}],
            "CFG_ERRULE": [
                {"ERRULE_ID": 1, "ERRULE_CODE": "R1", "RTYPE_ID": 1, "QUAL_ERFRAG_CODE": "F", "ERRULE_TIER": 10},
                {"ERRULE_ID": 2, "ERRULE_CODE": "R2", "RTYPE_ID": 1, "QUAL_ERFRAG_CODE": "F", "ERRULE_TIER": 10}
            ],
            "CFG_RTYPE": [{"RTYPE_ID": 1, "RTYPE_CODE": "RESOLVED"}],
            "CFG_ERFRAG": [{"ERFRAG_ID": 1, "ERFRAG_CODE": "F", "ERFRAG_SOURCE": "./SCORES/MISSING[./X>1]"}]
        }));
        let report = validate(&doc);
        let text = report.to_string();
        assert!(text.contains("refers to missing element 'GONE'"), "{text}");
        assert!(text.contains("feature code A is used more than once"), "{text}");
        assert!(text.contains("tier 10 is shared by R1, R2"), "{text}");
        assert!(text.contains("missing feature 'MISSING'"), "{text}");
        assert_eq!(report.len(), 4);
    }

    #[test]
    fn wildcard_feature_is_not_a_reference() {
        let doc = doc(json!({
            "CFG_GPLAN": [{"GPLAN_ID": 1, "GPLAN_CODE": "INGEST"}],
            "CFG_GENERIC_THRESHOLD": [{"GPLAN_CODE": "INGEST", "BEHAVIOR": "NAME", "FTYPE_CODE": "ALL"}]
        }));
        assert!(validate(&doc).is_clean());
    }

    #[test]
    fn repeated_key_is_reported_once() {
        let doc = doc(json!({
            "CFG_FTYPE": [{"FTYPE_ID": 1, "FTYPE_CODE": "A"}],
            "CFG_FELEM": [{"FELEM_ID": 1, "FELEM_CODE": "E"}],
            "CFG_FBOM": [
                {"FTYPE_CODE": "A", "FELEM_CODE": "E"},
                {"FTYPE_CODE": "A", "FELEM_CODE": "E"},
                {"FTYPE_CODE": "A", "FELEM_CODE": "E"}
            ]
        }));
        let report = validate(&doc);
        assert_eq!(report.len(), 1, "{report}");
        assert!(report.to_string().contains("appears more than once"), "{report}");
    }
}
