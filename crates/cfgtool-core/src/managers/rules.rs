//! Fragments, rules, generic plans and their thresholds.

use cfgtool_schema::{ApiRecord, Domain, EntityKind, ExprPattern, Record, to_api, to_internal, value_key};
use serde_json::Value;
use std::collections::BTreeSet;

use super::feature::flag;
use super::{DomainManager, create_record, set_default, update_record};
use crate::base::{BaseManager, Selector, record_code, record_id};
use crate::document::ConfigDocument;
use crate::journal::Change;
use crate::scope::Scope;
use crate::{Error, Result};

/// Gap between consecutive tiers handed out by defaults and reordering.
const TIER_STEP: i64 = 10;

#[derive(Debug, Default, Clone, Copy)]
pub struct RulesManager;

impl RulesManager {
    /// Fill fields derived from others: a rule's type given by code becomes
    /// its id, a fragment's dependency list follows its source.
    fn derive(&self, kind: EntityKind, record: &mut Record, doc: &ConfigDocument) -> Result<()> {
        match kind {
            EntityKind::Rule => {
                if let Some(value) = record.get("RTYPE_ID").cloned()
                    && !value.is_null()
                {
                    let id = rule_type_id(doc, &value)?;
                    record.insert("RTYPE_ID".to_string(), Value::from(id));
                }
            }
            EntityKind::Fragment => {
                if let Some(source) = record.get("ERFRAG_SOURCE").and_then(Value::as_str) {
                    let depends = fragment_depends(doc, source);
                    record.insert("ERFRAG_DEPENDS".to_string(), depends);
                }
            }
            _ => {}
        }
        Ok(())
    }
}

impl DomainManager for RulesManager {
    fn domain(&self) -> Domain {
        Domain::Rules
    }

    fn prepare(&self, kind: EntityKind, record: &mut Record, doc: &ConfigDocument) -> Result<()> {
        self.derive(kind, record, doc)?;
        let code = record_code(kind.spec(), record).map(str::to_string);
        match kind {
            EntityKind::Fragment => {
                if let Some(code) = code {
                    set_default(record, "ERFRAG_DESC", code);
                }
            }
            EntityKind::Rule => {
                if let Some(code) = code {
                    set_default(record, "ERRULE_DESC", code);
                }
                set_default(record, "RESOLVE", "Yes");
                set_default(record, "RELATE", "No");
                if let Some(rule_type) = record.get("RTYPE_ID").and_then(Value::as_i64) {
                    let next = tiers_of(doc, rule_type).map(|(_, tier)| tier).max().unwrap_or(0) + TIER_STEP;
                    set_default(record, "ERRULE_TIER", next);
                }
            }
            EntityKind::GenericPlan => {
                if let Some(code) = code {
                    set_default(record, "GPLAN_DESC", code);
                }
            }
            EntityKind::GenericThreshold => {
                set_default(record, "FTYPE_CODE", "ALL");
                set_default(record, "CANDIDATE_CAP", -1);
                set_default(record, "SCORING_CAP", -1);
                set_default(record, "SEND_TO_REDO", "Yes");
            }
            _ => {}
        }
        Ok(())
    }

    fn validate(
        &self,
        kind: EntityKind,
        doc: &ConfigDocument,
        record: &Record,
        _before: Option<&Record>,
    ) -> Result<()> {
        match kind {
            EntityKind::Rule => {
                for field in ["RESOLVE", "RELATE"] {
                    if flag(record.get(field)).is_none() {
                        return Err(Error::invalid(kind, field.to_lowercase(), "must be Yes or No"));
                    }
                }
                let tier = record
                    .get("ERRULE_TIER")
                    .and_then(Value::as_i64)
                    .ok_or_else(|| Error::invalid(kind, "tier", "must be an integer"))?;
                let rule_type = record.get("RTYPE_ID").and_then(Value::as_i64).unwrap_or_default();
                let id = record_id(kind.spec(), record);
                if let Some((other, _)) = tiers_of(doc, rule_type).find(|(r, t)| *t == tier && record_id(kind.spec(), r) != id) {
                    let other = record_code(kind.spec(), other).unwrap_or_default();
                    return Err(Error::invalid(
                        kind,
                        "tier",
                        format!("tier {tier} is already used by rule {other}"),
                    ));
                }
            }
            EntityKind::GenericThreshold => {
                for field in ["CANDIDATE_CAP", "SCORING_CAP"] {
                    if record.get(field).is_some_and(|v| !v.is_null() && v.as_i64().is_none()) {
                        let name = cfgtool_schema::api_name(kind, field).unwrap_or(field);
                        return Err(Error::invalid(kind, name, "must be an integer"));
                    }
                }
                if flag(record.get("SEND_TO_REDO")).is_none() {
                    return Err(Error::invalid(kind, "sendToRedo", "must be Yes or No"));
                }
            }
            _ => {}
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
        let mut changes = to_internal(kind, fields)?;
        let before = scope.base(kind).resolve(selector)?.clone();
        self.derive(kind, &mut changes, scope.doc())?;
        let after = update_record(self, scope, kind, before, changes)?;
        Ok(to_api(kind, &after))
    }
}

impl RulesManager {
    /// Give the rules of one rule type the tiers 10, 20, ... in the order
    /// named. `codes` must name every rule of that type exactly once.
    pub fn reorder_rules(&self, scope: &mut Scope<'_>, rule_type: &str, codes: &[String]) -> Result<Vec<ApiRecord>> {
        let rule_type_row = scope.base(EntityKind::RuleType).resolve(&Selector::parse(rule_type))?;
        let type_id = record_id(EntityKind::RuleType.spec(), rule_type_row).unwrap_or_default();
        let type_code = record_code(EntityKind::RuleType.spec(), rule_type_row)
            .unwrap_or(rule_type)
            .to_string();

        let rules: Vec<Record> = tiers_of(scope.doc(), type_id).map(|(r, _)| r.clone()).collect();
        let existing: BTreeSet<String> = rules
            .iter()
            .filter_map(|r| record_code(EntityKind::Rule.spec(), r))
            .map(str::to_uppercase)
            .collect();

        let mut named = BTreeSet::new();
        for code in codes {
            let code = code.trim().to_uppercase();
            if !existing.contains(&code) {
                return Err(Error::invalid(
                    format!("rule type {type_code}"),
                    "rules",
                    format!("{code} is not a rule of this type"),
                ));
            }
            if !named.insert(code.clone()) {
                return Err(Error::invalid(
                    format!("rule type {type_code}"),
                    "rules",
                    format!("{code} is named more than once"),
                ));
            }
        }
        let missing: Vec<&str> = existing.difference(&named).map(String::as_str).collect();
        if !missing.is_empty() {
            return Err(Error::invalid(
                format!("rule type {type_code}"),
                "rules",
                format!("missing {}", missing.join(", ")),
            ));
        }

        // Tiers are swapped wholesale; intermediate states may repeat a tier.
        let mut reordered = Vec::with_capacity(codes.len());
        for (position, code) in codes.iter().enumerate() {
            let before = scope.base(EntityKind::Rule).get_by_code(code)?.clone();
            let mut after = before.clone();
            let tier = (position as i64 + 1) * TIER_STEP;
            after.insert("ERRULE_TIER".to_string(), Value::from(tier));
            reordered.push(to_api(EntityKind::Rule, &after));
            scope.commit(Change::Update {
                kind: EntityKind::Rule,
                before,
                after,
            })?;
        }
        Ok(reordered)
    }

    /// Copy a generic plan together with all of its thresholds.
    pub fn clone_generic_plan(
        &self,
        scope: &mut Scope<'_>,
        source: &str,
        new_code: &str,
        description: Option<&str>,
    ) -> Result<ApiRecord> {
        let source_plan = scope.base(EntityKind::GenericPlan).resolve(&Selector::parse(source))?;
        let source_code = record_code(EntityKind::GenericPlan.spec(), source_plan)
            .unwrap_or_default()
            .to_string();

        let mut plan = Record::new();
        plan.insert("GPLAN_CODE".to_string(), Value::from(new_code));
        let description = description
            .map(str::to_string)
            .or_else(|| source_plan.get("GPLAN_DESC").and_then(Value::as_str).map(|d| format!("{d} (copy)")));
        if let Some(description) = description {
            plan.insert("GPLAN_DESC".to_string(), Value::from(description));
        }
        let thresholds: Vec<Record> = scope
            .base(EntityKind::GenericThreshold)
            .find_all("GPLAN_CODE", &source_code)
            .cloned()
            .collect();

        let plan = create_record(self, scope, EntityKind::GenericPlan, plan)?;
        let new_code = record_code(EntityKind::GenericPlan.spec(), &plan)
            .unwrap_or_default()
            .to_string();
        for mut threshold in thresholds {
            threshold.insert("GPLAN_CODE".to_string(), Value::from(new_code.clone()));
            create_record(self, scope, EntityKind::GenericThreshold, threshold)?;
        }
        Ok(to_api(EntityKind::GenericPlan, &plan))
    }
}

/// Rules of one rule type paired with their tiers.
fn tiers_of(doc: &ConfigDocument, rule_type: i64) -> impl Iterator<Item = (&Record, i64)> {
    doc.rows(EntityKind::Rule).filter_map(move |r| {
        if r.get("RTYPE_ID").and_then(Value::as_i64) != Some(rule_type) {
            return None;
        }
        r.get("ERRULE_TIER").and_then(Value::as_i64).map(|tier| (r, tier))
    })
}

/// Accept a rule type by id or by code.
fn rule_type_id(doc: &ConfigDocument, value: &Value) -> Result<i64> {
    let text = value_key(value).unwrap_or_default();
    let base = BaseManager::new(EntityKind::RuleType, doc);
    let row = match text.trim().parse::<i64>() {
        Ok(id) => base.find_by_id(id),
        Err(_) => base.find_by_code(&text),
    };
    row.and_then(|r| record_id(EntityKind::RuleType.spec(), r))
        .ok_or_else(|| Error::invalid(EntityKind::Rule, "ruleType", format!("unknown rule type '{text}'")))
}

/// Comma-separated ids of the fragments a source expression mentions.
fn fragment_depends(doc: &ConfigDocument, source: &str) -> Value {
    let base = BaseManager::new(EntityKind::Fragment, doc);
    let ids: Vec<String> = ExprPattern::FragmentRefs
        .extract(source)
        .iter()
        .filter_map(|code| base.find_by_code(code))
        .filter_map(|r| record_id(EntityKind::Fragment.spec(), r))
        .map(|id| id.to_string())
        .collect();
    if ids.is_empty() {
        Value::Null
    } else {
        Value::from(ids.join(","))
    }
}
