//! Features, elements, their bindings, attributes and behavior overrides.

use cfgtool_schema::{
    ApiRecord, Domain, EntityKind, ExprPattern, Record, to_api, to_internal, value_key,
};
use serde_json::{Value, json};
use std::collections::BTreeSet;

use super::{DomainManager, create_record, delete_record, normalize, set_default, text_arg, update_record};
use crate::base::{BaseManager, Selector, describe, record_code};
use crate::document::ConfigDocument;
use crate::error::Dependent;
use crate::scope::Scope;
use crate::{Error, Result};

/// Frequencies a behavior code may start with.
const FREQUENCIES: &[&str] = &["A1", "F1", "FF", "FM", "FVM", "NONE", "NAME"];

/// A built-in feature layout used by `templateAdd`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Template {
    pub name: &'static str,
    /// Feature class given to the new feature and its attributes
    pub class: &'static str,
    pub elements: &'static [&'static str],
}

pub const TEMPLATES: &[Template] = &[
    Template {
        name: "NAME",
        class: "NAME",
        elements: &["FULL_NAME", "SURNAME", "GIVEN_NAME"],
    },
    Template {
        name: "ADDRESS",
        class: "ADDRESS",
        elements: &["ADDR_FULL", "ADDR_LINE1", "ADDR_CITY", "ADDR_STATE", "ADDR_POSTAL_CODE"],
    },
];

/// One entry of an `elementList`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSpec {
    pub element: String,
    pub compared: bool,
    pub expressed: bool,
    pub display: bool,
    pub derived: bool,
    pub usage_type: Option<String>,
}

impl ElementSpec {
    fn parse(value: &Value) -> Result<Self> {
        let subject = EntityKind::Feature;
        match value {
            Value::String(code) if !code.trim().is_empty() => Ok(Self {
                element: code.trim().to_uppercase(),
                compared: false,
                expressed: false,
                display: true,
                derived: false,
                usage_type: None,
            }),
            Value::Object(fields) => {
                let element = text_arg(fields, "element")
                    .ok_or_else(|| Error::invalid(subject, "elementList", "every entry needs an element"))?
                    .to_uppercase();
                Ok(Self {
                    element,
                    compared: flag(fields.get("compared")).unwrap_or(false),
                    expressed: flag(fields.get("expressed")).unwrap_or(false),
                    display: flag(fields.get("display")).unwrap_or(true),
                    derived: flag(fields.get("derived")).unwrap_or(false),
                    usage_type: text_arg(fields, "usageType").map(str::to_uppercase),
                })
            }
            _ => Err(Error::invalid(
                subject,
                "elementList",
                "entries must be element codes or objects",
            )),
        }
    }
}

/// A parsed `addFeature` request.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRequest {
    /// Feature row fields in internal names
    pub fields: Record,
    pub elements: Vec<ElementSpec>,
    pub comparison: Option<String>,
    pub expression: Option<String>,
    pub standardize: Option<String>,
    pub distinct: Option<String>,
}

impl FeatureRequest {
    /// Split an API record into the feature row and its bindings.
    pub fn from_api(fields: &ApiRecord) -> Result<Self> {
        let mut row = fields.clone();
        let elements = match row.shift_remove("elementList") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items.iter().map(ElementSpec::parse).collect::<Result<_>>()?,
            Some(_) => {
                return Err(Error::invalid(EntityKind::Feature, "elementList", "must be a list"));
            }
        };
        let mut take = |name: &str| {
            row.shift_remove(name)
                .as_ref()
                .and_then(value_key)
                .map(|s| s.trim().to_uppercase())
        };
        let comparison = take("comparison");
        let expression = take("expression");
        let standardize = take("standardize");
        let distinct = take("distinct");
        let behavior = take("behavior");

        let mut internal = to_internal(EntityKind::Feature, &row)?;
        if let Some(behavior) = behavior {
            apply_behavior(EntityKind::Feature, &mut internal, &behavior)?;
        }
        normalize(EntityKind::Feature, &mut internal);

        let mut seen = BTreeSet::new();
        for spec in &elements {
            if !seen.insert(spec.element.clone()) {
                return Err(Error::invalid(
                    EntityKind::Feature,
                    "elementList",
                    format!("element {} is listed twice", spec.element),
                ));
            }
        }

        Ok(Self {
            fields: internal,
            elements,
            comparison,
            expression,
            standardize,
            distinct,
        })
    }

    pub fn code(&self) -> Option<&str> {
        self.fields.get("FTYPE_CODE").and_then(Value::as_str)
    }

    /// Whether the feature should start out active.
    pub fn active(&self) -> Result<bool> {
        let possible = !self.elements.is_empty() && self.comparison.is_some();
        match self.fields.get("ACTIVE") {
            None | Some(Value::Null) => Ok(possible),
            Some(value) => match flag(Some(value)) {
                Some(true) if !possible => Err(Error::invalid(
                    EntityKind::Feature,
                    "active",
                    "an active feature needs at least one element and a comparison function",
                )),
                Some(active) => Ok(active),
                None => Err(Error::invalid(EntityKind::Feature, "active", "must be Yes or No")),
            },
        }
    }

    /// Check everything the request names before anything is written.
    pub fn check(&self, doc: &ConfigDocument) -> Result<()> {
        let code = self
            .code()
            .ok_or_else(|| Error::invalid(EntityKind::Feature, "feature", "is required"))?;
        BaseManager::new(EntityKind::Feature, doc).assert_unique_code(code)?;

        let elements = BaseManager::new(EntityKind::Element, doc);
        for spec in &self.elements {
            if elements.find_by_code(&spec.element).is_none() {
                return Err(Error::invalid(
                    EntityKind::Feature,
                    "elementList",
                    format!("unknown element '{}'", spec.element),
                ));
            }
        }
        let functions = [
            ("comparison", EntityKind::ComparisonFunction, &self.comparison),
            ("expression", EntityKind::ExpressionFunction, &self.expression),
            ("standardize", EntityKind::StandardizeFunction, &self.standardize),
            ("distinct", EntityKind::DistinctFunction, &self.distinct),
        ];
        for (field, kind, function) in functions {
            if let Some(function) = function
                && BaseManager::new(kind, doc).find_by_code(function).is_none()
            {
                return Err(Error::invalid(
                    EntityKind::Feature,
                    field,
                    format!("unknown {kind} '{function}'"),
                ));
            }
        }
        self.active()?;
        Ok(())
    }
}

/// Read a Yes/No style flag.
pub(crate) fn flag(value: Option<&Value>) -> Option<bool> {
    match value? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "yes" | "y" | "true" | "1" => Some(true),
            "no" | "n" | "false" | "0" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        _ => None,
    }
}

pub(crate) fn yes_no(value: bool) -> Value {
    Value::from(if value { "Yes" } else { "No" })
}

/// A missing ACTIVE field counts as active.
pub(crate) fn is_active_feature(record: &Record) -> bool {
    flag(record.get("ACTIVE")).unwrap_or(true)
}

/// Expand a behavior code such as `F1ES` into frequency, exclusivity and stability.
pub(crate) fn apply_behavior(kind: EntityKind, record: &mut Record, behavior: &str) -> Result<()> {
    let code = behavior.trim().to_uppercase();
    let parsed = if FREQUENCIES.contains(&code.as_str()) {
        Some((code.as_str(), false, false))
    } else if let Some(freq) = code.strip_suffix("ES").filter(|f| FREQUENCIES.contains(f)) {
        Some((freq, true, true))
    } else if let Some(freq) = code.strip_suffix('E').filter(|f| FREQUENCIES.contains(f)) {
        Some((freq, true, false))
    } else if let Some(freq) = code.strip_suffix('S').filter(|f| FREQUENCIES.contains(f)) {
        Some((freq, false, true))
    } else {
        None
    };
    let (freq, exclusive, stable) = parsed.ok_or_else(|| {
        Error::invalid(
            kind,
            "behavior",
            format!("'{behavior}' is not a behavior code (frequency {} plus optional E and S)", FREQUENCIES.join("|")),
        )
    })?;
    record.insert("FTYPE_FREQ".into(), Value::from(freq));
    record.insert("FTYPE_EXCL".into(), yes_no(exclusive));
    record.insert("FTYPE_STAB".into(), yes_no(stable));
    Ok(())
}

/// Rules that are active and reach `feature` through their fragments.
pub fn active_rules_using(doc: &ConfigDocument, feature: &str) -> Vec<String> {
    let mut fragments: BTreeSet<String> = doc
        .rows(EntityKind::Fragment)
        .filter(|f| {
            source_of(f)
                .map(|s| ExprPattern::FeatureScores.extract(s))
                .is_some_and(|codes| codes.iter().any(|c| c.eq_ignore_ascii_case(feature)))
        })
        .filter_map(|f| record_code(EntityKind::Fragment.spec(), f).map(str::to_uppercase))
        .collect();

    loop {
        let before = fragments.len();
        for fragment in doc.rows(EntityKind::Fragment) {
            let refs = source_of(fragment)
                .map(|s| ExprPattern::FragmentRefs.extract(s))
                .unwrap_or_default();
            if refs.iter().any(|r| fragments.contains(&r.to_uppercase()))
                && let Some(code) = record_code(EntityKind::Fragment.spec(), fragment)
            {
                fragments.insert(code.to_uppercase());
            }
        }
        if fragments.len() == before {
            break;
        }
    }

    doc.rows(EntityKind::Rule)
        .filter(|rule| flag(rule.get("RESOLVE")) == Some(true) || flag(rule.get("RELATE")) == Some(true))
        .filter(|rule| {
            ["QUAL_ERFRAG_CODE", "DISQ_ERFRAG_CODE"].iter().any(|field| {
                rule.get(*field)
                    .and_then(value_key)
                    .is_some_and(|code| fragments.contains(&code.to_uppercase()))
            })
        })
        .map(|rule| describe(EntityKind::Rule, rule))
        .collect()
}

fn source_of(fragment: &Record) -> Option<&str> {
    fragment.get("ERFRAG_SOURCE").and_then(Value::as_str)
}

/// Features, elements, bindings, attributes and behavior overrides.
#[derive(Debug, Default, Clone, Copy)]
pub struct FeatureManager;

impl DomainManager for FeatureManager {
    fn domain(&self) -> Domain {
        Domain::Features
    }

    fn prepare(&self, kind: EntityKind, record: &mut Record, doc: &ConfigDocument) -> Result<()> {
        match kind {
            EntityKind::Feature => {
                if let Some(code) = record.get("FTYPE_CODE").and_then(Value::as_str).map(str::to_string) {
                    set_default(record, "FTYPE_DESC", code);
                }
                if BaseManager::new(EntityKind::FeatureClass, doc).find_by_code("OTHER").is_some() {
                    set_default(record, "FCLASS_CODE", "OTHER");
                }
                set_default(record, "FTYPE_FREQ", "FM");
                set_default(record, "FTYPE_EXCL", "No");
                set_default(record, "FTYPE_STAB", "No");
                set_default(record, "ANONYMIZE", "No");
                set_default(record, "DERIVED", "No");
                set_default(record, "USED_FOR_CAND", "No");
                set_default(record, "SHOW_IN_MATCH_KEY", "Yes");
                set_default(record, "PERSIST_HISTORY", "Yes");
                set_default(record, "VERSION", 1);
                set_default(record, "ACTIVE", "No");
            }
            EntityKind::Element => {
                if let Some(code) = record.get("FELEM_CODE").and_then(Value::as_str).map(str::to_string) {
                    set_default(record, "FELEM_DESC", code);
                }
                set_default(record, "DATA_TYPE", "string");
                set_default(record, "TOKENIZE", "No");
            }
            EntityKind::FeatureElement => {
                let feature = record.get("FTYPE_CODE").and_then(value_key).unwrap_or_default();
                let next = doc
                    .rows(EntityKind::FeatureElement)
                    .filter(|r| r.get("FTYPE_CODE").and_then(value_key).as_deref() == Some(feature.as_str()))
                    .filter_map(|r| r.get("EXEC_ORDER").and_then(Value::as_i64))
                    .max()
                    .unwrap_or(0)
                    + 1;
                set_default(record, "EXEC_ORDER", next);
                set_default(record, "DISPLAY_LEVEL", 1);
                set_default(record, "DERIVED", "No");
            }
            EntityKind::Attribute => {
                set_default(record, "ATTR_CLASS", "OTHER");
                set_default(record, "REQUIRED", "No");
                set_default(record, "ADVANCED", "No");
                set_default(record, "INTERNAL", "No");
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
        before: Option<&Record>,
    ) -> Result<()> {
        match kind {
            EntityKind::Feature => {
                if record.get("ACTIVE").is_some_and(|v| flag(Some(v)).is_none()) {
                    return Err(Error::invalid(kind, "active", "must be Yes or No"));
                }
                let Some(before) = before else { return Ok(()) };
                let code = record_code(kind.spec(), record).unwrap_or_default();
                match (is_active_feature(before), is_active_feature(record)) {
                    (false, true) => check_activation(doc, code),
                    (true, false) => check_deactivation(doc, code),
                    _ => Ok(()),
                }
            }
            EntityKind::Attribute => {
                let feature = record.get("FTYPE_CODE").and_then(value_key).unwrap_or_default();
                let element = record.get("FELEM_CODE").and_then(value_key).unwrap_or_default();
                if !is_bound(doc, &feature, &element) {
                    return Err(Error::invalid(
                        kind,
                        "element",
                        format!("element {element} is not part of feature {feature}"),
                    ));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn get(&self, doc: &ConfigDocument, kind: EntityKind, selector: &Selector) -> Result<ApiRecord> {
        let record = BaseManager::new(kind, doc).resolve(selector)?;
        if kind == EntityKind::Feature {
            return Ok(feature_view(doc, record));
        }
        Ok(to_api(kind, record))
    }
}

fn check_activation(doc: &ConfigDocument, feature: &str) -> Result<()> {
    let elements = BaseManager::new(EntityKind::FeatureElement, doc)
        .find_all("FTYPE_CODE", feature)
        .count();
    let comparisons = BaseManager::new(EntityKind::ComparisonCall, doc)
        .find_all("FTYPE_CODE", feature)
        .count();
    if elements == 0 || comparisons == 0 {
        return Err(Error::invalid(
            EntityKind::Feature,
            "active",
            format!("feature {feature} needs at least one element and a comparison call before it can be activated"),
        ));
    }
    Ok(())
}

/// Refuse a removal that leaves an active feature without an element binding
/// or a comparison call. `removed` holds every row the operation deletes,
/// `record` first; features deleted alongside their rows are skipped.
pub(crate) fn check_removal_keeps_activation(
    doc: &ConfigDocument,
    kind: EntityKind,
    record: &Record,
    removed: &[(EntityKind, &Record)],
) -> Result<()> {
    let owner = |row: &Record| row.get("FTYPE_CODE").and_then(value_key);
    let touched: BTreeSet<String> = removed
        .iter()
        .filter(|(k, _)| matches!(k, EntityKind::FeatureElement | EntityKind::ComparisonCall))
        .filter_map(|(_, row)| owner(*row))
        .filter(|code| {
            !removed.iter().any(|(k, row)| {
                *k == EntityKind::Feature && record_code(k.spec(), row).is_some_and(|c| c.eq_ignore_ascii_case(code))
            })
        })
        .collect();
    let remaining = |rows: EntityKind, feature: &str| {
        BaseManager::new(rows, doc)
            .find_all("FTYPE_CODE", feature)
            .filter(|row| !removed.iter().any(|(k, r)| *k == rows && *r == *row))
            .count()
    };
    let mut dependents = Vec::new();
    for code in touched {
        let Some(feature) = BaseManager::new(EntityKind::Feature, doc).find_by_code(&code) else {
            continue;
        };
        if !is_active_feature(feature) {
            continue;
        }
        if remaining(EntityKind::FeatureElement, &code) == 0 || remaining(EntityKind::ComparisonCall, &code) == 0 {
            dependents.push(Dependent {
                kind: EntityKind::Feature,
                key: code,
                field: "active".into(),
            });
        }
    }
    if dependents.is_empty() {
        return Ok(());
    }
    Err(Error::ReferentialIntegrity {
        kind,
        key: describe(kind, record),
        dependents,
    })
}

fn check_deactivation(doc: &ConfigDocument, feature: &str) -> Result<()> {
    let rules = active_rules_using(doc, feature);
    if !rules.is_empty() {
        return Err(Error::invalid(
            EntityKind::Feature,
            "active",
            format!("feature {feature} is used by active rules: {}", rules.join(", ")),
        ));
    }
    Ok(())
}

fn is_bound(doc: &ConfigDocument, feature: &str, element: &str) -> bool {
    let key = [("FTYPE_CODE", &json!(feature)), ("FELEM_CODE", &json!(element))];
    BaseManager::new(EntityKind::FeatureElement, doc).find_by_key(&key).is_some()
}

/// A feature with its element list and bound function codes.
pub fn feature_view(doc: &ConfigDocument, feature: &Record) -> ApiRecord {
    let mut view = to_api(EntityKind::Feature, feature);
    let code = record_code(EntityKind::Feature.spec(), feature).unwrap_or_default();

    let call_elements = |call_kind: EntityKind, bom_kind: EntityKind| -> BTreeSet<String> {
        let id_field = call_kind.spec().id_field.unwrap_or_default();
        let ids: BTreeSet<String> = BaseManager::new(call_kind, doc)
            .find_all("FTYPE_CODE", code)
            .filter_map(|c| c.get(id_field).and_then(value_key))
            .collect();
        doc.rows(bom_kind)
            .filter(|b| b.get(id_field).and_then(value_key).is_some_and(|id| ids.contains(&id)))
            .filter_map(|b| b.get("FELEM_CODE").and_then(value_key))
            .map(|e| e.to_uppercase())
            .collect()
    };
    let compared = call_elements(EntityKind::ComparisonCall, EntityKind::ComparisonCallElement);
    let expressed = call_elements(EntityKind::ExpressionCall, EntityKind::ExpressionCallElement);

    let mut bindings: Vec<&Record> = BaseManager::new(EntityKind::FeatureElement, doc)
        .find_all("FTYPE_CODE", code)
        .collect();
    bindings.sort_by_key(|b| b.get("EXEC_ORDER").and_then(Value::as_i64).unwrap_or(i64::MAX));
    let element_list: Vec<Value> = bindings
        .into_iter()
        .map(|binding| {
            let element = binding.get("FELEM_CODE").and_then(value_key).unwrap_or_default();
            let mut entry = to_api(EntityKind::FeatureElement, binding);
            entry.shift_remove("feature");
            entry.insert("compared".into(), yes_no(compared.contains(&element.to_uppercase())));
            entry.insert("expressed".into(), yes_no(expressed.contains(&element.to_uppercase())));
            Value::Object(entry)
        })
        .collect();
    view.insert("elementList".into(), Value::Array(element_list));

    let functions = [
        ("comparison", EntityKind::ComparisonCall, "CFUNC_CODE"),
        ("expression", EntityKind::ExpressionCall, "EFUNC_CODE"),
        ("standardize", EntityKind::StandardizeCall, "SFUNC_CODE"),
        ("distinct", EntityKind::DistinctCall, "DFUNC_CODE"),
    ];
    for (name, kind, field) in functions {
        let function = BaseManager::new(kind, doc)
            .find_all("FTYPE_CODE", code)
            .find_map(|c| c.get(field).cloned());
        if let Some(function) = function {
            view.insert(name.into(), function);
        }
    }
    view
}

impl FeatureManager {
    /// Create the feature row and its element bindings.
    ///
    /// Function calls are created separately by the function manager, in the
    /// same transaction, so the ACTIVE flag is written as requested here.
    pub fn add_feature(&self, scope: &mut Scope<'_>, request: &FeatureRequest) -> Result<Record> {
        request.check(scope.doc())?;
        let mut row = request.fields.clone();
        row.insert("ACTIVE".into(), yes_no(request.active()?));
        let feature = create_record(self, scope, EntityKind::Feature, row)?;
        let code = record_code(EntityKind::Feature.spec(), &feature)
            .unwrap_or_default()
            .to_string();

        for (position, spec) in request.elements.iter().enumerate() {
            let mut binding = Record::new();
            binding.insert("FTYPE_CODE".into(), Value::from(code.as_str()));
            binding.insert("FELEM_CODE".into(), Value::from(spec.element.as_str()));
            binding.insert("EXEC_ORDER".into(), Value::from(position as i64 + 1));
            binding.insert("DISPLAY_LEVEL".into(), Value::from(i64::from(spec.display)));
            binding.insert("DERIVED".into(), yes_no(spec.derived));
            if let Some(usage) = &spec.usage_type {
                binding.insert("USAGE_TYPE".into(), Value::from(usage.as_str()));
            }
            create_record(self, scope, EntityKind::FeatureElement, binding)?;
        }
        Ok(feature)
    }

    /// Turn a feature on or off, enforcing the activation rules.
    pub fn set_active(&self, scope: &mut Scope<'_>, feature: &str, active: bool) -> Result<ApiRecord> {
        let before = scope.base(EntityKind::Feature).get_by_code(feature)?.clone();
        let mut changes = Record::new();
        changes.insert("ACTIVE".into(), yes_no(active));
        let after = update_record(self, scope, EntityKind::Feature, before, changes)?;
        Ok(feature_view(scope.doc(), &after))
    }

    /// Set the feature's VERSION field.
    pub fn update_feature_version(&self, scope: &mut Scope<'_>, feature: &str, version: i64) -> Result<ApiRecord> {
        if version < 1 {
            return Err(Error::invalid(EntityKind::Feature, "version", "must be a positive integer"));
        }
        let before = scope.base(EntityKind::Feature).get_by_code(feature)?.clone();
        let mut changes = Record::new();
        changes.insert("VERSION".into(), Value::from(version));
        let after = update_record(self, scope, EntityKind::Feature, before, changes)?;
        Ok(to_api(EntityKind::Feature, &after))
    }

    /// Bind an element to a feature. `fields` may carry order, display,
    /// derived, delimiter and usageType.
    pub fn add_element_to_feature(
        &self,
        scope: &mut Scope<'_>,
        feature: &str,
        element: &str,
        fields: &ApiRecord,
    ) -> Result<ApiRecord> {
        scope.base(EntityKind::Feature).get_by_code(feature)?;
        scope.base(EntityKind::Element).get_by_code(element)?;
        let mut binding = to_internal(EntityKind::FeatureElement, fields)?;
        binding.insert("FTYPE_CODE".into(), Value::from(feature));
        binding.insert("FELEM_CODE".into(), Value::from(element));
        let record = create_record(self, scope, EntityKind::FeatureElement, binding)?;
        Ok(to_api(EntityKind::FeatureElement, &record))
    }

    /// Unbind an element. Refused while an attribute or call element still
    /// uses the pair.
    pub fn delete_element_from_feature(&self, scope: &mut Scope<'_>, feature: &str, element: &str) -> Result<Record> {
        let binding = binding(scope.doc(), feature, element)?.clone();
        let mut dependents = Vec::new();
        for kind in [
            EntityKind::Attribute,
            EntityKind::ComparisonCallElement,
            EntityKind::ExpressionCallElement,
            EntityKind::DistinctCallElement,
        ] {
            let key = [("FTYPE_CODE", &json!(feature)), ("FELEM_CODE", &json!(element))];
            for row in scope.doc().rows(kind) {
                let uses = key.iter().all(|(field, wanted)| {
                    row.get(*field)
                        .and_then(value_key)
                        .zip(value_key(wanted))
                        .is_some_and(|(a, b)| a.eq_ignore_ascii_case(&b))
                });
                if uses {
                    dependents.push(Dependent {
                        kind,
                        key: describe(kind, row),
                        field: "element".into(),
                    });
                }
            }
        }
        if !dependents.is_empty() {
            return Err(Error::ReferentialIntegrity {
                kind: EntityKind::FeatureElement,
                key: describe(EntityKind::FeatureElement, &binding),
                dependents,
            });
        }
        check_removal_keeps_activation(
            scope.doc(),
            EntityKind::FeatureElement,
            &binding,
            &[(EntityKind::FeatureElement, &binding)],
        )?;
        delete_record(scope, EntityKind::FeatureElement, binding)
    }

    /// Change display, derived, delimiter, order or usage type of a binding.
    pub fn set_feature_element(
        &self,
        scope: &mut Scope<'_>,
        feature: &str,
        element: &str,
        fields: &ApiRecord,
    ) -> Result<ApiRecord> {
        let before = binding(scope.doc(), feature, element)?.clone();
        let mut changes = to_internal(EntityKind::FeatureElement, fields)?;
        if let Some(derived) = changes.get("DERIVED").map(|v| flag(Some(v))) {
            let derived = derived.ok_or_else(|| Error::invalid(EntityKind::FeatureElement, "derived", "must be Yes or No"))?;
            changes.insert("DERIVED".into(), yes_no(derived));
        }
        if let Some(level) = changes.get("DISPLAY_LEVEL")
            && !level.is_i64()
        {
            return Err(Error::invalid(EntityKind::FeatureElement, "display", "must be an integer"));
        }
        let after = update_record(self, scope, EntityKind::FeatureElement, before, changes)?;
        Ok(to_api(EntityKind::FeatureElement, &after))
    }

    /// Add a behavior override; `behavior` may be given as a code such as `F1E`.
    pub fn add_behavior_override(&self, scope: &mut Scope<'_>, fields: &ApiRecord) -> Result<ApiRecord> {
        let mut fields = fields.clone();
        let behavior = fields.shift_remove("behavior");
        let mut record = to_internal(EntityKind::BehaviorOverride, &fields)?;
        if let Some(behavior) = behavior.as_ref().and_then(value_key) {
            apply_behavior(EntityKind::BehaviorOverride, &mut record, &behavior)?;
        }
        if record.get("FTYPE_FREQ").is_none() {
            return Err(Error::invalid(EntityKind::BehaviorOverride, "behavior", "is required"));
        }
        let record = create_record(self, scope, EntityKind::BehaviorOverride, record)?;
        Ok(to_api(EntityKind::BehaviorOverride, &record))
    }

    /// Build a feature, any missing elements, bindings and attributes from a template.
    pub fn apply_template(&self, scope: &mut Scope<'_>, template: &str, feature: &str) -> Result<ApiRecord> {
        let template = TEMPLATES
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(template.trim()))
            .ok_or_else(|| {
                let names: Vec<&str> = TEMPLATES.iter().map(|t| t.name).collect();
                Error::invalid(
                    "template",
                    "template",
                    format!("unknown template '{template}', expected one of: {}", names.join(", ")),
                )
            })?;
        let feature = feature.trim().to_uppercase();

        let mut row = Record::new();
        row.insert("FTYPE_CODE".into(), Value::from(feature.as_str()));
        if scope.base(EntityKind::FeatureClass).find_by_code(template.class).is_some() {
            row.insert("FCLASS_CODE".into(), Value::from(template.class));
        }
        let created = create_record(self, scope, EntityKind::Feature, row)?;

        for (position, element) in template.elements.iter().enumerate() {
            if scope.base(EntityKind::Element).find_by_code(element).is_none() {
                let mut row = Record::new();
                row.insert("FELEM_CODE".into(), Value::from(*element));
                create_record(self, scope, EntityKind::Element, row)?;
            }

            let mut binding = Record::new();
            binding.insert("FTYPE_CODE".into(), Value::from(feature.as_str()));
            binding.insert("FELEM_CODE".into(), Value::from(*element));
            binding.insert("EXEC_ORDER".into(), Value::from(position as i64 + 1));
            create_record(self, scope, EntityKind::FeatureElement, binding)?;

            let mut attribute = Record::new();
            attribute.insert("ATTR_CODE".into(), Value::from(format!("{feature}_{element}")));
            attribute.insert("ATTR_CLASS".into(), Value::from(template.name));
            attribute.insert("FTYPE_CODE".into(), Value::from(feature.as_str()));
            attribute.insert("FELEM_CODE".into(), Value::from(*element));
            create_record(self, scope, EntityKind::Attribute, attribute)?;
        }
        Ok(feature_view(scope.doc(), &created))
    }
}

fn binding<'d>(doc: &'d ConfigDocument, feature: &str, element: &str) -> Result<&'d Record> {
    let key = [
        ("FTYPE_CODE", &json!(feature.trim())),
        ("FELEM_CODE", &json!(element.trim())),
    ];
    BaseManager::new(EntityKind::FeatureElement, doc)
        .find_by_key(&key)
        .ok_or_else(|| Error::not_found(EntityKind::FeatureElement, format!("{feature}/{element}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::Journal;
    use crate::scope::Session;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn doc() -> ConfigDocument {
        ConfigDocument::parse(cfgtool_store::DEFAULT_TEMPLATE).unwrap()
    }

    fn api(value: Value) -> ApiRecord {
        value.as_object().cloned().unwrap()
    }

    #[rstest]
    #[case("FM", "FM", "No", "No")]
    #[case("F1E", "F1", "Yes", "No")]
    #[case("F1ES", "F1", "Yes", "Yes")]
    #[case("name", "NAME", "No", "No")]
    #[case("A1S", "A1", "No", "Yes")]
    fn behavior_codes(#[case] code: &str, #[case] freq: &str, #[case] excl: &str, #[case] stab: &str) {
        let mut record = Record::new();
        apply_behavior(EntityKind::Feature, &mut record, code).unwrap();
        assert_eq!(record["FTYPE_FREQ"], json!(freq));
        assert_eq!(record["FTYPE_EXCL"], json!(excl));
        assert_eq!(record["FTYPE_STAB"], json!(stab));
    }

    #[test]
    fn bad_behavior_code_is_rejected() {
        let mut record = Record::new();
        assert!(apply_behavior(EntityKind::Feature, &mut record, "XYZ").is_err());
    }

    #[test]
    fn request_checks_elements_and_functions_first() {
        let doc = doc();
        let request = FeatureRequest::from_api(&api(json!({
            "feature": "LOYALTY",
            "elementList": [{"element": "ELEM_X", "compared": "Yes"}],
            "comparison": "EXACT_COMP"
        })))
        .unwrap();
        let err = request.check(&doc).unwrap_err();
        assert!(err.to_string().contains("ELEM_X"), "{err}");

        let request = FeatureRequest::from_api(&api(json!({
            "feature": "LOYALTY",
            "elementList": ["ID_NUM"],
            "comparison": "NO_SUCH_COMP"
        })))
        .unwrap();
        let err = request.check(&doc).unwrap_err();
        assert!(err.to_string().contains("NO_SUCH_COMP"), "{err}");
    }

    #[test]
    fn explicit_activation_needs_elements_and_comparison() {
        let request = FeatureRequest::from_api(&api(json!({"feature": "X", "active": "Yes"}))).unwrap();
        assert!(request.active().is_err());
        let request = FeatureRequest::from_api(&api(json!({"feature": "X"}))).unwrap();
        assert_eq!(request.active().unwrap(), false);
    }

    #[test]
    fn template_builds_feature_bindings_and_attributes() {
        let mut doc = doc();
        let mut journal = Journal::new();
        let mut session = Session::default();
        let mut scope = Scope::new(Domain::Features, &mut doc, &mut journal, &mut session);
        let view = FeatureManager.apply_template(&mut scope, "name", "alias_name").unwrap();
        assert_eq!(view["feature"], json!("ALIAS_NAME"));
        assert_eq!(view["class"], json!("NAME"));
        assert_eq!(view["elementList"].as_array().map(Vec::len), Some(3));
        assert!(scope.base(EntityKind::Attribute).find_by_code("ALIAS_NAME_SURNAME").is_some());
    }

    #[test]
    fn unbinding_element_used_by_attribute_is_refused() {
        let mut doc = doc();
        let mut journal = Journal::new();
        let mut session = Session::default();
        let mut scope = Scope::new(Domain::Features, &mut doc, &mut journal, &mut session);
        FeatureManager.apply_template(&mut scope, "ADDRESS", "HOME_ADDR").unwrap();
        let err = FeatureManager
            .delete_element_from_feature(&mut scope, "HOME_ADDR", "ADDR_CITY")
            .unwrap_err();
        assert!(matches!(err, Error::ReferentialIntegrity { .. }));
    }

    #[test]
    fn attribute_element_must_be_bound() {
        let mut doc = doc();
        let mut journal = Journal::new();
        let mut session = Session::default();
        let mut scope = Scope::new(Domain::Features, &mut doc, &mut journal, &mut session);
        let err = FeatureManager
            .create(
                &mut scope,
                EntityKind::Attribute,
                &api(json!({"attribute": "BAD_ATTR", "feature": "PHONE", "element": "SURNAME"})),
            )
            .unwrap_err();
        assert!(err.to_string().contains("not part of feature PHONE"), "{err}");
    }

    #[test]
    fn deactivation_blocked_by_active_rule() {
        let mut doc = doc();
        let mut journal = Journal::new();
        let mut session = Session::default();
        let mut scope = Scope::new(Domain::Features, &mut doc, &mut journal, &mut session);
        assert!(!active_rules_using(scope.doc(), "SSN").is_empty());
        let err = FeatureManager.set_active(&mut scope, "SSN", false).unwrap_err();
        assert!(err.to_string().contains("active rules"), "{err}");
        assert!(journal.is_empty());
    }
}
