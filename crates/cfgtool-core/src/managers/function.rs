//! Functions, their calls and call elements, and comparison thresholds.

use cfgtool_schema::{ApiRecord, Domain, EntityKind, Record, to_api, to_internal, value_key};
use serde_json::{Value, json};
use std::fmt;

use super::feature::{FeatureRequest, yes_no};
use super::{DomainManager, create_record, delete_record, set_default, text_arg};
use crate::base::{BaseManager, Selector, record_code, record_id};
use crate::document::ConfigDocument;
use crate::scope::Scope;
use crate::{Error, Result};

/// Expression function behind the name-hash call.
const NAME_HASHER: &str = "NAME_HASHER";
/// Feature produced by the SSN-last-four expression call.
const SSN_LAST4_FEATURE: &str = "NAME_SSN_LAST4";

/// The four families of engine functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallFamily {
    Comparison,
    Expression,
    Standardize,
    Distinct,
}

impl CallFamily {
    pub const ALL: [CallFamily; 4] = [
        CallFamily::Comparison,
        CallFamily::Expression,
        CallFamily::Standardize,
        CallFamily::Distinct,
    ];

    pub fn function_kind(self) -> EntityKind {
        match self {
            CallFamily::Comparison => EntityKind::ComparisonFunction,
            CallFamily::Expression => EntityKind::ExpressionFunction,
            CallFamily::Standardize => EntityKind::StandardizeFunction,
            CallFamily::Distinct => EntityKind::DistinctFunction,
        }
    }

    pub fn call_kind(self) -> EntityKind {
        match self {
            CallFamily::Comparison => EntityKind::ComparisonCall,
            CallFamily::Expression => EntityKind::ExpressionCall,
            CallFamily::Standardize => EntityKind::StandardizeCall,
            CallFamily::Distinct => EntityKind::DistinctCall,
        }
    }

    /// Standardize calls have no element table.
    pub fn element_kind(self) -> Option<EntityKind> {
        match self {
            CallFamily::Comparison => Some(EntityKind::ComparisonCallElement),
            CallFamily::Expression => Some(EntityKind::ExpressionCallElement),
            CallFamily::Standardize => None,
            CallFamily::Distinct => Some(EntityKind::DistinctCallElement),
        }
    }

    /// Family owning a call or call-element kind.
    pub fn of(kind: EntityKind) -> Option<CallFamily> {
        Self::ALL
            .into_iter()
            .find(|f| f.call_kind() == kind || f.element_kind() == Some(kind) || f.function_kind() == kind)
    }

    fn function_field(self) -> &'static str {
        self.function_kind().spec().code_field.unwrap_or_default()
    }

    fn call_id_field(self) -> &'static str {
        self.call_kind().spec().id_field.unwrap_or_default()
    }

    /// Call elements must use the call's own feature.
    fn elements_share_feature(self) -> bool {
        matches!(self, CallFamily::Comparison | CallFamily::Distinct)
    }
}

impl fmt::Display for CallFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallFamily::Comparison => "comparison",
            CallFamily::Expression => "expression",
            CallFamily::Standardize => "standardize",
            CallFamily::Distinct => "distinct",
        };
        f.write_str(name)
    }
}

/// Functions, calls, call elements and thresholds.
#[derive(Debug, Default, Clone, Copy)]
pub struct FunctionManager;

impl DomainManager for FunctionManager {
    fn domain(&self) -> Domain {
        Domain::Functions
    }

    fn prepare(&self, kind: EntityKind, record: &mut Record, doc: &ConfigDocument) -> Result<()> {
        let spec = kind.spec();
        match kind {
            EntityKind::ComparisonFunction
            | EntityKind::ExpressionFunction
            | EntityKind::StandardizeFunction
            | EntityKind::DistinctFunction => {
                if let Some(code) = record_code(spec, record).map(str::to_string) {
                    if let Some(desc) = spec.fields.iter().find(|f| f.internal.ends_with("_DESC")) {
                        set_default(record, desc.internal, code.clone());
                    }
                    set_default(record, "FUNC_LIB", format!("g2func_{}", code.to_lowercase()));
                }
                set_default(record, "FUNC_VER", "1");
                set_default(record, "LANGUAGE", "cpp");
                if matches!(kind, EntityKind::ComparisonFunction | EntityKind::DistinctFunction) {
                    set_default(record, "ANON_SUPPORT", "No");
                }
            }
            EntityKind::ComparisonThreshold => {
                set_default(record, "FTYPE_CODE", "ALL");
                let function = record.get("CFUNC_CODE").and_then(value_key).unwrap_or_default();
                let next = BaseManager::new(kind, doc)
                    .find_all("CFUNC_CODE", &function)
                    .filter_map(|r| r.get("EXEC_ORDER").and_then(Value::as_i64))
                    .max()
                    .unwrap_or(0)
                    + 1;
                set_default(record, "EXEC_ORDER", next);
            }
            EntityKind::ComparisonCall
            | EntityKind::ExpressionCall
            | EntityKind::StandardizeCall
            | EntityKind::DistinctCall => {
                set_default(record, "EXEC_ORDER", 1);
                if kind == EntityKind::ExpressionCall {
                    set_default(record, "IS_VIRTUAL", "No");
                }
            }
            EntityKind::ComparisonCallElement
            | EntityKind::ExpressionCallElement
            | EntityKind::DistinctCallElement => {
                let id_field = spec.key_fields[0];
                let call = record.get(id_field).and_then(value_key).unwrap_or_default();
                let next = doc
                    .rows(kind)
                    .filter(|r| r.get(id_field).and_then(value_key).as_deref() == Some(call.as_str()))
                    .filter_map(|r| r.get("EXEC_ORDER").and_then(Value::as_i64))
                    .max()
                    .unwrap_or(0)
                    + 1;
                set_default(record, "EXEC_ORDER", next);
                if kind == EntityKind::ExpressionCallElement {
                    set_default(record, "FELEM_REQ", "Yes");
                }
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
        let Some(family) = CallFamily::of(kind).filter(|f| f.element_kind() == Some(kind)) else {
            return Ok(());
        };
        let feature = record.get("FTYPE_CODE").and_then(value_key).unwrap_or_default();
        let element = record.get("FELEM_CODE").and_then(value_key).unwrap_or_default();
        let bound = BaseManager::new(EntityKind::FeatureElement, doc)
            .find_by_key(&[("FTYPE_CODE", &json!(feature)), ("FELEM_CODE", &json!(element))])
            .is_some();
        if !bound {
            return Err(Error::invalid(
                kind,
                "element",
                format!("element {element} is not part of feature {feature}"),
            ));
        }
        if family.elements_share_feature() {
            let call_id = record
                .get(family.call_id_field())
                .and_then(value_key)
                .and_then(|id| id.parse::<i64>().ok())
                .unwrap_or_default();
            let call = BaseManager::new(family.call_kind(), doc).get_by_id(call_id)?;
            let call_feature = call.get("FTYPE_CODE").and_then(value_key).unwrap_or_default();
            if !call_feature.eq_ignore_ascii_case(&feature) {
                return Err(Error::invalid(
                    kind,
                    "feature",
                    format!("{family} call {call_id} belongs to feature {call_feature}, not {feature}"),
                ));
            }
        }
        Ok(())
    }

    fn get(&self, doc: &ConfigDocument, kind: EntityKind, selector: &Selector) -> Result<ApiRecord> {
        let record = BaseManager::new(kind, doc).resolve(selector)?;
        match CallFamily::of(kind).filter(|f| f.call_kind() == kind) {
            Some(family) => Ok(call_view(doc, family, record)),
            None => Ok(to_api(kind, record)),
        }
    }
}

/// A call with its element list.
pub fn call_view(doc: &ConfigDocument, family: CallFamily, call: &Record) -> ApiRecord {
    let mut view = to_api(family.call_kind(), call);
    if let (Some(element_kind), Some(id)) = (family.element_kind(), record_id(family.call_kind().spec(), call)) {
        let id = id.to_string();
        let mut elements: Vec<&Record> = BaseManager::new(element_kind, doc)
            .find_all(family.call_id_field(), &id)
            .collect();
        elements.sort_by_key(|e| e.get("EXEC_ORDER").and_then(Value::as_i64).unwrap_or(i64::MAX));
        let list = elements
            .into_iter()
            .map(|e| {
                let mut entry = to_api(element_kind, e);
                entry.shift_remove("callId");
                Value::Object(entry)
            })
            .collect();
        view.insert("elementList".into(), Value::Array(list));
    }
    view
}

impl FunctionManager {
    /// Create a call and, when given, its `elementList`.
    ///
    /// List entries are element codes (using the call's feature) or objects
    /// with `element` and optionally `feature` and `required`.
    pub fn add_call(&self, scope: &mut Scope<'_>, family: CallFamily, fields: &ApiRecord) -> Result<ApiRecord> {
        let call_kind = family.call_kind();
        let mut fields = fields.clone();
        let list = match fields.shift_remove("elementList") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items,
            Some(_) => return Err(Error::invalid(call_kind, "elementList", "must be a list")),
        };
        let record = to_internal(call_kind, &fields)?;
        if family.element_kind().is_none() && !list.is_empty() {
            return Err(Error::invalid(call_kind, "elementList", "standardize calls have no elements"));
        }
        if family.elements_share_feature() && list.is_empty() {
            return Err(Error::invalid(call_kind, "elementList", "at least one element is required"));
        }

        let call = create_record(self, scope, call_kind, record)?;
        let call_id = record_id(call_kind.spec(), &call).unwrap_or_default();
        let feature = call.get("FTYPE_CODE").and_then(value_key);

        for entry in &list {
            let (element_feature, element, required) = match entry {
                Value::String(code) => (feature.clone(), code.clone(), None),
                Value::Object(item) => (
                    text_arg(item, "feature").map(str::to_string).or_else(|| feature.clone()),
                    text_arg(item, "element")
                        .ok_or_else(|| Error::invalid(call_kind, "elementList", "every entry needs an element"))?
                        .to_string(),
                    item.get("required").cloned(),
                ),
                _ => {
                    return Err(Error::invalid(
                        call_kind,
                        "elementList",
                        "entries must be element codes or objects",
                    ));
                }
            };
            let element_feature = element_feature
                .ok_or_else(|| Error::invalid(call_kind, "elementList", "entries need a feature"))?;
            self.create_call_element(scope, family, call_id, &element_feature, &element, required)?;
        }
        Ok(call_view(scope.doc(), family, &call))
    }

    fn create_call_element(
        &self,
        scope: &mut Scope<'_>,
        family: CallFamily,
        call_id: i64,
        feature: &str,
        element: &str,
        required: Option<Value>,
    ) -> Result<Record> {
        let Some(element_kind) = family.element_kind() else {
            return Err(Error::invalid(family.call_kind(), "element", "standardize calls have no elements"));
        };
        let mut record = Record::new();
        record.insert(family.call_id_field().to_string(), Value::from(call_id));
        record.insert("FTYPE_CODE".into(), Value::from(feature));
        record.insert("FELEM_CODE".into(), Value::from(element));
        if let Some(required) = required
            && element_kind == EntityKind::ExpressionCallElement
        {
            record.insert("FELEM_REQ".into(), required);
        }
        create_record(self, scope, element_kind, record)
    }

    /// The call an element command addresses: `callId`, or the one call of `feature`.
    fn target_call<'d>(doc: &'d ConfigDocument, family: CallFamily, fields: &ApiRecord) -> Result<&'d Record> {
        let call_kind = family.call_kind();
        let base = BaseManager::new(call_kind, doc);
        if let Some(id) = fields.get("callId").and_then(value_key) {
            let id: i64 = id
                .parse()
                .map_err(|_| Error::invalid(call_kind, "callId", "must be an integer"))?;
            return base.get_by_id(id);
        }
        let feature = text_arg(fields, "feature")
            .ok_or_else(|| Error::invalid(call_kind, "callId", "give a callId or a feature"))?;
        let mut calls = base.find_all("FTYPE_CODE", feature);
        match (calls.next(), calls.next()) {
            (Some(call), None) => Ok(call),
            (None, _) => Err(Error::not_found(call_kind, feature.to_uppercase())),
            (Some(_), Some(_)) => Err(Error::invalid(
                call_kind,
                "callId",
                format!("feature {feature} has several {family} calls; give a callId"),
            )),
        }
    }

    /// Add one element to an existing call.
    pub fn add_call_element(
        &self,
        scope: &mut Scope<'_>,
        family: CallFamily,
        fields: &ApiRecord,
    ) -> Result<ApiRecord> {
        let call = Self::target_call(scope.doc(), family, fields)?;
        let call_id = record_id(family.call_kind().spec(), call).unwrap_or_default();
        let call_feature = call.get("FTYPE_CODE").and_then(value_key);
        let kind = family.element_kind().unwrap_or(family.call_kind());

        let element = super::require_text(kind, fields, "element")?.to_string();
        let feature = text_arg(fields, "elementFeature")
            .or_else(|| text_arg(fields, "feature"))
            .map(str::to_string)
            .or(call_feature)
            .ok_or_else(|| Error::invalid(kind, "feature", "is required"))?;
        let record = self.create_call_element(
            scope,
            family,
            call_id,
            &feature,
            &element,
            fields.get("required").cloned(),
        )?;
        Ok(to_api(kind, &record))
    }

    /// Remove one element from a call.
    pub fn delete_call_element(
        &self,
        scope: &mut Scope<'_>,
        family: CallFamily,
        fields: &ApiRecord,
    ) -> Result<Record> {
        let Some(kind) = family.element_kind() else {
            return Err(Error::invalid(family.call_kind(), "element", "standardize calls have no elements"));
        };
        let call = Self::target_call(scope.doc(), family, fields)?;
        let call_id = record_id(family.call_kind().spec(), call).unwrap_or_default();
        let call_feature = call.get("FTYPE_CODE").and_then(value_key).unwrap_or_default();
        let element = super::require_text(kind, fields, "element")?.to_uppercase();
        let feature = text_arg(fields, "elementFeature")
            .or_else(|| text_arg(fields, "feature"))
            .map(str::to_uppercase)
            .unwrap_or(call_feature);
        let key = [
            (family.call_id_field(), &json!(call_id)),
            ("FTYPE_CODE", &json!(feature)),
            ("FELEM_CODE", &json!(element)),
        ];
        let row = BaseManager::new(kind, scope.doc())
            .find_by_key(&key)
            .cloned()
            .ok_or_else(|| Error::not_found(kind, format!("#{call_id} ({feature}/{element})")))?;
        delete_record(scope, kind, row)
    }

    /// Create the calls an `addFeature` request names for a freshly added feature.
    ///
    /// Comparison and distinct calls cover the elements flagged `compared`, or
    /// every element when none is flagged; the expression call covers the
    /// elements flagged `expressed`.
    pub fn bind_feature(&self, scope: &mut Scope<'_>, feature: &str, request: &FeatureRequest) -> Result<()> {
        let compared: Vec<&str> = {
            let flagged: Vec<&str> = request
                .elements
                .iter()
                .filter(|e| e.compared)
                .map(|e| e.element.as_str())
                .collect();
            if flagged.is_empty() {
                request.elements.iter().map(|e| e.element.as_str()).collect()
            } else {
                flagged
            }
        };
        let expressed: Vec<&str> = request
            .elements
            .iter()
            .filter(|e| e.expressed)
            .map(|e| e.element.as_str())
            .collect();

        let bindings = [
            (CallFamily::Comparison, &request.comparison, compared.clone()),
            (CallFamily::Expression, &request.expression, expressed),
            (CallFamily::Standardize, &request.standardize, Vec::new()),
            (CallFamily::Distinct, &request.distinct, compared),
        ];
        for (family, function, elements) in bindings {
            let Some(function) = function else { continue };
            let mut call = Record::new();
            call.insert("FTYPE_CODE".into(), Value::from(feature));
            call.insert(family.function_field().to_string(), Value::from(function.as_str()));
            let call = create_record(self, scope, family.call_kind(), call)?;
            let call_id = record_id(family.call_kind().spec(), &call).unwrap_or_default();
            for element in elements {
                let required = (family == CallFamily::Expression).then(|| yes_no(true));
                self.create_call_element(scope, family, call_id, feature, element, required)?;
            }
        }
        Ok(())
    }

    fn shortcut_call<'d>(doc: &'d ConfigDocument, field: &str, value: &str) -> Result<&'d Record> {
        BaseManager::new(EntityKind::ExpressionCall, doc)
            .find_all(field, value)
            .next()
            .ok_or_else(|| Error::not_found(EntityKind::ExpressionCall, format!("{field}={value}")))
    }

    fn add_to_shortcut(
        &self,
        scope: &mut Scope<'_>,
        call_field: &str,
        call_value: &str,
        feature: &str,
        element: &str,
    ) -> Result<ApiRecord> {
        let call = Self::shortcut_call(scope.doc(), call_field, call_value)?;
        let call_id = record_id(EntityKind::ExpressionCall.spec(), call).unwrap_or_default();
        scope.base(EntityKind::Feature).get_by_code(feature)?;
        scope.base(EntityKind::Element).get_by_code(element)?;
        let record = self.create_call_element(
            scope,
            CallFamily::Expression,
            call_id,
            &feature.to_uppercase(),
            &element.to_uppercase(),
            Some(yes_no(false)),
        )?;
        Ok(to_api(EntityKind::ExpressionCallElement, &record))
    }

    fn delete_from_shortcut(
        &self,
        scope: &mut Scope<'_>,
        call_field: &str,
        call_value: &str,
        feature: &str,
        element: &str,
    ) -> Result<Record> {
        let call = Self::shortcut_call(scope.doc(), call_field, call_value)?;
        let call_id = record_id(EntityKind::ExpressionCall.spec(), call).unwrap_or_default();
        let mut fields = ApiRecord::new();
        fields.insert("callId".into(), Value::from(call_id));
        fields.insert("elementFeature".into(), Value::from(feature));
        fields.insert("element".into(), Value::from(element));
        self.delete_call_element(scope, CallFamily::Expression, &fields)
    }

    /// Add a feature element to the name-hash expression call.
    pub fn add_to_namehash(&self, scope: &mut Scope<'_>, feature: &str, element: &str) -> Result<ApiRecord> {
        self.add_to_shortcut(scope, "EFUNC_CODE", NAME_HASHER, feature, element)
    }

    pub fn delete_from_namehash(&self, scope: &mut Scope<'_>, feature: &str, element: &str) -> Result<Record> {
        self.delete_from_shortcut(scope, "EFUNC_CODE", NAME_HASHER, feature, element)
    }

    /// Add a feature element to the call that builds the name plus SSN-last-four key.
    pub fn add_to_ssn_last4_hash(&self, scope: &mut Scope<'_>, feature: &str, element: &str) -> Result<ApiRecord> {
        self.add_to_shortcut(scope, "EFEAT_FTYPE_CODE", SSN_LAST4_FEATURE, feature, element)
    }

    pub fn delete_from_ssn_last4_hash(&self, scope: &mut Scope<'_>, feature: &str, element: &str) -> Result<Record> {
        self.delete_from_shortcut(scope, "EFEAT_FTYPE_CODE", SSN_LAST4_FEATURE, feature, element)
    }
}

/// Selector for a comparison threshold: `id`, or function + returnCode + feature (default `ALL`).
pub fn threshold_selector(fields: &ApiRecord) -> Result<Selector> {
    let kind = EntityKind::ComparisonThreshold;
    if let Some(id) = fields.get("id").and_then(value_key) {
        let id = id.parse().map_err(|_| Error::invalid(kind, "id", "must be an integer"))?;
        return Ok(Selector::Id(id));
    }
    let mut key = ApiRecord::new();
    key.insert("function".into(), Value::from(super::require_text(kind, fields, "function")?.to_uppercase()));
    key.insert(
        "returnCode".into(),
        Value::from(super::require_text(kind, fields, "returnCode")?.to_uppercase()),
    );
    key.insert(
        "feature".into(),
        Value::from(text_arg(fields, "feature").unwrap_or("ALL").to_uppercase()),
    );
    Ok(Selector::Key(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::Journal;
    use crate::scope::Session;
    use pretty_assertions::assert_eq;

    fn doc() -> ConfigDocument {
        ConfigDocument::parse(cfgtool_store::DEFAULT_TEMPLATE).unwrap()
    }

    fn api(value: Value) -> ApiRecord {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn family_lookup_covers_every_call_kind() {
        for family in CallFamily::ALL {
            assert_eq!(CallFamily::of(family.call_kind()), Some(family));
            assert_eq!(CallFamily::of(family.function_kind()), Some(family));
        }
        assert_eq!(CallFamily::of(EntityKind::Rule), None);
    }

    #[test]
    fn comparison_call_needs_elements() {
        let mut doc = doc();
        let mut journal = Journal::new();
        let mut session = Session::default();
        let mut scope = Scope::new(Domain::Functions, &mut doc, &mut journal, &mut session);
        let err = FunctionManager
            .add_call(
                &mut scope,
                CallFamily::Comparison,
                &api(json!({"feature": "PHONE", "function": "EXACT_COMP"})),
            )
            .unwrap_err();
        assert!(err.to_string().contains("at least one element"), "{err}");
    }

    #[test]
    fn expression_call_with_elements() {
        let mut doc = doc();
        let mut journal = Journal::new();
        let mut session = Session::default();
        let mut scope = Scope::new(Domain::Functions, &mut doc, &mut journal, &mut session);
        let view = FunctionManager
            .add_call(
                &mut scope,
                CallFamily::Expression,
                &api(json!({
                    "feature": "PHONE",
                    "function": "EXPRESS_BOM",
                    "expressionFeature": "NAME_KEY",
                    "elementList": ["PHONE_NUM", {"feature": "NAME", "element": "SURNAME", "required": "No"}]
                })),
            )
            .unwrap();
        assert_eq!(view["id"], json!(1000));
        let list = view["elementList"].as_array().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[1]["feature"], json!("NAME"));
        assert_eq!(list[1]["required"], json!("No"));
        assert_eq!(journal.len(), 3);
    }

    #[test]
    fn comparison_element_must_match_call_feature() {
        let mut doc = doc();
        let mut journal = Journal::new();
        let mut session = Session::default();
        let mut scope = Scope::new(Domain::Functions, &mut doc, &mut journal, &mut session);
        let err = FunctionManager
            .add_call_element(
                &mut scope,
                CallFamily::Comparison,
                &api(json!({"callId": 3, "elementFeature": "NAME", "element": "SURNAME"})),
            )
            .unwrap_err();
        assert!(err.to_string().contains("belongs to feature PHONE"), "{err}");
    }

    #[test]
    fn namehash_add_and_remove() {
        let mut doc = doc();
        let mut journal = Journal::new();
        let mut session = Session::default();
        let mut scope = Scope::new(Domain::Functions, &mut doc, &mut journal, &mut session);
        FunctionManager.add_to_namehash(&mut scope, "address", "addr_city").unwrap();
        let call = scope.base(EntityKind::ExpressionCall).get_by_id(1).unwrap().clone();
        let view = call_view(scope.doc(), CallFamily::Expression, &call);
        assert_eq!(view["elementList"].as_array().map(Vec::len), Some(4));

        FunctionManager.delete_from_namehash(&mut scope, "ADDRESS", "ADDR_CITY").unwrap();
        let err = FunctionManager
            .delete_from_namehash(&mut scope, "ADDRESS", "ADDR_CITY")
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn ssn_last4_requires_bound_element() {
        let mut doc = doc();
        let mut journal = Journal::new();
        let mut session = Session::default();
        let mut scope = Scope::new(Domain::Functions, &mut doc, &mut journal, &mut session);
        let err = FunctionManager
            .add_to_ssn_last4_hash(&mut scope, "PHONE", "SURNAME")
            .unwrap_err();
        assert!(err.to_string().contains("not part of feature PHONE"), "{err}");
        FunctionManager.add_to_ssn_last4_hash(&mut scope, "NAME", "GIVEN_NAME").unwrap();
    }

    #[test]
    fn threshold_selector_defaults_feature_to_all() {
        let selector = threshold_selector(&api(json!({"function": "gnr_comp", "returnCode": "full_score"}))).unwrap();
        let doc = doc();
        let row = BaseManager::new(EntityKind::ComparisonThreshold, &doc).resolve(&selector).unwrap();
        assert_eq!(row["CFRTN_ID"], json!(1));
    }
}
