//! Static entity catalog
//!
//! Every collection the tool manages is described once here: which
//! `G2_CONFIG` table holds it, how its rows are identified, which fields
//! reference other entities, and how each internal field is named in the
//! public API vocabulary. Managers, the integrity scanner, and the
//! translator are all driven by these tables.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::error::{Error, Result};

/// Version of the public API vocabulary.
///
/// Bump whenever an API field name changes meaning or disappears.
pub const API_VERSION: &str = "1";

/// The ownership domain of an entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Domain {
    DataSources,
    Features,
    Functions,
    Rules,
    System,
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Domain::DataSources => "data sources",
            Domain::Features => "features",
            Domain::Functions => "functions",
            Domain::Rules => "rules",
            Domain::System => "system",
        };
        f.write_str(name)
    }
}

/// Every kind of configuration entity known to the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    DataSource,
    FeatureClass,
    Feature,
    Element,
    FeatureElement,
    Attribute,
    BehaviorOverride,
    ComparisonFunction,
    ComparisonThreshold,
    ExpressionFunction,
    StandardizeFunction,
    DistinctFunction,
    ComparisonCall,
    ExpressionCall,
    StandardizeCall,
    DistinctCall,
    ComparisonCallElement,
    ExpressionCallElement,
    DistinctCallElement,
    Fragment,
    RuleType,
    Rule,
    GenericPlan,
    GenericThreshold,
    SystemParameter,
}

impl EntityKind {
    /// All kinds in catalog order.
    pub const ALL: [EntityKind; 25] = [
        EntityKind::DataSource,
        EntityKind::FeatureClass,
        EntityKind::Feature,
        EntityKind::Element,
        EntityKind::FeatureElement,
        EntityKind::Attribute,
        EntityKind::BehaviorOverride,
        EntityKind::ComparisonFunction,
        EntityKind::ComparisonThreshold,
        EntityKind::ExpressionFunction,
        EntityKind::StandardizeFunction,
        EntityKind::DistinctFunction,
        EntityKind::ComparisonCall,
        EntityKind::ExpressionCall,
        EntityKind::StandardizeCall,
        EntityKind::DistinctCall,
        EntityKind::ComparisonCallElement,
        EntityKind::ExpressionCallElement,
        EntityKind::DistinctCallElement,
        EntityKind::Fragment,
        EntityKind::RuleType,
        EntityKind::Rule,
        EntityKind::GenericPlan,
        EntityKind::GenericThreshold,
        EntityKind::SystemParameter,
    ];

    /// The catalog entry describing this kind.
    pub fn spec(self) -> &'static EntitySpec {
        match self {
            EntityKind::DataSource => &DATA_SOURCE,
            EntityKind::FeatureClass => &FEATURE_CLASS,
            EntityKind::Feature => &FEATURE,
            EntityKind::Element => &ELEMENT,
            EntityKind::FeatureElement => &FEATURE_ELEMENT,
            EntityKind::Attribute => &ATTRIBUTE,
            EntityKind::BehaviorOverride => &BEHAVIOR_OVERRIDE,
            EntityKind::ComparisonFunction => &COMPARISON_FUNCTION,
            EntityKind::ComparisonThreshold => &COMPARISON_THRESHOLD,
            EntityKind::ExpressionFunction => &EXPRESSION_FUNCTION,
            EntityKind::StandardizeFunction => &STANDARDIZE_FUNCTION,
            EntityKind::DistinctFunction => &DISTINCT_FUNCTION,
            EntityKind::ComparisonCall => &COMPARISON_CALL,
            EntityKind::ExpressionCall => &EXPRESSION_CALL,
            EntityKind::StandardizeCall => &STANDARDIZE_CALL,
            EntityKind::DistinctCall => &DISTINCT_CALL,
            EntityKind::ComparisonCallElement => &COMPARISON_CALL_ELEMENT,
            EntityKind::ExpressionCallElement => &EXPRESSION_CALL_ELEMENT,
            EntityKind::DistinctCallElement => &DISTINCT_CALL_ELEMENT,
            EntityKind::Fragment => &FRAGMENT,
            EntityKind::RuleType => &RULE_TYPE,
            EntityKind::Rule => &RULE,
            EntityKind::GenericPlan => &GENERIC_PLAN,
            EntityKind::GenericThreshold => &GENERIC_THRESHOLD,
            EntityKind::SystemParameter => &SYSTEM_PARAMETER,
        }
    }

    pub fn table(self) -> &'static str {
        self.spec().table
    }

    pub fn domain(self) -> Domain {
        self.spec().domain
    }

    /// Look up the kind stored in a `G2_CONFIG` table.
    pub fn from_table(table: &str) -> Option<EntityKind> {
        Self::ALL.into_iter().find(|k| k.table() == table)
    }

    /// Kinds owned by a domain, in catalog order.
    pub fn in_domain(domain: Domain) -> impl Iterator<Item = EntityKind> {
        Self::ALL.into_iter().filter(move |k| k.domain() == domain)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.spec().label)
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    /// Accepts the table name (`CFG_DSRC`) or the camelCase API name
    /// (`dataSource`), case-insensitively.
    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|k| {
                let spec = k.spec();
                spec.table.eq_ignore_ascii_case(s) || spec.api_name.eq_ignore_ascii_case(s)
            })
            .ok_or_else(|| Error::UnknownKind { name: s.to_string() })
    }
}

/// How an internal field appears in the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldAccess {
    /// Exposed under the given API name.
    Mapped(&'static str),
    /// Engine-managed; hidden from views and rejected on input.
    InternalOnly,
}

/// One row of an entity's field-name table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub internal: &'static str,
    pub access: FieldAccess,
}

impl FieldSpec {
    pub fn api(&self) -> Option<&'static str> {
        match self.access {
            FieldAccess::Mapped(api) => Some(api),
            FieldAccess::InternalOnly => None,
        }
    }
}

const fn mapped(internal: &'static str, api: &'static str) -> FieldSpec {
    FieldSpec {
        internal,
        access: FieldAccess::Mapped(api),
    }
}

const fn internal_only(internal: &'static str) -> FieldSpec {
    FieldSpec {
        internal,
        access: FieldAccess::InternalOnly,
    }
}

/// Patterns used to pull entity codes out of expression-valued fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprPattern {
    /// `./SCORES/<FEATURE>` in a fragment source
    FeatureScores,
    /// `./FRAGMENT/<FRAGMENT>` in a fragment source
    FragmentRefs,
}

static FEATURE_SCORES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\./SCORES/([A-Za-z0-9_]+)").expect("static pattern"));
static FRAGMENT_REFS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\./FRAGMENT/([A-Za-z0-9_]+)").expect("static pattern"));

impl ExprPattern {
    fn regex(self) -> &'static Regex {
        match self {
            ExprPattern::FeatureScores => &FEATURE_SCORES,
            ExprPattern::FragmentRefs => &FRAGMENT_REFS,
        }
    }

    /// Every distinct code mentioned in `text`, in first-seen order.
    pub fn extract(self, text: &str) -> Vec<String> {
        let mut codes: Vec<String> = Vec::new();
        for cap in self.regex().captures_iter(text) {
            let code = cap[1].to_string();
            if !codes.contains(&code) {
                codes.push(code);
            }
        }
        codes
    }
}

/// How a reference field names its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefBy {
    Code,
    Id,
    Expression(ExprPattern),
}

/// What happens to the referencing row when its target is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    /// The target cannot be deleted while this row exists.
    Deny,
    /// The row is owned by its target and is removed with it.
    Cascade,
}

/// A typed reference from one field of a row to another entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    pub field: &'static str,
    pub target: EntityKind,
    pub by: RefBy,
    pub optional: bool,
    pub on_delete: OnDelete,
    /// A value meaning "no particular target", e.g. `ALL`.
    pub wildcard: Option<&'static str>,
}

impl Reference {
    /// The target keys this reference names in `record`.
    ///
    /// Empty when the field is absent, null, blank, or the wildcard.
    pub fn targets(&self, record: &serde_json::Map<String, Value>) -> Vec<String> {
        let Some(value) = record.get(self.field) else {
            return Vec::new();
        };
        match self.by {
            RefBy::Expression(pattern) => value.as_str().map(|s| pattern.extract(s)).unwrap_or_default(),
            RefBy::Code | RefBy::Id => match value_key(value) {
                Some(key) if Some(key.as_str()) != self.wildcard => vec![key],
                _ => Vec::new(),
            },
        }
    }
}

/// Normalise a scalar JSON value into the string form used for key matching.
///
/// Numbers and strings compare by their textual form so that `1000` and
/// `"1000"` identify the same row. Null, blank strings and containers have no key.
pub fn value_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

const fn code_ref(field: &'static str, target: EntityKind, on_delete: OnDelete) -> Reference {
    Reference {
        field,
        target,
        by: RefBy::Code,
        optional: false,
        on_delete,
        wildcard: None,
    }
}

const fn optional_code_ref(field: &'static str, target: EntityKind) -> Reference {
    Reference {
        field,
        target,
        by: RefBy::Code,
        optional: true,
        on_delete: OnDelete::Deny,
        wildcard: None,
    }
}

const fn id_ref(field: &'static str, target: EntityKind, on_delete: OnDelete) -> Reference {
    Reference {
        field,
        target,
        by: RefBy::Id,
        optional: false,
        on_delete,
        wildcard: None,
    }
}

/// Catalog entry for one entity kind.
#[derive(Debug)]
pub struct EntitySpec {
    pub kind: EntityKind,
    /// Human label used in messages ("data source").
    pub label: &'static str,
    /// camelCase name used when the kind itself is named in the API.
    pub api_name: &'static str,
    pub domain: Domain,
    pub table: &'static str,
    pub id_field: Option<&'static str>,
    pub code_field: Option<&'static str>,
    /// Natural key: no two rows may agree on all of these fields.
    pub key_fields: &'static [&'static str],
    /// Lowest id handed out by automatic assignment; below is system-reserved.
    pub id_floor: i64,
    /// Reference data shipped by the engine; listed but never edited.
    pub read_only: bool,
    pub fields: &'static [FieldSpec],
    pub references: &'static [Reference],
}

impl EntitySpec {
    pub fn field(&self, internal: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.internal == internal)
    }

    pub fn field_by_api(&self, api: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.api() == Some(api))
    }

    /// API name of the code field, e.g. `dataSource`.
    pub fn code_api_name(&self) -> Option<&'static str> {
        self.code_field.and_then(|f| self.field(f)).and_then(FieldSpec::api)
    }

    /// Every field the catalog itself relies on: ids, codes, keys, references.
    pub fn structural_fields(&self) -> Vec<&'static str> {
        let mut fields: Vec<&'static str> = Vec::new();
        fields.extend(self.id_field);
        fields.extend(self.code_field);
        fields.extend(self.key_fields.iter().copied());
        fields.extend(self.references.iter().map(|r| r.field));
        fields.sort_unstable();
        fields.dedup();
        fields
    }
}

use EntityKind as K;
use OnDelete::{Cascade, Deny};

static DATA_SOURCE: EntitySpec = EntitySpec {
    kind: K::DataSource,
    label: "data source",
    api_name: "dataSource",
    domain: Domain::DataSources,
    table: "CFG_DSRC",
    id_field: Some("DSRC_ID"),
    code_field: Some("DSRC_CODE"),
    key_fields: &["DSRC_CODE"],
    id_floor: 1000,
    read_only: false,
    fields: &[
        mapped("DSRC_ID", "id"),
        mapped("DSRC_CODE", "dataSource"),
        mapped("DSRC_DESC", "description"),
        mapped("DSRC_RELY", "reliability"),
        mapped("RETENTION_LEVEL", "retentionLevel"),
        mapped("CONVERSATIONAL", "conversational"),
    ],
    references: &[],
};

static FEATURE_CLASS: EntitySpec = EntitySpec {
    kind: K::FeatureClass,
    label: "feature class",
    api_name: "featureClass",
    domain: Domain::Features,
    table: "CFG_FCLASS",
    id_field: Some("FCLASS_ID"),
    code_field: Some("FCLASS_CODE"),
    key_fields: &["FCLASS_CODE"],
    id_floor: 1,
    read_only: true,
    fields: &[
        mapped("FCLASS_ID", "id"),
        mapped("FCLASS_CODE", "class"),
        mapped("FCLASS_DESC", "description"),
    ],
    references: &[],
};

static FEATURE: EntitySpec = EntitySpec {
    kind: K::Feature,
    label: "feature",
    api_name: "feature",
    domain: Domain::Features,
    table: "CFG_FTYPE",
    id_field: Some("FTYPE_ID"),
    code_field: Some("FTYPE_CODE"),
    key_fields: &["FTYPE_CODE"],
    id_floor: 1000,
    read_only: false,
    fields: &[
        mapped("FTYPE_ID", "id"),
        mapped("FTYPE_CODE", "feature"),
        mapped("FTYPE_DESC", "description"),
        mapped("FCLASS_CODE", "class"),
        mapped("FTYPE_FREQ", "frequency"),
        mapped("FTYPE_EXCL", "exclusive"),
        mapped("FTYPE_STAB", "stable"),
        mapped("ANONYMIZE", "anonymize"),
        mapped("DERIVED", "derived"),
        mapped("DERIVATION", "derivation"),
        mapped("USED_FOR_CAND", "candidates"),
        mapped("SHOW_IN_MATCH_KEY", "matchKey"),
        mapped("PERSIST_HISTORY", "history"),
        mapped("VERSION", "version"),
        mapped("ACTIVE", "active"),
    ],
    references: &[optional_code_ref("FCLASS_CODE", K::FeatureClass)],
};

static ELEMENT: EntitySpec = EntitySpec {
    kind: K::Element,
    label: "element",
    api_name: "element",
    domain: Domain::Features,
    table: "CFG_FELEM",
    id_field: Some("FELEM_ID"),
    code_field: Some("FELEM_CODE"),
    key_fields: &["FELEM_CODE"],
    id_floor: 1000,
    read_only: false,
    fields: &[
        mapped("FELEM_ID", "id"),
        mapped("FELEM_CODE", "element"),
        mapped("FELEM_DESC", "description"),
        mapped("DATA_TYPE", "dataType"),
        mapped("TOKENIZE", "tokenize"),
    ],
    references: &[],
};

static FEATURE_ELEMENT: EntitySpec = EntitySpec {
    kind: K::FeatureElement,
    label: "feature element",
    api_name: "featureElement",
    domain: Domain::Features,
    table: "CFG_FBOM",
    id_field: None,
    code_field: None,
    key_fields: &["FTYPE_CODE", "FELEM_CODE"],
    id_floor: 1,
    read_only: false,
    fields: &[
        mapped("FTYPE_CODE", "feature"),
        mapped("FELEM_CODE", "element"),
        mapped("EXEC_ORDER", "order"),
        mapped("DISPLAY_LEVEL", "display"),
        mapped("DISPLAY_DELIM", "delimiter"),
        mapped("DERIVED", "derived"),
        mapped("USAGE_TYPE", "usageType"),
    ],
    references: &[
        code_ref("FTYPE_CODE", K::Feature, Cascade),
        code_ref("FELEM_CODE", K::Element, Deny),
    ],
};

static ATTRIBUTE: EntitySpec = EntitySpec {
    kind: K::Attribute,
    label: "attribute",
    api_name: "attribute",
    domain: Domain::Features,
    table: "CFG_ATTR",
    id_field: Some("ATTR_ID"),
    code_field: Some("ATTR_CODE"),
    key_fields: &["ATTR_CODE"],
    id_floor: 1000,
    read_only: false,
    fields: &[
        mapped("ATTR_ID", "id"),
        mapped("ATTR_CODE", "attribute"),
        mapped("ATTR_CLASS", "class"),
        mapped("FTYPE_CODE", "feature"),
        mapped("FELEM_CODE", "element"),
        mapped("REQUIRED", "required"),
        mapped("DEFAULT_VALUE", "default"),
        mapped("ADVANCED", "advanced"),
        mapped("INTERNAL", "internal"),
        mapped("DSRC_CODE", "dataSource"),
    ],
    references: &[
        code_ref("FTYPE_CODE", K::Feature, Deny),
        code_ref("FELEM_CODE", K::Element, Deny),
        optional_code_ref("DSRC_CODE", K::DataSource),
    ],
};

static BEHAVIOR_OVERRIDE: EntitySpec = EntitySpec {
    kind: K::BehaviorOverride,
    label: "behavior override",
    api_name: "behaviorOverride",
    domain: Domain::Features,
    table: "CFG_FBOVR",
    id_field: None,
    code_field: None,
    key_fields: &["FTYPE_CODE", "UTYPE_CODE"],
    id_floor: 1,
    read_only: false,
    fields: &[
        mapped("FTYPE_CODE", "feature"),
        mapped("UTYPE_CODE", "usageType"),
        mapped("FTYPE_FREQ", "frequency"),
        mapped("FTYPE_EXCL", "exclusive"),
        mapped("FTYPE_STAB", "stable"),
    ],
    references: &[code_ref("FTYPE_CODE", K::Feature, Cascade)],
};

const FUNCTION_REFS: &[Reference] = &[];

static COMPARISON_FUNCTION: EntitySpec = EntitySpec {
    kind: K::ComparisonFunction,
    label: "comparison function",
    api_name: "comparisonFunction",
    domain: Domain::Functions,
    table: "CFG_CFUNC",
    id_field: Some("CFUNC_ID"),
    code_field: Some("CFUNC_CODE"),
    key_fields: &["CFUNC_CODE"],
    id_floor: 1000,
    read_only: false,
    fields: &[
        mapped("CFUNC_ID", "id"),
        mapped("CFUNC_CODE", "function"),
        mapped("CFUNC_DESC", "description"),
        mapped("CONNECT_STR", "connectStr"),
        mapped("ANON_SUPPORT", "anonSupport"),
        mapped("LANGUAGE", "language"),
        internal_only("FUNC_LIB"),
        internal_only("FUNC_VER"),
        internal_only("JAVA_CLASS_NAME"),
    ],
    references: FUNCTION_REFS,
};

static COMPARISON_THRESHOLD: EntitySpec = EntitySpec {
    kind: K::ComparisonThreshold,
    label: "comparison threshold",
    api_name: "comparisonThreshold",
    domain: Domain::Functions,
    table: "CFG_CFRTN",
    id_field: Some("CFRTN_ID"),
    code_field: None,
    key_fields: &["CFUNC_CODE", "CFUNC_RTNVAL", "FTYPE_CODE"],
    id_floor: 1000,
    read_only: false,
    fields: &[
        mapped("CFRTN_ID", "id"),
        mapped("CFUNC_CODE", "function"),
        mapped("CFUNC_RTNVAL", "returnCode"),
        mapped("FTYPE_CODE", "feature"),
        mapped("EXEC_ORDER", "order"),
        mapped("SAME_SCORE", "sameScore"),
        mapped("CLOSE_SCORE", "closeScore"),
        mapped("LIKELY_SCORE", "likelyScore"),
        mapped("PLAUSIBLE_SCORE", "plausibleScore"),
        mapped("UN_LIKELY_SCORE", "unlikelyScore"),
    ],
    references: &[
        code_ref("CFUNC_CODE", K::ComparisonFunction, Cascade),
        Reference {
            field: "FTYPE_CODE",
            target: K::Feature,
            by: RefBy::Code,
            optional: true,
            on_delete: Deny,
            wildcard: Some("ALL"),
        },
    ],
};

static EXPRESSION_FUNCTION: EntitySpec = EntitySpec {
    kind: K::ExpressionFunction,
    label: "expression function",
    api_name: "expressionFunction",
    domain: Domain::Functions,
    table: "CFG_EFUNC",
    id_field: Some("EFUNC_ID"),
    code_field: Some("EFUNC_CODE"),
    key_fields: &["EFUNC_CODE"],
    id_floor: 1000,
    read_only: false,
    fields: &[
        mapped("EFUNC_ID", "id"),
        mapped("EFUNC_CODE", "function"),
        mapped("EFUNC_DESC", "description"),
        mapped("CONNECT_STR", "connectStr"),
        mapped("LANGUAGE", "language"),
        internal_only("FUNC_LIB"),
        internal_only("FUNC_VER"),
        internal_only("JAVA_CLASS_NAME"),
    ],
    references: FUNCTION_REFS,
};

static STANDARDIZE_FUNCTION: EntitySpec = EntitySpec {
    kind: K::StandardizeFunction,
    label: "standardize function",
    api_name: "standardizeFunction",
    domain: Domain::Functions,
    table: "CFG_SFUNC",
    id_field: Some("SFUNC_ID"),
    code_field: Some("SFUNC_CODE"),
    key_fields: &["SFUNC_CODE"],
    id_floor: 1000,
    read_only: false,
    fields: &[
        mapped("SFUNC_ID", "id"),
        mapped("SFUNC_CODE", "function"),
        mapped("SFUNC_DESC", "description"),
        mapped("CONNECT_STR", "connectStr"),
        mapped("LANGUAGE", "language"),
        internal_only("FUNC_LIB"),
        internal_only("FUNC_VER"),
        internal_only("JAVA_CLASS_NAME"),
    ],
    references: FUNCTION_REFS,
};

static DISTINCT_FUNCTION: EntitySpec = EntitySpec {
    kind: K::DistinctFunction,
    label: "distinct function",
    api_name: "distinctFunction",
    domain: Domain::Functions,
    table: "CFG_DFUNC",
    id_field: Some("DFUNC_ID"),
    code_field: Some("DFUNC_CODE"),
    key_fields: &["DFUNC_CODE"],
    id_floor: 1000,
    read_only: false,
    fields: &[
        mapped("DFUNC_ID", "id"),
        mapped("DFUNC_CODE", "function"),
        mapped("DFUNC_DESC", "description"),
        mapped("CONNECT_STR", "connectStr"),
        mapped("ANON_SUPPORT", "anonSupport"),
        mapped("LANGUAGE", "language"),
        internal_only("FUNC_LIB"),
        internal_only("FUNC_VER"),
        internal_only("JAVA_CLASS_NAME"),
    ],
    references: FUNCTION_REFS,
};

static COMPARISON_CALL: EntitySpec = EntitySpec {
    kind: K::ComparisonCall,
    label: "comparison call",
    api_name: "comparisonCall",
    domain: Domain::Functions,
    table: "CFG_CFCALL",
    id_field: Some("CFCALL_ID"),
    code_field: None,
    key_fields: &["FTYPE_CODE"],
    id_floor: 1000,
    read_only: false,
    fields: &[
        mapped("CFCALL_ID", "id"),
        mapped("FTYPE_CODE", "feature"),
        mapped("CFUNC_CODE", "function"),
        mapped("EXEC_ORDER", "order"),
    ],
    references: &[
        code_ref("FTYPE_CODE", K::Feature, Cascade),
        code_ref("CFUNC_CODE", K::ComparisonFunction, Deny),
    ],
};

static EXPRESSION_CALL: EntitySpec = EntitySpec {
    kind: K::ExpressionCall,
    label: "expression call",
    api_name: "expressionCall",
    domain: Domain::Functions,
    table: "CFG_EFCALL",
    id_field: Some("EFCALL_ID"),
    code_field: None,
    key_fields: &["FTYPE_CODE", "FELEM_CODE", "EFUNC_CODE", "EFEAT_FTYPE_CODE"],
    id_floor: 1000,
    read_only: false,
    fields: &[
        mapped("EFCALL_ID", "id"),
        mapped("FTYPE_CODE", "feature"),
        mapped("FELEM_CODE", "element"),
        mapped("EFUNC_CODE", "function"),
        mapped("EXEC_ORDER", "order"),
        mapped("EFEAT_FTYPE_CODE", "expressionFeature"),
        mapped("IS_VIRTUAL", "virtual"),
    ],
    references: &[
        Reference {
            field: "FTYPE_CODE",
            target: K::Feature,
            by: RefBy::Code,
            optional: true,
            on_delete: Cascade,
            wildcard: None,
        },
        optional_code_ref("FELEM_CODE", K::Element),
        code_ref("EFUNC_CODE", K::ExpressionFunction, Deny),
        optional_code_ref("EFEAT_FTYPE_CODE", K::Feature),
    ],
};

static STANDARDIZE_CALL: EntitySpec = EntitySpec {
    kind: K::StandardizeCall,
    label: "standardize call",
    api_name: "standardizeCall",
    domain: Domain::Functions,
    table: "CFG_SFCALL",
    id_field: Some("SFCALL_ID"),
    code_field: None,
    key_fields: &["FTYPE_CODE", "FELEM_CODE", "SFUNC_CODE"],
    id_floor: 1000,
    read_only: false,
    fields: &[
        mapped("SFCALL_ID", "id"),
        mapped("FTYPE_CODE", "feature"),
        mapped("FELEM_CODE", "element"),
        mapped("SFUNC_CODE", "function"),
        mapped("EXEC_ORDER", "order"),
    ],
    references: &[
        Reference {
            field: "FTYPE_CODE",
            target: K::Feature,
            by: RefBy::Code,
            optional: true,
            on_delete: Cascade,
            wildcard: None,
        },
        optional_code_ref("FELEM_CODE", K::Element),
        code_ref("SFUNC_CODE", K::StandardizeFunction, Deny),
    ],
};

static DISTINCT_CALL: EntitySpec = EntitySpec {
    kind: K::DistinctCall,
    label: "distinct call",
    api_name: "distinctCall",
    domain: Domain::Functions,
    table: "CFG_DFCALL",
    id_field: Some("DFCALL_ID"),
    code_field: None,
    key_fields: &["FTYPE_CODE"],
    id_floor: 1000,
    read_only: false,
    fields: &[
        mapped("DFCALL_ID", "id"),
        mapped("FTYPE_CODE", "feature"),
        mapped("DFUNC_CODE", "function"),
        mapped("EXEC_ORDER", "order"),
    ],
    references: &[
        code_ref("FTYPE_CODE", K::Feature, Cascade),
        code_ref("DFUNC_CODE", K::DistinctFunction, Deny),
    ],
};

static COMPARISON_CALL_ELEMENT: EntitySpec = EntitySpec {
    kind: K::ComparisonCallElement,
    label: "comparison call element",
    api_name: "comparisonCallElement",
    domain: Domain::Functions,
    table: "CFG_CFBOM",
    id_field: None,
    code_field: None,
    key_fields: &["CFCALL_ID", "FTYPE_CODE", "FELEM_CODE"],
    id_floor: 1,
    read_only: false,
    fields: &[
        mapped("CFCALL_ID", "callId"),
        mapped("FTYPE_CODE", "feature"),
        mapped("FELEM_CODE", "element"),
        mapped("EXEC_ORDER", "order"),
    ],
    references: &[
        id_ref("CFCALL_ID", K::ComparisonCall, Cascade),
        code_ref("FTYPE_CODE", K::Feature, Deny),
        code_ref("FELEM_CODE", K::Element, Deny),
    ],
};

static EXPRESSION_CALL_ELEMENT: EntitySpec = EntitySpec {
    kind: K::ExpressionCallElement,
    label: "expression call element",
    api_name: "expressionCallElement",
    domain: Domain::Functions,
    table: "CFG_EFBOM",
    id_field: None,
    code_field: None,
    key_fields: &["EFCALL_ID", "FTYPE_CODE", "FELEM_CODE"],
    id_floor: 1,
    read_only: false,
    fields: &[
        mapped("EFCALL_ID", "callId"),
        mapped("FTYPE_CODE", "feature"),
        mapped("FELEM_CODE", "element"),
        mapped("EXEC_ORDER", "order"),
        mapped("FELEM_REQ", "required"),
    ],
    references: &[
        id_ref("EFCALL_ID", K::ExpressionCall, Cascade),
        code_ref("FTYPE_CODE", K::Feature, Deny),
        code_ref("FELEM_CODE", K::Element, Deny),
    ],
};

static DISTINCT_CALL_ELEMENT: EntitySpec = EntitySpec {
    kind: K::DistinctCallElement,
    label: "distinct call element",
    api_name: "distinctCallElement",
    domain: Domain::Functions,
    table: "CFG_DFBOM",
    id_field: None,
    code_field: None,
    key_fields: &["DFCALL_ID", "FTYPE_CODE", "FELEM_CODE"],
    id_floor: 1,
    read_only: false,
    fields: &[
        mapped("DFCALL_ID", "callId"),
        mapped("FTYPE_CODE", "feature"),
        mapped("FELEM_CODE", "element"),
        mapped("EXEC_ORDER", "order"),
    ],
    references: &[
        id_ref("DFCALL_ID", K::DistinctCall, Cascade),
        code_ref("FTYPE_CODE", K::Feature, Deny),
        code_ref("FELEM_CODE", K::Element, Deny),
    ],
};

static FRAGMENT: EntitySpec = EntitySpec {
    kind: K::Fragment,
    label: "fragment",
    api_name: "fragment",
    domain: Domain::Rules,
    table: "CFG_ERFRAG",
    id_field: Some("ERFRAG_ID"),
    code_field: Some("ERFRAG_CODE"),
    key_fields: &["ERFRAG_CODE"],
    id_floor: 1000,
    read_only: false,
    fields: &[
        mapped("ERFRAG_ID", "id"),
        mapped("ERFRAG_CODE", "fragment"),
        mapped("ERFRAG_DESC", "description"),
        mapped("ERFRAG_SOURCE", "source"),
        internal_only("ERFRAG_DEPENDS"),
    ],
    references: &[
        Reference {
            field: "ERFRAG_SOURCE",
            target: K::Feature,
            by: RefBy::Expression(ExprPattern::FeatureScores),
            optional: true,
            on_delete: Deny,
            wildcard: None,
        },
        Reference {
            field: "ERFRAG_SOURCE",
            target: K::Fragment,
            by: RefBy::Expression(ExprPattern::FragmentRefs),
            optional: true,
            on_delete: Deny,
            wildcard: None,
        },
    ],
};

static RULE_TYPE: EntitySpec = EntitySpec {
    kind: K::RuleType,
    label: "rule type",
    api_name: "ruleType",
    domain: Domain::Rules,
    table: "CFG_RTYPE",
    id_field: Some("RTYPE_ID"),
    code_field: Some("RTYPE_CODE"),
    key_fields: &["RTYPE_CODE"],
    id_floor: 1,
    read_only: true,
    fields: &[
        mapped("RTYPE_ID", "id"),
        mapped("RTYPE_CODE", "ruleType"),
        mapped("RTYPE_DESC", "description"),
    ],
    references: &[],
};

static RULE: EntitySpec = EntitySpec {
    kind: K::Rule,
    label: "rule",
    api_name: "rule",
    domain: Domain::Rules,
    table: "CFG_ERRULE",
    id_field: Some("ERRULE_ID"),
    code_field: Some("ERRULE_CODE"),
    key_fields: &["ERRULE_CODE"],
    id_floor: 1000,
    read_only: false,
    fields: &[
        mapped("ERRULE_ID", "id"),
        mapped("ERRULE_CODE", "rule"),
        mapped("ERRULE_DESC", "description"),
        mapped("RESOLVE", "resolve"),
        mapped("RELATE", "relate"),
        mapped("RTYPE_ID", "ruleType"),
        mapped("QUAL_ERFRAG_CODE", "fragment"),
        mapped("DISQ_ERFRAG_CODE", "disqualifier"),
        mapped("ERRULE_TIER", "tier"),
    ],
    references: &[
        id_ref("RTYPE_ID", K::RuleType, Deny),
        code_ref("QUAL_ERFRAG_CODE", K::Fragment, Deny),
        optional_code_ref("DISQ_ERFRAG_CODE", K::Fragment),
    ],
};

static GENERIC_PLAN: EntitySpec = EntitySpec {
    kind: K::GenericPlan,
    label: "generic plan",
    api_name: "genericPlan",
    domain: Domain::Rules,
    table: "CFG_GPLAN",
    id_field: Some("GPLAN_ID"),
    code_field: Some("GPLAN_CODE"),
    key_fields: &["GPLAN_CODE"],
    id_floor: 1000,
    read_only: false,
    fields: &[
        mapped("GPLAN_ID", "id"),
        mapped("GPLAN_CODE", "plan"),
        mapped("GPLAN_DESC", "description"),
    ],
    references: &[],
};

static GENERIC_THRESHOLD: EntitySpec = EntitySpec {
    kind: K::GenericThreshold,
    label: "generic threshold",
    api_name: "genericThreshold",
    domain: Domain::Rules,
    table: "CFG_GENERIC_THRESHOLD",
    id_field: None,
    code_field: None,
    key_fields: &["GPLAN_CODE", "BEHAVIOR", "FTYPE_CODE"],
    id_floor: 1,
    read_only: false,
    fields: &[
        mapped("GPLAN_CODE", "plan"),
        mapped("BEHAVIOR", "behavior"),
        mapped("FTYPE_CODE", "feature"),
        mapped("CANDIDATE_CAP", "candidateCap"),
        mapped("SCORING_CAP", "scoringCap"),
        mapped("SEND_TO_REDO", "sendToRedo"),
    ],
    references: &[
        code_ref("GPLAN_CODE", K::GenericPlan, Cascade),
        Reference {
            field: "FTYPE_CODE",
            target: K::Feature,
            by: RefBy::Code,
            optional: true,
            on_delete: Deny,
            wildcard: Some("ALL"),
        },
    ],
};

static SYSTEM_PARAMETER: EntitySpec = EntitySpec {
    kind: K::SystemParameter,
    label: "system parameter",
    api_name: "systemParameter",
    domain: Domain::System,
    table: "SYS_PARAMS",
    id_field: Some("PARAM_ID"),
    code_field: Some("PARAM_CODE"),
    key_fields: &["PARAM_CODE"],
    id_floor: 1,
    read_only: false,
    fields: &[
        mapped("PARAM_ID", "id"),
        mapped("PARAM_CODE", "parameter"),
        mapped("PARAM_VALUE", "value"),
    ],
    references: &[],
};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn every_kind_points_back_at_itself() {
        for kind in EntityKind::ALL {
            assert_eq!(kind.spec().kind, kind, "catalog entry mismatch for {kind:?}");
        }
    }

    #[test]
    fn tables_are_unique() {
        let mut tables: Vec<&str> = EntityKind::ALL.iter().map(|k| k.table()).collect();
        tables.sort_unstable();
        let before = tables.len();
        tables.dedup();
        assert_eq!(before, tables.len());
    }

    #[test]
    fn kind_parses_from_table_and_api_name() {
        assert_eq!("CFG_DSRC".parse::<EntityKind>().unwrap(), EntityKind::DataSource);
        assert_eq!("dataSource".parse::<EntityKind>().unwrap(), EntityKind::DataSource);
        assert_eq!("FEATURE".parse::<EntityKind>().unwrap(), EntityKind::Feature);
        assert!("nope".parse::<EntityKind>().is_err());
    }

    #[test]
    fn fragment_source_yields_features_and_fragments() {
        let source = "./FRAGMENT[./SAME_NAME>0 and ./SCORES/ADDRESS[./FULL_SCORE>=90] and ./FRAGMENT/CLOSE_NAME>0 and ./SCORES/ADDRESS]";
        assert_eq!(ExprPattern::FeatureScores.extract(source), vec!["ADDRESS"]);
        assert_eq!(ExprPattern::FragmentRefs.extract(source), vec!["CLOSE_NAME"]);
    }

    #[test]
    fn wildcard_and_blank_references_have_no_targets() {
        let spec = EntityKind::GenericThreshold.spec();
        let feature_ref = spec.references.iter().find(|r| r.field == "FTYPE_CODE").unwrap();

        let all = json!({"FTYPE_CODE": "ALL"});
        assert!(feature_ref.targets(all.as_object().unwrap()).is_empty());

        let blank = json!({"FTYPE_CODE": " "});
        assert!(feature_ref.targets(blank.as_object().unwrap()).is_empty());

        let named = json!({"FTYPE_CODE": "NAME"});
        assert_eq!(feature_ref.targets(named.as_object().unwrap()), vec!["NAME"]);
    }

    #[test]
    fn id_references_compare_numbers_as_text() {
        assert_eq!(value_key(&json!(1001)), Some("1001".to_string()));
        assert_eq!(value_key(&json!("1001")), Some("1001".to_string()));
        assert_eq!(value_key(&json!(null)), None);
    }
}
