//! Translation between internal records and API records.
//!
//! Internal names are the engine's terse table columns (`DSRC_CODE`); API
//! names are the stable camelCase vocabulary (`dataSource`). Both functions
//! are driven entirely by the catalog's field tables.

use serde_json::{Map, Value};
use tracing::debug;

use crate::catalog::{EntityKind, FieldAccess};
use crate::error::{Error, Result};

/// A row as stored in the configuration document.
pub type Record = Map<String, Value>;

/// A row as shown to and accepted from users.
pub type ApiRecord = Map<String, Value>;

/// Project an internal record into the API vocabulary.
///
/// Mapped fields are renamed, internal-only fields are hidden, and fields the
/// catalog does not know pass through unchanged.
pub fn to_api(kind: EntityKind, record: &Record) -> ApiRecord {
    let spec = kind.spec();
    let mut out = Map::with_capacity(record.len());

    // Catalog order first so views read the same regardless of document order.
    for field in spec.fields {
        if let (FieldAccess::Mapped(api), Some(value)) = (field.access, record.get(field.internal)) {
            out.insert(api.to_string(), value.clone());
        }
    }
    for (name, value) in record {
        if spec.field(name).is_none() {
            out.insert(name.clone(), value.clone());
        }
    }
    out
}

/// Convert an API record into internal field names.
///
/// Every key must be a mapped API name for `kind`; anything else is an
/// [`Error::InvalidField`] naming the key.
pub fn to_internal(kind: EntityKind, api: &ApiRecord) -> Result<Record> {
    let spec = kind.spec();
    let mut out = Map::with_capacity(api.len());

    for (name, value) in api {
        match spec.field_by_api(name) {
            Some(field) => {
                out.insert(field.internal.to_string(), value.clone());
            }
            None if spec.field(name).is_some() => {
                debug!(kind = %kind, field = %name, "Rejected internal-only field");
                return Err(Error::invalid_field(kind, name, "internal field cannot be set directly"));
            }
            None => {
                debug!(kind = %kind, field = %name, "Rejected unknown field");
                return Err(Error::invalid_field(kind, name, unknown_reason(kind)));
            }
        }
    }
    Ok(out)
}

fn unknown_reason(kind: EntityKind) -> String {
    let names: Vec<&str> = kind.spec().fields.iter().filter_map(|f| f.api()).collect();
    format!("unknown field, expected one of: {}", names.join(", "))
}

/// API name of an internal field, if it is mapped.
pub fn api_name(kind: EntityKind, internal: &str) -> Option<&'static str> {
    kind.spec().field(internal).and_then(|f| f.api())
}

/// Internal name behind an API field.
pub fn internal_name(kind: EntityKind, api: &str) -> Option<&'static str> {
    kind.spec().field_by_api(api).map(|f| f.internal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn data_source_renames_and_orders() {
        let record = obj(json!({
            "DSRC_CODE": "CUSTOMERS",
            "DSRC_ID": 1001,
            "DSRC_DESC": "Customers"
        }));
        let api = to_api(EntityKind::DataSource, &record);
        let keys: Vec<&str> = api.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["id", "dataSource", "description"]);
        assert_eq!(api["dataSource"], json!("CUSTOMERS"));
    }

    #[test]
    fn unknown_internal_fields_pass_through() {
        let record = obj(json!({"DSRC_CODE": "X", "FUTURE_COLUMN": 7}));
        let api = to_api(EntityKind::DataSource, &record);
        assert_eq!(api["FUTURE_COLUMN"], json!(7));
    }

    #[test]
    fn internal_only_fields_are_hidden() {
        let record = obj(json!({"CFUNC_CODE": "CMP", "FUNC_LIB": "g2CmpFn", "FUNC_VER": "1"}));
        let api = to_api(EntityKind::ComparisonFunction, &record);
        assert_eq!(api.len(), 1);
        assert_eq!(api["function"], json!("CMP"));
    }

    #[test]
    fn unknown_api_field_is_rejected_by_name() {
        let api = obj(json!({"dataSource": "X", "colour": "red"}));
        let err = to_internal(EntityKind::DataSource, &api).unwrap_err();
        match err {
            Error::InvalidField { field, kind, .. } => {
                assert_eq!(field, "colour");
                assert_eq!(kind, EntityKind::DataSource);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn internal_only_field_is_rejected_on_input() {
        let api = obj(json!({"function": "X", "FUNC_LIB": "lib"}));
        assert!(to_internal(EntityKind::ComparisonFunction, &api).is_err());
    }

    #[test]
    fn name_lookups() {
        assert_eq!(api_name(EntityKind::Attribute, "ATTR_CODE"), Some("attribute"));
        assert_eq!(internal_name(EntityKind::Rule, "tier"), Some("ERRULE_TIER"));
        assert_eq!(api_name(EntityKind::ExpressionFunction, "FUNC_LIB"), None);
        assert_eq!(internal_name(EntityKind::Rule, "nope"), None);
    }
}
