//! Shared read primitives for every entity kind.

use cfgtool_schema::{ApiRecord, EntityKind, EntitySpec, Record, internal_name, value_key};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::document::ConfigDocument;
use crate::{Error, Result};

/// How a command names the row it wants.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    Id(i64),
    Code(String),
    /// Composite key given in API field names
    Key(ApiRecord),
}

impl Selector {
    /// Numbers select by id, anything else by code.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        match text.parse::<i64>() {
            Ok(id) => Selector::Id(id),
            Err(_) => Selector::Code(text.to_string()),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Id(id) => write!(f, "{id}"),
            Selector::Code(code) => f.write_str(code),
            Selector::Key(fields) => {
                let parts: Vec<String> = fields
                    .iter()
                    .map(|(k, v)| format!("{k}={}", value_key(v).unwrap_or_default()))
                    .collect();
                f.write_str(&parts.join(", "))
            }
        }
    }
}

/// Row filter for list operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Filter {
    #[default]
    All,
    /// Case-insensitive substring over every scalar value
    Text(String),
    /// Exact (case-insensitive) match on one internal field
    Field { field: String, value: String },
}

impl Filter {
    pub fn text(needle: impl Into<String>) -> Self {
        let needle = needle.into();
        if needle.trim().is_empty() {
            Filter::All
        } else {
            Filter::Text(needle.trim().to_lowercase())
        }
    }

    pub fn field(field: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Field {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Filter::All => true,
            Filter::Text(needle) => record
                .values()
                .filter_map(value_key)
                .any(|v| v.to_lowercase().contains(needle.as_str())),
            Filter::Field { field, value } => record
                .get(field)
                .and_then(value_key)
                .is_some_and(|v| v.eq_ignore_ascii_case(value)),
        }
    }
}

/// A lazy, restartable listing of rows. Clone it to iterate again.
#[derive(Clone)]
pub struct Listing<'a, I> {
    rows: I,
    filter: &'a Filter,
}

impl<'a, I> Iterator for Listing<'a, I>
where
    I: Iterator<Item = &'a Record>,
{
    type Item = &'a Record;

    fn next(&mut self) -> Option<Self::Item> {
        let filter = self.filter;
        self.rows.by_ref().find(|row| filter.matches(row))
    }
}

/// Ids retired by deletes during this session, per kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetiredIds {
    ids: BTreeMap<EntityKind, BTreeSet<i64>>,
}

impl RetiredIds {
    pub fn retire(&mut self, kind: EntityKind, id: i64) {
        self.ids.entry(kind).or_default().insert(id);
    }

    pub fn contains(&self, kind: EntityKind, id: i64) -> bool {
        self.ids.get(&kind).is_some_and(|set| set.contains(&id))
    }
}

/// Integer id of a row, if it has one.
pub fn record_id(spec: &EntitySpec, record: &Record) -> Option<i64> {
    let value = record.get(spec.id_field?)?;
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Code of a row, if its kind has codes.
pub fn record_code<'r>(spec: &EntitySpec, record: &'r Record) -> Option<&'r str> {
    record.get(spec.code_field?)?.as_str()
}

/// Short human identification of a row: its code, its composite key, or its id.
pub fn describe(kind: EntityKind, record: &Record) -> String {
    let spec = kind.spec();
    if let Some(code) = record_code(spec, record) {
        return code.to_string();
    }
    let key: Vec<String> = spec
        .key_fields
        .iter()
        .map(|f| record.get(*f).and_then(value_key).unwrap_or_else(|| "-".to_string()))
        .collect();
    match record_id(spec, record) {
        Some(id) => format!("#{id} ({})", key.join("/")),
        None => key.join("/"),
    }
}

/// Read access to one kind's table.
pub struct BaseManager<'a> {
    kind: EntityKind,
    doc: &'a ConfigDocument,
}

impl<'a> BaseManager<'a> {
    pub fn new(kind: EntityKind, doc: &'a ConfigDocument) -> Self {
        Self { kind, doc }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn spec(&self) -> &'static EntitySpec {
        self.kind.spec()
    }

    /// Rows in document order that pass `filter`.
    pub fn list(&self, filter: &'a Filter) -> Listing<'a, impl Iterator<Item = &'a Record> + Clone + use<'a>> {
        Listing {
            rows: self.doc.rows(self.kind),
            filter,
        }
    }

    pub fn find_by_id(&self, id: i64) -> Option<&'a Record> {
        let spec = self.spec();
        self.doc.rows(self.kind).find(|r| record_id(spec, r) == Some(id))
    }

    pub fn get_by_id(&self, id: i64) -> Result<&'a Record> {
        self.find_by_id(id)
            .ok_or_else(|| Error::not_found(self.kind, id.to_string()))
    }

    /// Codes compare case-insensitively.
    pub fn find_by_code(&self, code: &str) -> Option<&'a Record> {
        let spec = self.spec();
        self.doc
            .rows(self.kind)
            .find(|r| record_code(spec, r).is_some_and(|c| c.eq_ignore_ascii_case(code.trim())))
    }

    pub fn get_by_code(&self, code: &str) -> Result<&'a Record> {
        self.find_by_code(code)
            .ok_or_else(|| Error::not_found(self.kind, code.trim().to_string()))
    }

    /// First row whose internal fields match every `(field, value)` pair.
    pub fn find_by_key(&self, key: &[(&str, &Value)]) -> Option<&'a Record> {
        self.doc.rows(self.kind).find(|r| key_matches(r, key))
    }

    /// Every row whose `field` matches `value`.
    pub fn find_all<'q>(&self, field: &'q str, value: &'q str) -> impl Iterator<Item = &'a Record> + use<'a, 'q> {
        let doc: &'a ConfigDocument = self.doc;
        doc.rows(self.kind).filter(move |r| {
            r.get(field)
                .and_then(value_key)
                .is_some_and(|v| v.eq_ignore_ascii_case(value))
        })
    }

    /// Resolve a selector to one row.
    pub fn resolve(&self, selector: &Selector) -> Result<&'a Record> {
        match selector {
            Selector::Id(id) if self.spec().id_field.is_some() => self.get_by_id(*id),
            Selector::Id(id) => Err(Error::invalid(
                self.kind,
                "id",
                format!("{} rows have no id; cannot select {id}", self.kind),
            )),
            Selector::Code(code) if self.spec().code_field.is_some() => self.get_by_code(code),
            Selector::Code(code) => Err(Error::invalid(
                self.kind,
                "code",
                format!("{} rows have no code; cannot select '{code}'", self.kind),
            )),
            Selector::Key(fields) => {
                let mut key: Vec<(&str, &Value)> = Vec::with_capacity(fields.len());
                for (api, value) in fields {
                    let internal = internal_name(self.kind, api)
                        .ok_or_else(|| Error::invalid(self.kind, api.clone(), "not a field of this entity"))?;
                    key.push((internal, value));
                }
                if key.is_empty() {
                    return Err(Error::invalid(self.kind, "key", "no key fields supplied"));
                }
                self.find_by_key(&key)
                    .ok_or_else(|| Error::not_found(self.kind, selector.to_string()))
            }
        }
    }

    /// Smallest id at or above `floor` (default: the kind's floor) that is
    /// neither in use nor retired this session.
    pub fn reserve_next_id(&self, retired: &RetiredIds, floor: Option<i64>) -> i64 {
        let spec = self.spec();
        let floor = floor.unwrap_or(spec.id_floor).max(spec.id_floor);
        let used: BTreeSet<i64> = self.doc.rows(self.kind).filter_map(|r| record_id(spec, r)).collect();
        (floor..)
            .find(|id| !used.contains(id) && !retired.contains(self.kind, *id))
            .unwrap_or(floor)
    }

    pub fn assert_unique_code(&self, code: &str) -> Result<()> {
        match self.find_by_code(code) {
            Some(_) => Err(Error::DuplicateCode {
                kind: self.kind,
                code: code.trim().to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Fails with `DuplicateCode` when another row agrees on every key field.
    pub fn assert_unique_key(&self, record: &Record, ignore: Option<&Record>) -> Result<()> {
        let spec = self.spec();
        let key: Vec<(&str, &Value)> = spec
            .key_fields
            .iter()
            .map(|f| (*f, record.get(*f).unwrap_or(&Value::Null)))
            .collect();
        let clash = self
            .doc
            .rows(self.kind)
            .filter(|r| Some(*r) != ignore)
            .any(|r| key_matches(r, &key));
        if clash {
            return Err(Error::DuplicateCode {
                kind: self.kind,
                code: describe(self.kind, record),
            });
        }
        Ok(())
    }
}

fn key_matches(record: &Record, key: &[(&str, &Value)]) -> bool {
    key.iter().all(|(field, wanted)| {
        let have = record.get(*field).and_then(value_key);
        let want = value_key(wanted);
        match (have, want) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(&b),
            (None, None) => true,
            _ => false,
        }
    })
}
