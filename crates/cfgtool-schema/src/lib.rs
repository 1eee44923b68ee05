//! Entity catalog and field-name translation for the configuration tool.
//!
//! The catalog describes every table of the engine configuration document:
//! identity fields, natural keys, references between kinds, and the mapping
//! between internal column names and the public API vocabulary.

pub mod catalog;
pub mod error;
pub mod translator;

pub use catalog::{
    API_VERSION, Domain, EntityKind, EntitySpec, ExprPattern, FieldAccess, FieldSpec, OnDelete,
    RefBy, Reference, value_key,
};
pub use error::{Error, Result};
pub use translator::{ApiRecord, Record, api_name, internal_name, to_api, to_internal};
