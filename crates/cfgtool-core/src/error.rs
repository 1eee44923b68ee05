//! Error types for cfgtool-core

use cfgtool_schema::{Domain, EntityKind};
use std::fmt;

use crate::integrity::ValidationReport;

/// Result type for cfgtool-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// A row that blocks a delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependent {
    pub kind: EntityKind,
    /// Human identification of the row (code, id, or composite key)
    pub key: String,
    /// API name of the referencing field
    pub field: String,
}

impl fmt::Display for Dependent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} (via {})", self.kind, self.key, self.field)
    }
}

/// Errors that can occur in configuration operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{kind} not found: {key}")]
    NotFound { kind: EntityKind, key: String },

    #[error("{kind} already exists: {code}")]
    DuplicateCode { kind: EntityKind, code: String },

    #[error("Invalid field '{field}' for {subject}: {reason}")]
    InvalidField {
        subject: String,
        field: String,
        reason: String,
    },

    #[error("Cannot delete {kind} {key}: still referenced by {}", join_dependents(.dependents))]
    ReferentialIntegrity {
        kind: EntityKind,
        key: String,
        dependents: Vec<Dependent>,
    },

    #[error("Setting {setting} is write-once and already persisted")]
    ImmutableSetting { setting: String },

    #[error("Configuration failed validation with {} issue(s)", .report.len())]
    Validation { report: ValidationReport },

    #[error("Persistence error: {0}")]
    Persistence(#[from] cfgtool_store::Error),

    #[error("Cannot load configuration: {reason}")]
    Load { reason: String },

    #[error("No configuration loaded")]
    NotLoaded,

    #[error("The {domain} manager cannot modify {kind} rows")]
    OutOfScope { domain: Domain, kind: EntityKind },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn join_dependents(dependents: &[Dependent]) -> String {
    dependents.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

impl Error {
    pub fn invalid(subject: impl fmt::Display, field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            subject: subject.to_string(),
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found(kind: EntityKind, key: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            key: key.into(),
        }
    }

    pub fn load(reason: impl Into<String>) -> Self {
        Self::Load {
            reason: reason.into(),
        }
    }

    /// Stable code shown next to every error message.
    pub fn code(&self) -> &'static str {
        match self {
            Error::NotFound { .. } => "CFG001",
            Error::DuplicateCode { .. } => "CFG002",
            Error::InvalidField { .. } => "CFG003",
            Error::ReferentialIntegrity { .. } => "CFG004",
            Error::ImmutableSetting { .. } => "CFG005",
            Error::Validation { .. } => "CFG006",
            Error::Persistence(_) => "CFG007",
            Error::Load { .. } => "CFG008",
            Error::NotLoaded => "CFG009",
            Error::OutOfScope { .. } => "CFG012",
            Error::Io(_) => "CFG013",
            Error::Json(_) => "CFG014",
        }
    }
}

impl From<cfgtool_schema::Error> for Error {
    fn from(err: cfgtool_schema::Error) -> Self {
        match err {
            cfgtool_schema::Error::InvalidField { kind, field, reason } => Self::invalid(kind, field, reason),
            cfgtool_schema::Error::UnknownKind { name } => Self::invalid("command", name, "unknown entity type"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn referential_integrity_lists_dependents() {
        let err = Error::ReferentialIntegrity {
            kind: EntityKind::DataSource,
            key: "CUSTOMERS".into(),
            dependents: vec![Dependent {
                kind: EntityKind::Attribute,
                key: "CUST_NAME".into(),
                field: "dataSource".into(),
            }],
        };
        let text = err.to_string();
        assert!(text.contains("CUSTOMERS"), "{text}");
        assert!(text.contains("attribute CUST_NAME (via dataSource)"), "{text}");
        assert_eq!(err.code(), "CFG004");
    }

    #[test]
    fn schema_errors_become_invalid_field() {
        let err: Error = cfgtool_schema::Error::invalid_field(EntityKind::Feature, "colour", "unknown").into();
        assert!(matches!(err, Error::InvalidField { ref field, .. } if field == "colour"));
        assert_eq!(err.code(), "CFG003");
    }
}
