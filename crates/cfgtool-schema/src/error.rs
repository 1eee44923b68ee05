//! Error types for cfgtool-schema

use crate::EntityKind;

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while translating between the internal and API vocabularies
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// An API record carried a key that is not part of the entity's vocabulary
    #[error("Invalid field '{field}' for {kind}: {reason}")]
    InvalidField {
        kind: EntityKind,
        field: String,
        reason: String,
    },

    /// An entity type name did not match any catalog entry
    #[error("Unknown entity type: {name}")]
    UnknownKind { name: String },
}

impl Error {
    pub fn invalid_field(kind: EntityKind, field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            kind,
            field: field.into(),
            reason: reason.into(),
        }
    }
}
