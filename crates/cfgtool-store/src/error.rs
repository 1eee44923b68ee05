//! Error types for cfgtool-store

use std::path::PathBuf;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failures talking to the configuration engine
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration engine unavailable: {reason}")]
    EngineUnavailable { reason: String },

    #[error("Malformed configuration document: {reason}")]
    MalformedDocument { reason: String },

    #[error("Configuration engine rejected the document: {reason}")]
    EngineRejected { reason: String },

    #[error("No configuration with id {id}")]
    UnknownConfigId { id: u64 },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Lock acquisition failed for {path}")]
    LockFailed { path: PathBuf },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedDocument {
            reason: reason.into(),
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::EngineRejected {
            reason: reason.into(),
        }
    }
}
