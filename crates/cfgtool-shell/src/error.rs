//! Error types for cfgtool-shell

/// Result type for shell operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that can occur while running commands
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Error from the configuration layer
    #[error(transparent)]
    Core(#[from] cfgtool_core::Error),

    /// Error opening the configuration store
    #[error(transparent)]
    Store(#[from] cfgtool_store::Error),

    #[error("Unknown command '{name}'{}", did_you_mean(.suggestions))]
    UnknownCommand { name: String, suggestions: Vec<String> },

    #[error("{message}\n  usage: {usage}")]
    Usage { message: String, usage: String },

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Interactive prompt error
    #[error("Interactive prompt error: {0}")]
    Dialoguer(#[from] dialoguer::Error),

    #[error("Invalid settings file {path}: {source}")]
    Settings {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    /// User-facing error with a message
    #[error("{message}")]
    User { message: String },
}

fn did_you_mean(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!("; did you mean {}?", suggestions.join(", "))
    }
}

impl CliError {
    /// Create a new user error with the given message
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>, usage: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
            usage: usage.into(),
        }
    }

    /// Stable code shown with the message.
    pub fn code(&self) -> &'static str {
        match self {
            CliError::Core(err) => err.code(),
            CliError::Store(_) => "CFG007",
            CliError::UnknownCommand { .. } => "CFG010",
            CliError::Usage { .. } | CliError::User { .. } | CliError::Settings { .. } => "CFG011",
            CliError::Io(_) | CliError::Dialoguer(_) => "CFG013",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_command_lists_suggestions() {
        let err = CliError::UnknownCommand {
            name: "listDataSorces".into(),
            suggestions: vec!["listDataSources".into()],
        };
        assert_eq!(err.code(), "CFG010");
        assert!(err.to_string().contains("did you mean listDataSources?"));
    }

    #[test]
    fn core_errors_keep_their_code() {
        let err: CliError = cfgtool_core::Error::NotLoaded.into();
        assert_eq!(err.code(), "CFG009");
    }
}
