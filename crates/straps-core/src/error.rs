//! Error types for straps Core
//!
//! Provides error handling for:
//! - Command parsing failures (recoverable, shown to the model)
//! - Model collaborator failures (fatal for the session)
//! - Configuration loading
//! - Session bootstrap and generation persistence

use std::path::PathBuf;

use straps_artifact::ParseError;
use straps_engine::GenerationError;

/// Command line rejected before dispatch
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// Wrong number of positional arguments
    #[error("Invalid number of arguments for '{command}': expected {expected}, got {actual}")]
    ArityMismatch {
        command: String,
        expected: usize,
        actual: usize,
    },

    /// Action is not in the command table
    #[error("Invalid command: '{0}'")]
    UnknownCommand(String),
}

/// Model collaborator errors
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// API key environment variable unset or empty
    #[error("cannot find API key in the environment; set {var} accordingly")]
    CredentialMissing { var: String },

    /// Connection or protocol failure
    #[error("transport failure: {0}")]
    Transport(String),

    /// Non-success HTTP status
    #[error("model endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Reply did not have the expected shape
    #[error("malformed model response: {0}")]
    MalformedResponse(String),

    /// No reply within the configured timeout
    #[error("model request timed out after {secs}s")]
    Timeout { secs: u64 },
}

impl ModelError {
    /// Check if the error is a missing credential
    #[inline]
    #[must_use]
    pub fn is_credential(&self) -> bool {
        matches!(self, Self::CredentialMissing { .. })
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Errors that end a session
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("io error reading {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("source does not parse: {0}")]
    Parse(#[from] ParseError),

    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl SessionError {
    /// Create load error for path
    pub fn load(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Load {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for session operations
pub type SessionResult<T> = Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arity_mismatch_display() {
        let err = CommandError::ArityMismatch {
            command: "show".to_string(),
            expected: 1,
            actual: 0,
        };
        assert_eq!(
            err.to_string(),
            "Invalid number of arguments for 'show': expected 1, got 0"
        );
    }

    #[test]
    fn unknown_command_display() {
        let err = CommandError::UnknownCommand("rm".to_string());
        assert_eq!(err.to_string(), "Invalid command: 'rm'");
    }

    #[test]
    fn model_error_conversion() {
        let err: SessionError = ModelError::CredentialMissing {
            var: "OPENAI_API_KEY".to_string(),
        }
        .into();
        assert!(matches!(err, SessionError::Model(ref e) if e.is_credential()));
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }
}
