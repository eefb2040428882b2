//! Error types for the mutation engine
//!
//! Every variant here is recoverable: the dispatcher renders it as a result
//! string and the model sees it on its next turn.

use straps_artifact::{ParseError, StoreError};

use crate::patch::PatchError;

/// Errors from create/show/modify
#[derive(Debug, thiserror::Error)]
pub enum MutationError {
    /// `create` target already exists
    #[error("function '{0}' already exists")]
    DuplicateName(String),

    /// No declaration with that name
    #[error("no function named '{0}'")]
    NotFound(String),

    /// Several declarations share the name and the policy requires one
    #[error("{count} functions are named '{name}'; modify needs exactly one")]
    AmbiguousName { name: String, count: usize },

    /// Replacement code defines the name more than once
    #[error("too many functions named '{name}' defined ({count})")]
    TooManyDefinitions { name: String, count: usize },

    /// Replacement code does not define the name
    #[error("no function named '{0}' defined in the new code")]
    NoDefinitionFound(String),

    /// Code does not parse, or is not a single declaration
    #[error("invalid syntax: {0}")]
    InvalidSyntax(String),

    /// Patch applier rejected the patch
    #[error("patch failed: {0}")]
    PatchFailed(#[from] PatchError),

    /// `modify` without any code after the command line
    #[error("nothing specified after 'modify {0}'; follow the command with the new code")]
    EmptyPayload(String),

    /// Store rejected a positional operation
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl From<ParseError> for MutationError {
    fn from(err: ParseError) -> Self {
        Self::InvalidSyntax(err.to_string())
    }
}

impl MutationError {
    /// Create invalid syntax error
    pub fn invalid_syntax(message: impl Into<String>) -> Self {
        Self::InvalidSyntax(message.into())
    }
}

/// Result type alias for engine operations
pub type MutationResult<T> = Result<T, MutationError>;
