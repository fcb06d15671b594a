//! Error taxonomy shared by the chunker, the collaborators, and the
//! processing coordinator.

use thiserror::Error;

/// Result type alias for doc-ingest operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the core and its collaborators.
#[derive(Debug, Error)]
pub enum Error {
    /// A referenced document, or the blob behind it, does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A required collaborator was not wired up.
    #[error("misconfigured: {0}")]
    Misconfigured(String),

    /// Blob read or write failure.
    #[error("storage failure: {0}")]
    Storage(String),

    /// Rejected configuration value (e.g. chunk overlap not below chunk size).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Anything else, including catalog/database failures.
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl Error {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn misconfigured(message: impl Into<String>) -> Self {
        Self::Misconfigured(message.into())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Wrap any displayable error as [`Error::Unexpected`].
    pub fn unexpected(err: impl std::fmt::Display) -> Self {
        Self::Unexpected(err.to_string())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Short machine-readable code used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "not_found",
            Error::Misconfigured(_) => "misconfigured",
            Error::Storage(_) => "storage_error",
            Error::InvalidConfig(_) => "bad_request",
            Error::Unexpected(_) => "internal",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Unexpected(format!("json: {}", err))
    }
}
