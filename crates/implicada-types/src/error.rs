use thiserror::Error;

/// Errors from repository operations (trait definitions live in
/// implicada-core, implementations in implicada-infra).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors surfaced by the chat pipeline.
///
/// Only input validation and unrecoverable failures reach the caller;
/// degraded external dependencies and parse non-conformance are absorbed
/// with fallback values inside the pipeline.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("message must not be empty")]
    EmptyMessage,

    #[error("generation failed: {0}")]
    Generation(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<RepositoryError> for ChatError {
    fn from(e: RepositoryError) -> Self {
        ChatError::Storage(e.to_string())
    }
}

/// Errors related to user authentication.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("email '{0}' already registered")]
    EmailConflict(String),

    #[error("invalid token")]
    InvalidToken,

    #[error("storage error: {0}")]
    StorageError(String),
}
