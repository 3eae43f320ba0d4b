//! Error types for notedeck.

use thiserror::Error;

/// Result type alias using notedeck's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for notedeck operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Note not found
    #[error("Note not found: {0}")]
    NoteNotFound(i64),

    /// Attachment not found under the given note
    #[error("Attachment {attachment_id} not found on note {note_id}")]
    AttachmentNotFound { attachment_id: i64, note_id: i64 },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Authentication failed
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Object store call failed
    #[error("Object store error: {0}")]
    ObjectStore(String),

    /// Object was expected in the bucket but is not there
    #[error("Object does not exist: {0}")]
    ObjectMissing(String),

    /// Object is still in the bucket after a delete
    #[error("Object still exists after deletion: {0}")]
    ObjectStillPresent(String),

    /// Write would duplicate an existing unique row
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for every "row or object is not there" variant.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_) | Error::NoteNotFound(_) | Error::AttachmentNotFound { .. }
        )
    }
}
