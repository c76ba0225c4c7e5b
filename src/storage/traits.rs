use uuid::Uuid;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Username already exists: {0}")]
    DuplicateUsername(String),

    #[error("Email already exists: {0}")]
    DuplicateEmail(String),

    #[error("Note not found: {0}")]
    NoteNotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
