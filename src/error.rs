use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::auth::PasswordError;
use crate::storage::StorageError;

pub const USERNAME_TAKEN: &str =
    "Username already taken. Please choose a different one or log in instead.";
pub const EMAIL_TAKEN: &str =
    "A user with this email address already exists. Please log in instead.";
const GENERIC_INTERNAL: &str = "An unknown error occurred.";

/// Every failure an operation can report to its caller
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Malformed or missing input
    #[error("{0}")]
    Validation(String),

    /// Uniqueness violation
    #[error("{0}")]
    Conflict(String),

    /// Unknown username or wrong password; the two are never distinguished
    #[error("Invalid credentials.")]
    InvalidCredentials,

    #[error("User not authenticated.")]
    AuthRequired,

    /// Authenticated, but not the owner
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Storage or hashing backend failure. The detail is logged, never sent.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::InvalidCredentials | Self::AuthRequired => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to the client
    pub fn client_message(&self) -> String {
        match self {
            Self::Internal(_) => GENERIC_INTERNAL.to_string(),
            other => other.to_string(),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::DuplicateUsername(_) => Self::Conflict(USERNAME_TAKEN.to_string()),
            StorageError::DuplicateEmail(_) => Self::Conflict(EMAIL_TAKEN.to_string()),
            StorageError::NoteNotFound(_) => Self::NotFound("Note not found".to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Uniform error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let Self::Internal(detail) = &self {
            error!("Request failed: {}", detail);
        }

        (
            status,
            Json(ErrorResponse {
                error: self.client_message(),
            }),
        )
            .into_response()
    }
}

/// Fallback for any path or method nothing else matched
pub async fn endpoint_not_found() -> AppError {
    AppError::NotFound("Endpoint not found".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(AppError::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::AuthRequired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden("x".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Internal("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_detail_is_not_exposed() {
        let err = AppError::Internal("connection refused at 10.0.0.3:5432".into());
        assert_eq!(err.client_message(), GENERIC_INTERNAL);
    }

    #[test]
    fn test_duplicate_storage_errors_become_conflicts() {
        let err = AppError::from(StorageError::DuplicateUsername("alice".into()));
        assert!(matches!(err, AppError::Conflict(ref m) if m == USERNAME_TAKEN));

        let err = AppError::from(StorageError::DuplicateEmail("a@x.com".into()));
        assert!(matches!(err, AppError::Conflict(ref m) if m == EMAIL_TAKEN));
    }
}
