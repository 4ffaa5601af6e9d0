use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::{DbErr, SqlErr};
use serde::Serialize;
use tracing::{debug, error};

use crate::validation::{humanize, FieldErrors};

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Unprocessable Entity")
    pub error: String,
    pub message: String,
    /// Field-scoped messages, present only for validation failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("The given data was invalid.")]
    ValidationError(FieldErrors),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ServiceError {
    /// A validation failure on a single field.
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field, message);
        ServiceError::ValidationError(errors)
    }

    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::DatabaseError(_) | Self::Storage(_) | Self::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::Storage(_) | Self::InternalError(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    fn log(&self) {
        match self {
            Self::ValidationError(errors) => debug!(fields = ?errors.fields(), "validation failed"),
            Self::DatabaseError(_) | Self::Storage(_) | Self::InternalError(_) => {
                error!(error = %self, "request failed")
            }
            _ => debug!(error = %self, "request rejected"),
        }
    }
}

/// A unique column on the table being written, paired with the form field it
/// is submitted through.
pub type UniqueField = (&'static str, &'static str);

/// Converts a write error into the error surfaced to the caller.
///
/// Constraint violations that slipped past validation (two concurrent
/// submissions of the same slug, a parent deleted mid-request) are reported
/// against the form field when the violated column is known, and as a
/// conflict otherwise.
pub fn downgrade_write_error(err: DbErr, unique: &[UniqueField]) -> ServiceError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(message)) => {
            match unique.iter().find(|(column, _)| names_column(&message, column)) {
                Some((_, field)) => ServiceError::field(
                    field,
                    format!("The {} has already been taken.", humanize(field)),
                ),
                None => ServiceError::Conflict(message),
            }
        }
        Some(SqlErr::ForeignKeyConstraintViolation(message)) => ServiceError::Conflict(message),
        _ => ServiceError::DatabaseError(err),
    }
}

// SQLite reports `table.column`, Postgres reports the `table_column_key` index.
fn names_column(message: &str, column: &str) -> bool {
    message.contains(&format!(".{}", column)) || message.contains(&format!("_{}_", column))
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        self.log();
        let status = self.status_code();
        let message = self.response_message();

        let errors = match self {
            ServiceError::ValidationError(errors) => Some(errors),
            _ => None,
        };

        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message,
            errors,
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}
