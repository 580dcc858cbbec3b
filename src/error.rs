// ABOUTME: Centralized error handling system with detailed context and logging
// ABOUTME: Provides structured errors without exposing store or internal details to clients

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;

/// A single rejected field, reported back so the caller can re-render the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation failed: {}", summarize(.0))]
    Validation(Vec<FieldError>),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Dangling reference: {0}")]
    Reference(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Internal error: {0}")]
    Internal(String),
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl AppError {
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation(vec![FieldError::new(field, message)])
    }

    /// Field errors carried by a validation failure, empty for every other kind.
    #[cfg(test)]
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            AppError::Validation(errors) => errors,
            _ => &[],
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::Validation(errors) => {
                tracing::info!(fields = errors.len(), "Validation failed: {}", self);
                let body = Json(json!({
                    "error": "Validation failed",
                    "fields": errors,
                    "status": StatusCode::BAD_REQUEST.as_u16()
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::Conflict(msg) => {
                tracing::info!("Conflict: {}", msg);
                (StatusCode::CONFLICT, msg.clone())
            }
            AppError::Unauthorized(msg) => {
                tracing::warn!("Unauthorized access: {}", msg);
                (StatusCode::UNAUTHORIZED, "Authentication required".to_string())
            }
            AppError::Forbidden(msg) => {
                tracing::warn!("Forbidden: {}", msg);
                (
                    StatusCode::FORBIDDEN,
                    "You are not allowed to modify this resource".to_string(),
                )
            }
            AppError::InvalidCredentials => {
                tracing::warn!("Login attempt with invalid credentials");
                (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string())
            }
            AppError::Reference(msg) => {
                tracing::info!("Dangling reference: {}", msg);
                (StatusCode::UNPROCESSABLE_ENTITY, msg.clone())
            }
            AppError::NotFound(msg) => {
                tracing::info!("Resource not found: {}", msg);
                (StatusCode::NOT_FOUND, "Resource not found".to_string())
            }
            AppError::Database(_) => {
                tracing::error!("Database error: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database operation failed".to_string(),
                )
            }
            AppError::Io(_) => {
                tracing::error!("I/O error: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Storage operation failed".to_string(),
                )
            }
            AppError::Internal(_) => {
                tracing::error!("Internal error: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

const JSON_DATA_PREFIX: &str = "Failed to deserialize the JSON body into the target type: ";

/// Splits a JSON data error into the offending field and a message. The
/// decoder reports `path: message at line L column C`; errors without a path
/// are attributed to the whole body.
fn json_field_error(detail: &str) -> FieldError {
    let detail = detail.strip_prefix(JSON_DATA_PREFIX).unwrap_or(detail);
    let detail = detail.rsplit_once(" at line ").map_or(detail, |(head, _)| head);

    if let Some((field, _)) = detail
        .strip_prefix("missing field `")
        .and_then(|rest| rest.split_once('`'))
    {
        return FieldError::new(field, "This field is required.");
    }

    match detail.split_once(": ") {
        Some((path, message)) if !path.is_empty() && !path.contains(char::is_whitespace) => {
            FieldError::new(path, message)
        }
        _ => FieldError::new("body", detail),
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(err) => {
                AppError::Validation(vec![json_field_error(&err.body_text())])
            }
            other => AppError::field("body", other.body_text()),
        }
    }
}

/// JSON request body whose decoding failures surface as field-level
/// validation errors.
pub type JsonBody<T> = axum_extra::extract::WithRejection<Json<T>, AppError>;

/// Maps a unique-constraint violation from the store to a conflict, passing
/// every other database error through.
pub fn conflict_on_unique(err: sea_orm::DbErr, message: &str) -> AppError {
    match err.sql_err() {
        Some(sea_orm::SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict(message.to_string())
        }
        _ => AppError::Database(err),
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
