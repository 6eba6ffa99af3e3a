use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{message}")]
    Validation {
        message: String,
        errors: Vec<FieldError>,
    },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Upload rejected: {0}")]
    UploadRejected(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    status: &'a str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a [FieldError]>,
}

impl AppError {
    /// Maps `validator` derive output onto the `{field, message, value}`
    /// shape of the response envelope.
    pub fn from_validation(errors: validator::ValidationErrors) -> Self {
        let mut field_errors = Vec::new();
        for (field, errs) in errors.field_errors() {
            for err in errs {
                field_errors.push(FieldError {
                    field: field.to_string(),
                    message: err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("invalid value for {}", field)),
                    value: err
                        .params
                        .get("value")
                        .and_then(|v| serde_json::to_value(v).ok()),
                });
            }
        }
        AppError::Validation {
            message: "Validation failed".to_string(),
            errors: field_errors,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            errors: Vec::new(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            // Duplicate email and friends answer 400, matching the wire
            // contract the frontend was built against
            AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::UploadRejected(_) => StatusCode::BAD_REQUEST,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Jwt(_) => StatusCode::UNAUTHORIZED,
            AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        let (message, errors) = match self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                ("Database error".to_string(), None)
            }
            AppError::Validation { message, errors } => (message.clone(), Some(errors.as_slice())),
            AppError::Unauthorized(m) => (m.clone(), None),
            AppError::Forbidden(m) => (m.clone(), None),
            AppError::NotFound(m) => (m.clone(), None),
            AppError::Conflict(m) => (m.clone(), None),
            AppError::UploadRejected(m) => (m.clone(), None),
            AppError::BadRequest(m) => (m.clone(), None),
            AppError::Jwt(e) => {
                tracing::debug!("JWT error: {:?}", e);
                ("Invalid or expired token".to_string(), None)
            }
            AppError::Io(e) => {
                tracing::error!("IO error: {:?}", e);
                ("IO error".to_string(), None)
            }
            AppError::Internal(m) => {
                tracing::error!("Internal error: {}", m);
                (m.clone(), None)
            }
        };

        let envelope = ErrorEnvelope {
            status: if status.is_server_error() {
                "error"
            } else {
                "fail"
            },
            message,
            errors,
        };

        HttpResponse::build(status).json(envelope)
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Postgres unique-violation check, used to reconcile concurrent
/// bootstrap inserts against the single-active-record index.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::UploadRejected("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Conflict("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::validation("bad").status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_error_envelope_status() {
        let resp = AppError::NotFound("missing".into()).error_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = AppError::Internal("boom".into()).error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
