//! Error handling for the bookshelf HTTP layer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::validation::FieldError;

/// Body for a single error: `{"error": "<message>"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Body for validation failures: `{"errors": [{"error": "<message>"}, ...]}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorsBody {
    pub errors: Vec<ErrorBody>,
}

/// Application error types that map to HTTP responses
#[derive(Error, Debug)]
pub enum AppError {
    #[error("validation failed on {} field(s)", .0.len())]
    Validation(Vec<FieldError>),

    #[error("not found")]
    NotFound,

    #[error("bad request: {message}")]
    BadRequest { message: String },

    /// `message` is what the client sees; `source` only reaches the logs.
    #[error("{message}")]
    Internal {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl AppError {
    /// Create a validation error
    pub fn validation(errors: Vec<FieldError>) -> Self {
        Self::Validation(errors)
    }

    /// Create a not found error; renders with an empty body
    pub fn not_found() -> Self {
        Self::NotFound
    }

    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Create an internal error with a fixed client-facing message
    pub fn internal(message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Internal {
            message: message.into(),
            source: source.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v4();
        let status = self.status();

        match self {
            AppError::Validation(errors) => {
                tracing::info!(
                    error_id = %error_id,
                    status_code = %status.as_u16(),
                    violations = ?errors
                        .iter()
                        .map(|e| format!("{}:{}", e.field, e.rule))
                        .collect::<Vec<_>>(),
                    "request failed validation"
                );
                let body = ErrorsBody {
                    errors: errors
                        .into_iter()
                        .map(|e| ErrorBody { error: e.message })
                        .collect(),
                };
                (status, Json(body)).into_response()
            }
            AppError::NotFound => {
                tracing::info!(
                    error_id = %error_id,
                    status_code = %status.as_u16(),
                    "resource not found"
                );
                status.into_response()
            }
            AppError::BadRequest { message } => {
                tracing::info!(
                    error_id = %error_id,
                    status_code = %status.as_u16(),
                    %message,
                    "bad request"
                );
                (status, Json(ErrorBody { error: message })).into_response()
            }
            AppError::Internal { message, source } => {
                tracing::error!(
                    error_id = %error_id,
                    status_code = %status.as_u16(),
                    %message,
                    error = ?source,
                    "request error"
                );
                (status, Json(ErrorBody { error: message })).into_response()
            }
        }
    }
}
