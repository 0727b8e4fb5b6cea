//! Boundary error translation.
//!
//! Handlers return `Result<_, ApiError>`; every storage and normalization
//! failure is mapped to a status code and envelope here, and only here.
//!
//! | Source                       | Status | Message                                          |
//! |------------------------------|--------|--------------------------------------------------|
//! | empty update                 | 400    | No valid fields provided for update.             |
//! | bad reference / input        | 400    | (specific)                                       |
//! | missing record               | 404    | `<Resource> not found`                           |
//! | unique violation (23505)     | 409    | Duplicate value error.                           |
//! | foreign key (23503)          | 400    | Foreign key constraint violation.                |
//! | not null (23502)             | 400    | Null value error; a required field is missing.   |
//! | check (23514)                | 400    | Check constraint violation.                      |
//! | out of range (22003)         | 400    | Numeric value out of range.                      |
//! | anything else                | 500    | Internal server error                            |

use crate::domain::update::NormalizeError;
use crate::storage::{ConstraintKind, StoreError};
use crate::transport::http::types::ApiResponse;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{message}")]
    Constraint {
        kind: ConstraintKind,
        message: &'static str,
        detail: String,
    },

    #[error("Invalid JSON body")]
    InvalidJson(#[from] JsonRejection),

    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::InvalidJson(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Constraint {
                kind: ConstraintKind::Unique,
                ..
            } => StatusCode::CONFLICT,
            ApiError::Constraint { .. } => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<NormalizeError> for ApiError {
    fn from(err: NormalizeError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Constraint { kind, detail } => {
                let message = match kind {
                    ConstraintKind::Unique => "Duplicate value error.",
                    ConstraintKind::ForeignKey => "Foreign key constraint violation.",
                    ConstraintKind::NotNull => "Null value error; a required field is missing.",
                    ConstraintKind::Check => "Check constraint violation.",
                };
                ApiError::Constraint {
                    kind,
                    message,
                    detail,
                }
            }
            StoreError::InvalidValue(field) => {
                ApiError::BadRequest(format!("Invalid numeric value for field(s): {}", field))
            }
            StoreError::OutOfRange(cause) => {
                tracing::warn!(%cause, "numeric overflow");
                ApiError::BadRequest("Numeric value out of range.".into())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Constraint {
                message, detail, ..
            } => {
                tracing::warn!(%detail, "{}", message);
                ApiResponse::failure(message, Some(detail))
            }
            ApiError::Internal(cause) => {
                tracing::error!(%cause, "request failed");
                ApiResponse::failure("Internal server error", None)
            }
            ApiError::InvalidJson(rejection) => {
                tracing::debug!(%rejection, "rejected request body");
                ApiResponse::failure("Invalid JSON body", None)
            }
            other => ApiResponse::failure(other.to_string(), None),
        };
        (status, Json(body)).into_response()
    }
}
