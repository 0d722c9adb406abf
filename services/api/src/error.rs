//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service, and the single
//! place where errors become HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use finance_core::advice::AdviceError;
use finance_core::ports::PortError;
use finance_core::validation::{BatchErrors, FieldErrors, SubmissionError};
use serde_json::json;
use tracing::{error, warn};

use crate::config::ConfigError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// One record failed validation.
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    /// At least one member of a batch failed validation; nothing was stored.
    #[error("Batch validation failed at indexes {:?}", .0.invalid_indexes())]
    BatchValidation(BatchErrors),

    /// The caller skipped a step that must come first.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Wrong username or password, or an inactive account.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Advice Error: {0}")]
    Advice(#[from] AdviceError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl From<SubmissionError> for ApiError {
    fn from(err: SubmissionError) -> Self {
        match err {
            SubmissionError::Single(errors) => ApiError::Validation(errors),
            SubmissionError::Batch(report) => ApiError::BatchValidation(report),
        }
    }
}

impl From<FieldErrors> for ApiError {
    fn from(errors: FieldErrors) -> Self {
        ApiError::Validation(errors)
    }
}

fn detail(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "detail": message.into() }))).into_response()
}

fn error_body(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

fn internal(err: &dyn std::fmt::Debug) -> Response {
    error!("Unhandled error while serving request: {:?}", err);
    error_body(
        StatusCode::INTERNAL_SERVER_ERROR,
        "An unexpected error occurred.",
    )
}

fn port_response(err: PortError) -> Response {
    match err {
        PortError::NotFound(_) => detail(StatusCode::NOT_FOUND, "Not found."),
        PortError::Conflict(message) => detail(StatusCode::BAD_REQUEST, message),
        PortError::Unauthorized => detail(
            StatusCode::UNAUTHORIZED,
            "Authentication credentials were not provided or are invalid.",
        ),
        PortError::Upstream(reason) => {
            warn!("Advice service returned an unusable reply: {}", reason);
            error_body(
                StatusCode::BAD_GATEWAY,
                "The advice service returned an invalid response. Please try again.",
            )
        }
        PortError::Unavailable(reason) => {
            warn!("Advice service unavailable: {}", reason);
            error_body(
                StatusCode::SERVICE_UNAVAILABLE,
                "The advice service is currently unavailable. Please try again later.",
            )
        }
        other @ PortError::Unexpected(_) => internal(&other),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(errors) => (StatusCode::BAD_REQUEST, Json(errors)).into_response(),
            ApiError::BatchValidation(report) => {
                (StatusCode::BAD_REQUEST, Json(report)).into_response()
            }
            ApiError::Precondition(message) => error_body(StatusCode::BAD_REQUEST, message),
            ApiError::Unauthorized(message) => detail(StatusCode::UNAUTHORIZED, message),
            ApiError::InvalidCredentials => {
                error_body(StatusCode::UNAUTHORIZED, "Invalid credentials")
            }
            ApiError::Forbidden(message) => detail(StatusCode::FORBIDDEN, message),
            ApiError::Advice(err) => match err {
                AdviceError::ProfileRequired | AdviceError::MissingLoanTerms(_) => {
                    error_body(StatusCode::BAD_REQUEST, err.to_string())
                }
                AdviceError::InvalidLoanTerms(errors) => {
                    (StatusCode::BAD_REQUEST, Json(errors)).into_response()
                }
                AdviceError::EmptyReply => {
                    port_response(PortError::Upstream("empty reply".to_string()))
                }
                AdviceError::Cancelled => error_body(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "The advice request was cancelled.",
                ),
                AdviceError::Port(port) => port_response(port),
            },
            ApiError::Port(err) => port_response(err),
            other => internal(&other),
        }
    }
}
