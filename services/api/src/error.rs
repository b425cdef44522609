//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service.
//!
//! Handlers return `Result<T, ApiError>`; client-facing failures keep their
//! message, internal ones are logged in full and answered with a generic body.

use crate::config::ConfigError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use support_chat_core::ports::PortError;
use tracing::error;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The request body or path failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl ApiError {
    /// The status code and client-visible message for this error.
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::Validation(m) => (StatusCode::BAD_REQUEST, m.clone()),
            ApiError::Port(PortError::InvalidId(raw)) => (
                StatusCode::BAD_REQUEST,
                format!("Invalid id format: {}", raw),
            ),
            ApiError::Port(PortError::AlreadyExists(m)) => (StatusCode::BAD_REQUEST, m.clone()),
            ApiError::Port(PortError::NotFound(m)) => (StatusCode::NOT_FOUND, m.clone()),
            ApiError::Port(PortError::Unauthorized) => {
                (StatusCode::UNAUTHORIZED, "Unauthorized".to_string())
            }
            ApiError::Port(PortError::Provider(_)) => (
                StatusCode::BAD_GATEWAY,
                "An upstream model or search provider failed".to_string(),
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }
        (status, Json(json!({ "detail": message }))).into_response()
    }
}
