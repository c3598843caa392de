//! Centralized error types for the Audio-Pi core library.
//!
//! This module provides a unified error handling system that:
//! - Defines structured error types using `thiserror`
//! - Maps errors to appropriate HTTP status codes
//! - Implements `IntoResponse` for automatic JSON error responses
//!
//! Tool failures (a command exiting non-zero, timing out, or missing) are
//! deliberately NOT represented here: they are reported to callers as
//! `ok: false` payloads via [`CommandReport`](crate::exec::CommandReport).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Trait for error types that provide machine-readable error codes.
pub trait ErrorCode {
    /// Returns a machine-readable error code for API responses.
    fn code(&self) -> &'static str;
}

/// Application-wide error type for the Audio-Pi control plane.
#[derive(Debug, Error)]
pub enum AudioPiError {
    /// Caller supplied an unknown service, action, mode or a malformed body.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration is unusable.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The device config document could not be written.
    #[error("Failed to persist device config: {0}")]
    Persistence(String),
}

impl ErrorCode for AudioPiError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::Configuration(_) => "configuration_error",
            Self::Persistence(_) => "save_failed",
        }
    }
}

impl AudioPiError {
    /// Maps the error to an appropriate HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convenient Result alias for application-wide operations.
pub type AudioPiResult<T> = Result<T, AudioPiError>;

/// JSON response body for error responses.
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
    status: u16,
}

impl IntoResponse for AudioPiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.code(),
            message: self.to_string(),
            status: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}
