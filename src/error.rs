//! Error types for SecretGate
//!
//! All handler errors are converted to `AppError`,
//! which implements `IntoResponse` for proper HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Message returned to clients that hit a gated route without a session.
pub const LOGIN_REQUIRED_MESSAGE: &str = "You must log in!";

/// Application-wide error type
///
/// OAuth failures never reach clients through this type: the callback
/// handler turns them into a redirect to `/failure`. What does reach
/// clients is mostly `Unauthorized` from the session gate.
#[derive(Debug, Error)]
pub enum AppError {
    /// Authentication required (401)
    #[error("You must log in!")]
    Unauthorized,

    /// Identity provider rejected or garbled the exchange (502)
    #[error("Identity provider error: {0}")]
    Provider(String),

    /// HTTP client error (502)
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Signing error (500)
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl IntoResponse for AppError {
    /// Maps each error variant to a status code and a JSON error body.
    fn into_response(self) -> Response {
        use axum::Json;

        let (status, error_message, error_type) = match &self {
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                LOGIN_REQUIRED_MESSAGE.to_string(),
                "unauthorized",
            ),
            AppError::Provider(msg) => (StatusCode::BAD_GATEWAY, msg.clone(), "provider"),
            AppError::HttpClient(_) => (StatusCode::BAD_GATEWAY, self.to_string(), "http_client"),
            AppError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone(), "config"),
            AppError::Encryption(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                "encryption",
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                "internal",
            ),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        // Anonymous visitors hitting the gate are counted by the session check metric
        if !matches!(self, AppError::Unauthorized) {
            crate::metrics::ERRORS_TOTAL
                .with_label_values(&[error_type])
                .inc();
        }

        let body = Json(serde_json::json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
