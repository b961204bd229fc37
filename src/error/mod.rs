use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::notification::DispatchError;
use crate::store::StoreError;
use crate::transport::TransportError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DispatchError> for AppError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Validation(msg) => AppError::Validation(msg),
            DispatchError::Store(e) => AppError::Store(e),
            DispatchError::Transport(e) => AppError::Transport(e),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

/// Check if running in production mode (based on RUN_MODE env var)
fn is_production() -> bool {
    std::env::var("RUN_MODE")
        .map(|m| m == "production" || m == "prod")
        .unwrap_or(false)
}

/// Server-side failures keep their details out of production responses.
fn server_error(summary: &str, code: &'static str, detail: String) -> (StatusCode, ErrorResponse) {
    let details = (!is_production()).then_some(detail);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        ErrorResponse {
            error: summary.to_string(),
            code,
            details,
        },
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let log_message = self.to_string();

        let (status, body) = match self {
            AppError::Config(e) => server_error("Configuration error", "CONFIG_ERROR", e.to_string()),
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: msg,
                    code: "VALIDATION_ERROR",
                    details: None,
                },
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorResponse {
                    error: msg,
                    code: "NOT_FOUND",
                    details: None,
                },
            ),
            AppError::Store(e) => {
                server_error("Failed to query directory", "STORE_ERROR", e.to_string())
            }
            AppError::Transport(e) => {
                server_error("Failed to send notification", "TRANSPORT_ERROR", e.to_string())
            }
            AppError::Internal(msg) => server_error("Internal server error", "INTERNAL_ERROR", msg),
        };

        // Always log the detailed error server-side
        tracing::error!(
            code = %body.code,
            status = %status.as_u16(),
            message = %log_message,
            "API error"
        );

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
