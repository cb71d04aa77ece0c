use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::render::orchestrator::BackendAttemptFailure;
use crate::tailor::TailorError;

/// Seconds a caller should wait after the provider's retry budget runs out.
pub const RETRY_AFTER_SECS: u64 = 60;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not configured: {0}")]
    NotConfigured(String),

    #[error("Service unavailable: {message}")]
    Unavailable { message: String, retry_after: u64 },

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),

    #[error("Render error: {message}")]
    Render {
        message: String,
        failures: Vec<BackendAttemptFailure>,
    },

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<TailorError> for AppError {
    fn from(err: TailorError) -> Self {
        match err {
            TailorError::Input(e) => AppError::Validation(e.to_string()),
            TailorError::ProviderNotConfigured | TailorError::TemplateUnavailable { .. } => {
                AppError::NotConfigured(err.to_string())
            }
            TailorError::Generation(e) if e.retryable => AppError::Unavailable {
                message: e.to_string(),
                retry_after: RETRY_AFTER_SECS,
            },
            TailorError::Generation(e) => AppError::Generation(e.to_string()),
            TailorError::Structural(e) => AppError::UnprocessableEntity(e.to_string()),
            TailorError::Render(e) => AppError::Render {
                message: e.to_string(),
                failures: e.failures().to_vec(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::NotConfigured(msg) => {
                tracing::error!("Configuration error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "NOT_CONFIGURED",
                    msg.clone(),
                )
            }
            AppError::Unavailable { message, retry_after } => {
                tracing::warn!("Provider unavailable: {message}");
                let body = Json(json!({
                    "error": {
                        "code": "SERVICE_UNAVAILABLE",
                        "type": "rate_limit",
                        "message": "The AI service is temporarily overloaded. Please try again shortly.",
                        "retry_after": retry_after
                    }
                }));
                return (
                    StatusCode::SERVICE_UNAVAILABLE,
                    [(header::RETRY_AFTER, retry_after.to_string())],
                    body,
                )
                    .into_response();
            }
            AppError::Generation(msg) => {
                tracing::error!("Generation error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "GENERATION_ERROR",
                    msg.clone(),
                )
            }
            AppError::UnprocessableEntity(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNPROCESSABLE_ENTITY",
                msg.clone(),
            ),
            AppError::Render { message, failures } => {
                tracing::error!("Render error: {message} ({} backends tried)", failures.len());
                let body = Json(json!({
                    "error": {
                        "code": "RENDER_ERROR",
                        "message": message,
                        "details": failures
                    }
                }));
                return (StatusCode::INTERNAL_SERVER_ERROR, body).into_response();
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
