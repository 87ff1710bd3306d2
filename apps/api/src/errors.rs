use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::analyzer::AnalyzerError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Tier-level conditions (store unavailable, duplicate insert) never appear
/// here — the cache coordinator absorbs them.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Analyzer returned malformed output: {0}")]
    AnalyzerMalformed(String),

    #[error("Analyzer unavailable: {0}")]
    AnalyzerUnavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<AnalyzerError> for AppError {
    fn from(err: AnalyzerError) -> Self {
        match err {
            AnalyzerError::Malformed(msg) => AppError::AnalyzerMalformed(msg),
            AnalyzerError::Unavailable(msg) => AppError::AnalyzerUnavailable(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::AnalyzerMalformed(msg) => {
                tracing::error!("Analyzer malformed output: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "ANALYZER_MALFORMED",
                    "The AI analyzer returned an unexpected response".to_string(),
                )
            }
            AppError::AnalyzerUnavailable(msg) => {
                tracing::error!("Analyzer unavailable: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "ANALYZER_UNAVAILABLE",
                    "The AI analyzer is currently unavailable".to_string(),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
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
