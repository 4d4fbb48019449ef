use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::profile::engine::EngineError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Engine(e) => engine_error_parts(e),
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

fn engine_error_parts(e: &EngineError) -> (StatusCode, &'static str, String) {
    match e {
        EngineError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        EngineError::NotReady(_) => (StatusCode::CONFLICT, "NOT_READY", e.to_string()),
        EngineError::ConcurrentSave => (StatusCode::CONFLICT, "SAVE_IN_PROGRESS", e.to_string()),
        EngineError::Upload(err) => {
            tracing::error!("Avatar upload error: {err:?}");
            (
                StatusCode::BAD_GATEWAY,
                "UPLOAD_ERROR",
                "The avatar could not be stored".to_string(),
            )
        }
        EngineError::Persistence(err) => {
            tracing::error!("Profile persistence error: {err:?}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "PERSISTENCE_ERROR",
                "The profile could not be saved".to_string(),
            )
        }
    }
}
