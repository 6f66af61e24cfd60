use crate::index::{BuildError, CacheError};
use crate::lesson::LessonError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unprocessable request: {0}")]
    Unprocessable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Upstream provider error: {0}")]
    Upstream(String),

    #[error("Internal server error")]
    Internal(String),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub status: String,
}

impl From<LessonError> for ApiError {
    fn from(err: LessonError) -> Self {
        match err {
            LessonError::UnknownSubject(name) => Self::NotFound(format!("Unknown subject: {}", name)),
            LessonError::ComponentsNotReady(detail) => {
                tracing::warn!("Lesson requested before index ready: {}", detail);
                Self::Unavailable(
                    "Curriculum index is not ready. Check /status and try /rebuild.".to_string(),
                )
            }
            LessonError::Retrieval(detail) => {
                tracing::error!("Retrieval failed: {}", detail);
                Self::Internal("Curriculum retrieval failed".to_string())
            }
            LessonError::GenerationFailure(detail) => {
                tracing::error!("Generation failed: {}", detail);
                Self::Upstream("Lesson generation failed".to_string())
            }
        }
    }
}

impl From<CacheError> for ApiError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Build(BuildError::SourceUnavailable(path)) => {
                tracing::warn!("Source document missing: {}", path.display());
                Self::InvalidRequest("Source document not found".to_string())
            }
            other => {
                tracing::error!("Index error: {}", other);
                Self::Internal("Index rebuild failed".to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::InvalidRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Unprocessable(message) => (StatusCode::UNPROCESSABLE_ENTITY, message),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, message),
            Self::Unavailable(message) => (StatusCode::SERVICE_UNAVAILABLE, message),
            Self::Upstream(message) => (StatusCode::BAD_GATEWAY, message),
            Self::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        (
            status,
            Json(ErrorResponse {
                error: message,
                status: "error".to_string(),
            }),
        )
            .into_response()
    }
}
