use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use foamline_core::error::EngineError;
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    Engine(EngineError),
    Anyhow(anyhow::Error),
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        Self::Engine(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Anyhow(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Engine(EngineError::Validation(msg)) => (StatusCode::BAD_REQUEST, msg),
            AppError::Engine(EngineError::NotFound(msg)) => (StatusCode::NOT_FOUND, msg),
            AppError::Engine(EngineError::Conflict(msg)) => (StatusCode::CONFLICT, msg),
            AppError::Engine(EngineError::EvidenceRejected(msg)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, msg)
            }
            AppError::Engine(EngineError::ServiceUnavailable(msg)) => {
                tracing::error!("Upstream unavailable: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, msg)
            }
            AppError::Engine(EngineError::Storage(msg)) => {
                tracing::error!("Storage error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
