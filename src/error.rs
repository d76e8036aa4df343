use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("malformed event: {0}")]
    MalformedEvent(String),

    #[error("unresolved identity: {0}")]
    UnresolvedIdentity(String),

    #[error("no drivers available for ride {0}")]
    NoCapacity(String),

    #[error("dispatcher unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::MalformedEvent(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::UnresolvedIdentity(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::NoCapacity(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "no drivers available".to_string(),
            ),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
