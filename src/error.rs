//! Error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    /// Submission key missing or wrong.
    InvalidApiKey,

    /// Payload failed boundary validation.
    ValidationError(String),

    /// The classifier artifact never loaded; the detection path is down.
    ClassifierUnavailable,

    /// Anything the caller cannot act on.
    InternalError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::InvalidApiKey => (StatusCode::FORBIDDEN, "Invalid Key"),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            AppError::ClassifierUnavailable => {
                (StatusCode::SERVICE_UNAVAILABLE, "Detection engine offline")
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}
