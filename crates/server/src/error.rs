use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rk_core::EngineError;
use serde::Serialize;

#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
    Engine(EngineError),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
            AppError::Engine(err) => match err {
                EngineError::InvalidGoal(_) => {
                    (StatusCode::BAD_REQUEST, "invalid_goal", err.to_string())
                }
                EngineError::RunNotFound(_) => (StatusCode::NOT_FOUND, "not_found", err.to_string()),
                EngineError::TemplateMissing(_) => {
                    tracing::error!("Engine error: {:?}", err);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "template_missing",
                        err.to_string(),
                    )
                }
            },
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        AppError::Engine(err)
    }
}
