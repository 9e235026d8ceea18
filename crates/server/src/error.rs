// ABOUTME: HTTP error type for the API handlers and its JSON rendering.
// ABOUTME: Malformed requests map to 400, auth to 401, persistence failures to 502 with DB_ERROR.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use newsdesk_scraper::{EditError, ErrorCode};
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Unauthorized,
    Db(String),
    Internal(anyhow::Error),
}

impl From<EditError> for AppError {
    fn from(err: EditError) -> Self {
        match err {
            EditError::Invalid(message) => AppError::BadRequest(message),
            EditError::Store(err) => AppError::Db(err.message()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", message),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Unauthorized".to_string(),
            ),
            AppError::Db(message) => {
                tracing::error!(error = %message, "persistence request failed");
                (
                    StatusCode::BAD_GATEWAY,
                    ErrorCode::DbError.as_str(),
                    message,
                )
            }
            AppError::Internal(err) => {
                tracing::error!(error = ?err, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({ "code": code, "message": message }))).into_response()
    }
}
