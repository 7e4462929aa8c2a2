//! Server-specific error types

use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use enroll_common::{EnrollError, FieldFailure};
use serde_json::json;
use thiserror::Error;

/// Application error types returned from HTTP handlers
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("Validation failed")]
    Validation(Vec<FieldFailure>),

    #[error("{0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<EnrollError> for AppError {
    fn from(err: EnrollError) -> Self {
        match err {
            EnrollError::NotFound(message) => AppError::NotFound(message),
            EnrollError::Validation(failures) => AppError::Validation(failures),
            EnrollError::Conflict(message) => AppError::Conflict(message),
            invalid @ EnrollError::InvalidKey => AppError::BadRequest(invalid.to_string()),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// `Json` extractor whose rejections use the [`AppError`] body
#[derive(FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, errors) = match self {
            AppError::NotFound(message) => (StatusCode::NOT_FOUND, message, None),
            AppError::Validation(failures) => (
                StatusCode::BAD_REQUEST,
                "One or more validation errors occurred".to_string(),
                Some(failures),
            ),
            AppError::Conflict(message) => (StatusCode::CONFLICT, message, None),
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message, None),
            AppError::Internal(message) => {
                tracing::error!(error = %message, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred".to_string(),
                    None,
                )
            },
        };

        let mut error = json!({
            "message": message,
            "status": status.as_u16(),
        });

        if let Some(failures) = errors {
            error["errors"] = json!(failures);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}
