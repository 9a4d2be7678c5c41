//! Error handling

use axum::{
    extract::rejection::FormRejection,
    response::{IntoResponse, Redirect, Response},
    http::StatusCode,
    Json,
};
use serde_json::json;

use crate::models::FeatureError;
use crate::services::dashboard::DashboardError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    // Auth errors
    InvalidCredentials,
    Unauthorized,

    // Resource errors
    AlreadyExists(String),

    // Validation errors
    ValidationError(String),

    // Database errors
    DatabaseError(String),

    // Generic errors
    InternalError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "Invalid credentials"),
            AppError::Unauthorized => return Redirect::to("/login").into_response(),
            AppError::AlreadyExists(msg) => (StatusCode::CONFLICT, msg.as_str()),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            AppError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error occurred")
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

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl From<FeatureError> for AppError {
    fn from(err: FeatureError) -> Self {
        match err {
            // A form without the field is a bad request; a field that fails
            // numeric conversion is an unhandled server error.
            FeatureError::Missing(_) => AppError::ValidationError(err.to_string()),
            FeatureError::InvalidInteger { .. } | FeatureError::InvalidFloat { .. } => {
                AppError::InternalError(err.to_string())
            }
        }
    }
}

impl From<DashboardError> for AppError {
    fn from(err: DashboardError) -> Self {
        AppError::InternalError(err.to_string())
    }
}

impl From<FormRejection> for AppError {
    fn from(rejection: FormRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}
