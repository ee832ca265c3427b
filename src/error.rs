use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::caffeine::CaffeineError;
use crate::utils::{error_codes, error_to_api_response};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Caffeine(#[from] CaffeineError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl AppError {
    fn parts(&self) -> (StatusCode, i32, String) {
        match self {
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                error_codes::AUTH_FAILED,
                "A valid API secret is required".into(),
            ),
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                error_codes::VALIDATION_ERROR,
                msg.clone(),
            ),
            AppError::Caffeine(err @ CaffeineError::InvalidProfile { .. }) => (
                StatusCode::BAD_REQUEST,
                error_codes::INVALID_PROFILE,
                err.to_string(),
            ),
            AppError::Caffeine(err @ CaffeineError::InvalidOptions(_)) => (
                StatusCode::BAD_REQUEST,
                error_codes::VALIDATION_ERROR,
                err.to_string(),
            ),
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_codes::INTERNAL_ERROR,
                "Internal server error".into(),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Database(err) = &self {
            tracing::error!("Database error: {:?}", err);
        }
        let (status, code, msg) = self.parts();
        (status, error_to_api_response::<()>(code, msg)).into_response()
    }
}
