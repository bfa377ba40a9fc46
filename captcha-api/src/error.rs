use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::api::response::ApiResponse;

#[derive(Error, Debug)]
pub enum CaptchaError {
    #[error("Image size exceeds limit: {size} > {limit} bytes")]
    SizeExceeded { size: usize, limit: usize },

    #[error("Request body exceeds the configured limit")]
    BodyTooLarge,

    #[error("Image download failed: {0}")]
    FetchFailed(#[source] reqwest::Error),

    #[error("Image decode failed: {0}")]
    DecodeFailed(String),

    #[error("Unsupported image input type: {0}")]
    UnsupportedInputType(String),

    #[error("Expression is empty after sanitizing")]
    EmptyExpression,

    #[error("Unsupported expression construct: {0}")]
    UnsupportedConstruct(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Arithmetic overflow")]
    ArithmeticOverflow,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Rate limit exceeded, retry after {retry_after} seconds")]
    RateLimited { retry_after: u64 },

    #[error("Recognition engine error: {0}")]
    Engine(String),

    #[error("Recognition engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl CaptchaError {
    /// True for the failures produced while evaluating an arithmetic expression.
    pub fn is_expression_error(&self) -> bool {
        matches!(
            self,
            CaptchaError::EmptyExpression
                | CaptchaError::UnsupportedConstruct(_)
                | CaptchaError::DivisionByZero
                | CaptchaError::ArithmeticOverflow
        )
    }
}

impl IntoResponse for CaptchaError {
    fn into_response(self) -> Response {
        ApiResponse::<()>::from(self).into_response()
    }
}

pub type Result<T> = std::result::Result<T, CaptchaError>;
