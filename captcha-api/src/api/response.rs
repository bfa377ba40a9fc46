//! # API Response Envelope & Error Contract
//!
//! Every endpoint returns an [`ApiResponse<T>`] envelope:
//!
//! ```json
//! {
//!   "data": { ... },                                        // present on success
//!   "error": { "code": "invalid_request", "message": "..." } // present on error
//! }
//! ```
//!
//! Error codes map to fixed HTTP statuses via [`ErrorCode::status`]. Internal
//! failures are logged and reported with a generic message.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::CaptchaError;

/// Machine-readable error code included in every error response.
///
/// Serialized as a snake_case string on the wire (e.g. `"invalid_request"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Malformed body, missing field, undecodable image. HTTP 400.
    InvalidRequest,
    /// No API key supplied. HTTP 401.
    Unauthorized,
    /// API key not recognised. HTTP 403.
    Forbidden,
    /// Image larger than the configured limit. HTTP 413.
    PayloadTooLarge,
    /// The captcha text is not a supported arithmetic expression. HTTP 422.
    UnprocessableExpression,
    /// Too many requests in the current window. HTTP 429.
    RateLimited,
    /// Unexpected server-side failure. HTTP 500.
    InternalError,
    /// Remote image could not be fetched. HTTP 502.
    UpstreamError,
    /// Recognition engine not configured or unreachable. HTTP 503.
    ServiceUnavailable,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UnprocessableExpression => StatusCode::UNPROCESSABLE_ENTITY,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::UpstreamError => StatusCode::BAD_GATEWAY,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = match self {
            Self::InvalidRequest => "invalid_request",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::PayloadTooLarge => "payload_too_large",
            Self::UnprocessableExpression => "unprocessable_expression",
            Self::RateLimited => "rate_limited",
            Self::InternalError => "internal_error",
            Self::UpstreamError => "upstream_error",
            Self::ServiceUnavailable => "service_unavailable",
        };
        f.write_str(code)
    }
}

/// Structured error payload within the envelope.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ApiError {
    pub code: ErrorCode,
    /// Human-readable description. Internal details are never included.
    pub message: String,
}

impl From<CaptchaError> for ApiError {
    fn from(err: CaptchaError) -> Self {
        let (code, message) = classify_error(err);
        Self { code, message }
    }
}

/// Response envelope shared by all endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,

    /// HTTP status to use in the response. Not serialized on the wire.
    #[serde(skip)]
    status: StatusCode,
    /// Seconds for the `Retry-After` header on rate-limited responses.
    #[serde(skip)]
    retry_after: Option<u64>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Success response with data (HTTP 200).
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            status: StatusCode::OK,
            retry_after: None,
        }
    }

    /// Error response. HTTP status is derived from the [`ErrorCode`].
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
            status: code.status(),
            retry_after: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status;
        let retry_after = self.retry_after;

        let mut response = match serde_json::to_value(&self) {
            Ok(body) => (status, Json(body)).into_response(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize response body");
                let body = serde_json::json!({
                    "error": {
                        "code": "internal_error",
                        "message": "An internal error occurred"
                    }
                });
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        };

        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

fn classify_error(err: CaptchaError) -> (ErrorCode, String) {
    match err {
        CaptchaError::Validation(msg) => (ErrorCode::InvalidRequest, msg),

        e @ (CaptchaError::DecodeFailed(_)
        | CaptchaError::UnsupportedInputType(_)
        | CaptchaError::Json(_)) => (ErrorCode::InvalidRequest, e.to_string()),

        CaptchaError::Unauthorized(msg) => (ErrorCode::Unauthorized, msg),

        CaptchaError::Forbidden(msg) => (ErrorCode::Forbidden, msg),

        e @ (CaptchaError::SizeExceeded { .. } | CaptchaError::BodyTooLarge) => {
            (ErrorCode::PayloadTooLarge, e.to_string())
        }

        e @ (CaptchaError::EmptyExpression
        | CaptchaError::UnsupportedConstruct(_)
        | CaptchaError::DivisionByZero
        | CaptchaError::ArithmeticOverflow) => {
            (ErrorCode::UnprocessableExpression, e.to_string())
        }

        e @ CaptchaError::RateLimited { .. } => (ErrorCode::RateLimited, e.to_string()),

        e @ CaptchaError::FetchFailed(_) => {
            tracing::warn!(error = %e, "Remote image fetch failed");
            (ErrorCode::UpstreamError, "Failed to download image".to_string())
        }

        CaptchaError::EngineUnavailable(msg) => {
            tracing::warn!(reason = %msg, "Recognition engine unavailable");
            (
                ErrorCode::ServiceUnavailable,
                "Recognition engine unavailable".to_string(),
            )
        }

        ref internal @ (CaptchaError::Engine(_)
        | CaptchaError::Processing(_)
        | CaptchaError::Internal(_)) => {
            tracing::error!(error = %internal, "Internal error mapped to API response");
            (
                ErrorCode::InternalError,
                "An internal error occurred".to_string(),
            )
        }
    }
}

impl<T: Serialize> From<CaptchaError> for ApiResponse<T> {
    /// Convert a [`CaptchaError`] into an error envelope.
    fn from(err: CaptchaError) -> Self {
        let retry_after = match err {
            CaptchaError::RateLimited { retry_after } => Some(retry_after),
            _ => None,
        };
        let (code, message) = classify_error(err);
        let mut response = ApiResponse::error(code, message);
        response.retry_after = retry_after;
        response
    }
}

impl<T: Serialize> From<crate::error::Result<T>> for ApiResponse<T> {
    fn from(result: crate::error::Result<T>) -> Self {
        match result {
            Ok(data) => ApiResponse::success(data),
            Err(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: CaptchaError) -> (StatusCode, ErrorCode) {
        let resp = ApiResponse::<()>::from(err);
        let code = resp.error.as_ref().map(|e| e.code).unwrap();
        (resp.status(), code)
    }

    #[test]
    fn success_response_serializes_without_error() {
        let resp = ApiResponse::success("hello");
        let json = serde_json::to_value(&resp).expect("serialize");
        assert_eq!(json["data"], "hello");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn error_response_serializes_without_data() {
        let resp = ApiResponse::<()>::error(ErrorCode::Forbidden, "nope");
        let json = serde_json::to_value(&resp).expect("serialize");
        assert!(json.get("data").is_none());
        assert_eq!(json["error"]["code"], "forbidden");
        assert_eq!(json["error"]["message"], "nope");
    }

    #[test]
    fn error_taxonomy_maps_to_statuses() {
        assert_eq!(
            status_of(CaptchaError::DecodeFailed("x".into())),
            (StatusCode::BAD_REQUEST, ErrorCode::InvalidRequest)
        );
        assert_eq!(
            status_of(CaptchaError::UnsupportedInputType("number".into())),
            (StatusCode::BAD_REQUEST, ErrorCode::InvalidRequest)
        );
        assert_eq!(
            status_of(CaptchaError::SizeExceeded { size: 2, limit: 1 }),
            (StatusCode::PAYLOAD_TOO_LARGE, ErrorCode::PayloadTooLarge)
        );
        assert_eq!(
            status_of(CaptchaError::DivisionByZero),
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorCode::UnprocessableExpression
            )
        );
        assert_eq!(
            status_of(CaptchaError::Unauthorized("missing".into())),
            (StatusCode::UNAUTHORIZED, ErrorCode::Unauthorized)
        );
        assert_eq!(
            status_of(CaptchaError::Forbidden("bad".into())),
            (StatusCode::FORBIDDEN, ErrorCode::Forbidden)
        );
        assert_eq!(
            status_of(CaptchaError::EngineUnavailable("off".into())),
            (StatusCode::SERVICE_UNAVAILABLE, ErrorCode::ServiceUnavailable)
        );
        assert_eq!(
            status_of(CaptchaError::Engine("boom".into())),
            (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::InternalError)
        );
    }

    #[test]
    fn internal_details_are_masked() {
        let resp = ApiResponse::<()>::from(CaptchaError::Internal("db password".into()));
        let json = serde_json::to_value(&resp).expect("serialize");
        assert_eq!(json["error"]["message"], "An internal error occurred");
    }

    #[test]
    fn rate_limited_sets_retry_after_header() {
        let response = ApiResponse::<()>::from(CaptchaError::RateLimited { retry_after: 17 })
            .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "17");
    }

    #[test]
    fn error_code_display_matches_wire_format() {
        for code in [
            ErrorCode::InvalidRequest,
            ErrorCode::PayloadTooLarge,
            ErrorCode::UnprocessableExpression,
            ErrorCode::ServiceUnavailable,
        ] {
            let json = serde_json::to_value(code).expect("serialize");
            assert_eq!(json, code.to_string());
        }
    }
}
