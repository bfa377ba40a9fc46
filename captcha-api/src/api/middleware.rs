//! # API Key Authentication & Request Stats
//!
//! Captcha routes are wrapped, outermost first, by the rate limiter,
//! [`stats_middleware`] and [`auth_middleware`]. Stats therefore count auth
//! rejections but not rate-limited requests.

use std::collections::HashMap;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{Query, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::api::state::AppState;
use crate::error::CaptchaError;

use super::ratelimit::endpoint_name;
use super::response::ApiResponse;

pub const API_KEY_HEADER: &str = "x-api-key";
const API_KEY_QUERY_PARAM: &str = "api_key";

/// The API key from the `X-API-Key` header, falling back to the `api_key`
/// query parameter.
fn extract_api_key(request: &Request<Body>) -> Option<String> {
    let from_header = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|key| !key.is_empty());
    if let Some(key) = from_header {
        return Some(key.to_string());
    }

    let Query(mut params) = Query::<HashMap<String, String>>::try_from_uri(request.uri()).ok()?;
    params
        .remove(API_KEY_QUERY_PARAM)
        .filter(|key| !key.is_empty())
}

/// Axum middleware enforcing API-key authentication on captcha routes.
///
/// # Behavior
///
/// - No keys configured → authentication is disabled, every request passes.
/// - Key missing from both header and query → 401 `unauthorized`.
/// - Key not in the configured list → 403 `forbidden`.
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let keys = &state.config.server.api_keys;
    if keys.is_empty() {
        return next.run(request).await;
    }

    let error = match extract_api_key(&request) {
        Some(key) if keys.iter().any(|k| *k == key) => return next.run(request).await,
        Some(_) => CaptchaError::Forbidden("Invalid API key".to_string()),
        None => CaptchaError::Unauthorized(
            "Missing API key. Provide it via the X-API-Key header or the api_key query parameter"
                .to_string(),
        ),
    };

    ApiResponse::<()>::from(error).into_response()
}

/// Records outcome and latency of every request that reaches it.
pub async fn stats_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let endpoint = endpoint_name(&request);
    let started = Instant::now();

    let response = next.run(request).await;

    let success = response.status().is_success();
    state.stats.record(&endpoint, success, started.elapsed());
    response
}
