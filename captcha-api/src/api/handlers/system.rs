//! Service info, health and stats handlers. None of these require an API key.

use std::collections::BTreeMap;

use axum::extract::State;
use chrono::Utc;

use crate::api::dto::{HealthStatus, ServiceInfo};
use crate::api::response::ApiResponse;
use crate::api::AppState;
use crate::services::StatsSnapshot;

const SERVICE_NAME: &str = "CAPTCHA Recognition API";

/// Captcha endpoints by stats name.
pub const CAPTCHA_ENDPOINTS: &[(&str, &str)] = &[
    ("batch_classification", "/batch/classification"),
    ("calculate", "/calculate"),
    ("capcode", "/capcode"),
    ("classification", "/classification"),
    ("crop", "/crop"),
    ("detection", "/detection"),
    ("select", "/select"),
    ("slideComparison", "/slideComparison"),
];

/// `GET /`
#[utoipa::path(
    get,
    path = "/",
    tag = "system",
    responses((status = 200, description = "Service information", body = ServiceInfo))
)]
pub async fn service_info(State(state): State<AppState>) -> ApiResponse<ServiceInfo> {
    let mut endpoints: BTreeMap<String, String> = CAPTCHA_ENDPOINTS
        .iter()
        .map(|(name, path)| (name.to_string(), path.to_string()))
        .collect();
    endpoints.insert("health".to_string(), "/health".to_string());
    endpoints.insert("stats".to_string(), "/stats".to_string());

    let engine = state.engine();
    ApiResponse::success(ServiceInfo {
        name: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        docs: "/docs".to_string(),
        engine: engine.name().to_string(),
        engine_available: engine.is_available(),
        auth_enabled: !state.config.server.api_keys.is_empty(),
        allowed_formats: state.config.image.allowed_formats.clone(),
        endpoints,
    })
}

/// `GET /health`
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses((status = 200, description = "Service is up", body = HealthStatus))
)]
pub async fn health_check() -> ApiResponse<HealthStatus> {
    ApiResponse::success(HealthStatus {
        status: "healthy".to_string(),
        timestamp: Utc::now().to_rfc3339(),
        service: SERVICE_NAME.to_string(),
    })
}

/// `GET /stats`
#[utoipa::path(
    get,
    path = "/stats",
    tag = "system",
    responses((status = 200, description = "Uptime and per-endpoint counters", body = StatsSnapshot))
)]
pub async fn stats(State(state): State<AppState>) -> ApiResponse<StatsSnapshot> {
    ApiResponse::success(state.stats.snapshot())
}
