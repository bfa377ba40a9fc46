use std::collections::BTreeMap;

use serde::Serialize;

/// Body of `GET /`.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub docs: String,
    pub engine: String,
    pub engine_available: bool,
    pub auth_enabled: bool,
    pub allowed_formats: Vec<String>,
    /// Endpoint name → path.
    pub endpoints: BTreeMap<String, String>,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct HealthStatus {
    pub status: String,
    /// RFC 3339 timestamp.
    pub timestamp: String,
    pub service: String,
}
