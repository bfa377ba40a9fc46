use axum::Json;
use utoipa::OpenApi;
use utoipa_redoc::{Redoc, Servable};

use super::dto;
use super::handlers;
use super::middleware::API_KEY_HEADER;
use super::response;
use crate::expression::Number;
use crate::imaging::{BoundingBox, PreprocessOptions};
use crate::services::{
    CalculationResult, ClassificationResult, ClickTarget, EndpointStats, StatsSnapshot,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "CAPTCHA Recognition API",
        description = "Slider, text, arithmetic and click-select captcha recognition over HTTP.",
    ),
    paths(
        handlers::system::service_info,
        handlers::system::health_check,
        handlers::system::stats,
        handlers::captcha::slide_match,
        handlers::captcha::slide_comparison,
        handlers::captcha::classify,
        handlers::captcha::batch_classify,
        handlers::captcha::detect,
        handlers::captcha::calculate,
        handlers::captcha::crop,
        handlers::captcha::select,
    ),
    components(schemas(
        response::ErrorCode,
        response::ApiError,
        PreprocessOptions,
        BoundingBox,
        Number,
        dto::PreprocessParam,
        dto::SlideMatchRequest,
        dto::SlideComparisonRequest,
        dto::ClassificationRequest,
        dto::BatchClassificationRequest,
        dto::ImageRequest,
        dto::CropRequest,
        dto::SlideMatchResponse,
        dto::SlideComparisonResponse,
        dto::BatchResultItem,
        dto::BatchClassificationResponse,
        dto::DetectionResponse,
        dto::CropResponse,
        dto::SelectResponse,
        dto::ServiceInfo,
        dto::HealthStatus,
        ClassificationResult,
        CalculationResult,
        ClickTarget,
        EndpointStats,
        StatsSnapshot,
    )),
    tags(
        (name = "captcha", description = "Captcha recognition (API key required when keys are configured)"),
        (name = "system", description = "Service info, health and stats"),
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_key",
            utoipa::openapi::security::SecurityScheme::ApiKey(
                utoipa::openapi::security::ApiKey::Header(
                    utoipa::openapi::security::ApiKeyValue::new(API_KEY_HEADER),
                ),
            ),
        );
    }
}

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn redoc_router<S: Clone + Send + Sync + 'static>() -> axum::Router<S> {
    Redoc::with_url("/docs", ApiDoc::openapi()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_every_endpoint() {
        let doc = ApiDoc::openapi();
        for path in [
            "/",
            "/health",
            "/stats",
            "/capcode",
            "/slideComparison",
            "/classification",
            "/batch/classification",
            "/detection",
            "/calculate",
            "/crop",
            "/select",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn test_api_key_scheme_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("api_key"));
    }

    #[test]
    fn test_boxes_documented_as_coordinate_arrays() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        let schemas = &doc["components"]["schemas"];
        assert_eq!(schemas["BoundingBox"]["type"], "array");
        assert_eq!(
            schemas["DetectionResponse"]["properties"]["boxes"]["items"]["$ref"],
            "#/components/schemas/BoundingBox"
        );
    }
}
