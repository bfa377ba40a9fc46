use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{captcha, system};
use super::middleware::{auth_middleware, stats_middleware};
use super::openapi;
use super::ratelimit::rate_limit_middleware;
use super::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let public_routes = Router::new()
        .route("/", get(system::service_info))
        .route("/stats", get(system::stats))
        .route("/apispec.json", get(openapi::openapi_json))
        .merge(openapi::redoc_router());

    // route_layer wraps inside-out: the last one added runs first.
    let protected_routes = Router::new()
        .route("/capcode", post(captcha::slide_match))
        .route("/slideComparison", post(captcha::slide_comparison))
        .route("/classification", post(captcha::classify))
        .route("/batch/classification", post(captcha::batch_classify))
        .route("/detection", post(captcha::detect))
        .route("/calculate", post(captcha::calculate))
        .route("/crop", post(captcha::crop))
        .route("/select", post(captcha::select))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            stats_middleware,
        ))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));

    let max_body_size = state.config.server.max_body_size;

    // Health probes stay out of the request trace.
    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .route("/health", get(system::health_check))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_size))
        .layer(cors)
        .with_state(state)
}
