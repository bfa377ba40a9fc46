//! Per-endpoint, per-client rate limiting.
//!
//! Each endpoint budget is a keyed GCRA limiter from `governor`, keyed by
//! client. A budget of `n per period` allows a burst of `n` and replenishes
//! one request every `period / n`. Idle clients are pruned with
//! `retain_recent` once an endpoint tracks more than the configured
//! capacity.

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, MatchedPath, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::{Clock, DefaultClock},
    middleware::NoOpMiddleware,
    state::keyed::DefaultKeyedStateStore,
    Quota,
};

use crate::api::state::AppState;
use crate::config::{RateLimit, RateLimitConfig};
use crate::error::CaptchaError;

use super::response::ApiResponse;

/// Budgets for endpoints that do not follow the default limit.
const ENDPOINT_LIMITS: &[(&str, RateLimit)] = &[
    ("classification", RateLimit::per_minute(50)),
    ("batch_classification", RateLimit::per_minute(10)),
];

type KeyedLimiter<C> = governor::RateLimiter<
    String,
    DefaultKeyedStateStore<String>,
    C,
    NoOpMiddleware<<C as Clock>::Instant>,
>;

struct Budget<C: Clock> {
    limit: RateLimit,
    limiter: KeyedLimiter<C>,
}

impl<C: Clock + Clone> Budget<C> {
    fn new(limit: RateLimit, clock: &C) -> Self {
        Self {
            limit,
            limiter: governor::RateLimiter::new(
                quota(limit),
                DefaultKeyedStateStore::default(),
                clock.clone(),
            ),
        }
    }
}

/// Burst of `requests`, one request replenished every `period / requests`.
fn quota(limit: RateLimit) -> Quota {
    let burst = NonZeroU32::new(limit.requests).unwrap_or(NonZeroU32::MIN);
    let interval = limit.period / burst.get();
    Quota::with_period(interval)
        .unwrap_or_else(|| Quota::per_second(NonZeroU32::MAX))
        .allow_burst(burst)
}

/// Whole seconds, rounded up and never below one.
fn retry_after_secs(wait: Duration) -> u64 {
    let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
    secs.max(1)
}

#[derive(Clone)]
pub struct RateLimiter<C: Clock = DefaultClock> {
    endpoints: Arc<Vec<(&'static str, Budget<C>)>>,
    fallback: Arc<Budget<C>>,
    clock: C,
    capacity: usize,
    trust_proxy_headers: bool,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self::with_clock(config, DefaultClock::default())
    }
}

impl<C: Clock + Clone> RateLimiter<C> {
    pub fn with_clock(config: &RateLimitConfig, clock: C) -> Self {
        let endpoints = ENDPOINT_LIMITS
            .iter()
            .map(|(name, limit)| (*name, Budget::new(*limit, &clock)))
            .collect();
        Self {
            endpoints: Arc::new(endpoints),
            fallback: Arc::new(Budget::new(config.default_limit, &clock)),
            clock,
            capacity: config.capacity.max(1),
            trust_proxy_headers: config.trust_proxy_headers,
        }
    }

    fn budget(&self, endpoint: &str) -> &Budget<C> {
        self.endpoints
            .iter()
            .find(|(name, _)| *name == endpoint)
            .map(|(_, budget)| budget)
            .unwrap_or(&self.fallback)
    }

    pub fn limit_for(&self, endpoint: &str) -> RateLimit {
        self.budget(endpoint).limit
    }

    /// Spend one request of `client`'s budget on `endpoint`. Returns the
    /// seconds until the next request would be admitted when none is left.
    pub fn check(&self, endpoint: &str, client: &str) -> Result<(), u64> {
        let budget = self.budget(endpoint);
        let key = client.to_string();

        if let Err(not_until) = budget.limiter.check_key(&key) {
            let wait = not_until.wait_time_from(self.clock.now());
            return Err(retry_after_secs(wait));
        }

        if budget.limiter.len() > self.capacity {
            budget.limiter.retain_recent();
            budget.limiter.shrink_to_fit();
        }
        Ok(())
    }

    /// Number of clients currently tracked for `endpoint`.
    pub fn tracked_clients(&self, endpoint: &str) -> usize {
        self.budget(endpoint).limiter.len()
    }

    /// Client identity: the first `X-Forwarded-For` hop when proxies are
    /// trusted, otherwise the peer address.
    pub fn client_key(&self, request: &Request<Body>) -> String {
        if self.trust_proxy_headers {
            let forwarded = request
                .headers()
                .get("x-forwarded-for")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.split(',').next())
                .map(str::trim)
                .filter(|hop| !hop.is_empty());
            if let Some(hop) = forwarded {
                return hop.to_string();
            }
        }

        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Stable endpoint name for a matched route, e.g. `/batch/classification`
/// becomes `batch_classification`.
pub fn endpoint_name(request: &Request<Body>) -> String {
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    path.trim_matches('/').replace('/', "_")
}

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.config.rate_limit.enabled {
        return next.run(request).await;
    }

    let endpoint = endpoint_name(&request);
    let client = state.limiter.client_key(&request);

    match state.limiter.check(&endpoint, &client) {
        Ok(()) => next.run(request).await,
        Err(retry_after) => {
            let limit = state.limiter.limit_for(&endpoint);
            tracing::warn!(%endpoint, %client, %limit, retry_after, "Rate limit exceeded");
            ApiResponse::<()>::from(CaptchaError::RateLimited { retry_after }).into_response()
        }
    }
}
