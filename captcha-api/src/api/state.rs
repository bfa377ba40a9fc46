use std::sync::Arc;

use crate::config::Config;
use crate::engine::RecognitionEngine;
use crate::error::Result;
use crate::imaging::ImageResolver;
use crate::services::{CaptchaService, StatsTracker};

use super::ratelimit::RateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub captcha: CaptchaService,
    pub stats: Arc<StatsTracker>,
    pub limiter: RateLimiter,
}

impl AppState {
    pub fn new(config: Config, engine: Arc<dyn RecognitionEngine>) -> Result<Self> {
        let resolver = ImageResolver::new(config.image.resolve_limits(), &config.image.user_agent)?;
        let captcha = CaptchaService::new(resolver, engine);
        let limiter = RateLimiter::new(&config.rate_limit);

        Ok(Self {
            config: Arc::new(config),
            captcha,
            stats: Arc::new(StatsTracker::new()),
            limiter,
        })
    }

    pub fn engine(&self) -> &Arc<dyn RecognitionEngine> {
        self.captcha.engine()
    }
}
