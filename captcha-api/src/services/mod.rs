mod captcha;
mod stats;

pub use captcha::{
    BatchItem, CalculationResult, CaptchaService, ClassificationResult, ClickTarget,
    CLASSIFICATION_CONFIDENCE,
};
pub use stats::{EndpointStats, StatsSnapshot, StatsTracker};
