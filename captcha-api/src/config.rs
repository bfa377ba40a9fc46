use serde::Deserialize;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::imaging::ResolveLimits;

pub const DEFAULT_MAX_IMAGE_SIZE: usize = 5 * 1024 * 1024;
/// Upper bound for `ENGINE_MAX_RETRIES`.
pub const MAX_ENGINE_RETRIES: u32 = 10;
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

fn parse_env_or<T: FromStr>(var: &str, default: T) -> T
where
    T::Err: fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

fn parse_env_list(var: &str) -> Option<Vec<String>> {
    env::var(var).ok().map(|val| {
        val.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub image: ImageConfig,
    pub rate_limit: RateLimitConfig,
    pub engine: EngineConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Accepted API keys. Empty disables authentication.
    pub api_keys: Vec<String>,
    pub max_batch_size: usize,
    pub max_body_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageConfig {
    pub max_image_size: usize,
    pub fetch_timeout_secs: u64,
    pub user_agent: String,
    /// Informational; unsupported formats fail naturally at decode time.
    pub allowed_formats: Vec<String>,
}

impl ImageConfig {
    pub fn resolve_limits(&self) -> ResolveLimits {
        ResolveLimits {
            max_size: self.max_image_size,
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_image_size: DEFAULT_MAX_IMAGE_SIZE,
            fetch_timeout_secs: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            allowed_formats: ["JPEG", "PNG", "BMP", "GIF", "WEBP"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Limit shared by every captcha endpoint without a dedicated one.
    pub default_limit: RateLimit,
    /// Clients tracked per endpoint before idle ones are pruned.
    pub capacity: usize,
    /// Key clients by the first `X-Forwarded-For` hop instead of the peer address.
    pub trust_proxy_headers: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_limit: RateLimit::per_minute(30),
            capacity: 10_000,
            trust_proxy_headers: false,
        }
    }
}

/// Recognition engine backend configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Base URL of the inference service. `None` leaves the engine unavailable.
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            timeout_secs: 30,
            max_retries: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

/// A request budget: at most `requests` per `period`.
///
/// Parses the `"<n> per <unit>"` and `"<n>/<unit>"` notations, e.g.
/// `"30 per minute"` or `"200/day"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RateLimit {
    pub requests: u32,
    pub period: Duration,
}

impl RateLimit {
    pub const fn new(requests: u32, period: Duration) -> Self {
        Self { requests, period }
    }

    pub const fn per_minute(requests: u32) -> Self {
        Self::new(requests, Duration::from_secs(60))
    }
}

impl FromStr for RateLimit {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        let (count, unit) = if let Some((count, unit)) = normalized.split_once('/') {
            (count.trim(), unit.trim())
        } else if let Some((count, unit)) = normalized.split_once(" per ") {
            (count.trim(), unit.trim())
        } else {
            return Err(format!("expected '<n> per <unit>', got '{s}'"));
        };

        let requests: u32 = count
            .parse()
            .map_err(|e| format!("invalid request count '{count}': {e}"))?;
        if requests == 0 {
            return Err("request count must be positive".to_string());
        }

        let secs = match unit.trim_end_matches('s') {
            "second" | "sec" => 1,
            "minute" | "min" => 60,
            "hour" => 3600,
            "day" => 86_400,
            other => return Err(format!("unknown rate limit unit '{other}'")),
        };

        Ok(Self::new(requests, Duration::from_secs(secs)))
    }
}

impl fmt::Display for RateLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = match self.period.as_secs() {
            1 => "second",
            60 => "minute",
            3600 => "hour",
            86_400 => "day",
            secs => return write!(f, "{} per {}s", self.requests, secs),
        };
        write!(f, "{} per {}", self.requests, unit)
    }
}

impl Default for Config {
    fn default() -> Self {
        let image_defaults = ImageConfig::default();
        let rate_defaults = RateLimitConfig::default();
        let engine_defaults = EngineConfig::default();

        Self {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "::".to_string()),
                port: parse_env_or("PORT", 7777),
                api_keys: parse_env_list("API_KEYS").unwrap_or_default(),
                max_batch_size: parse_env_or("MAX_BATCH_SIZE", 20),
                max_body_size: parse_env_or("MAX_BODY_SIZE", 32 * 1024 * 1024),
            },
            image: ImageConfig {
                max_image_size: parse_env_or("MAX_IMAGE_SIZE", image_defaults.max_image_size),
                fetch_timeout_secs: parse_env_or(
                    "FETCH_TIMEOUT",
                    image_defaults.fetch_timeout_secs,
                ),
                user_agent: env::var("FETCH_USER_AGENT").unwrap_or(image_defaults.user_agent),
                allowed_formats: parse_env_list("ALLOWED_IMAGE_FORMATS")
                    .filter(|formats| !formats.is_empty())
                    .unwrap_or(image_defaults.allowed_formats),
            },
            rate_limit: RateLimitConfig {
                enabled: parse_env_or("RATE_LIMIT_ENABLED", rate_defaults.enabled),
                default_limit: parse_env_or("DEFAULT_RATE_LIMIT", rate_defaults.default_limit),
                capacity: parse_env_or("RATE_LIMIT_CAPACITY", rate_defaults.capacity),
                trust_proxy_headers: parse_env_or(
                    "TRUST_PROXY_HEADERS",
                    rate_defaults.trust_proxy_headers,
                ),
            },
            engine: EngineConfig {
                url: env::var("ENGINE_URL").ok().filter(|url| !url.trim().is_empty()),
                api_key: env::var("ENGINE_API_KEY").ok(),
                timeout_secs: parse_env_or("ENGINE_TIMEOUT", engine_defaults.timeout_secs),
                max_retries: parse_env_or("ENGINE_MAX_RETRIES", engine_defaults.max_retries)
                    .min(MAX_ENGINE_RETRIES),
            },
            logging: LoggingConfig {
                level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
                json: env::var("LOG_FORMAT")
                    .map(|format| format.eq_ignore_ascii_case("json"))
                    .unwrap_or(false),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}
