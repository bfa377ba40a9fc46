use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::{CaptchaError, Result};
use crate::imaging::BoundingBox;

use super::{SlideMatch, DEFAULT_SLIDE_CONFIDENCE};

const MAX_RETRY_DELAY: Duration = Duration::from_secs(10);

/// HTTP client for a remote inference server.
#[derive(Clone, Debug)]
pub struct RemoteEngineClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    max_retries: u32,
}

#[derive(Debug, Serialize)]
struct ImageRequest {
    image: String,
}

#[derive(Debug, Serialize)]
struct SlideMatchRequest {
    target: String,
    background: String,
    simple_target: bool,
}

#[derive(Debug, Serialize)]
struct SlideComparisonRequest {
    target: String,
    background: String,
}

#[derive(Debug, Deserialize)]
struct OcrResponse {
    text: String,
}

#[derive(Debug, Deserialize)]
struct DetectionResponse {
    bboxes: Vec<BoundingBox>,
}

#[derive(Debug, Deserialize)]
struct SlideMatchResponse {
    target: Vec<i32>,
    confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct SlideComparisonResponse {
    target: Vec<i32>,
}

impl RemoteEngineClient {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let base_url = config
            .url
            .clone()
            .ok_or_else(|| CaptchaError::Engine("Engine URL not configured".to_string()))?
            .trim_end_matches('/')
            .to_string();

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CaptchaError::Engine(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
            max_retries: config.max_retries,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn ocr(&self, image: &[u8]) -> Result<String> {
        let request = ImageRequest {
            image: STANDARD.encode(image),
        };
        let response: OcrResponse = self.post_json("ocr", &request).await?;
        Ok(response.text.trim().to_string())
    }

    pub async fn detect(&self, image: &[u8]) -> Result<Vec<BoundingBox>> {
        let request = ImageRequest {
            image: STANDARD.encode(image),
        };
        let response: DetectionResponse = self.post_json("det", &request).await?;
        Ok(response.bboxes)
    }

    pub async fn slide_match(
        &self,
        sliding: &[u8],
        background: &[u8],
        simple_target: bool,
    ) -> Result<SlideMatch> {
        let request = SlideMatchRequest {
            target: STANDARD.encode(sliding),
            background: STANDARD.encode(background),
            simple_target,
        };
        let response: SlideMatchResponse = self.post_json("slide_match", &request).await?;
        let offset = first_coordinate(&response.target, "slide_match")?;

        Ok(SlideMatch {
            offset,
            confidence: response.confidence.unwrap_or(DEFAULT_SLIDE_CONFIDENCE),
        })
    }

    pub async fn slide_comparison(&self, sliding: &[u8], background: &[u8]) -> Result<i32> {
        let request = SlideComparisonRequest {
            target: STANDARD.encode(sliding),
            background: STANDARD.encode(background),
        };
        let response: SlideComparisonResponse =
            self.post_json("slide_comparison", &request).await?;
        first_coordinate(&response.target, "slide_comparison")
    }

    /// POST `request` to `{base_url}/{path}`. Rate limiting (429), server
    /// errors and transport failures are retried with exponential delay.
    async fn post_json<Req, Resp>(&self, path: &str, request: &Req) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, path);
        let mut retries = 0;

        loop {
            let mut builder = self.client.post(&url).json(request);
            if let Some(api_key) = &self.api_key {
                builder = builder.bearer_auth(api_key);
            }

            match builder.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return resp.json::<Resp>().await.map_err(|e| {
                            CaptchaError::Engine(format!("Failed to parse {path} response: {e}"))
                        });
                    } else if status.as_u16() == 429 || status.is_server_error() {
                        if retries >= self.max_retries {
                            return Err(CaptchaError::Engine(format!(
                                "Engine request to {path} failed after {retries} retries: {status}"
                            )));
                        }
                    } else {
                        let body = resp.text().await.unwrap_or_default();
                        return Err(CaptchaError::Engine(format!(
                            "Engine request to {path} failed: {status} - {body}"
                        )));
                    }
                }
                Err(e) => {
                    if retries >= self.max_retries {
                        return Err(CaptchaError::Engine(format!(
                            "Engine request to {path} failed after {retries} retries: {e}"
                        )));
                    }
                }
            }

            retries += 1;
            let delay = retry_delay(retries);
            debug!(path, retries, ?delay, "Retrying engine request");
            tokio::time::sleep(delay).await;
        }
    }
}

/// 200 ms, 400 ms, 800 ms, ... capped at [`MAX_RETRY_DELAY`].
fn retry_delay(retries: u32) -> Duration {
    let millis = 100_u64.saturating_mul(2_u64.saturating_pow(retries));
    Duration::from_millis(millis).min(MAX_RETRY_DELAY)
}

fn first_coordinate(target: &[i32], operation: &str) -> Result<i32> {
    target
        .first()
        .copied()
        .ok_or_else(|| CaptchaError::Engine(format!("Empty target in {operation} response")))
}
