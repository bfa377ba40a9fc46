use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::error::{CaptchaError, Result};
use crate::imaging::BoundingBox;

use super::api::RemoteEngineClient;
use super::{RecognitionEngine, SlideMatch};

#[derive(Clone)]
enum EngineBackend {
    Remote { client: RemoteEngineClient },
    Unavailable { reason: String },
}

/// Engine selected from configuration.
///
/// With `ENGINE_URL` set, calls go to the remote inference server; otherwise
/// every call fails with [`CaptchaError::EngineUnavailable`] and the rest of
/// the service keeps working.
#[derive(Clone)]
pub struct EngineProvider {
    backend: EngineBackend,
    timeout: Duration,
}

impl EngineProvider {
    pub fn new(config: &EngineConfig) -> Self {
        let backend = match &config.url {
            Some(url) => match RemoteEngineClient::new(config) {
                Ok(client) => {
                    info!(url = %url, "Remote recognition engine initialized");
                    EngineBackend::Remote { client }
                }
                Err(e) => {
                    let reason = format!("Remote engine unavailable: {e}");
                    warn!("{}", reason);
                    EngineBackend::Unavailable { reason }
                }
            },
            None => {
                let reason = "No recognition engine configured (set ENGINE_URL)".to_string();
                warn!("{}", reason);
                EngineBackend::Unavailable { reason }
            }
        };

        Self {
            backend,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            backend: EngineBackend::Unavailable {
                reason: reason.into(),
            },
            timeout: Duration::from_secs(EngineConfig::default().timeout_secs),
        }
    }

    fn remote(&self) -> Result<&RemoteEngineClient> {
        match &self.backend {
            EngineBackend::Remote { client } => Ok(client),
            EngineBackend::Unavailable { reason } => {
                Err(CaptchaError::EngineUnavailable(reason.clone()))
            }
        }
    }

    async fn with_timeout<T>(
        &self,
        operation: &str,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(inner_result) => inner_result,
            Err(_) => Err(CaptchaError::Engine(format!(
                "{operation} timed out after {} seconds",
                self.timeout.as_secs()
            ))),
        }
    }
}

#[async_trait]
impl RecognitionEngine for EngineProvider {
    fn name(&self) -> &str {
        match self.backend {
            EngineBackend::Remote { .. } => "remote",
            EngineBackend::Unavailable { .. } => "unavailable",
        }
    }

    fn is_available(&self) -> bool {
        !matches!(self.backend, EngineBackend::Unavailable { .. })
    }

    async fn classify_text(&self, image: &[u8]) -> Result<String> {
        let client = self.remote()?;
        self.with_timeout("Text classification", client.ocr(image))
            .await
    }

    async fn detect_regions(&self, image: &[u8]) -> Result<Vec<BoundingBox>> {
        let client = self.remote()?;
        self.with_timeout("Detection", client.detect(image)).await
    }

    async fn slide_match(
        &self,
        sliding: &[u8],
        background: &[u8],
        simple_target: bool,
    ) -> Result<SlideMatch> {
        let client = self.remote()?;
        self.with_timeout(
            "Slide match",
            client.slide_match(sliding, background, simple_target),
        )
        .await
    }

    async fn slide_comparison(&self, sliding: &[u8], background: &[u8]) -> Result<i32> {
        let client = self.remote()?;
        self.with_timeout(
            "Slide comparison",
            client.slide_comparison(sliding, background),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_unconfigured_engine_is_unavailable() {
        let provider = EngineProvider::new(&EngineConfig::default());
        assert!(!provider.is_available());
        assert_eq!(provider.name(), "unavailable");

        let result = provider.classify_text(b"img").await;
        assert!(matches!(result, Err(CaptchaError::EngineUnavailable(_))));
        let result = provider.slide_comparison(b"a", b"b").await;
        assert!(matches!(result, Err(CaptchaError::EngineUnavailable(_))));
    }

    #[tokio::test]
    async fn test_remote_engine_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ocr"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "x7k2"})))
            .mount(&server)
            .await;

        let provider = EngineProvider::new(&EngineConfig {
            url: Some(server.uri()),
            ..EngineConfig::default()
        });
        assert!(provider.is_available());
        assert_eq!(provider.name(), "remote");
        assert_eq!(provider.classify_text(b"img").await.unwrap(), "x7k2");
    }

    #[tokio::test]
    async fn test_slow_engine_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/det"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"bboxes": []}))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let provider = EngineProvider::new(&EngineConfig {
            url: Some(server.uri()),
            timeout_secs: 1,
            max_retries: 0,
            ..EngineConfig::default()
        });

        let err = provider.detect_regions(b"img").await.unwrap_err();
        assert!(matches!(err, CaptchaError::Engine(_)));
    }
}
