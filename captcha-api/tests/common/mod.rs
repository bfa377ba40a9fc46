#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde_json::Value;
use tower::ServiceExt;

use captcha_api::api::{create_router, AppState};
use captcha_api::config::{
    Config, EngineConfig, ImageConfig, LoggingConfig, RateLimitConfig, ServerConfig,
};
use captcha_api::engine::{RecognitionEngine, SlideMatch};
use captcha_api::error::Result;
use captcha_api::imaging::BoundingBox;

/// Engine returning canned answers.
pub struct StubEngine {
    pub text: String,
    pub boxes: Vec<BoundingBox>,
}

impl StubEngine {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            boxes: Vec::new(),
        }
    }

    pub fn with_boxes(mut self, boxes: Vec<BoundingBox>) -> Self {
        self.boxes = boxes;
        self
    }
}

#[async_trait]
impl RecognitionEngine for StubEngine {
    fn name(&self) -> &str {
        "stub"
    }

    async fn classify_text(&self, _image: &[u8]) -> Result<String> {
        Ok(self.text.clone())
    }

    async fn detect_regions(&self, _image: &[u8]) -> Result<Vec<BoundingBox>> {
        Ok(self.boxes.clone())
    }

    async fn slide_match(
        &self,
        _sliding: &[u8],
        _background: &[u8],
        _simple_target: bool,
    ) -> Result<SlideMatch> {
        Ok(SlideMatch {
            offset: 42,
            confidence: 0.95,
        })
    }

    async fn slide_comparison(&self, _sliding: &[u8], _background: &[u8]) -> Result<i32> {
        Ok(64)
    }
}

/// Configuration independent of the process environment.
pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            api_keys: Vec::new(),
            max_batch_size: 5,
            max_body_size: 1024 * 1024,
        },
        image: ImageConfig::default(),
        rate_limit: RateLimitConfig {
            enabled: false,
            ..RateLimitConfig::default()
        },
        engine: EngineConfig::default(),
        logging: LoggingConfig {
            level: "info".to_string(),
            json: false,
        },
    }
}

pub fn app(config: Config, engine: impl RecognitionEngine + 'static) -> Router {
    let engine: Arc<dyn RecognitionEngine> = Arc::new(engine);
    let state = AppState::new(config, engine).expect("state should build");
    create_router(state)
}

/// Base64 PNG with a vertical gradient so halves are distinguishable.
pub fn png_base64(width: u32, height: u32) -> String {
    let img = RgbImage::from_fn(width, height, |_, y| {
        let v = (y * 255 / height.max(1)) as u8;
        Rgb([v, v, v])
    });
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageFormat::Png)
        .expect("encode png");
    STANDARD.encode(buf.into_inner())
}

pub fn decode_png(b64: &str) -> DynamicImage {
    let bytes = STANDARD.decode(b64).expect("valid base64");
    image::load_from_memory(&bytes).expect("valid png")
}

pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

/// Sends one request through a clone of the router and returns status and JSON body.
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("infallible");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}
