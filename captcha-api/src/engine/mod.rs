//! Recognition engine capability.
//!
//! OCR and detection models are not part of this crate. Everything that needs
//! them goes through [`RecognitionEngine`], so the service can run against a
//! remote inference server, an in-process implementation or a test stub.

pub mod api;
pub mod provider;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;
use crate::imaging::BoundingBox;

pub use provider::EngineProvider;

/// Confidence reported when the engine does not return one.
pub const DEFAULT_SLIDE_CONFIDENCE: f64 = 0.95;

/// Outcome of matching a slider piece against its background.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SlideMatch {
    /// Horizontal offset of the piece's left edge in the background.
    pub offset: i32,
    pub confidence: f64,
}

#[async_trait]
pub trait RecognitionEngine: Send + Sync {
    /// Backend name for logs and the info endpoint.
    fn name(&self) -> &str;

    fn is_available(&self) -> bool {
        true
    }

    /// Read the text in a captcha image.
    async fn classify_text(&self, image: &[u8]) -> Result<String>;

    /// Locate clickable targets.
    async fn detect_regions(&self, image: &[u8]) -> Result<Vec<BoundingBox>>;

    /// Find the slider piece inside the background image.
    async fn slide_match(
        &self,
        sliding: &[u8],
        background: &[u8],
        simple_target: bool,
    ) -> Result<SlideMatch>;

    /// Find the gap by comparing the background with and without the piece.
    async fn slide_comparison(&self, sliding: &[u8], background: &[u8]) -> Result<i32>;
}
