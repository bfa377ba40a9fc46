use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tracing::debug;

use crate::engine::{RecognitionEngine, SlideMatch};
use crate::error::{CaptchaError, Result};
use crate::expression::{self, Number};
use crate::imaging::preprocessing::decode_image;
use crate::imaging::region::crop_region;
use crate::imaging::{
    preprocess_image, split_at, BoundingBox, ImageInput, ImageResolver, PreprocessOptions,
    SplitImage,
};

/// Confidence reported for text classification; the engine does not score OCR output.
pub const CLASSIFICATION_CONFIDENCE: f64 = 0.90;

#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct ClassificationResult {
    pub text: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct CalculationResult {
    /// The arithmetic expression after sanitizing the OCR text.
    pub expression: String,
    pub result: Number,
}

#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct ClickTarget {
    pub text: String,
    pub bbox: BoundingBox,
    /// `[x, y]` click point.
    #[schema(value_type = Vec<i32>)]
    pub center: [i32; 2],
}

/// One entry of a batch classification, in request order.
#[derive(Debug)]
pub struct BatchItem {
    pub index: usize,
    pub outcome: Result<ClassificationResult>,
}

/// Runs a CPU-bound closure on the blocking pool.
async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CaptchaError::Internal(format!("Image task panicked: {e}")))?
}

/// Captcha operations built from the resolver, the image helpers and the
/// recognition engine.
#[derive(Clone)]
pub struct CaptchaService {
    resolver: ImageResolver,
    engine: Arc<dyn RecognitionEngine>,
}

impl CaptchaService {
    pub fn new(resolver: ImageResolver, engine: Arc<dyn RecognitionEngine>) -> Self {
        Self { resolver, engine }
    }

    pub fn engine(&self) -> &Arc<dyn RecognitionEngine> {
        &self.engine
    }

    /// Resolve an input and optionally preprocess it.
    async fn load(&self, input: ImageInput, preprocess: Option<PreprocessOptions>) -> Result<Vec<u8>> {
        let bytes = self.resolver.resolve(input).await?;
        match preprocess {
            Some(options) if !options.is_noop() => {
                run_blocking(move || preprocess_image(&bytes, &options)).await
            }
            _ => Ok(bytes),
        }
    }

    pub async fn slide_match(
        &self,
        sliding: ImageInput,
        background: ImageInput,
        simple_target: bool,
        preprocess: Option<PreprocessOptions>,
    ) -> Result<SlideMatch> {
        let (sliding, background) = futures::try_join!(
            self.load(sliding, preprocess),
            self.load(background, preprocess)
        )?;

        let matched = self
            .engine
            .slide_match(&sliding, &background, simple_target)
            .await?;
        debug!(offset = matched.offset, confidence = matched.confidence, "Slider matched");
        Ok(matched)
    }

    pub async fn slide_comparison(&self, sliding: ImageInput, background: ImageInput) -> Result<i32> {
        let (sliding, background) = futures::try_join!(
            self.resolver.resolve(sliding),
            self.resolver.resolve(background)
        )?;
        self.engine.slide_comparison(&sliding, &background).await
    }

    pub async fn classify(
        &self,
        image: ImageInput,
        preprocess: Option<PreprocessOptions>,
    ) -> Result<ClassificationResult> {
        let bytes = self.load(image, preprocess).await?;
        let text = self.engine.classify_text(&bytes).await?;
        Ok(ClassificationResult {
            text,
            confidence: CLASSIFICATION_CONFIDENCE,
        })
    }

    /// Classify every image concurrently. A failing item never fails the
    /// batch; results keep request order.
    pub async fn batch_classify(
        &self,
        images: &[serde_json::Value],
        preprocess: Option<PreprocessOptions>,
    ) -> Vec<BatchItem> {
        let tasks = images.iter().enumerate().map(|(index, value)| async move {
            let outcome = match ImageInput::from_json(value) {
                Ok(input) => self.classify(input, preprocess).await,
                Err(e) => Err(e),
            };
            BatchItem { index, outcome }
        });

        join_all(tasks).await
    }

    pub async fn detect(&self, image: ImageInput) -> Result<Vec<BoundingBox>> {
        let bytes = self.resolver.resolve(image).await?;
        self.engine.detect_regions(&bytes).await
    }

    /// OCR the image and evaluate the arithmetic it shows.
    pub async fn calculate(&self, image: ImageInput) -> Result<CalculationResult> {
        let bytes = self.resolver.resolve(image).await?;
        let text = self.engine.classify_text(&bytes).await?;
        let result = expression::evaluate(&text).inspect_err(|e| {
            if e.is_expression_error() {
                debug!(ocr = %text, error = %e, "Recognized text is not a usable expression");
            }
        })?;
        debug!(ocr = %text, %result, "Evaluated arithmetic captcha");

        Ok(CalculationResult {
            expression: expression::sanitize(&text),
            result,
        })
    }

    /// Split a combined slider image at row `y`.
    pub async fn crop_image(&self, image: ImageInput, y: u32) -> Result<SplitImage> {
        let bytes = self.resolver.resolve(image).await?;
        run_blocking(move || split_at(&bytes, y)).await
    }

    /// Detect targets, read the character inside each one and report where to
    /// click. Degenerate boxes are skipped.
    pub async fn click_select(&self, image: ImageInput) -> Result<Vec<ClickTarget>> {
        let bytes = self.resolver.resolve(image).await?;
        let boxes = self.engine.detect_regions(&bytes).await?;

        let valid: Vec<BoundingBox> = boxes.into_iter().filter(BoundingBox::is_valid).collect();
        if valid.is_empty() {
            return Ok(Vec::new());
        }

        let crops = {
            let boxes = valid.clone();
            run_blocking(move || {
                let img = decode_image(&bytes)?;
                Ok(boxes
                    .into_iter()
                    .map(|bbox| crop_region(&img, bbox).ok())
                    .collect::<Vec<_>>())
            })
            .await?
        };

        let tasks = valid
            .into_iter()
            .zip(crops)
            .filter_map(|(bbox, crop)| {
                if crop.is_none() {
                    debug!(?bbox, "Skipping region outside the image");
                }
                crop.map(|png| (bbox, png))
            })
            .map(|(bbox, png)| async move {
                let text = self.engine.classify_text(&png).await?;
                let (x, y) = bbox.center();
                Ok::<_, CaptchaError>(ClickTarget {
                    text,
                    bbox,
                    center: [x, y],
                })
            });

        join_all(tasks).await.into_iter().collect()
    }
}
