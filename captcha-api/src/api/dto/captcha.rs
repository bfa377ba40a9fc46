use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::response::ApiError;
use crate::error::{CaptchaError, Result};
use crate::imaging::{BoundingBox, PreprocessOptions, SplitImage};
use crate::services::{BatchItem, ClassificationResult, ClickTarget};

/// `preprocess` accepts either a boolean, which selects the endpoint's preset,
/// or an object with explicit flags.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, utoipa::ToSchema)]
#[serde(untagged)]
pub enum PreprocessParam {
    Enabled(bool),
    Custom(PreprocessOptions),
}

impl PreprocessParam {
    /// The options to run, if any. Explicit options are range-checked.
    pub fn resolve(
        param: Option<Self>,
        preset: PreprocessOptions,
    ) -> Result<Option<PreprocessOptions>> {
        match param {
            Some(PreprocessParam::Enabled(true)) => Ok(Some(preset)),
            Some(PreprocessParam::Custom(options)) => {
                options.validate()?;
                Ok(Some(options))
            }
            Some(PreprocessParam::Enabled(false)) | None => Ok(None),
        }
    }
}

fn default_simple_target() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Request DTOs
// ---------------------------------------------------------------------------

/// Request body for `POST /capcode`.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SlideMatchRequest {
    /// Slider piece, base64 or URL.
    #[schema(value_type = String)]
    pub sliding_image: Value,
    /// Background image, base64 or URL.
    #[schema(value_type = String)]
    pub back_image: Value,
    #[serde(default = "default_simple_target")]
    pub simple_target: bool,
    pub preprocess: Option<PreprocessParam>,
}

/// Request body for `POST /slideComparison`.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SlideComparisonRequest {
    /// Background with the piece in place.
    #[schema(value_type = String)]
    pub sliding_image: Value,
    /// Background without the piece.
    #[schema(value_type = String)]
    pub back_image: Value,
}

/// Request body for `POST /classification`.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct ClassificationRequest {
    #[schema(value_type = String)]
    pub image: Value,
    pub preprocess: Option<PreprocessParam>,
}

/// Request body for `POST /batch/classification`.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct BatchClassificationRequest {
    #[schema(value_type = Vec<String>)]
    pub images: Vec<Value>,
    pub preprocess: Option<PreprocessParam>,
}

/// Request body for `POST /detection`, `POST /calculate` and `POST /select`.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct ImageRequest {
    #[schema(value_type = String)]
    pub image: Value,
}

/// Request body for `POST /crop`.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct CropRequest {
    #[schema(value_type = String)]
    pub image: Value,
    /// Row at which the image is split; must lie strictly inside the image.
    /// Fractional values are truncated toward zero.
    pub y_coordinate: f64,
}

impl CropRequest {
    /// The split row as a pixel index.
    pub fn split_row(&self) -> Result<u32> {
        let y = self.y_coordinate.trunc();
        if !y.is_finite() || y < 1.0 || y > f64::from(u32::MAX) {
            return Err(CaptchaError::Validation(format!(
                "y_coordinate must be a positive number, got {}",
                self.y_coordinate
            )));
        }
        Ok(y as u32)
    }
}

// ---------------------------------------------------------------------------
// Response DTOs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct SlideMatchResponse {
    /// Horizontal offset of the gap.
    pub position: i32,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct SlideComparisonResponse {
    pub position: i32,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct BatchResultItem {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ClassificationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl From<BatchItem> for BatchResultItem {
    fn from(item: BatchItem) -> Self {
        match item.outcome {
            Ok(result) => Self {
                index: item.index,
                result: Some(result),
                error: None,
            },
            Err(e) => Self {
                index: item.index,
                result: None,
                error: Some(ApiError::from(e)),
            },
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct BatchClassificationResponse {
    pub results: Vec<BatchResultItem>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct DetectionResponse {
    pub boxes: Vec<BoundingBox>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CropResponse {
    /// Upper part as base64 PNG.
    pub sliding_image: String,
    /// Lower part as base64 PNG.
    pub back_image: String,
}

impl From<SplitImage> for CropResponse {
    fn from(split: SplitImage) -> Self {
        Self {
            sliding_image: split.top,
            back_image: split.bottom,
        }
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct SelectResponse {
    pub targets: Vec<ClickTarget>,
}
