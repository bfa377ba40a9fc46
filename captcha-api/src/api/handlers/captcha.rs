//! Captcha recognition handlers.

use axum::extract::State;

use crate::api::dto::{
    BatchClassificationRequest, BatchClassificationResponse, BatchResultItem,
    ClassificationRequest, CropRequest, CropResponse, DetectionResponse, ImageRequest,
    PreprocessParam, SelectResponse, SlideComparisonRequest, SlideComparisonResponse,
    SlideMatchRequest, SlideMatchResponse,
};
use crate::api::extractors::AppJson;
use crate::api::response::{ApiError, ApiResponse};
use crate::api::AppState;
use crate::error::CaptchaError;
use crate::imaging::{ImageInput, PreprocessOptions};
use crate::services::{CalculationResult, ClassificationResult};

/// `POST /capcode`
#[utoipa::path(
    post,
    path = "/capcode",
    tag = "captcha",
    operation_id = "captcha.slideMatch",
    request_body = SlideMatchRequest,
    responses(
        (status = 200, description = "Gap position", body = SlideMatchResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 413, description = "Image too large", body = ApiError),
    ),
    security(("api_key" = []))
)]
pub async fn slide_match(
    State(state): State<AppState>,
    AppJson(req): AppJson<SlideMatchRequest>,
) -> ApiResponse<SlideMatchResponse> {
    let sliding = match ImageInput::from_json(&req.sliding_image) {
        Ok(input) => input,
        Err(e) => return e.into(),
    };
    let background = match ImageInput::from_json(&req.back_image) {
        Ok(input) => input,
        Err(e) => return e.into(),
    };
    let preprocess = match PreprocessParam::resolve(req.preprocess, PreprocessOptions::enhance())
    {
        Ok(options) => options,
        Err(e) => return e.into(),
    };

    match state
        .captcha
        .slide_match(sliding, background, req.simple_target, preprocess)
        .await
    {
        Ok(matched) => ApiResponse::success(SlideMatchResponse {
            position: matched.offset,
            confidence: matched.confidence,
        }),
        Err(e) => e.into(),
    }
}

/// `POST /slideComparison`
#[utoipa::path(
    post,
    path = "/slideComparison",
    tag = "captcha",
    operation_id = "captcha.slideComparison",
    request_body = SlideComparisonRequest,
    responses(
        (status = 200, description = "Gap position", body = SlideComparisonResponse),
        (status = 400, description = "Invalid request", body = ApiError),
    ),
    security(("api_key" = []))
)]
pub async fn slide_comparison(
    State(state): State<AppState>,
    AppJson(req): AppJson<SlideComparisonRequest>,
) -> ApiResponse<SlideComparisonResponse> {
    let inputs = ImageInput::from_json(&req.sliding_image)
        .and_then(|sliding| Ok((sliding, ImageInput::from_json(&req.back_image)?)));
    let (sliding, background) = match inputs {
        Ok(pair) => pair,
        Err(e) => return e.into(),
    };

    state
        .captcha
        .slide_comparison(sliding, background)
        .await
        .map(|position| SlideComparisonResponse { position })
        .into()
}

/// `POST /classification`
#[utoipa::path(
    post,
    path = "/classification",
    tag = "captcha",
    operation_id = "captcha.classify",
    request_body = ClassificationRequest,
    responses(
        (status = 200, description = "Recognized text", body = ClassificationResult),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 503, description = "Recognition engine unavailable", body = ApiError),
    ),
    security(("api_key" = []))
)]
pub async fn classify(
    State(state): State<AppState>,
    AppJson(req): AppJson<ClassificationRequest>,
) -> ApiResponse<ClassificationResult> {
    let image = match ImageInput::from_json(&req.image) {
        Ok(input) => input,
        Err(e) => return e.into(),
    };
    let preprocess =
        match PreprocessParam::resolve(req.preprocess, PreprocessOptions::enhance_and_denoise()) {
            Ok(options) => options,
            Err(e) => return e.into(),
        };

    state.captcha.classify(image, preprocess).await.into()
}

/// `POST /batch/classification`
#[utoipa::path(
    post,
    path = "/batch/classification",
    tag = "captcha",
    operation_id = "captcha.batchClassify",
    request_body = BatchClassificationRequest,
    responses(
        (status = 200, description = "Per-image results in request order", body = BatchClassificationResponse),
        (status = 400, description = "Empty or oversized batch", body = ApiError),
    ),
    security(("api_key" = []))
)]
pub async fn batch_classify(
    State(state): State<AppState>,
    AppJson(req): AppJson<BatchClassificationRequest>,
) -> ApiResponse<BatchClassificationResponse> {
    let max_batch = state.config.server.max_batch_size;
    if req.images.is_empty() {
        return CaptchaError::Validation("images must not be empty".to_string()).into();
    }
    if req.images.len() > max_batch {
        return CaptchaError::Validation(format!(
            "At most {max_batch} images per batch, got {}",
            req.images.len()
        ))
        .into();
    }

    let preprocess =
        match PreprocessParam::resolve(req.preprocess, PreprocessOptions::enhance_and_denoise()) {
            Ok(options) => options,
            Err(e) => return e.into(),
        };
    let results = state.captcha.batch_classify(&req.images, preprocess).await;

    ApiResponse::success(BatchClassificationResponse {
        total: results.len(),
        results: results.into_iter().map(BatchResultItem::from).collect(),
    })
}

/// `POST /detection`
#[utoipa::path(
    post,
    path = "/detection",
    tag = "captcha",
    operation_id = "captcha.detect",
    request_body = ImageRequest,
    responses(
        (status = 200, description = "Detected regions as [x1, y1, x2, y2]", body = DetectionResponse),
        (status = 400, description = "Invalid request", body = ApiError),
    ),
    security(("api_key" = []))
)]
pub async fn detect(
    State(state): State<AppState>,
    AppJson(req): AppJson<ImageRequest>,
) -> ApiResponse<DetectionResponse> {
    let image = match ImageInput::from_json(&req.image) {
        Ok(input) => input,
        Err(e) => return e.into(),
    };

    state
        .captcha
        .detect(image)
        .await
        .map(|boxes| DetectionResponse { boxes })
        .into()
}

/// `POST /calculate`
#[utoipa::path(
    post,
    path = "/calculate",
    tag = "captcha",
    operation_id = "captcha.calculate",
    request_body = ImageRequest,
    responses(
        (status = 200, description = "Evaluated expression", body = CalculationResult),
        (status = 422, description = "Text is not a supported expression", body = ApiError),
    ),
    security(("api_key" = []))
)]
pub async fn calculate(
    State(state): State<AppState>,
    AppJson(req): AppJson<ImageRequest>,
) -> ApiResponse<CalculationResult> {
    let image = match ImageInput::from_json(&req.image) {
        Ok(input) => input,
        Err(e) => return e.into(),
    };

    state.captcha.calculate(image).await.into()
}

/// `POST /crop`
#[utoipa::path(
    post,
    path = "/crop",
    tag = "captcha",
    operation_id = "captcha.crop",
    request_body = CropRequest,
    responses(
        (status = 200, description = "Upper and lower halves as base64 PNG", body = CropResponse),
        (status = 400, description = "Coordinate outside the image", body = ApiError),
    ),
    security(("api_key" = []))
)]
pub async fn crop(
    State(state): State<AppState>,
    AppJson(req): AppJson<CropRequest>,
) -> ApiResponse<CropResponse> {
    let y = match req.split_row() {
        Ok(y) => y,
        Err(e) => return e.into(),
    };
    let image = match ImageInput::from_json(&req.image) {
        Ok(input) => input,
        Err(e) => return e.into(),
    };

    state
        .captcha
        .crop_image(image, y)
        .await
        .map(CropResponse::from)
        .into()
}

/// `POST /select`
#[utoipa::path(
    post,
    path = "/select",
    tag = "captcha",
    operation_id = "captcha.select",
    request_body = ImageRequest,
    responses(
        (status = 200, description = "Click targets with text and centre point", body = SelectResponse),
        (status = 400, description = "Invalid request", body = ApiError),
    ),
    security(("api_key" = []))
)]
pub async fn select(
    State(state): State<AppState>,
    AppJson(req): AppJson<ImageRequest>,
) -> ApiResponse<SelectResponse> {
    let image = match ImageInput::from_json(&req.image) {
        Ok(input) => input,
        Err(e) => return e.into(),
    };

    state
        .captcha
        .click_select(image)
        .await
        .map(|targets| SelectResponse { targets })
        .into()
}
