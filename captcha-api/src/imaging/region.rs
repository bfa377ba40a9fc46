use std::borrow::Cow;

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use utoipa::openapi::schema::{ArrayBuilder, KnownFormat, ObjectBuilder, Schema, SchemaFormat, Type};
use utoipa::openapi::RefOr;

use super::preprocessing::encode_png;
use crate::error::{CaptchaError, Result};

/// An axis-aligned box in pixel coordinates, `(x1, y1)` inclusive and
/// `(x2, y2)` exclusive. Serialized as `[x1, y1, x2, y2]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// A box is usable only when it has positive width and height.
    pub fn is_valid(&self) -> bool {
        self.x2 > self.x1 && self.y2 > self.y1
    }

    pub fn width(&self) -> i32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> i32 {
        self.y2.saturating_sub(self.y1)
    }

    /// Integer centre point, rounded towards negative infinity.
    pub fn center(&self) -> (i32, i32) {
        (midpoint(self.x1, self.x2), midpoint(self.y1, self.y2))
    }

    /// Intersect with the `width × height` image area.
    pub fn clamp_to(&self, width: u32, height: u32) -> Self {
        let w = i32::try_from(width).unwrap_or(i32::MAX);
        let h = i32::try_from(height).unwrap_or(i32::MAX);
        Self {
            x1: self.x1.clamp(0, w),
            y1: self.y1.clamp(0, h),
            x2: self.x2.clamp(0, w),
            y2: self.y2.clamp(0, h),
        }
    }
}

/// The mean of two `i32`s always fits back into an `i32`.
fn midpoint(a: i32, b: i32) -> i32 {
    (i64::from(a) + i64::from(b)).div_euclid(2) as i32
}

impl utoipa::PartialSchema for BoundingBox {
    fn schema() -> RefOr<Schema> {
        ArrayBuilder::new()
            .items(
                ObjectBuilder::new()
                    .schema_type(Type::Integer)
                    .format(Some(SchemaFormat::KnownFormat(KnownFormat::Int32))),
            )
            .min_items(Some(4))
            .max_items(Some(4))
            .description(Some("Box corners as [x1, y1, x2, y2]"))
            .into()
    }
}

impl utoipa::ToSchema for BoundingBox {
    fn name() -> Cow<'static, str> {
        Cow::Borrowed("BoundingBox")
    }
}

impl From<[i32; 4]> for BoundingBox {
    fn from([x1, y1, x2, y2]: [i32; 4]) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

impl From<BoundingBox> for [i32; 4] {
    fn from(bbox: BoundingBox) -> Self {
        [bbox.x1, bbox.y1, bbox.x2, bbox.y2]
    }
}

/// Crop `bbox` out of `img` and encode the region as PNG.
///
/// The box is clipped to the image first; a box that is empty after
/// clipping is a validation error.
pub fn crop_region(img: &DynamicImage, bbox: BoundingBox) -> Result<Vec<u8>> {
    let clipped = bbox.clamp_to(img.width(), img.height());
    if !clipped.is_valid() {
        return Err(CaptchaError::Validation(format!(
            "Region {:?} lies outside the {}x{} image",
            <[i32; 4]>::from(bbox),
            img.width(),
            img.height()
        )));
    }

    let region = img.crop_imm(
        clipped.x1 as u32,
        clipped.y1 as u32,
        clipped.width() as u32,
        clipped.height() as u32,
    );
    encode_png(&region)
}
