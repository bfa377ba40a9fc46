use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::preprocessing::{decode_image, encode_png};
use crate::error::{CaptchaError, Result};

/// The two halves of a combined slider image, each a base64 PNG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitImage {
    /// Rows `[0, y)`: the sliding piece.
    pub top: String,
    /// Rows `[y, height)`: the background.
    pub bottom: String,
}

/// Split an image horizontally at row `y`.
///
/// `y` must lie strictly inside the image so that neither half is empty.
pub fn split_at(bytes: &[u8], y: u32) -> Result<SplitImage> {
    let img = decode_image(bytes)?;
    let (width, height) = (img.width(), img.height());

    if y == 0 || y >= height {
        return Err(CaptchaError::Validation(format!(
            "Split row must satisfy 0 < y < {height}, got {y}"
        )));
    }

    let top = img.crop_imm(0, 0, width, y);
    let bottom = img.crop_imm(0, y, width, height - y);

    Ok(SplitImage {
        top: STANDARD.encode(encode_png(&top)?),
        bottom: STANDARD.encode(encode_png(&bottom)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GenericImageView, ImageFormat, Rgb, RgbImage};

    fn striped_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |_, y| Rgb([y as u8, 0, 0]));
        let mut output = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut std::io::Cursor::new(&mut output), ImageFormat::Png)
            .unwrap();
        output
    }

    fn decode_half(b64: &str) -> DynamicImage {
        image::load_from_memory(&STANDARD.decode(b64).unwrap()).unwrap()
    }

    #[test]
    fn test_split_heights_and_content() {
        let split = split_at(&striped_png(30, 100), 40).unwrap();

        let top = decode_half(&split.top);
        let bottom = decode_half(&split.bottom);
        assert_eq!(top.dimensions(), (30, 40));
        assert_eq!(bottom.dimensions(), (30, 60));
        assert_eq!(top.to_rgb8().get_pixel(0, 39), &Rgb([39, 0, 0]));
        assert_eq!(bottom.to_rgb8().get_pixel(0, 0), &Rgb([40, 0, 0]));
    }

    #[test]
    fn test_split_row_bounds() {
        let png = striped_png(10, 20);
        assert!(split_at(&png, 1).is_ok());
        assert!(split_at(&png, 19).is_ok());
        assert!(matches!(split_at(&png, 0), Err(CaptchaError::Validation(_))));
        assert!(matches!(split_at(&png, 20), Err(CaptchaError::Validation(_))));
        assert!(matches!(split_at(&png, 500), Err(CaptchaError::Validation(_))));
    }

    #[test]
    fn test_split_rejects_undecodable_input() {
        assert!(matches!(
            split_at(b"definitely not an image", 5),
            Err(CaptchaError::DecodeFailed(_))
        ));
    }
}
