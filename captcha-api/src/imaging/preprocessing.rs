use image::{DynamicImage, GrayImage, ImageFormat, ImageReader, Luma, Rgb, RgbImage};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{CaptchaError, Result};

/// Pixel-neighbour visits allowed for one denoise pass.
const MAX_DENOISE_WORK: u64 = 200_000_000;

/// Upper bounds for client-supplied parameters.
pub const MAX_ENHANCE_FACTOR: f32 = 10.0;
pub const MAX_DENOISE_STRENGTH: f32 = 100.0;
pub const MAX_DENOISE_WINDOW: u32 = 31;
pub const MAX_THRESHOLD_BLOCK_SIZE: u32 = 255;

/// Which enhancement steps to run and how strongly.
///
/// Steps always execute in the order contrast → sharpness → denoise →
/// binarize, whichever subset is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, utoipa::ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct PreprocessOptions {
    pub enhance_contrast: bool,
    pub enhance_sharpness: bool,
    pub denoise: bool,
    pub binarize: bool,
    pub contrast_factor: f32,
    pub sharpness_factor: f32,
    /// Filter strength, comparable to the `h` parameter of non-local means.
    pub denoise_strength: f32,
    /// Side of the square neighbourhood, odd.
    pub denoise_window: u32,
    /// Side of the thresholding neighbourhood, odd and at least 3.
    pub threshold_block_size: u32,
    /// Subtracted from the local mean before comparing.
    pub threshold_constant: f32,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            enhance_contrast: false,
            enhance_sharpness: false,
            denoise: false,
            binarize: false,
            contrast_factor: 1.5,
            sharpness_factor: 1.5,
            denoise_strength: 3.0,
            denoise_window: 7,
            threshold_block_size: 11,
            threshold_constant: 2.0,
        }
    }
}

impl PreprocessOptions {
    /// Contrast and sharpness boost, used for slider images.
    pub fn enhance() -> Self {
        Self {
            enhance_contrast: true,
            enhance_sharpness: true,
            ..Self::default()
        }
    }

    /// Enhancement followed by denoising, used before text classification.
    pub fn enhance_and_denoise() -> Self {
        Self {
            denoise: true,
            ..Self::enhance()
        }
    }

    pub fn is_noop(&self) -> bool {
        !(self.enhance_contrast || self.enhance_sharpness || self.denoise || self.binarize)
    }

    /// Rejects parameters outside the supported ranges.
    ///
    /// Only bounds are checked here. A denoise window or strength that is in
    /// range but unusable (even window, non-positive strength) still makes the
    /// denoise step skip itself at run time.
    pub fn validate(&self) -> Result<()> {
        check_factor("contrastFactor", self.contrast_factor)?;
        check_factor("sharpnessFactor", self.sharpness_factor)?;

        if !self.denoise_strength.is_finite() || self.denoise_strength > MAX_DENOISE_STRENGTH {
            return Err(CaptchaError::Validation(format!(
                "denoiseStrength must be a finite number up to {MAX_DENOISE_STRENGTH}, got {}",
                self.denoise_strength
            )));
        }
        if self.denoise_window > MAX_DENOISE_WINDOW {
            return Err(CaptchaError::Validation(format!(
                "denoiseWindow must be at most {MAX_DENOISE_WINDOW}, got {}",
                self.denoise_window
            )));
        }
        if self.threshold_block_size > MAX_THRESHOLD_BLOCK_SIZE {
            return Err(CaptchaError::Validation(format!(
                "thresholdBlockSize must be at most {MAX_THRESHOLD_BLOCK_SIZE}, got {}",
                self.threshold_block_size
            )));
        }
        if !self.threshold_constant.is_finite() || self.threshold_constant.abs() > 255.0 {
            return Err(CaptchaError::Validation(format!(
                "thresholdConstant must be within -255..=255, got {}",
                self.threshold_constant
            )));
        }
        if self.binarize {
            validate_block_size(self.threshold_block_size)?;
        }
        Ok(())
    }
}

fn check_factor(name: &str, factor: f32) -> Result<()> {
    if !factor.is_finite() || !(0.0..=MAX_ENHANCE_FACTOR).contains(&factor) {
        return Err(CaptchaError::Validation(format!(
            "{name} must be within 0..={MAX_ENHANCE_FACTOR}, got {factor}"
        )));
    }
    Ok(())
}

/// Preprocess image bytes before handing them to the recognition engine.
///
/// Decodes the image, normalizes it to 3-channel RGB, applies the enabled
/// steps and re-encodes the result as PNG. Binarized output is single-channel.
///
/// A failing denoise step is logged and skipped; every other failure is
/// returned to the caller.
pub fn preprocess_image(bytes: &[u8], options: &PreprocessOptions) -> Result<Vec<u8>> {
    options.validate()?;

    let img = decode_image(bytes)?;
    let mut rgb = img.to_rgb8();
    debug!(
        width = rgb.width(),
        height = rgb.height(),
        ?options,
        "Preprocessing image"
    );

    if options.enhance_contrast {
        rgb = enhance_contrast(&rgb, options.contrast_factor);
    }

    if options.enhance_sharpness {
        rgb = enhance_sharpness(&rgb, options.sharpness_factor);
    }

    if options.denoise {
        match denoise(&rgb, options.denoise_strength, options.denoise_window) {
            Ok(denoised) => rgb = denoised,
            Err(e) => warn!(error = %e, "Denoising failed, continuing without it"),
        }
    }

    let output = if options.binarize {
        let gray = to_grayscale(&rgb);
        DynamicImage::ImageLuma8(adaptive_threshold(
            &gray,
            options.threshold_block_size,
            options.threshold_constant,
        ))
    } else {
        DynamicImage::ImageRgb8(rgb)
    };

    encode_png(&output)
}

/// Decode image bytes, guessing the format from content.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    let reader = ImageReader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| CaptchaError::DecodeFailed(format!("Failed to read image: {e}")))?;

    if reader.format().is_none() {
        return Err(CaptchaError::DecodeFailed(
            "Unrecognized image format".to_string(),
        ));
    }

    reader
        .decode()
        .map_err(|e| CaptchaError::DecodeFailed(format!("Failed to decode image: {e}")))
}

pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut output), ImageFormat::Png)
        .map_err(|e| CaptchaError::Processing(format!("Failed to encode image: {e}")))?;
    Ok(output)
}

fn validate_block_size(block_size: u32) -> Result<()> {
    if block_size < 3 || block_size % 2 == 0 {
        return Err(CaptchaError::Validation(format!(
            "Threshold block size must be odd and at least 3, got {block_size}"
        )));
    }
    Ok(())
}

/// ITU-R BT.601 luma, the weighting used by most OCR pipelines.
fn luma(pixel: &Rgb<u8>) -> f32 {
    0.299 * pixel[0] as f32 + 0.587 * pixel[1] as f32 + 0.114 * pixel[2] as f32
}

fn to_grayscale(rgb: &RgbImage) -> GrayImage {
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        Luma([luma(rgb.get_pixel(x, y)).round().clamp(0.0, 255.0) as u8])
    })
}

/// `base + factor * (value - base)`, clipped to the u8 range.
fn blend(base: f32, value: f32, factor: f32) -> u8 {
    (base + factor * (value - base)).round().clamp(0.0, 255.0) as u8
}

/// Scale each channel's distance from the mean luminance by `factor`.
fn enhance_contrast(rgb: &RgbImage, factor: f32) -> RgbImage {
    let pixel_count = (rgb.width() as u64 * rgb.height() as u64).max(1);
    let sum: f64 = rgb.pixels().map(|p| luma(p).round() as f64).sum();
    let mean = (sum / pixel_count as f64).round() as f32;

    let mut output = rgb.clone();
    for pixel in output.pixels_mut() {
        for channel in pixel.0.iter_mut() {
            *channel = blend(mean, *channel as f32, factor);
        }
    }
    output
}

/// Blend against a 3×3 smoothed copy. Border pixels are left as-is.
fn enhance_sharpness(rgb: &RgbImage, factor: f32) -> RgbImage {
    const KERNEL: [[f32; 3]; 3] = [[1.0, 1.0, 1.0], [1.0, 5.0, 1.0], [1.0, 1.0, 1.0]];
    const KERNEL_SUM: f32 = 13.0;

    let (w, h) = rgb.dimensions();
    let mut output = rgb.clone();
    if w < 3 || h < 3 {
        return output;
    }

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let mut smooth = [0.0f32; 3];
            for (ky, row) in KERNEL.iter().enumerate() {
                for (kx, weight) in row.iter().enumerate() {
                    let neighbour = rgb.get_pixel(x + kx as u32 - 1, y + ky as u32 - 1);
                    for c in 0..3 {
                        smooth[c] += weight * neighbour[c] as f32;
                    }
                }
            }

            let original = rgb.get_pixel(x, y);
            let mut sharpened = [0u8; 3];
            for c in 0..3 {
                let base = (smooth[c] / KERNEL_SUM).round();
                sharpened[c] = blend(base, original[c] as f32, factor);
            }
            output.put_pixel(x, y, Rgb(sharpened));
        }
    }

    output
}

/// Edge-preserving colour denoise (bilateral filter).
///
/// `strength` controls how different two colours may be and still be averaged;
/// `window` is the odd side length of the spatial neighbourhood.
fn denoise(rgb: &RgbImage, strength: f32, window: u32) -> Result<RgbImage> {
    if window < 3 || window % 2 == 0 {
        return Err(CaptchaError::Processing(format!(
            "Denoise window must be odd and at least 3, got {window}"
        )));
    }
    if !strength.is_finite() || strength <= 0.0 {
        return Err(CaptchaError::Processing(format!(
            "Denoise strength must be positive, got {strength}"
        )));
    }

    let (w, h) = rgb.dimensions();
    let work = w as u64 * h as u64 * window as u64 * window as u64;
    if work > MAX_DENOISE_WORK {
        return Err(CaptchaError::Processing(format!(
            "Image {w}x{h} too large to denoise with window {window}"
        )));
    }

    let radius = window / 2;
    let spatial_sigma = radius as f32;
    let range_sigma = strength * 5.0;
    let spatial_denominator = 2.0 * spatial_sigma * spatial_sigma;
    let range_denominator = 2.0 * range_sigma * range_sigma;

    let side = window as usize;
    let mut spatial_weights = vec![0.0f32; side * side];
    for dy in 0..side {
        for dx in 0..side {
            let oy = dy as f32 - radius as f32;
            let ox = dx as f32 - radius as f32;
            spatial_weights[dy * side + dx] = (-(ox * ox + oy * oy) / spatial_denominator).exp();
        }
    }

    let mut output = RgbImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let center = rgb.get_pixel(x, y);
            let mut sums = [0.0f32; 3];
            let mut weight_sum = 0.0f32;

            let y_start = y.saturating_sub(radius);
            let y_end = (y + radius + 1).min(h);
            let x_start = x.saturating_sub(radius);
            let x_end = (x + radius + 1).min(w);

            for ny in y_start..y_end {
                for nx in x_start..x_end {
                    let neighbour = rgb.get_pixel(nx, ny);
                    let color_distance: f32 = (0..3)
                        .map(|c| {
                            let d = neighbour[c] as f32 - center[c] as f32;
                            d * d
                        })
                        .sum();

                    let spatial_index =
                        (ny + radius - y) as usize * side + (nx + radius - x) as usize;
                    let weight = spatial_weights[spatial_index]
                        * (-color_distance / range_denominator).exp();

                    for c in 0..3 {
                        sums[c] += neighbour[c] as f32 * weight;
                    }
                    weight_sum += weight;
                }
            }

            // The centre pixel always contributes weight 1.0.
            let mut denoised = [0u8; 3];
            for c in 0..3 {
                denoised[c] = (sums[c] / weight_sum).round().clamp(0.0, 255.0) as u8;
            }
            output.put_pixel(x, y, Rgb(denoised));
        }
    }

    Ok(output)
}

/// Normalized 1-D Gaussian kernel. The sigma follows the usual
/// `0.3 * ((size - 1) * 0.5 - 1) + 0.8` rule for a given kernel size.
fn gaussian_kernel(size: u32) -> Vec<f32> {
    let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let half = (size / 2) as i32;
    let weights: Vec<f32> = (-half..=half)
        .map(|i| {
            let offset = i as f32;
            (-(offset * offset) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let total: f32 = weights.iter().sum();
    weights.into_iter().map(|w| w / total).collect()
}

/// Gaussian-weighted local mean, borders replicated.
fn gaussian_mean(gray: &GrayImage, block_size: u32) -> Vec<u8> {
    let (w, h) = (gray.width() as i64, gray.height() as i64);
    let kernel = gaussian_kernel(block_size);
    let half = (block_size / 2) as i64;

    let mut horizontal = vec![0.0f32; (w * h) as usize];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0f32;
            for (k, weight) in kernel.iter().enumerate() {
                let sx = (x + k as i64 - half).clamp(0, w - 1);
                acc += weight * gray.get_pixel(sx as u32, y as u32)[0] as f32;
            }
            horizontal[(y * w + x) as usize] = acc;
        }
    }

    let mut mean = vec![0u8; (w * h) as usize];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0f32;
            for (k, weight) in kernel.iter().enumerate() {
                let sy = (y + k as i64 - half).clamp(0, h - 1);
                acc += weight * horizontal[(sy * w + x) as usize];
            }
            mean[(y * w + x) as usize] = acc.round().clamp(0.0, 255.0) as u8;
        }
    }
    mean
}

/// Adaptive binarization: a pixel turns white when it is brighter than its
/// Gaussian-weighted neighbourhood mean minus `constant`.
fn adaptive_threshold(gray: &GrayImage, block_size: u32, constant: f32) -> GrayImage {
    let mean = gaussian_mean(gray, block_size);
    let delta = constant.ceil() as i32;
    let width = gray.width();

    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let local = mean[(y * width + x) as usize] as i32;
        let value = gray.get_pixel(x, y)[0] as i32;
        if value - local > -delta {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut output = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut output), format)
            .unwrap();
        output
    }

    /// A deterministic, textured RGB test image.
    fn patterned_rgb(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([
                ((x * 7 + y * 3) % 256) as u8,
                ((x * 13) % 256) as u8,
                ((y * 29 + x) % 256) as u8,
            ])
        })
    }

    fn all_flags() -> PreprocessOptions {
        PreprocessOptions {
            enhance_contrast: true,
            enhance_sharpness: true,
            denoise: true,
            binarize: true,
            ..PreprocessOptions::default()
        }
    }

    #[test]
    fn test_noop_preserves_pixels() {
        let rgb = patterned_rgb(40, 30);
        let png = encode(&DynamicImage::ImageRgb8(rgb.clone()), ImageFormat::Png);

        let output = preprocess_image(&png, &PreprocessOptions::default()).unwrap();
        let decoded = image::load_from_memory(&output).unwrap();
        assert_eq!(decoded.to_rgb8(), rgb);
    }

    #[test]
    fn test_noop_bmp_input_reencoded_as_png() {
        let rgb = patterned_rgb(16, 16);
        let bmp = encode(&DynamicImage::ImageRgb8(rgb.clone()), ImageFormat::Bmp);

        let output = preprocess_image(&bmp, &PreprocessOptions::default()).unwrap();
        assert_eq!(image::guess_format(&output).unwrap(), ImageFormat::Png);
        assert_eq!(image::load_from_memory(&output).unwrap().to_rgb8(), rgb);
    }

    #[test]
    fn test_rgba_and_gray_normalized_to_rgb() {
        for img in [
            DynamicImage::new_rgba8(20, 20),
            DynamicImage::new_luma8(20, 20),
            DynamicImage::new_luma_a8(20, 20),
        ] {
            let png = encode(&img, ImageFormat::Png);
            let output = preprocess_image(&png, &PreprocessOptions::enhance()).unwrap();
            let decoded = image::load_from_memory(&output).unwrap();
            assert!(matches!(decoded, DynamicImage::ImageRgb8(_)));
            assert_eq!(decoded.dimensions(), (20, 20));
        }
    }

    #[test]
    fn test_binarize_produces_two_level_luma() {
        let png = encode(
            &DynamicImage::ImageRgb8(patterned_rgb(48, 32)),
            ImageFormat::Png,
        );
        let options = PreprocessOptions {
            binarize: true,
            ..PreprocessOptions::default()
        };

        let output = preprocess_image(&png, &options).unwrap();
        let decoded = image::load_from_memory(&output).unwrap();
        let DynamicImage::ImageLuma8(gray) = decoded else {
            panic!("binarized output should be single-channel");
        };
        assert!(gray.pixels().all(|p| p[0] == 0 || p[0] == 255));
        assert_eq!(gray.dimensions(), (48, 32));
    }

    #[test]
    fn test_all_flags_compose() {
        let jpeg = encode(
            &DynamicImage::ImageRgb8(patterned_rgb(30, 20)),
            ImageFormat::Jpeg,
        );
        let output = preprocess_image(&jpeg, &all_flags()).unwrap();
        let decoded = image::load_from_memory(&output).unwrap();
        assert!(matches!(decoded, DynamicImage::ImageLuma8(_)));
    }

    #[test]
    fn test_invalid_bytes_fail_to_decode() {
        let result = preprocess_image(&[0, 1, 2, 3, 4, 5], &PreprocessOptions::default());
        assert!(matches!(result, Err(CaptchaError::DecodeFailed(_))));
    }

    #[test]
    fn test_truncated_png_fails_to_decode() {
        let png = encode(
            &DynamicImage::ImageRgb8(patterned_rgb(30, 20)),
            ImageFormat::Png,
        );
        let result = preprocess_image(&png[..png.len() / 2], &PreprocessOptions::default());
        assert!(matches!(result, Err(CaptchaError::DecodeFailed(_))));
    }

    #[test]
    fn test_denoise_failure_is_skipped() {
        let rgb = patterned_rgb(10, 10);
        let png = encode(&DynamicImage::ImageRgb8(rgb.clone()), ImageFormat::Png);
        let options = PreprocessOptions {
            denoise: true,
            denoise_window: 4,
            ..PreprocessOptions::default()
        };

        let output = preprocess_image(&png, &options).unwrap();
        assert_eq!(image::load_from_memory(&output).unwrap().to_rgb8(), rgb);
    }

    #[test]
    fn test_even_block_size_rejected() {
        let png = encode(&DynamicImage::new_rgb8(8, 8), ImageFormat::Png);
        let options = PreprocessOptions {
            binarize: true,
            threshold_block_size: 10,
            ..PreprocessOptions::default()
        };
        assert!(matches!(
            preprocess_image(&png, &options),
            Err(CaptchaError::Validation(_))
        ));
    }

    #[test]
    fn test_huge_block_size_rejected_before_decoding() {
        let png = encode(&DynamicImage::new_rgb8(4, 4), ImageFormat::Png);
        let options = PreprocessOptions {
            binarize: true,
            threshold_block_size: 100_001,
            ..PreprocessOptions::default()
        };
        assert!(matches!(
            preprocess_image(&png, &options),
            Err(CaptchaError::Validation(_))
        ));
    }

    #[test]
    fn test_largest_block_size_accepted() {
        let png = encode(&DynamicImage::ImageRgb8(patterned_rgb(6, 6)), ImageFormat::Png);
        let options = PreprocessOptions {
            binarize: true,
            threshold_block_size: MAX_THRESHOLD_BLOCK_SIZE,
            ..PreprocessOptions::default()
        };
        let output = preprocess_image(&png, &options).unwrap();
        assert_eq!(image::load_from_memory(&output).unwrap().dimensions(), (6, 6));
    }

    #[test]
    fn test_out_of_range_parameters_rejected() {
        let cases = [
            PreprocessOptions {
                contrast_factor: f32::INFINITY,
                ..PreprocessOptions::default()
            },
            PreprocessOptions {
                sharpness_factor: -1.0,
                ..PreprocessOptions::default()
            },
            PreprocessOptions {
                contrast_factor: 1e9,
                ..PreprocessOptions::default()
            },
            PreprocessOptions {
                denoise_strength: f32::NAN,
                ..PreprocessOptions::default()
            },
            PreprocessOptions {
                denoise_window: 4_001,
                ..PreprocessOptions::default()
            },
            PreprocessOptions {
                threshold_constant: 1e6,
                ..PreprocessOptions::default()
            },
        ];
        for options in cases {
            assert!(
                matches!(options.validate(), Err(CaptchaError::Validation(_))),
                "{options:?}"
            );
        }
        assert!(PreprocessOptions::enhance_and_denoise().validate().is_ok());
    }

    #[test]
    fn test_large_kernel_stays_finite() {
        let kernel = gaussian_kernel(MAX_THRESHOLD_BLOCK_SIZE);
        assert_eq!(kernel.len(), MAX_THRESHOLD_BLOCK_SIZE as usize);
        assert!(kernel.iter().all(|w| w.is_finite() && *w >= 0.0));
        assert!((kernel.iter().sum::<f32>() - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_contrast_factor_one_is_identity() {
        let rgb = patterned_rgb(12, 12);
        assert_eq!(enhance_contrast(&rgb, 1.0), rgb);
    }

    #[test]
    fn test_contrast_spreads_values_from_mean() {
        let mut rgb = RgbImage::from_pixel(2, 1, Rgb([100, 100, 100]));
        rgb.put_pixel(1, 0, Rgb([140, 140, 140]));
        let enhanced = enhance_contrast(&rgb, 1.5);
        // mean luminance is 120
        assert_eq!(enhanced.get_pixel(0, 0), &Rgb([90, 90, 90]));
        assert_eq!(enhanced.get_pixel(1, 0), &Rgb([150, 150, 150]));
    }

    #[test]
    fn test_sharpness_keeps_flat_image_and_borders() {
        let flat = RgbImage::from_pixel(8, 8, Rgb([80, 120, 160]));
        assert_eq!(enhance_sharpness(&flat, 2.0), flat);

        let rgb = patterned_rgb(8, 8);
        let sharpened = enhance_sharpness(&rgb, 2.0);
        for x in 0..8 {
            assert_eq!(sharpened.get_pixel(x, 0), rgb.get_pixel(x, 0));
            assert_eq!(sharpened.get_pixel(x, 7), rgb.get_pixel(x, 7));
        }
    }

    #[test]
    fn test_denoise_smooths_isolated_noise() {
        let mut rgb = RgbImage::from_pixel(9, 9, Rgb([100, 100, 100]));
        rgb.put_pixel(4, 4, Rgb([110, 110, 110]));
        let denoised = denoise(&rgb, 3.0, 7).unwrap();
        let center = denoised.get_pixel(4, 4)[0];
        assert!(center < 110 && center >= 100, "got {center}");
    }

    #[test]
    fn test_denoise_preserves_strong_edges() {
        let rgb = RgbImage::from_fn(10, 10, |x, _| {
            if x < 5 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        });
        assert_eq!(denoise(&rgb, 3.0, 7).unwrap(), rgb);
    }

    #[test]
    fn test_denoise_rejects_bad_parameters() {
        let rgb = patterned_rgb(5, 5);
        assert!(denoise(&rgb, 3.0, 2).is_err());
        assert!(denoise(&rgb, 0.0, 7).is_err());
        assert!(denoise(&rgb, f32::NAN, 7).is_err());
    }

    #[test]
    fn test_gaussian_kernel_normalized_and_symmetric() {
        let kernel = gaussian_kernel(11);
        assert_eq!(kernel.len(), 11);
        assert!((kernel.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        for i in 0..5 {
            assert!((kernel[i] - kernel[10 - i]).abs() < 1e-6);
        }
        assert!(kernel[5] > kernel[4]);
    }

    #[test]
    fn test_adaptive_threshold_flat_image_is_white() {
        // value - mean == 0 > -2
        let gray = GrayImage::from_pixel(15, 15, Luma([37]));
        let binary = adaptive_threshold(&gray, 11, 2.0);
        assert!(binary.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn test_adaptive_threshold_dark_stroke_is_black() {
        let mut gray = GrayImage::from_pixel(21, 21, Luma([220]));
        for y in 0..21 {
            gray.put_pixel(10, y, Luma([20]));
        }
        let binary = adaptive_threshold(&gray, 11, 2.0);
        assert_eq!(binary.get_pixel(10, 10)[0], 0);
        assert_eq!(binary.get_pixel(2, 10)[0], 255);
    }

    #[test]
    fn test_presets() {
        assert!(PreprocessOptions::default().is_noop());
        let enhance = PreprocessOptions::enhance();
        assert!(enhance.enhance_contrast && enhance.enhance_sharpness);
        assert!(!enhance.denoise && !enhance.binarize);
        assert!(PreprocessOptions::enhance_and_denoise().denoise);
    }
}
