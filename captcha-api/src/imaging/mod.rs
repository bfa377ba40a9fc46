//! Image input normalization and pixel-level helpers.
//!
//! Everything the service does to an image before or after the recognition
//! engine lives here:
//!
//! - [`source`]: turns client-supplied values (raw bytes, base64 text, remote
//!   URLs) into size-checked bytes.
//! - [`preprocessing`]: optional contrast/sharpness enhancement, denoising and
//!   adaptive binarization, always re-encoded as PNG.
//! - [`region`]: bounding boxes and region cropping for click-select captchas.
//! - [`split`]: horizontal splitting of combined slider images.
//!
//! Nothing in this module keeps state between calls. Limits are passed in
//! explicitly so each piece can be tested on its own.

pub mod preprocessing;
pub mod region;
pub mod source;
pub mod split;

pub use preprocessing::{preprocess_image, PreprocessOptions};
pub use region::BoundingBox;
pub use source::{ImageInput, ImageResolver, ResolveLimits};
pub use split::{split_at, SplitImage};
