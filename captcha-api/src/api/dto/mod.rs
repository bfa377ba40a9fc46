//! Request and response bodies for the HTTP API.
//!
//! Image fields are accepted as raw JSON values so that a non-string value is
//! reported as an unsupported input type rather than a generic JSON error.

pub mod captcha;
pub mod system;

pub use captcha::*;
pub use system::*;
