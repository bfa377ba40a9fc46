//! HTTP service for recognizing captchas: slider gaps, text, arithmetic and
//! click-select challenges.
//!
//! Recognition itself is delegated to a [`engine::RecognitionEngine`]; this
//! crate resolves image inputs, preprocesses them, evaluates arithmetic and
//! serves the results.

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod expression;
pub mod imaging;
pub mod services;
