//! Image source resolution.
//!
//! Clients send images as base64 text (optionally a `data:` URI), as an
//! `http(s)://` URL, or, for internal callers, as raw bytes. [`ImageResolver`]
//! turns any of those into bytes no larger than [`ResolveLimits::max_size`].
//!
//! Remote fetches keep certificate verification on, are bounded by
//! [`ResolveLimits::fetch_timeout`] and stream the body so an oversized
//! response is abandoned as soon as it crosses the limit.

use std::time::Duration;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use futures::StreamExt;
use reqwest::redirect::Policy;
use reqwest::Client;
use tracing::debug;

use crate::error::{CaptchaError, Result};

const MAX_REDIRECTS: usize = 10;

/// Standard alphabet, padding optional.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Bounds applied to every resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveLimits {
    pub max_size: usize,
    pub fetch_timeout: Duration,
}

/// A client-supplied image before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageInput {
    RawBytes(Vec<u8>),
    Base64Text(String),
    RemoteUrl(String),
}

impl ImageInput {
    /// Classifies a textual image reference: `http://` and `https://` prefixes
    /// mark a URL, anything else is treated as base64.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.starts_with("http://") || text.starts_with("https://") {
            ImageInput::RemoteUrl(text)
        } else {
            ImageInput::Base64Text(text)
        }
    }

    /// Builds an input from a JSON request field. Only strings are accepted.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::String(text) => Ok(Self::from_text(text.as_str())),
            other => Err(CaptchaError::UnsupportedInputType(
                json_type_name(other).to_string(),
            )),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ImageInput::RawBytes(_) => "bytes",
            ImageInput::Base64Text(_) => "base64",
            ImageInput::RemoteUrl(_) => "url",
        }
    }
}

impl From<Vec<u8>> for ImageInput {
    fn from(bytes: Vec<u8>) -> Self {
        ImageInput::RawBytes(bytes)
    }
}

impl From<&str> for ImageInput {
    fn from(text: &str) -> Self {
        ImageInput::from_text(text)
    }
}

impl From<String> for ImageInput {
    fn from(text: String) -> Self {
        ImageInput::from_text(text)
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Resolves [`ImageInput`]s into verified bytes.
///
/// Cheap to clone; the underlying HTTP client is shared.
#[derive(Debug, Clone)]
pub struct ImageResolver {
    client: Client,
    limits: ResolveLimits,
}

impl ImageResolver {
    pub fn new(limits: ResolveLimits, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(limits.fetch_timeout)
            .user_agent(user_agent)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| CaptchaError::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, limits })
    }

    pub fn limits(&self) -> ResolveLimits {
        self.limits
    }

    pub async fn resolve(&self, input: ImageInput) -> Result<Vec<u8>> {
        match input {
            ImageInput::RawBytes(bytes) => {
                ensure_within_limit(bytes.len(), self.limits.max_size)?;
                Ok(bytes)
            }
            ImageInput::Base64Text(text) => decode_base64(&text, self.limits.max_size),
            ImageInput::RemoteUrl(url) => self.fetch(&url).await,
        }
    }

    /// Single GET attempt. The body is accumulated chunk by chunk and the
    /// transfer is dropped once it would cross `max_size`.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let max_size = self.limits.max_size;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(CaptchaError::FetchFailed)?;

        let declared = response.content_length();
        if let Some(declared) = declared {
            let declared = usize::try_from(declared).unwrap_or(usize::MAX);
            ensure_within_limit(declared, max_size)?;
        }

        let capacity = declared
            .and_then(|len| usize::try_from(len).ok())
            .unwrap_or(0)
            .min(max_size);
        let mut body = Vec::with_capacity(capacity);
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(CaptchaError::FetchFailed)?;
            ensure_within_limit(body.len() + chunk.len(), max_size)?;
            body.extend_from_slice(&chunk);
        }

        debug!(url, bytes = body.len(), "Fetched remote image");
        Ok(body)
    }
}

fn ensure_within_limit(size: usize, limit: usize) -> Result<()> {
    if size > limit {
        return Err(CaptchaError::SizeExceeded { size, limit });
    }
    Ok(())
}

/// Strips a `data:<mime>;base64,` header when present.
fn strip_data_uri(text: &str) -> &str {
    if text.starts_with("data:") {
        if let Some((_, payload)) = text.split_once(',') {
            return payload;
        }
    }
    text
}

fn decode_base64(text: &str, max_size: usize) -> Result<Vec<u8>> {
    let payload: Vec<u8> = strip_data_uri(text)
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();

    // Every 4 encoded characters carry 3 bytes; at most 2 of those can be padding.
    let min_decoded = (payload.len() / 4 * 3).saturating_sub(2);
    ensure_within_limit(min_decoded, max_size)?;

    let decoded = LENIENT_BASE64
        .decode(&payload)
        .map_err(|e| CaptchaError::DecodeFailed(format!("invalid base64: {e}")))?;

    ensure_within_limit(decoded.len(), max_size)?;
    Ok(decoded)
}
