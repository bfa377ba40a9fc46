use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use axum::http::StatusCode;

use crate::error::CaptchaError;

/// `axum::Json` whose rejections come back as [`CaptchaError`] inside the
/// standard error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(CaptchaError))]
pub struct AppJson<T>(pub T);

impl From<JsonRejection> for CaptchaError {
    fn from(rejection: JsonRejection) -> Self {
        map_json_rejection(rejection)
    }
}

fn map_json_rejection(rejection: JsonRejection) -> CaptchaError {
    match rejection {
        JsonRejection::JsonDataError(err) => {
            let message = err.body_text();
            if let Some(field) = extract_missing_field(&message) {
                CaptchaError::Validation(format!("Missing required field: {field}"))
            } else {
                CaptchaError::Validation(format!("Invalid JSON: {message}"))
            }
        }
        JsonRejection::JsonSyntaxError(err) => {
            CaptchaError::Validation(format!("JSON syntax error: {}", err.body_text()))
        }
        JsonRejection::MissingJsonContentType(_) => CaptchaError::Validation(
            "Missing `Content-Type: application/json` header".to_string(),
        ),
        JsonRejection::BytesRejection(err) => {
            if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
                CaptchaError::BodyTooLarge
            } else {
                CaptchaError::Validation(format!("Failed to read request body: {}", err.body_text()))
            }
        }
        _ => CaptchaError::Validation(rejection.body_text()),
    }
}

fn extract_missing_field(message: &str) -> Option<&str> {
    let prefix = "missing field `";
    let start = message.find(prefix)? + prefix.len();
    let remaining = message.get(start..)?;
    let end = remaining.find('`')?;
    remaining.get(..end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_missing_field() {
        assert_eq!(
            extract_missing_field("Failed to deserialize: missing field `image` at line 1"),
            Some("image")
        );
        assert_eq!(extract_missing_field("invalid type: integer"), None);
    }
}
