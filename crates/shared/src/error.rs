use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    BadRequest,
    NotFound,
    Conflict,
    Validation,
    Internal,
    Unknown,
}

impl ErrorCode {
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => ErrorCode::BadRequest,
            404 => ErrorCode::NotFound,
            409 => ErrorCode::Conflict,
            422 => ErrorCode::Validation,
            500..=599 => ErrorCode::Internal,
            _ => ErrorCode::Unknown,
        }
    }

    /// Codes the backend uses to refuse a request on business grounds.
    pub fn is_rejection(self) -> bool {
        matches!(self, ErrorCode::BadRequest | ErrorCode::Conflict)
    }
}

/// Error body shape returned by the research backend: `{"detail": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code:?} ({status}): {message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub status: u16,
    pub message: String,
    /// Whether `message` came from the backend rather than a status fallback.
    pub has_detail: bool,
}

impl ApiError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::from_status(status),
            status,
            message: message.into(),
            has_detail: true,
        }
    }

    pub fn from_response(status: u16, body: &str) -> Self {
        match detail_from_body(body) {
            Some(detail) => Self::new(status, detail),
            None => Self {
                code: ErrorCode::from_status(status),
                status,
                message: format!("request failed with status {status}"),
                has_detail: false,
            },
        }
    }
}

fn detail_from_body(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    let detail = match parsed.detail {
        Value::String(text) => text,
        Value::Null => return None,
        // Validation failures carry a structured list; keep it readable as JSON.
        other => other.to_string(),
    };
    let detail = detail.trim();
    if detail.is_empty() {
        None
    } else {
        Some(detail.to_string())
    }
}
