use shared::{domain::ThemeId, error::ApiError};
use thiserror::Error;

/// What went wrong on the wire, decided from the transport error itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestKind {
    /// Nothing accepted the connection (refused, DNS, unroutable).
    Unreachable,
    TimedOut,
    #[default]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Rejected locally before any request was made.
    #[error("{0}")]
    Validation(String),
    /// Transport failure or a non-success status without a business reason.
    #[error("{message}")]
    Request {
        status: Option<u16>,
        kind: RequestKind,
        message: String,
    },
    /// Backend refused the request; `reason` is the backend's own wording.
    #[error("{reason}")]
    Rejected { reason: String },
    #[error("theme {0} already has a change in flight")]
    Busy(ThemeId),
    #[error("theme {0} is not in the current theme list")]
    UnknownTheme(ThemeId),
    #[error("no theme selected")]
    NoThemeSelected,
    #[error("{0} was not confirmed")]
    Declined(String),
}

impl ClientError {
    pub fn request(message: impl Into<String>) -> Self {
        Self::Request {
            status: None,
            kind: RequestKind::Other,
            message: message.into(),
        }
    }

    /// Errors that come from the user's own action and need no notice.
    pub fn is_silent(&self) -> bool {
        matches!(self, ClientError::Busy(_) | ClientError::Declined(_))
    }
}

impl From<ApiError> for ClientError {
    fn from(err: ApiError) -> Self {
        if err.code.is_rejection() && err.has_detail {
            ClientError::Rejected {
                reason: err.message,
            }
        } else {
            ClientError::Request {
                status: Some(err.status),
                kind: RequestKind::Other,
                message: err.message,
            }
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        // The cause sits in the source chain, not in the display text.
        let kind = if err.is_timeout() {
            RequestKind::TimedOut
        } else if err.is_connect() {
            RequestKind::Unreachable
        } else {
            RequestKind::Other
        };
        ClientError::Request {
            status: err.status().map(|status| status.as_u16()),
            kind,
            message: err.to_string(),
        }
    }
}
