//! User-facing, non-blocking notices raised when an operation fails.

use std::fmt;

use tokio::sync::broadcast;
use tracing::warn;

use crate::{
    error::{ClientError, RequestKind},
    ClientEvent,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Validation,
    Request,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeContext {
    ListThemes,
    CreateTheme,
    UpdateTheme,
    ActivateTheme,
    DeactivateTheme,
    DeleteTheme,
    DeleteThemes,
    UploadDocument,
    RunResearch,
    ListHistory,
    FetchRun,
    DeepDive,
}

impl NoticeContext {
    fn prefix(self) -> &'static str {
        match self {
            NoticeContext::ListThemes => "Failed to load themes",
            NoticeContext::CreateTheme => "Failed to create theme",
            NoticeContext::UpdateTheme => "Failed to update theme",
            NoticeContext::ActivateTheme => "Cannot activate",
            NoticeContext::DeactivateTheme => "Failed to stop schedule",
            NoticeContext::DeleteTheme => "Failed to delete theme",
            NoticeContext::DeleteThemes => "Failed to delete selected themes",
            NoticeContext::UploadDocument => "Failed to extract themes",
            NoticeContext::RunResearch => "Research run failed",
            NoticeContext::ListHistory => "Failed to load run history",
            NoticeContext::FetchRun => "Failed to load run",
            NoticeContext::DeepDive => "Failed to generate deep dive summary",
        }
    }
}

/// Turns a transport failure into something a user can act on.
pub fn describe_request_failure(kind: RequestKind, message: &str) -> String {
    match kind {
        RequestKind::Unreachable => {
            "Research backend unreachable; check the API URL and retry.".to_string()
        }
        RequestKind::TimedOut => "Research backend did not answer in time; retry.".to_string(),
        RequestKind::Other => message.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    kind: NoticeKind,
    context: NoticeContext,
    message: String,
}

impl Notice {
    /// `None` for errors that need no notice (declined prompts, disabled controls).
    pub fn from_error(context: NoticeContext, err: &ClientError) -> Option<Self> {
        if err.is_silent() {
            return None;
        }
        let (kind, message) = match err {
            ClientError::Rejected { reason } => (NoticeKind::Rejected, reason.clone()),
            ClientError::Request { kind, message, .. } => {
                (NoticeKind::Request, describe_request_failure(*kind, message))
            }
            other => (NoticeKind::Validation, other.to_string()),
        };
        Some(Self {
            kind,
            context,
            message,
        })
    }

    pub fn kind(&self) -> NoticeKind {
        self.kind
    }

    pub fn context(&self) -> NoticeContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind == NoticeKind::Validation {
            return f.write_str(&self.message);
        }
        write!(f, "{}: {}", self.context.prefix(), self.message)
    }
}

/// Logs and broadcasts `err` as a notice, handing it back for propagation.
pub(crate) fn report(
    events: &broadcast::Sender<ClientEvent>,
    context: NoticeContext,
    err: ClientError,
) -> ClientError {
    if let Some(notice) = Notice::from_error(context, &err) {
        warn!(?context, error = %err, "operation failed");
        let _ = events.send(ClientEvent::Notice(notice));
    }
    err
}
