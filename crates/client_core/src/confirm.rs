use async_trait::async_trait;

/// A destructive action awaiting the user's go-ahead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    DeleteTheme { name: String },
    DeleteSelected { count: usize },
    ClearAll { count: usize },
}

impl Confirmation {
    pub fn prompt(&self) -> String {
        match self {
            Confirmation::DeleteTheme { name } => {
                format!("Are you sure you want to delete the theme \"{name}\"?")
            }
            Confirmation::DeleteSelected { count } => format!("Delete {count} selected themes?"),
            Confirmation::ClearAll { count } => format!(
                "Are you sure you want to DELETE ALL {count} themes? This cannot be undone."
            ),
        }
    }

    pub(crate) fn action(&self) -> &'static str {
        match self {
            Confirmation::DeleteTheme { .. } => "delete theme",
            Confirmation::DeleteSelected { .. } => "delete selected themes",
            Confirmation::ClearAll { .. } => "clear all themes",
        }
    }
}

#[async_trait]
pub trait Confirmer: Send + Sync {
    async fn confirm(&self, request: &Confirmation) -> bool;
}

/// For callers that collected consent up front (e.g. a `--yes` flag).
pub struct AlwaysConfirm;

#[async_trait]
impl Confirmer for AlwaysConfirm {
    async fn confirm(&self, _request: &Confirmation) -> bool {
        true
    }
}

pub struct NeverConfirm;

#[async_trait]
impl Confirmer for NeverConfirm {
    async fn confirm(&self, _request: &Confirmation) -> bool {
        false
    }
}
