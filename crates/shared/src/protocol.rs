use serde::{Deserialize, Serialize};

use crate::domain::{Schedule, Theme, ThemeId, ThemeStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateThemeRequest {
    pub name: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub schedule: Schedule,
}

/// Full record sent on every update; the backend clears fields that are left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateThemeRequest {
    pub name: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub schedule: Schedule,
    pub status: ThemeStatus,
}

impl From<&Theme> for UpdateThemeRequest {
    fn from(theme: &Theme) -> Self {
        Self {
            name: theme.name.clone(),
            description: theme.description.clone(),
            keywords: theme.keywords.clone(),
            schedule: theme.schedule,
            status: theme.status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkDeleteRequest {
    pub theme_ids: Vec<ThemeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResearchRequest {
    pub theme_id: ThemeId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeepDiveRequest {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeepDiveResponse {
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunks_ingested: Option<u64>,
}
