//! Seam to the research backend and its HTTP implementation.

use std::{path::Path, time::Duration};

use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, Response,
};
use serde::de::DeserializeOwned;
use shared::{
    domain::{Run, RunId, Theme, ThemeId},
    error::ApiError,
    protocol::{
        BulkDeleteRequest, CreateThemeRequest, DeepDiveRequest, DeepDiveResponse,
        RunResearchRequest, UpdateThemeRequest, UploadResponse,
    },
};
use tracing::debug;

use crate::{config::ClientSettings, error::ClientError};

#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub filename: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl DocumentUpload {
    pub async fn from_path(path: &Path) -> Result<Self, ClientError> {
        let bytes = tokio::fs::read(path).await.map_err(|err| {
            ClientError::Validation(format!("cannot read '{}': {err}", path.display()))
        })?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        let mime_type = match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("pdf") => Some("application/pdf".to_string()),
            Some("txt") | Some("md") => Some("text/plain".to_string()),
            _ => None,
        };
        Ok(Self {
            filename,
            mime_type,
            bytes,
        })
    }
}

#[async_trait]
pub trait ResearchBackend: Send + Sync {
    async fn list_themes(&self) -> Result<Vec<Theme>, ClientError>;
    async fn create_theme(&self, request: CreateThemeRequest) -> Result<Theme, ClientError>;
    async fn update_theme(
        &self,
        id: &ThemeId,
        request: UpdateThemeRequest,
    ) -> Result<Theme, ClientError>;
    async fn activate_theme(&self, id: &ThemeId) -> Result<(), ClientError>;
    async fn delete_theme(&self, id: &ThemeId) -> Result<(), ClientError>;
    async fn bulk_delete_themes(&self, ids: &[ThemeId]) -> Result<(), ClientError>;
    async fn upload_document(&self, upload: DocumentUpload) -> Result<UploadResponse, ClientError>;
    async fn run_research(&self, theme_id: &ThemeId) -> Result<Run, ClientError>;
    /// Oldest first, as stored.
    async fn list_runs(&self) -> Result<Vec<Run>, ClientError>;
    async fn fetch_run(&self, id: &RunId) -> Result<Run, ClientError>;
    async fn deep_dive(&self, url: &str) -> Result<String, ClientError>;
}

pub struct HttpBackend {
    http: Client,
    api_url: String,
}

impl HttpBackend {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_settings(settings: &ClientSettings) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            api_url: settings.api_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_url)
    }

    async fn check(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let err = ApiError::from_response(status.as_u16(), &body);
        debug!(status = status.as_u16(), message = %err.message, "backend returned error");
        Err(err.into())
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let response = Self::check(response).await?;
        response.json::<T>().await.map_err(|err| {
            ClientError::request(format!("unexpected response from research backend: {err}"))
        })
    }
}

#[async_trait]
impl ResearchBackend for HttpBackend {
    async fn list_themes(&self) -> Result<Vec<Theme>, ClientError> {
        let response = self.http.get(self.url("/themes")).send().await?;
        Self::decode(response).await
    }

    async fn create_theme(&self, request: CreateThemeRequest) -> Result<Theme, ClientError> {
        let response = self
            .http
            .post(self.url("/themes/create"))
            .json(&request)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn update_theme(
        &self,
        id: &ThemeId,
        request: UpdateThemeRequest,
    ) -> Result<Theme, ClientError> {
        let response = self
            .http
            .put(self.url(&format!("/themes/{id}")))
            .json(&request)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn activate_theme(&self, id: &ThemeId) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.url(&format!("/themes/{id}/activate")))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn delete_theme(&self, id: &ThemeId) -> Result<(), ClientError> {
        let response = self
            .http
            .delete(self.url(&format!("/themes/{id}")))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn bulk_delete_themes(&self, ids: &[ThemeId]) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.url("/themes/bulk-delete"))
            .json(&BulkDeleteRequest {
                theme_ids: ids.to_vec(),
            })
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn upload_document(&self, upload: DocumentUpload) -> Result<UploadResponse, ClientError> {
        let mut part = Part::bytes(upload.bytes).file_name(upload.filename);
        if let Some(mime_type) = upload.mime_type.as_deref() {
            part = part.mime_str(mime_type)?;
        }
        let response = self
            .http
            .post(self.url("/upload"))
            .multipart(Form::new().part("file", part))
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn run_research(&self, theme_id: &ThemeId) -> Result<Run, ClientError> {
        let response = self
            .http
            .post(self.url("/research/run"))
            .json(&RunResearchRequest {
                theme_id: theme_id.clone(),
            })
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn list_runs(&self) -> Result<Vec<Run>, ClientError> {
        let response = self.http.get(self.url("/research/history")).send().await?;
        Self::decode(response).await
    }

    async fn fetch_run(&self, id: &RunId) -> Result<Run, ClientError> {
        let response = self
            .http
            .get(self.url(&format!("/research/history/{id}")))
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn deep_dive(&self, url: &str) -> Result<String, ClientError> {
        let response = self
            .http
            .post(self.url("/research/deep-dive"))
            .json(&DeepDiveRequest {
                url: url.to_string(),
            })
            .send()
            .await?;
        let body: DeepDiveResponse = Self::decode(response).await?;
        Ok(body.summary)
    }
}

#[cfg(test)]
#[path = "tests/backend_tests.rs"]
mod tests;
