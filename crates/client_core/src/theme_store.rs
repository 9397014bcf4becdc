//! Canonical theme list and every mutation made against it.
//!
//! The store never edits its list locally: each successful mutation is followed
//! by a full re-fetch, so the backend stays the only source of truth. Mutations
//! aimed at the same theme are serialized by refusing a second one while the
//! first is in flight.

use std::{
    collections::{BTreeSet, HashSet},
    sync::{Arc, Mutex as StdMutex, PoisonError},
};

use shared::{
    domain::{Schedule, Theme, ThemeId, ThemeStatus},
    protocol::{CreateThemeRequest, UpdateThemeRequest, UploadResponse},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};

use crate::{
    backend::{DocumentUpload, ResearchBackend},
    confirm::{Confirmation, Confirmer},
    error::ClientError,
    notice::{report, NoticeContext},
    slot::RequestSlot,
    ClientEvent,
};

/// Splits a comma separated keyword field. Empty tokens are kept as given.
pub fn parse_keywords(raw: &str) -> Vec<String> {
    raw.split(',').map(|k| k.trim().to_string()).collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThemeDraft {
    pub name: String,
    pub description: String,
    /// Comma separated, as typed.
    pub keywords: String,
    pub schedule: Schedule,
}

impl ThemeDraft {
    fn into_request(self) -> Result<CreateThemeRequest, ClientError> {
        if self.name.is_empty() || self.description.is_empty() {
            return Err(ClientError::Validation(
                "Please fill in name and description.".to_string(),
            ));
        }
        Ok(CreateThemeRequest {
            keywords: parse_keywords(&self.keywords),
            name: self.name,
            description: self.description,
            schedule: self.schedule,
        })
    }
}

/// Fields to change on a theme; everything left `None` is carried over.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThemeEdit {
    pub name: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub schedule: Option<Schedule>,
    pub status: Option<ThemeStatus>,
}

impl ThemeEdit {
    pub fn status(status: ThemeStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Merges onto `current` into the complete record the backend requires.
    pub fn apply(&self, current: &Theme) -> Result<UpdateThemeRequest, ClientError> {
        let mut request = UpdateThemeRequest::from(current);
        if let Some(name) = &self.name {
            request.name = name.clone();
        }
        if let Some(description) = &self.description {
            request.description = description.clone();
        }
        if let Some(keywords) = &self.keywords {
            request.keywords = keywords.clone();
        }
        if let Some(schedule) = self.schedule {
            request.schedule = schedule;
        }
        if let Some(status) = self.status {
            request.status = status;
        }
        if request.name.is_empty() || request.description.is_empty() {
            return Err(ClientError::Validation(
                "Theme name and description cannot be empty.".to_string(),
            ));
        }
        Ok(request)
    }
}

struct ThemeStoreState {
    themes: Vec<Theme>,
    list_slot: RequestSlot,
    selection: BTreeSet<ThemeId>,
}

/// Holds the ids of in-flight mutations until dropped.
struct MutationGuard<'a> {
    busy: &'a StdMutex<HashSet<ThemeId>>,
    ids: Vec<ThemeId>,
}

impl Drop for MutationGuard<'_> {
    fn drop(&mut self) {
        let mut busy = self.busy.lock().unwrap_or_else(PoisonError::into_inner);
        for id in &self.ids {
            busy.remove(id);
        }
    }
}

pub struct ThemeStore {
    backend: Arc<dyn ResearchBackend>,
    confirmer: Arc<dyn Confirmer>,
    events: broadcast::Sender<ClientEvent>,
    cap: usize,
    inner: Mutex<ThemeStoreState>,
    busy: StdMutex<HashSet<ThemeId>>,
}

impl ThemeStore {
    pub fn new(
        backend: Arc<dyn ResearchBackend>,
        confirmer: Arc<dyn Confirmer>,
        events: broadcast::Sender<ClientEvent>,
        cap: usize,
    ) -> Self {
        Self {
            backend,
            confirmer,
            events,
            cap,
            inner: Mutex::new(ThemeStoreState {
                themes: Vec::new(),
                list_slot: RequestSlot::default(),
                selection: BTreeSet::new(),
            }),
            busy: StdMutex::new(HashSet::new()),
        }
    }

    pub async fn themes(&self) -> Vec<Theme> {
        self.inner.lock().await.themes.clone()
    }

    pub async fn theme(&self, id: &ThemeId) -> Option<Theme> {
        self.inner
            .lock()
            .await
            .themes
            .iter()
            .find(|theme| &theme.id == id)
            .cloned()
    }

    pub async fn active_themes(&self) -> Vec<Theme> {
        self.inner
            .lock()
            .await
            .themes
            .iter()
            .filter(|theme| theme.is_active())
            .cloned()
            .collect()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    /// `"2/3"` style indicator.
    pub async fn count_label(&self) -> String {
        format!("{}/{}", self.inner.lock().await.themes.len(), self.cap)
    }

    pub async fn at_capacity(&self) -> bool {
        self.inner.lock().await.themes.len() >= self.cap
    }

    /// Whether controls for `id` should be disabled.
    pub fn is_busy(&self, id: &ThemeId) -> bool {
        self.busy
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(id)
    }

    pub async fn selection(&self) -> Vec<ThemeId> {
        self.inner.lock().await.selection.iter().cloned().collect()
    }

    /// Returns whether `id` is selected afterwards.
    pub async fn toggle_selection(&self, id: &ThemeId) -> bool {
        let mut guard = self.inner.lock().await;
        if guard.selection.remove(id) {
            false
        } else {
            guard.selection.insert(id.clone());
            true
        }
    }

    pub async fn clear_selection(&self) {
        self.inner.lock().await.selection.clear();
    }

    /// Re-fetches the list. On failure the previous list is kept; a response
    /// overtaken by a newer fetch is dropped.
    pub async fn refresh(&self) -> Result<Vec<Theme>, ClientError> {
        let token = self.inner.lock().await.list_slot.issue();
        let result = self.backend.list_themes().await;

        let mut guard = self.inner.lock().await;
        if !guard.list_slot.settle(token) {
            debug!("discarding superseded theme list response");
            return Ok(guard.themes.clone());
        }
        let themes = result.map_err(|err| report(&self.events, NoticeContext::ListThemes, err))?;
        guard.themes = themes.clone();
        let ThemeStoreState {
            themes: current,
            selection,
            ..
        } = &mut *guard;
        selection.retain(|id| current.iter().any(|theme| &theme.id == id));
        // Sent under the lock so listeners see lists in the order they were stored.
        let _ = self.events.send(ClientEvent::ThemesChanged(themes.clone()));
        Ok(themes)
    }

    pub async fn create(&self, draft: ThemeDraft) -> Result<Theme, ClientError> {
        let request = draft
            .into_request()
            .map_err(|err| report(&self.events, NoticeContext::CreateTheme, err))?;
        info!(name = %request.name, "creating theme");
        let created = self
            .backend
            .create_theme(request)
            .await
            .map_err(|err| report(&self.events, NoticeContext::CreateTheme, err))?;
        self.refresh_after_mutation().await;
        Ok(created)
    }

    pub async fn update(&self, id: &ThemeId, edit: ThemeEdit) -> Result<Theme, ClientError> {
        self.update_in_context(id, edit, NoticeContext::UpdateTheme)
            .await
    }

    /// "Stop schedule": an update back to draft with the full record.
    pub async fn deactivate(&self, id: &ThemeId) -> Result<Theme, ClientError> {
        self.update_in_context(
            id,
            ThemeEdit::status(ThemeStatus::Draft),
            NoticeContext::DeactivateTheme,
        )
        .await
    }

    async fn update_in_context(
        &self,
        id: &ThemeId,
        edit: ThemeEdit,
        context: NoticeContext,
    ) -> Result<Theme, ClientError> {
        let guard = self.begin_mutation(std::slice::from_ref(id))?;
        let request = {
            let current = self
                .theme(id)
                .await
                .ok_or_else(|| ClientError::UnknownTheme(id.clone()))
                .map_err(|err| report(&self.events, context, err))?;
            edit.apply(&current)
                .map_err(|err| report(&self.events, context, err))?
        };

        info!(theme_id = %id, status = %request.status, "updating theme");
        let result = self.backend.update_theme(id, request).await;
        drop(guard);

        let updated = result.map_err(|err| report(&self.events, context, err))?;
        self.refresh_after_mutation().await;
        Ok(updated)
    }

    /// The activation rule is the backend's; a refusal is passed on verbatim.
    pub async fn activate(&self, id: &ThemeId) -> Result<(), ClientError> {
        let guard = self.begin_mutation(std::slice::from_ref(id))?;
        info!(theme_id = %id, "activating theme");
        let result = self.backend.activate_theme(id).await;
        drop(guard);

        result.map_err(|err| report(&self.events, NoticeContext::ActivateTheme, err))?;
        // Activation may flip other themes as a side effect.
        self.refresh_after_mutation().await;
        Ok(())
    }

    pub async fn delete(&self, id: &ThemeId) -> Result<(), ClientError> {
        let guard = self.begin_mutation(std::slice::from_ref(id))?;
        let name = self
            .theme(id)
            .await
            .map(|theme| theme.name)
            .unwrap_or_else(|| id.to_string());
        self.confirm(&Confirmation::DeleteTheme { name }).await?;

        info!(theme_id = %id, "deleting theme");
        let result = self.backend.delete_theme(id).await;
        drop(guard);

        match result {
            Ok(()) => {
                self.refresh_after_mutation().await;
                Ok(())
            }
            Err(err) => {
                let err = report(&self.events, NoticeContext::DeleteTheme, err);
                self.refresh_after_mutation().await;
                Err(err)
            }
        }
    }

    /// All-or-nothing from the client's side: on any failure the list is
    /// re-fetched instead of guessing which ids went through.
    pub async fn bulk_delete(&self, ids: &[ThemeId]) -> Result<(), ClientError> {
        self.bulk_delete_confirmed(ids, Confirmation::DeleteSelected { count: ids.len() })
            .await
    }

    pub async fn delete_selected(&self) -> Result<(), ClientError> {
        let ids = self.selection().await;
        self.bulk_delete(&ids).await
    }

    pub async fn clear_all(&self) -> Result<(), ClientError> {
        let ids: Vec<ThemeId> = self
            .themes()
            .await
            .into_iter()
            .map(|theme| theme.id)
            .collect();
        self.bulk_delete_confirmed(&ids, Confirmation::ClearAll { count: ids.len() })
            .await
    }

    async fn bulk_delete_confirmed(
        &self,
        ids: &[ThemeId],
        confirmation: Confirmation,
    ) -> Result<(), ClientError> {
        if ids.is_empty() {
            return Ok(());
        }
        let guard = self.begin_mutation(ids)?;
        self.confirm(&confirmation).await?;

        info!(count = ids.len(), "deleting themes");
        let result = self.backend.bulk_delete_themes(ids).await;
        drop(guard);

        let outcome = match result {
            Ok(()) => {
                let mut state = self.inner.lock().await;
                for id in ids {
                    state.selection.remove(id);
                }
                Ok(())
            }
            Err(err) => Err(report(&self.events, NoticeContext::DeleteThemes, err)),
        };
        self.refresh_after_mutation().await;
        outcome
    }

    /// The backend extracts themes from the document; the list is re-fetched after.
    pub async fn upload_document(
        &self,
        upload: DocumentUpload,
    ) -> Result<UploadResponse, ClientError> {
        info!(filename = %upload.filename, bytes = upload.bytes.len(), "uploading document");
        let response = self
            .backend
            .upload_document(upload)
            .await
            .map_err(|err| report(&self.events, NoticeContext::UploadDocument, err))?;
        self.refresh_after_mutation().await;
        Ok(response)
    }

    fn begin_mutation(&self, ids: &[ThemeId]) -> Result<MutationGuard<'_>, ClientError> {
        let mut busy = self.busy.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(taken) = ids.iter().find(|id| busy.contains(*id)) {
            debug!(theme_id = %taken, "refusing overlapping mutation");
            return Err(ClientError::Busy(taken.clone()));
        }
        busy.extend(ids.iter().cloned());
        Ok(MutationGuard {
            busy: &self.busy,
            ids: ids.to_vec(),
        })
    }

    async fn confirm(&self, confirmation: &Confirmation) -> Result<(), ClientError> {
        if self.confirmer.confirm(confirmation).await {
            Ok(())
        } else {
            debug!(action = confirmation.action(), "destructive action declined");
            Err(ClientError::Declined(confirmation.action().to_string()))
        }
    }

    async fn refresh_after_mutation(&self) {
        // Failures are already reported as notices by `refresh`.
        if let Err(err) = self.refresh().await {
            debug!(error = %err, "theme list refresh after mutation failed");
        }
    }
}

#[cfg(test)]
#[path = "tests/theme_store_tests.rs"]
mod tests;
