//! Wires the theme store, run controller, history cache and deep dive together
//! the way a view uses them.

use std::sync::Arc;

use shared::{
    domain::{Run, RunId, Theme, ThemeId},
    protocol::UploadResponse,
};
use tokio::sync::broadcast;
use tracing::debug;

use crate::{
    backend::{DocumentUpload, HttpBackend, ResearchBackend},
    config::ClientSettings,
    confirm::Confirmer,
    deep_dive::{DeepDive, DeepDiveOutcome},
    error::ClientError,
    history::{HistoricalRun, HistoryCache},
    notice::{report, NoticeContext},
    run_controller::{RunController, RunOutcome},
    theme_store::{ThemeDraft, ThemeEdit, ThemeStore},
    ClientEvent,
};

pub struct ResearchSession {
    themes: ThemeStore,
    runs: RunController,
    history: HistoryCache,
    deep_dive: DeepDive,
    events: broadcast::Sender<ClientEvent>,
}

impl ResearchSession {
    pub fn new(
        backend: Arc<dyn ResearchBackend>,
        confirmer: Arc<dyn Confirmer>,
        theme_cap: usize,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            themes: ThemeStore::new(backend.clone(), confirmer, events.clone(), theme_cap),
            runs: RunController::new(backend.clone(), events.clone()),
            history: HistoryCache::new(backend.clone(), events.clone()),
            deep_dive: DeepDive::new(backend, events.clone()),
            events,
        })
    }

    pub fn connect(
        settings: &ClientSettings,
        confirmer: Arc<dyn Confirmer>,
    ) -> Result<Arc<Self>, ClientError> {
        let backend = HttpBackend::from_settings(settings)?;
        Ok(Self::new(Arc::new(backend), confirmer, settings.theme_cap))
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub fn themes(&self) -> &ThemeStore {
        &self.themes
    }

    pub fn runs(&self) -> &RunController {
        &self.runs
    }

    pub fn history(&self) -> &HistoryCache {
        &self.history
    }

    pub fn deep_dive(&self) -> &DeepDive {
        &self.deep_dive
    }

    /// Initial load of themes and history, side by side.
    pub async fn bootstrap(&self) -> Result<(), ClientError> {
        let (themes, history) = futures::join!(self.themes.refresh(), self.history.refresh());
        let themes = themes?;
        self.runs.reconcile_selection(&themes).await;
        history.map(|_| ())
    }

    pub async fn create_theme(&self, draft: ThemeDraft) -> Result<Theme, ClientError> {
        let result = self.themes.create(draft).await;
        self.sync_selection().await;
        result
    }

    pub async fn update_theme(&self, id: &ThemeId, edit: ThemeEdit) -> Result<Theme, ClientError> {
        let result = self.themes.update(id, edit).await;
        self.sync_selection().await;
        result
    }

    pub async fn activate_theme(&self, id: &ThemeId) -> Result<(), ClientError> {
        let result = self.themes.activate(id).await;
        self.sync_selection().await;
        result
    }

    pub async fn stop_schedule(&self, id: &ThemeId) -> Result<Theme, ClientError> {
        let result = self.themes.deactivate(id).await;
        self.sync_selection().await;
        result
    }

    pub async fn delete_theme(&self, id: &ThemeId) -> Result<(), ClientError> {
        let result = self.themes.delete(id).await;
        self.sync_selection().await;
        result
    }

    pub async fn delete_themes(&self, ids: &[ThemeId]) -> Result<(), ClientError> {
        let result = self.themes.bulk_delete(ids).await;
        self.sync_selection().await;
        result
    }

    pub async fn delete_selected_themes(&self) -> Result<(), ClientError> {
        let result = self.themes.delete_selected().await;
        self.sync_selection().await;
        result
    }

    pub async fn clear_themes(&self) -> Result<(), ClientError> {
        let result = self.themes.clear_all().await;
        self.sync_selection().await;
        result
    }

    pub async fn upload_document(
        &self,
        upload: DocumentUpload,
    ) -> Result<UploadResponse, ClientError> {
        let result = self.themes.upload_document(upload).await;
        self.sync_selection().await;
        result
    }

    pub async fn select_theme(&self, id: &ThemeId) -> Result<Theme, ClientError> {
        let theme = self.live_theme(id).await?;
        self.runs.select(theme.clone()).await;
        Ok(theme)
    }

    /// Runs research for `id`; a settled run also refreshes the history.
    pub async fn run_theme(&self, id: &ThemeId) -> Result<RunOutcome, ClientError> {
        let theme = self
            .live_theme(id)
            .await
            .map_err(|err| report(&self.events, NoticeContext::RunResearch, err))?;
        let outcome = self.runs.run(theme).await?;
        self.after_run(&outcome).await;
        Ok(outcome)
    }

    /// Re-runs whatever theme is selected.
    pub async fn run_again(&self) -> Result<RunOutcome, ClientError> {
        let outcome = self.runs.run_selected().await?;
        self.after_run(&outcome).await;
        Ok(outcome)
    }

    /// Puts a cached run in the view without asking the backend again.
    pub async fn load_run(&self, id: &RunId) -> Result<HistoricalRun, ClientError> {
        let themes = self.themes.themes().await;
        let loaded = match self.history.load(id, &themes).await {
            Some(loaded) => loaded,
            None => {
                let run = self.history.fetch_run(id).await?;
                HistoricalRun::resolve(run, &themes)
            }
        };
        self.runs
            .show_historical(loaded.run.clone(), loaded.theme.clone())
            .await;
        Ok(loaded)
    }

    pub async fn open_deep_dive(&self, href: &str) -> Result<DeepDiveOutcome, ClientError> {
        self.deep_dive.open(href).await
    }

    pub async fn close_deep_dive(&self) {
        self.deep_dive.close().await;
    }

    pub async fn history_runs(&self) -> Vec<Run> {
        self.history.runs().await
    }

    async fn after_run(&self, outcome: &RunOutcome) {
        if let RunOutcome::Settled(run) = outcome {
            debug!(run_id = %run.id, "refreshing history after run");
            // Failures are reported as notices by the cache itself.
            let _ = self.history.refresh().await;
        }
    }

    async fn live_theme(&self, id: &ThemeId) -> Result<Theme, ClientError> {
        self.themes
            .theme(id)
            .await
            .ok_or_else(|| ClientError::UnknownTheme(id.clone()))
    }

    async fn sync_selection(&self) {
        let themes = self.themes.themes().await;
        self.runs.reconcile_selection(&themes).await;
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
