use std::sync::Arc;

use shared::domain::{Run, RunId, Theme};
use tokio::sync::{broadcast, Mutex};
use tracing::debug;

use crate::{
    backend::ResearchBackend,
    error::ClientError,
    notice::{report, NoticeContext},
    slot::RequestSlot,
    ClientEvent,
};

/// A past run paired with its theme as it exists now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoricalRun {
    pub run: Run,
    /// `None` once the theme has been deleted; the run still renders by its
    /// snapshotted name but cannot be re-run.
    pub theme: Option<Theme>,
}

impl HistoricalRun {
    /// Resolves `run.theme_id` against the current theme list.
    pub fn resolve(run: Run, themes: &[Theme]) -> Self {
        let theme = themes.iter().find(|theme| theme.id == run.theme_id).cloned();
        Self { run, theme }
    }

    pub fn can_run_again(&self) -> bool {
        self.theme.is_some()
    }
}

struct HistoryState {
    runs: Vec<Run>,
    slot: RequestSlot,
}

pub struct HistoryCache {
    backend: Arc<dyn ResearchBackend>,
    events: broadcast::Sender<ClientEvent>,
    inner: Mutex<HistoryState>,
}

impl HistoryCache {
    pub fn new(backend: Arc<dyn ResearchBackend>, events: broadcast::Sender<ClientEvent>) -> Self {
        Self {
            backend,
            events,
            inner: Mutex::new(HistoryState {
                runs: Vec::new(),
                slot: RequestSlot::default(),
            }),
        }
    }

    /// Newest first.
    pub async fn runs(&self) -> Vec<Run> {
        self.inner.lock().await.runs.clone()
    }

    pub async fn find(&self, id: &RunId) -> Option<Run> {
        self.inner
            .lock()
            .await
            .runs
            .iter()
            .find(|run| &run.id == id)
            .cloned()
    }

    /// Re-fetches and re-orders newest first. The backend stores oldest first
    /// and that is reversed on every refresh, never assumed.
    pub async fn refresh(&self) -> Result<Vec<Run>, ClientError> {
        let token = self.inner.lock().await.slot.issue();
        let result = self.backend.list_runs().await;

        let mut guard = self.inner.lock().await;
        if !guard.slot.settle(token) {
            debug!("discarding superseded run history response");
            return Ok(guard.runs.clone());
        }
        let mut runs = result.map_err(|err| report(&self.events, NoticeContext::ListHistory, err))?;
        runs.reverse();
        guard.runs = runs.clone();
        let _ = self
            .events
            .send(ClientEvent::HistoryChanged { runs: runs.len() });
        Ok(runs)
    }

    /// Fetches a single run straight from the backend, bypassing the cache.
    pub async fn fetch_run(&self, id: &RunId) -> Result<Run, ClientError> {
        self.backend
            .fetch_run(id)
            .await
            .map_err(|err| report(&self.events, NoticeContext::FetchRun, err))
    }

    /// Looks `id` up in the cache and pairs it with its live theme, if any.
    pub async fn load(&self, id: &RunId, themes: &[Theme]) -> Option<HistoricalRun> {
        let run = self.find(id).await?;
        Some(HistoricalRun::resolve(run, themes))
    }
}

#[cfg(test)]
#[path = "tests/history_tests.rs"]
mod tests;
