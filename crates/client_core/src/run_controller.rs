//! Drives research runs for the selected theme.

use std::sync::Arc;

use shared::domain::{Run, Theme, ThemeId};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};

use crate::{
    backend::ResearchBackend,
    buckets::{aggregate_known, BucketView},
    error::ClientError,
    notice::{report, NoticeContext},
    slot::RequestSlot,
    ClientEvent,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Dispatching,
    Awaiting,
    Settled,
    /// The last dispatch failed. A resting phase like `Idle`: nothing is in
    /// flight and the same theme may be run again.
    Failed,
}

impl RunPhase {
    pub fn is_pending(self) -> bool {
        matches!(self, RunPhase::Dispatching | RunPhase::Awaiting)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Settled(Run),
    /// A newer run or a different selection took over; the response was dropped.
    Superseded,
}

/// Read-only snapshot of what the run view should show.
#[derive(Debug, Clone)]
pub struct RunView {
    pub phase: RunPhase,
    /// Copy of the selected theme; `None` when a loaded run's theme is gone.
    pub theme: Option<Theme>,
    pub run: Option<Run>,
    pub last_error: Option<String>,
}

impl RunView {
    /// Showing an older run while a new one is on its way.
    pub fn is_stale_pending(&self) -> bool {
        self.phase.is_pending() && self.run.is_some()
    }

    pub fn can_run_again(&self) -> bool {
        self.theme.is_some()
    }

    pub fn title(&self) -> Option<&str> {
        self.theme
            .as_ref()
            .map(|theme| theme.name.as_str())
            .or_else(|| self.run.as_ref().map(|run| run.theme_name.as_str()))
    }

    pub fn buckets(&self) -> Vec<BucketView> {
        self.run.as_ref().map(aggregate_known).unwrap_or_default()
    }
}

struct RunControllerState {
    phase: RunPhase,
    selected: Option<Theme>,
    current: Option<Run>,
    last_error: Option<String>,
    slot: RequestSlot,
}

pub struct RunController {
    backend: Arc<dyn ResearchBackend>,
    events: broadcast::Sender<ClientEvent>,
    inner: Mutex<RunControllerState>,
}

impl RunController {
    pub fn new(backend: Arc<dyn ResearchBackend>, events: broadcast::Sender<ClientEvent>) -> Self {
        Self {
            backend,
            events,
            inner: Mutex::new(RunControllerState {
                phase: RunPhase::Idle,
                selected: None,
                current: None,
                last_error: None,
                slot: RequestSlot::default(),
            }),
        }
    }

    pub async fn view(&self) -> RunView {
        let guard = self.inner.lock().await;
        RunView {
            phase: guard.phase,
            theme: guard.selected.clone(),
            run: guard.current.clone(),
            last_error: guard.last_error.clone(),
        }
    }

    pub async fn phase(&self) -> RunPhase {
        self.inner.lock().await.phase
    }

    pub async fn selected_theme_id(&self) -> Option<ThemeId> {
        self.inner
            .lock()
            .await
            .selected
            .as_ref()
            .map(|theme| theme.id.clone())
    }

    /// Switching themes clears the view and orphans any run in flight.
    pub async fn select(&self, theme: Theme) {
        let mut guard = self.inner.lock().await;
        if guard.selected.as_ref().map(|t| &t.id) == Some(&theme.id) {
            guard.selected = Some(theme);
            return;
        }
        guard.slot.invalidate();
        guard.selected = Some(theme);
        guard.current = None;
        guard.last_error = None;
        self.set_phase(&mut guard, RunPhase::Idle);
    }

    pub async fn run(&self, theme: Theme) -> Result<RunOutcome, ClientError> {
        self.select(theme).await;
        self.run_selected().await
    }

    /// Dispatches for the selected theme. The previous run stays visible until
    /// the new one replaces it whole.
    pub async fn run_selected(&self) -> Result<RunOutcome, ClientError> {
        let (token, theme_id) = {
            let mut guard = self.inner.lock().await;
            let theme_id = guard
                .selected
                .as_ref()
                .map(|theme| theme.id.clone())
                .ok_or(ClientError::NoThemeSelected)
                .map_err(|err| report(&self.events, NoticeContext::RunResearch, err))?;
            let token = guard.slot.issue();
            guard.last_error = None;
            self.set_phase(&mut guard, RunPhase::Dispatching);
            (token, theme_id)
        };

        {
            let mut guard = self.inner.lock().await;
            if guard.slot.is_current(token) {
                self.set_phase(&mut guard, RunPhase::Awaiting);
            }
        }

        info!(theme_id = %theme_id, "dispatching research run");
        let result = self.backend.run_research(&theme_id).await;

        let mut guard = self.inner.lock().await;
        if !guard.slot.settle(token) {
            debug!(theme_id = %theme_id, "discarding superseded research run response");
            return Ok(RunOutcome::Superseded);
        }
        match result {
            Ok(run) => {
                info!(run_id = %run.id, theme_id = %theme_id, "research run settled");
                guard.current = Some(run.clone());
                self.set_phase(&mut guard, RunPhase::Settled);
                Ok(RunOutcome::Settled(run))
            }
            Err(err) => {
                guard.last_error = Some(err.to_string());
                self.set_phase(&mut guard, RunPhase::Failed);
                Err(report(&self.events, NoticeContext::RunResearch, err))
            }
        }
    }

    /// Shows a run from history. `theme` is the live theme it belongs to, if it
    /// still exists.
    pub async fn show_historical(&self, run: Run, theme: Option<Theme>) {
        let mut guard = self.inner.lock().await;
        guard.slot.invalidate();
        guard.selected = theme;
        guard.current = Some(run);
        guard.last_error = None;
        self.set_phase(&mut guard, RunPhase::Settled);
    }

    /// Swaps the held theme copy for the fresh one from `themes`, or drops it
    /// when the theme is gone. The displayed run is kept either way.
    pub async fn reconcile_selection(&self, themes: &[Theme]) {
        let mut guard = self.inner.lock().await;
        let Some(selected_id) = guard.selected.as_ref().map(|t| t.id.clone()) else {
            return;
        };
        match themes.iter().find(|theme| theme.id == selected_id) {
            Some(fresh) => guard.selected = Some(fresh.clone()),
            None => {
                debug!(theme_id = %selected_id, "selected theme no longer exists");
                guard.selected = None;
                if guard.current.is_none() {
                    guard.slot.invalidate();
                    self.set_phase(&mut guard, RunPhase::Idle);
                }
            }
        }
    }

    /// Phase changes are announced under the state lock so listeners see
    /// them in write order.
    fn set_phase(&self, state: &mut RunControllerState, phase: RunPhase) {
        state.phase = phase;
        let _ = self.events.send(ClientEvent::RunStateChanged(phase));
    }
}

#[cfg(test)]
#[path = "tests/run_controller_tests.rs"]
mod tests;
