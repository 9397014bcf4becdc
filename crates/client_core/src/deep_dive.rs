//! Deep-dive overlay: one summary request at a time, independent of runs.

use std::sync::Arc;

use shared::domain::DeepDiveResult;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};

use crate::{
    backend::ResearchBackend,
    error::ClientError,
    notice::{report, NoticeContext},
    slot::RequestSlot,
    ClientEvent,
};

/// Spinner and summary live in one value so they cannot disagree.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DeepDiveOverlay {
    #[default]
    Closed,
    Diving {
        href: String,
    },
    Summarized(DeepDiveResult),
    /// The request failed; the overlay is closed and a notice was raised.
    ClosedOnError {
        href: String,
    },
}

impl DeepDiveOverlay {
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            DeepDiveOverlay::Diving { .. } | DeepDiveOverlay::Summarized(_)
        )
    }

    pub fn is_diving(&self) -> bool {
        matches!(self, DeepDiveOverlay::Diving { .. })
    }

    pub fn summary(&self) -> Option<&str> {
        match self {
            DeepDiveOverlay::Summarized(result) => Some(&result.summary),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeepDiveOutcome {
    Summarized(DeepDiveResult),
    Superseded,
}

struct DeepDiveState {
    overlay: DeepDiveOverlay,
    slot: RequestSlot,
}

pub struct DeepDive {
    backend: Arc<dyn ResearchBackend>,
    events: broadcast::Sender<ClientEvent>,
    inner: Mutex<DeepDiveState>,
}

impl DeepDive {
    pub fn new(backend: Arc<dyn ResearchBackend>, events: broadcast::Sender<ClientEvent>) -> Self {
        Self {
            backend,
            events,
            inner: Mutex::new(DeepDiveState {
                overlay: DeepDiveOverlay::Closed,
                slot: RequestSlot::default(),
            }),
        }
    }

    pub async fn overlay(&self) -> DeepDiveOverlay {
        self.inner.lock().await.overlay.clone()
    }

    /// Opens the overlay for `href`, superseding any dive still in flight.
    pub async fn open(&self, href: &str) -> Result<DeepDiveOutcome, ClientError> {
        let token = {
            let mut guard = self.inner.lock().await;
            let token = guard.slot.issue();
            self.set(
                &mut guard,
                DeepDiveOverlay::Diving {
                    href: href.to_string(),
                },
            );
            token
        };

        info!(href, "requesting deep dive");
        let result = self.backend.deep_dive(href).await;

        let mut guard = self.inner.lock().await;
        if !guard.slot.settle(token) {
            debug!(href, "discarding superseded deep dive response");
            return Ok(DeepDiveOutcome::Superseded);
        }
        match result {
            Ok(summary) => {
                let dive = DeepDiveResult {
                    href: href.to_string(),
                    summary,
                };
                self.set(&mut guard, DeepDiveOverlay::Summarized(dive.clone()));
                Ok(DeepDiveOutcome::Summarized(dive))
            }
            Err(err) => {
                self.set(
                    &mut guard,
                    DeepDiveOverlay::ClosedOnError {
                        href: href.to_string(),
                    },
                );
                Err(report(&self.events, NoticeContext::DeepDive, err))
            }
        }
    }

    /// Clears summary and in-flight state together; a late response is dropped.
    pub async fn close(&self) {
        let mut guard = self.inner.lock().await;
        guard.slot.invalidate();
        self.set(&mut guard, DeepDiveOverlay::Closed);
    }

    /// Writes the overlay and announces it under the same lock, so listeners
    /// see changes in the order they were made.
    fn set(&self, state: &mut DeepDiveState, overlay: DeepDiveOverlay) {
        state.overlay = overlay.clone();
        let _ = self.events.send(ClientEvent::DeepDiveChanged(overlay));
    }
}

#[cfg(test)]
#[path = "tests/deep_dive_tests.rs"]
mod tests;
