//! Orchestration core for the research themes client: theme management, research
//! runs, run history and deep dives against a research backend.

use shared::domain::Theme;

pub mod backend;
pub mod buckets;
pub mod config;
pub mod confirm;
pub mod deep_dive;
pub mod error;
pub mod history;
pub mod notice;
pub mod run_controller;
pub mod session;
pub mod slot;
pub mod theme_store;

pub use backend::{DocumentUpload, HttpBackend, ResearchBackend};
pub use buckets::{aggregate, aggregate_known, display_host, BucketMeta, BucketView, ResultView};
pub use config::{load_settings, ClientSettings};
pub use confirm::{AlwaysConfirm, Confirmation, Confirmer, NeverConfirm};
pub use deep_dive::{DeepDive, DeepDiveOutcome, DeepDiveOverlay};
pub use error::{ClientError, RequestKind};
pub use history::{HistoricalRun, HistoryCache};
pub use notice::{Notice, NoticeContext, NoticeKind};
pub use run_controller::{RunController, RunOutcome, RunPhase, RunView};
pub use session::ResearchSession;
pub use theme_store::{parse_keywords, ThemeDraft, ThemeEdit, ThemeStore};

/// Broadcast to views whenever a piece of client state changes.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    ThemesChanged(Vec<Theme>),
    RunStateChanged(RunPhase),
    HistoryChanged { runs: usize },
    DeepDiveChanged(DeepDiveOverlay),
    Notice(Notice),
}

#[cfg(test)]
#[path = "tests/fake_backend.rs"]
mod fake_backend;
