use std::{fs, path::Path};

use anyhow::Context;
use serde::Deserialize;
use shared::domain::DEFAULT_THEME_CAP;

pub const SETTINGS_FILE: &str = "research.toml";
const DEFAULT_API_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub api_url: String,
    pub request_timeout_secs: u64,
    pub theme_cap: usize,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            // A research run searches five sources sequentially.
            request_timeout_secs: 120,
            theme_cap: DEFAULT_THEME_CAP,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    api_url: Option<String>,
    request_timeout_secs: Option<u64>,
    theme_cap: Option<usize>,
}

/// Defaults, then `research.toml` in the working directory, then the environment.
pub fn load_settings() -> ClientSettings {
    let mut settings = ClientSettings::default();
    if let Ok(raw) = fs::read_to_string(SETTINGS_FILE) {
        if let Err(err) = apply_file(&mut settings, &raw) {
            tracing::warn!(error = %err, file = SETTINGS_FILE, "ignoring unreadable settings file");
        }
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

/// Like [`load_settings`] but the file must exist and parse.
pub fn load_settings_from(path: &Path) -> anyhow::Result<ClientSettings> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings file '{}'", path.display()))?;
    let mut settings = ClientSettings::default();
    apply_file(&mut settings, &raw)
        .with_context(|| format!("failed to parse settings file '{}'", path.display()))?;
    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_file(settings: &mut ClientSettings, raw: &str) -> anyhow::Result<()> {
    let file: SettingsFile = toml::from_str(raw)?;
    if let Some(v) = file.api_url {
        settings.api_url = normalize_api_url(&v);
    }
    if let Some(v) = file.request_timeout_secs.filter(|secs| *secs > 0) {
        settings.request_timeout_secs = v;
    }
    if let Some(v) = file.theme_cap.filter(|cap| *cap > 0) {
        settings.theme_cap = v;
    }
    Ok(())
}

fn apply_env(settings: &mut ClientSettings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("RESEARCH_API_URL") {
        settings.api_url = normalize_api_url(&v);
    }
    if let Some(v) = lookup("APP__API_URL") {
        settings.api_url = normalize_api_url(&v);
    }

    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.trim().parse::<u64>() {
            if parsed > 0 {
                settings.request_timeout_secs = parsed;
            }
        }
    }

    if let Some(v) = lookup("APP__THEME_CAP") {
        if let Ok(parsed) = v.trim().parse::<usize>() {
            if parsed > 0 {
                settings.theme_cap = parsed;
            }
        }
    }
}

pub fn normalize_api_url(raw: &str) -> String {
    let raw = raw.trim().trim_end_matches('/');
    if raw.is_empty() {
        return ClientSettings::default().api_url;
    }
    if raw.contains("://") {
        return raw.to_string();
    }
    format!("http://{raw}")
}
