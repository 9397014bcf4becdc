use std::fmt::Write as _;

use client_core::{aggregate_known, HistoricalRun, RunView};
use shared::domain::{Run, Theme};

pub fn theme_table(themes: &[Theme], count_label: &str) -> String {
    let mut out = format!("Themes {count_label}\n");
    if themes.is_empty() {
        out.push_str("  (none)\n");
        return out;
    }
    for theme in themes {
        let _ = writeln!(
            out,
            "  {:<8} {:<12} {:<32} {:<8} {}",
            theme.status,
            theme.id,
            theme.name,
            theme.schedule,
            theme.keywords.join(", ")
        );
    }
    out
}

/// Advisory only; creating past the cap is still allowed.
pub fn capacity_hint(cap: usize) -> String {
    format!("Theme limit reached ({cap}). New themes are still accepted.")
}

pub fn history_table(runs: &[Run]) -> String {
    if runs.is_empty() {
        return "No runs yet.\n".to_string();
    }
    let mut out = String::new();
    for run in runs {
        let when = run
            .recorded_at()
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| run.timestamp.clone());
        let _ = writeln!(out, "  {:<16} {:<12} {}", when, run.id, run.theme_name);
    }
    out
}

fn run_body(out: &mut String, run: &Run) {
    for bucket in aggregate_known(run) {
        let _ = writeln!(out, "\n== {} ==", bucket.meta.label);
        if let Some(summary) = &bucket.summary {
            let _ = writeln!(out, "{summary}");
        }
        if bucket.is_empty() {
            out.push_str("  no results\n");
            continue;
        }
        for result in &bucket.results {
            let source = result.host.as_deref().unwrap_or("unknown source");
            let _ = writeln!(out, "  - {} [{}]", result.title, source);
            let _ = writeln!(out, "    {}", result.href);
        }
    }
}

pub fn run_view(view: &RunView) -> String {
    let mut out = String::new();
    if let Some(title) = view.title() {
        let _ = writeln!(out, "Research: {title}");
    }
    if let Some(err) = &view.last_error {
        let _ = writeln!(out, "Last run failed: {err}");
    }
    match &view.run {
        Some(run) => {
            let _ = writeln!(out, "Run {} at {}", run.id, run.timestamp);
            run_body(&mut out, run);
        }
        None => out.push_str("No results to show.\n"),
    }
    out
}

pub fn historical(loaded: &HistoricalRun) -> String {
    let mut out = format!(
        "Run {} for {} at {}\n",
        loaded.run.id, loaded.run.theme_name, loaded.run.timestamp
    );
    if !loaded.can_run_again() {
        out.push_str("(theme deleted; cannot run again)\n");
    }
    run_body(&mut out, &loaded.run);
    out
}
