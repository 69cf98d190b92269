//! Installation status check.
//!
//! The last result is kept in `status.json` under the state directory, so
//! repeated calls only probe once the cached positive result has expired.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;
use wsa_core::{
    load_cached_status, save_cached_status, CachedStatus, InstallationStatus, StatusTracker,
};

use crate::app::{App, CommandError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Good,
    Warning,
    Bad,
}

/// What the status command prints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub status: InstallationStatus,
    pub code: u8,
    pub label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub information: Option<&'static str>,
    pub severity: Severity,
    /// True when the answer came from the cache instead of a fresh probe.
    pub from_cache: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked_at: Option<DateTime<Utc>>,
}

impl StatusReport {
    pub fn new(status: InstallationStatus, from_cache: bool, checked_at: Option<DateTime<Utc>>) -> Self {
        let (label, information, severity) = describe(status);
        Self {
            status,
            code: status.legacy_code(),
            label,
            information,
            severity,
            from_cache,
            checked_at,
        }
    }

    pub fn render_text(&self) -> String {
        let mut text = format!("WSA cache: {}", self.label);
        if let Some(information) = self.information {
            text.push('\n');
            text.push_str(information);
        }
        if let Some(checked_at) = self.checked_at {
            text.push_str(&format!(
                "\nChecked at {}{}",
                checked_at.to_rfc3339(),
                if self.from_cache { " (cached)" } else { "" }
            ));
        }
        text
    }
}

fn describe(status: InstallationStatus) -> (&'static str, Option<&'static str>, Severity) {
    match status {
        InstallationStatus::Installed => ("available", None, Severity::Good),
        InstallationStatus::MaybeNginx => (
            "undetermined",
            Some("The server runs nginx without the WSA signature; WSA may still be active."),
            Severity::Warning,
        ),
        InstallationStatus::MaybeCloudflare => (
            "undetermined",
            Some("The site is behind Cloudflare's proxy; WSA may still be active."),
            Severity::Warning,
        ),
        InstallationStatus::NotInstalled => ("unavailable", None, Severity::Bad),
    }
}

/// Evaluates the status, persisting the new cache state when a probe ran.
pub fn evaluate(app: &App, extended: bool, refresh: bool, now: DateTime<Utc>) -> StatusReport {
    let status_file = app.storage.status_file();
    let cached = if refresh {
        CachedStatus::Unknown
    } else {
        load_cached_status(&status_file)
    };

    let tracker = StatusTracker::new(app.config.status_ttl());
    let evaluation = tracker.evaluate(&cached, now, extended, |extended| {
        app.signal.detect_status(extended)
    });

    if evaluation.probed {
        if let Err(err) = save_cached_status(&status_file, &evaluation.cached) {
            warn!(error = %err, "Failed to persist installation status");
        }
    }

    let checked_at = match evaluation.cached {
        CachedStatus::Checked { checked_at, .. } => Some(checked_at),
        CachedStatus::Unknown => None,
    };
    StatusReport::new(evaluation.status, !evaluation.probed, checked_at)
}

pub fn run(app: &App, extended: bool, refresh: bool, json: bool) -> Result<(), CommandError> {
    let report = evaluate(app, extended, refresh, Utc::now());
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.render_text());
    }
    Ok(())
}
