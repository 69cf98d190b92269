//! Throttled installation checks.
//!
//! Detection is expensive (an HTTP round trip, or for the extended mode a
//! forced purge plus a blocking wait), so callers keep the last result and
//! only re-check when it is stale.
//!
//! ```text
//! Unknown ──detect──▶ Checked { status, checked_at }
//!                          │
//!                          ├─ status == Installed && age <= ttl → reuse
//!                          └─ otherwise                         → detect again
//! ```
//!
//! Only a positive result is reused: a negative one must not hide a cache
//! that was switched on since. An operator-requested extended check always
//! runs.

use chrono::{DateTime, Duration, Utc};
use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};
use wsa_protocol::InstallationStatus;

use crate::error::{Result, WsaError};

pub const DEFAULT_STATUS_TTL_HOURS: u32 = 48;

/// Last known detection result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CachedStatus {
    #[default]
    Unknown,
    Checked {
        status: InstallationStatus,
        checked_at: DateTime<Utc>,
    },
}

impl CachedStatus {
    /// Cached status that can be reused at `now`, if any.
    pub fn reusable(&self, now: DateTime<Utc>, ttl: Duration) -> Option<InstallationStatus> {
        match *self {
            CachedStatus::Checked {
                status: InstallationStatus::Installed,
                checked_at,
            } if now.signed_duration_since(checked_at) <= ttl => {
                Some(InstallationStatus::Installed)
            }
            _ => None,
        }
    }
}

/// Result of [`StatusTracker::evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusEvaluation {
    pub status: InstallationStatus,
    /// State to hand back to the caller for persistence.
    pub cached: CachedStatus,
    /// Whether detection actually ran.
    pub probed: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct StatusTracker {
    ttl: Duration,
}

impl Default for StatusTracker {
    fn default() -> Self {
        Self::new(Duration::hours(i64::from(DEFAULT_STATUS_TTL_HOURS)))
    }
}

impl StatusTracker {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the status to show, running `detect(extended)` only when the
    /// cached state cannot be reused.
    pub fn evaluate<F>(
        &self,
        cached: &CachedStatus,
        now: DateTime<Utc>,
        extended: bool,
        detect: F,
    ) -> StatusEvaluation
    where
        F: FnOnce(bool) -> InstallationStatus,
    {
        if !extended {
            if let Some(status) = cached.reusable(now, self.ttl) {
                debug!(status = %status, "Reusing cached installation status");
                return StatusEvaluation {
                    status,
                    cached: *cached,
                    probed: false,
                };
            }
        }

        let status = detect(extended);
        StatusEvaluation {
            status,
            cached: CachedStatus::Checked {
                status,
                checked_at: now,
            },
            probed: true,
        }
    }
}

/// Reads the cached status; a missing or unreadable file means `Unknown`.
pub fn load_cached_status(path: &Path) -> CachedStatus {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return CachedStatus::Unknown,
        Err(err) => {
            warn!(error = %err, "Failed to read cached status");
            return CachedStatus::Unknown;
        }
    };

    serde_json::from_slice(&data).unwrap_or_else(|err| {
        warn!(error = %err, path = %path.display(), "Discarding corrupt cached status");
        CachedStatus::Unknown
    })
}

/// Persists the cached status via temp file + rename.
pub fn save_cached_status(path: &Path, cached: &CachedStatus) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| WsaError::Io {
            context: "creating status directory".to_string(),
            source,
        })?;
    }

    let payload = serde_json::to_vec_pretty(cached).map_err(|source| WsaError::Json {
        context: "serializing cached status".to_string(),
        source,
    })?;
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, payload).map_err(|source| WsaError::Io {
        context: "writing cached status".to_string(),
        source,
    })?;
    fs::rename(&tmp_path, path).map_err(|source| WsaError::Io {
        context: "committing cached status".to_string(),
        source,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tempfile::tempdir;

    fn checked(status: InstallationStatus, age_hours: i64, now: DateTime<Utc>) -> CachedStatus {
        CachedStatus::Checked {
            status,
            checked_at: now - Duration::hours(age_hours),
        }
    }

    #[test]
    fn unknown_triggers_detection() {
        let now = Utc::now();
        let tracker = StatusTracker::default();
        let result = tracker.evaluate(&CachedStatus::Unknown, now, false, |_| {
            InstallationStatus::MaybeNginx
        });
        assert!(result.probed);
        assert_eq!(result.status, InstallationStatus::MaybeNginx);
        assert_eq!(
            result.cached,
            CachedStatus::Checked {
                status: InstallationStatus::MaybeNginx,
                checked_at: now
            }
        );
    }

    #[test]
    fn fresh_installed_is_reused() {
        let now = Utc::now();
        let cached = checked(InstallationStatus::Installed, 47, now);
        let calls = Cell::new(0);
        let result = StatusTracker::default().evaluate(&cached, now, false, |_| {
            calls.set(calls.get() + 1);
            InstallationStatus::NotInstalled
        });
        assert!(!result.probed);
        assert_eq!(calls.get(), 0);
        assert_eq!(result.status, InstallationStatus::Installed);
        assert_eq!(result.cached, cached);
    }

    #[test]
    fn stale_installed_is_rechecked() {
        let now = Utc::now();
        let cached = checked(InstallationStatus::Installed, 49, now);
        let result = StatusTracker::default().evaluate(&cached, now, false, |_| {
            InstallationStatus::NotInstalled
        });
        assert!(result.probed);
        assert_eq!(result.status, InstallationStatus::NotInstalled);
    }

    #[test]
    fn negative_result_is_never_reused() {
        let now = Utc::now();
        let cached = checked(InstallationStatus::NotInstalled, 1, now);
        let result = StatusTracker::default().evaluate(&cached, now, false, |_| {
            InstallationStatus::Installed
        });
        assert!(result.probed);
        assert_eq!(result.status, InstallationStatus::Installed);
    }

    #[test]
    fn extended_bypasses_cache() {
        let now = Utc::now();
        let cached = checked(InstallationStatus::Installed, 1, now);
        let result = StatusTracker::default().evaluate(&cached, now, true, |extended| {
            assert!(extended);
            InstallationStatus::NotInstalled
        });
        assert!(result.probed);
        assert_eq!(result.status, InstallationStatus::NotInstalled);
    }

    #[test]
    fn persists_and_reloads() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("state").join("status.json");
        assert_eq!(load_cached_status(&path), CachedStatus::Unknown);

        let cached = checked(InstallationStatus::Installed, 0, Utc::now());
        save_cached_status(&path, &cached).unwrap();
        assert_eq!(load_cached_status(&path), cached);
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn corrupt_file_reads_as_unknown() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("status.json");
        fs::write(&path, "{not json").unwrap();
        assert_eq!(load_cached_status(&path), CachedStatus::Unknown);
    }
}
