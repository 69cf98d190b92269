//! Purge requests and installation detection.
//!
//! # Purge protocol
//!
//! Presence of `.wsa/empty.me` means "purge pending"; the daemon deletes it
//! once it has evicted the cache. The payload picks the scope: a bare host
//! evicts that domain, anything else (we send [`PURGE_ALL_MARKER`]) evicts
//! every domain of the account.
//!
//! A leftover sentinel is deleted before the new one is written, so the
//! daemon never sees content change under a file it may be reading. The
//! delete-then-create sequence is not atomic: two processes purging at the
//! same moment race, and the last writer wins.
//!
//! # Detection
//!
//! - **Fast**: HEAD the site and classify the headers (see [`crate::probe`]).
//!   Any probe failure reads as [`InstallationStatus::NotInstalled`].
//! - **Extended**: request a purge-all, wait [`DEFAULT_CONSUME_WAIT`], and
//!   report `Installed` only if the daemon consumed the sentinel meanwhile.
//!   This forces a real purge and blocks the caller for the whole wait; a
//!   daemon slower than the wait yields a false `NotInstalled`.

use fs_err as fs;
use std::fmt;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};
use wsa_protocol::{InstallationStatus, PURGE_ALL_MARKER};

use crate::error::{Result, WsaError};
use crate::paths::{PathResolver, SignalDirectory};
use crate::probe::{classify_headers, HeaderProbe};
use crate::site::SiteHost;

/// How long extended detection waits for the daemon to consume the sentinel.
pub const DEFAULT_CONSUME_WAIT: Duration = Duration::from_secs(1);

/// Details of a successful purge request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurgeReceipt {
    pub directory: SignalDirectory,
    pub sentinel: PathBuf,
    pub content: String,
}

/// Signals the WSA daemon through the sentinel file and probes for its presence.
pub struct CacheSignal {
    resolver: PathResolver,
    site: Option<SiteHost>,
    probe: Box<dyn HeaderProbe>,
    signal_path: Option<PathBuf>,
    consume_wait: Duration,
}

impl fmt::Debug for CacheSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheSignal")
            .field("resolver", &self.resolver)
            .field("site", &self.site)
            .field("signal_path", &self.signal_path)
            .field("consume_wait", &self.consume_wait)
            .finish_non_exhaustive()
    }
}

impl CacheSignal {
    pub fn new(resolver: PathResolver, site: Option<SiteHost>, probe: Box<dyn HeaderProbe>) -> Self {
        Self {
            resolver,
            site,
            probe,
            signal_path: None,
            consume_wait: DEFAULT_CONSUME_WAIT,
        }
    }

    /// Default account root used when a call does not pass its own override.
    pub fn with_signal_path(mut self, path: Option<PathBuf>) -> Self {
        self.signal_path = path;
        self
    }

    pub fn with_consume_wait(mut self, wait: Duration) -> Self {
        self.consume_wait = wait;
        self
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn site(&self) -> Option<&SiteHost> {
        self.site.as_ref()
    }

    /// Resolves the signal directory using the override or configured path.
    pub fn resolve(&self, override_path: Option<&Path>) -> Result<SignalDirectory> {
        let explicit = override_path.or(self.signal_path.as_deref());
        self.resolver.resolve(explicit)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Purge
    // ─────────────────────────────────────────────────────────────────────

    /// Asks the daemon to purge the current domain, or everything when
    /// `purge_all` is set. Returns `false` on any failure, including the
    /// expected "no accelerator on this server" case.
    pub fn request_purge(&self, purge_all: bool, override_path: Option<&Path>) -> bool {
        match self.try_request_purge(purge_all, override_path) {
            Ok(_) => true,
            Err(err @ WsaError::PathUnavailable { .. }) => {
                debug!(error = %err, "Cache purge skipped");
                false
            }
            Err(err) => {
                warn!(error = %err, "Cache purge request failed");
                false
            }
        }
    }

    /// Same as [`CacheSignal::request_purge`] but reports why it failed.
    pub fn try_request_purge(
        &self,
        purge_all: bool,
        override_path: Option<&Path>,
    ) -> Result<PurgeReceipt> {
        let directory = self.resolve(override_path)?;

        if !directory.path().is_dir() {
            directory.ensure_exists()?;
        } else if !directory.is_writable() {
            return Err(WsaError::NotWritable {
                path: directory.path().to_path_buf(),
            });
        }

        let content = self.purge_payload(purge_all)?;
        let sentinel = directory.sentinel_path();

        if remove_sentinel(&sentinel)? {
            debug!(path = %sentinel.display(), "Removed stale sentinel file");
        }

        write_sentinel(&sentinel, &content)?;

        info!(
            path = %sentinel.display(),
            purge_all,
            content = %content,
            "Cache purge requested"
        );

        Ok(PurgeReceipt {
            directory,
            sentinel,
            content,
        })
    }

    fn purge_payload(&self, purge_all: bool) -> Result<String> {
        if purge_all {
            return Ok(PURGE_ALL_MARKER.to_string());
        }
        self.site
            .as_ref()
            .map(|site| site.bare().to_string())
            .filter(|host| !host.is_empty())
            .ok_or(WsaError::EmptyPayload)
    }

    /// Removes a leftover sentinel file. A missing file counts as success.
    pub fn clear_sentinel(&self, override_path: Option<&Path>) -> bool {
        let directory = match self.resolve(override_path) {
            Ok(directory) => directory,
            Err(err) => {
                debug!(error = %err, "Sentinel cleanup skipped");
                return false;
            }
        };

        match remove_sentinel(&directory.sentinel_path()) {
            Ok(removed) => {
                debug!(removed, path = %directory.path().display(), "Sentinel cleanup done");
                true
            }
            Err(err) => {
                warn!(error = %err, "Sentinel cleanup failed");
                false
            }
        }
    }

    /// True when a sentinel file is waiting to be consumed.
    pub fn purge_pending(&self, override_path: Option<&Path>) -> bool {
        self.resolve(override_path)
            .map(|directory| directory.sentinel_path().exists())
            .unwrap_or(false)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Detection
    // ─────────────────────────────────────────────────────────────────────

    /// Determines whether the accelerator serves this site.
    pub fn detect_status(&self, extended: bool) -> InstallationStatus {
        let status = if extended {
            self.detect_by_round_trip()
        } else {
            self.detect_from_headers()
        };
        info!(extended, status = %status, "Installation status detected");
        status
    }

    fn detect_from_headers(&self) -> InstallationStatus {
        let Some(site) = self.site.as_ref() else {
            warn!("No site host known, cannot probe headers");
            return InstallationStatus::NotInstalled;
        };

        let url = site.url();
        match self.probe.fetch_headers(&url) {
            Ok(headers) => classify_headers(&headers),
            Err(err) => {
                debug!(error = %err, url = %url, "Header probe failed");
                InstallationStatus::NotInstalled
            }
        }
    }

    fn detect_by_round_trip(&self) -> InstallationStatus {
        let directory = match self.resolve(None) {
            Ok(directory) => directory,
            Err(err) => {
                debug!(error = %err, "Extended detection without signal directory");
                return InstallationStatus::NotInstalled;
            }
        };

        if !self.request_purge(true, directory.account_root()) {
            return InstallationStatus::NotInstalled;
        }

        thread::sleep(self.consume_wait);

        if directory.sentinel_path().exists() {
            debug!(
                wait_ms = self.consume_wait.as_millis() as u64,
                "Sentinel not consumed within wait"
            );
            InstallationStatus::NotInstalled
        } else {
            InstallationStatus::Installed
        }
    }
}

fn write_sentinel(sentinel: &Path, content: &str) -> Result<()> {
    fs::write(sentinel, content.as_bytes()).map_err(|source| WsaError::SentinelWrite {
        path: sentinel.to_path_buf(),
        source,
    })
}

/// Deletes the sentinel if present. Returns whether a file was removed.
fn remove_sentinel(sentinel: &Path) -> Result<bool> {
    match fs::remove_file(sentinel) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(WsaError::SentinelRemove {
            path: sentinel.to_path_buf(),
            source,
        }),
    }
}
