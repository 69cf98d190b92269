//! Client configuration.
//!
//! Loaded from TOML; a missing file yields defaults. Precedence for the file
//! location: explicit path, then `$WSA_PURGE_CONFIG`, then
//! `~/.wsa-purge/config.toml`.
//!
//! ```toml
//! auto_purge = true
//! signal_path = "/home/user42"
//! host = "example.com"
//! https = true
//! probe_timeout_secs = 5
//! consume_wait_ms = 1000
//! status_ttl_hours = 48
//! log_dir = "/home/user42/.wsa-purge/logs"
//! ```

use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, WsaError};
use crate::probe::{HttpHeaderProbe, DEFAULT_PROBE_TIMEOUT};
use crate::paths::PathResolver;
use crate::signal::{CacheSignal, DEFAULT_CONSUME_WAIT};
use crate::site::{RequestContext, SiteHost};
use crate::status::DEFAULT_STATUS_TTL_HOURS;
use crate::storage::StorageConfig;

pub const CONFIG_ENV: &str = "WSA_PURGE_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WsaConfig {
    /// Purge the current domain whenever content is saved.
    pub auto_purge: bool,
    /// Account root containing `.wsa`, tried before discovery.
    pub signal_path: Option<PathBuf>,
    /// Served host; overrides the request context when set.
    pub host: Option<String>,
    /// Forces the scheme used by the header probe.
    pub https: Option<bool>,
    pub probe_timeout_secs: u64,
    pub consume_wait_ms: u64,
    pub status_ttl_hours: u32,
    /// Also write logs to daily files in this directory.
    pub log_dir: Option<PathBuf>,
}

impl Default for WsaConfig {
    fn default() -> Self {
        Self {
            auto_purge: true,
            signal_path: None,
            host: None,
            https: None,
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT.as_secs(),
            consume_wait_ms: DEFAULT_CONSUME_WAIT.as_millis() as u64,
            status_ttl_hours: DEFAULT_STATUS_TTL_HOURS,
            log_dir: None,
        }
    }
}

impl WsaConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn consume_wait(&self) -> Duration {
        Duration::from_millis(self.consume_wait_ms)
    }

    pub fn status_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.status_ttl_hours))
    }

    /// Served site: the configured host wins, otherwise the request context.
    /// A configured `https` flag overrides whatever the context says.
    pub fn site_host(&self, context: &RequestContext) -> Option<SiteHost> {
        let site = match self.host.as_deref().map(str::trim).filter(|h| !h.is_empty()) {
            Some(host) => SiteHost::new(host, self.https.unwrap_or(false)),
            None => context.site_host()?,
        };
        match self.https {
            Some(https) if https != site.is_https() => Some(SiteHost::new(site.bare(), https)),
            _ => Some(site),
        }
    }

    /// Builds a [`CacheSignal`] for a resolver and request context.
    pub fn build_signal(
        &self,
        resolver: PathResolver,
        context: &RequestContext,
    ) -> Result<CacheSignal> {
        let probe = HttpHeaderProbe::new(self.probe_timeout())?;
        Ok(
            CacheSignal::new(resolver, self.site_host(context), Box::new(probe))
                .with_signal_path(self.signal_path.clone())
                .with_consume_wait(self.consume_wait()),
        )
    }
}

/// Returns the config path from `$WSA_PURGE_CONFIG` or the storage default.
pub fn default_config_path(storage: &StorageConfig) -> PathBuf {
    env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| storage.config_file())
}

/// Loads configuration, returning defaults if the file doesn't exist.
pub fn load_config(path: &Path) -> Result<WsaConfig> {
    if !path.exists() {
        return Ok(WsaConfig::default());
    }

    let content = fs::read_to_string(path).map_err(|source| WsaError::Io {
        context: format!("reading config {}", path.display()),
        source,
    })?;
    toml::from_str::<WsaConfig>(&content).map_err(|err| WsaError::ConfigMalformed {
        path: path.to_path_buf(),
        details: err.to_string(),
    })
}
