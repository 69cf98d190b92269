//! Purge on content changes.
//!
//! Publishing tools call this every time a page or post is saved. It may fire
//! many times in quick succession; each call just replaces the sentinel.

use tracing::debug;

use crate::config::WsaConfig;
use crate::signal::CacheSignal;

/// Requests a current-domain purge when auto-purge is enabled.
///
/// Returns `None` when auto-purge is off, otherwise whether the request
/// was written.
pub fn on_content_saved(config: &WsaConfig, signal: &CacheSignal) -> Option<bool> {
    if !config.auto_purge {
        debug!("Auto-purge disabled, ignoring content save");
        return None;
    }
    Some(signal.request_purge(false, None))
}
