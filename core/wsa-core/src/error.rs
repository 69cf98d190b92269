//! Error types for wsa-core operations.
//!
//! The boolean/enum operations on [`crate::CacheSignal`] never surface these;
//! they exist for the `try_*` variants and for configuration loading.

use std::path::PathBuf;

/// All errors that can occur in wsa-core operations.
#[derive(Debug, thiserror::Error)]
pub enum WsaError {
    // ─────────────────────────────────────────────────────────────────────
    // Signal Directory Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("No writable .wsa directory found from {}", origin.display())]
    PathUnavailable { origin: PathBuf },

    #[error("Signal directory is not writable: {}", path.display())]
    NotWritable { path: PathBuf },

    #[error("Failed to create signal directory: {}: {source}", path.display())]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ─────────────────────────────────────────────────────────────────────
    // Sentinel File Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Failed to remove stale sentinel file: {}: {source}", path.display())]
    SentinelRemove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write sentinel file: {}: {source}", path.display())]
    SentinelWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Refusing to write an empty sentinel payload (no host known)")]
    EmptyPayload,

    // ─────────────────────────────────────────────────────────────────────
    // Probe Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Header probe failed for {url}: {details}")]
    Probe { url: String, details: String },

    // ─────────────────────────────────────────────────────────────────────
    // Configuration & I/O Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Configuration file malformed: {}: {details}", path.display())]
    ConfigMalformed { path: PathBuf, details: String },

    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON parsing error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Convenience type alias for Results using WsaError.
pub type Result<T> = std::result::Result<T, WsaError>;

impl From<WsaError> for String {
    fn from(err: WsaError) -> String {
        err.to_string()
    }
}
