//! Storage paths for the client's own files.
//!
//! Production code uses `StorageConfig::default()` which points to
//! `~/.wsa-purge/`. Tests use `StorageConfig::with_root(temp_dir)`.
//! The signal directory itself is not managed here; see [`crate::paths`].

use std::path::{Path, PathBuf};

const ROOT_DIR_NAME: &str = ".wsa-purge";

/// Central configuration for client-side storage paths.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let base = dirs::home_dir().unwrap_or_else(std::env::temp_dir);
        Self {
            root: base.join(ROOT_DIR_NAME),
        }
    }
}

impl StorageConfig {
    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to config.toml (user settings).
    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    /// Path to status.json (cached detection result).
    pub fn status_file(&self) -> PathBuf {
        self.root.join("status.json")
    }
}
