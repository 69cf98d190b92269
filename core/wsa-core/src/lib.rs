//! # wsa-core
//!
//! Client side of the WSA cache-purge protocol: find the account's `.wsa`
//! signal directory, drop a sentinel file there to request a purge, and
//! detect whether the accelerator fronts the site at all.
//!
//! ## Design Principles
//!
//! - **Synchronous**: every operation blocks the caller, including the HTTP
//!   probe and the extended-detection wait. No async runtime dependency.
//! - **Graceful degradation**: `request_purge` and `detect_status` never
//!   fail loudly; an absent accelerator is an expected state, reported as
//!   `false` / [`InstallationStatus::NotInstalled`]. The `try_*` variants
//!   carry the detail for callers that want to log it.
//! - **Caller owns persistence**: configuration and the cached status are
//!   explicit values passed in and returned, never ambient globals.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use wsa_core::{load_config, PathResolver, RequestContext, StorageConfig};
//!
//! let config = load_config(&StorageConfig::default().config_file())?;
//! let signal = config.build_signal(PathResolver::from_current_dir()?, &RequestContext::from_env())?;
//! signal.request_purge(false, None);
//! ```

pub mod auto_purge;
pub mod config;
pub mod error;
pub mod paths;
pub mod probe;
pub mod signal;
pub mod site;
pub mod status;
pub mod storage;

pub use auto_purge::on_content_saved;
pub use config::{default_config_path, load_config, WsaConfig};
pub use error::{Result, WsaError};
pub use paths::{DiscoverySource, PathResolver, SignalDirectory};
pub use probe::{classify_headers, HeaderProbe, HttpHeaderProbe};
pub use signal::{CacheSignal, PurgeReceipt};
pub use site::{RequestContext, SiteHost};
pub use status::{load_cached_status, save_cached_status, CachedStatus, StatusEvaluation, StatusTracker};
pub use storage::StorageConfig;
pub use wsa_protocol::InstallationStatus;
