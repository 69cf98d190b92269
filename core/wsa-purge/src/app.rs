//! Shared state for every subcommand: configuration, storage paths and the
//! signal built from them.

use clap::Args;
use std::path::PathBuf;
use thiserror::Error;
use wsa_core::{
    default_config_path, load_config, CacheSignal, PathResolver, RequestContext, StorageConfig,
    WsaConfig, WsaError,
};

#[derive(Error, Debug)]
pub enum CommandError {
    #[error(transparent)]
    Wsa(#[from] WsaError),

    #[error("Failed to encode output: {0}")]
    Output(#[from] serde_json::Error),

    #[error("{0}")]
    Failed(String),
}

/// Flags accepted by every subcommand.
#[derive(Args, Debug, Default, Clone)]
pub struct GlobalArgs {
    /// Served host name, overriding the config file and HTTP_HOST/SERVER_NAME
    #[arg(long, global = true, value_name = "HOST")]
    pub host: Option<String>,

    /// Probe the site over https
    #[arg(long, global = true, conflicts_with = "no_https")]
    pub https: bool,

    /// Probe the site over plain http, even if the config file says https
    #[arg(long, global = true)]
    pub no_https: bool,

    /// Config file (default: $WSA_PURGE_CONFIG or ~/.wsa-purge/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl GlobalArgs {
    pub fn config_path(&self, storage: &StorageConfig) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| default_config_path(storage))
    }

    /// Command-line flags win over the config file.
    pub fn apply(&self, config: &mut WsaConfig) {
        if let Some(host) = self.host.as_deref().map(str::trim).filter(|h| !h.is_empty()) {
            config.host = Some(host.to_string());
        }
        if self.https {
            config.https = Some(true);
        } else if self.no_https {
            config.https = Some(false);
        }
    }
}

pub struct App {
    pub config: WsaConfig,
    pub storage: StorageConfig,
    pub signal: CacheSignal,
}

impl App {
    pub fn new(
        config: WsaConfig,
        storage: StorageConfig,
        resolver: PathResolver,
    ) -> Result<Self, CommandError> {
        let signal = config.build_signal(resolver, &RequestContext::from_env())?;
        Ok(Self::from_parts(config, storage, signal))
    }

    pub fn from_parts(config: WsaConfig, storage: StorageConfig, signal: CacheSignal) -> Self {
        Self {
            config,
            storage,
            signal,
        }
    }
}

/// Loads the config the CLI should run with.
pub fn load_effective_config(
    args: &GlobalArgs,
    storage: &StorageConfig,
) -> Result<WsaConfig, CommandError> {
    let mut config = load_config(&args.config_path(storage))?;
    args.apply(&mut config);
    Ok(config)
}
