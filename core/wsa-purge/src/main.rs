//! wsa-purge: asks the WSA accelerator to drop cached pages.
//!
//! Runs from inside the hosting account (usually the site's plugin or
//! webroot directory) and talks to the daemon through the `.wsa` signal
//! directory.
//!
//! ## Subcommands
//!
//! - `purge`: request a purge of the current domain, or everything with `--all`
//! - `status`: report whether the accelerator serves the site
//! - `resolve`: print the signal directory purge requests go to
//! - `content-saved`: publishing hook, purges when `auto_purge` is on
//! - `clean`: remove a leftover sentinel file

mod app;
mod logging;
mod purge;
mod resolve;
mod status;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use wsa_core::{PathResolver, StorageConfig};

use app::{load_effective_config, App, CommandError, GlobalArgs};

#[derive(Parser)]
#[command(name = "wsa-purge")]
#[command(about = "WSA cache purge client")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Request a cache purge
    Purge {
        /// Purge every domain of the account instead of the current one
        #[arg(long)]
        all: bool,

        /// Account root holding the .wsa directory
        #[arg(long, value_name = "DIR")]
        path: Option<PathBuf>,
    },

    /// Show whether the WSA accelerator serves this site
    Status {
        /// Verify with a purge round trip instead of response headers
        #[arg(long)]
        extended: bool,

        /// Ignore the cached result
        #[arg(long)]
        refresh: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the signal directory and how it was found
    Resolve {
        /// Account root holding the .wsa directory
        #[arg(long, value_name = "DIR")]
        path: Option<PathBuf>,
    },

    /// Content was saved: purge the current domain if auto-purge is on
    ContentSaved,

    /// Remove a sentinel file the daemon never consumed
    Clean {
        /// Account root holding the .wsa directory
        #[arg(long, value_name = "DIR")]
        path: Option<PathBuf>,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Purge { .. } => "purge",
            Commands::Status { .. } => "status",
            Commands::Resolve { .. } => "resolve",
            Commands::ContentSaved => "content-saved",
            Commands::Clean { .. } => "clean",
        }
    }
}

fn build_app(global: &GlobalArgs) -> Result<App, CommandError> {
    let storage = StorageConfig::default();
    let config = load_effective_config(global, &storage)?;
    let resolver = PathResolver::from_current_dir()?;
    App::new(config, storage, resolver)
}

fn dispatch(app: &App, command: Commands) -> Result<(), CommandError> {
    match command {
        Commands::Purge { all, path } => purge::run(app, all, path.as_deref()),
        Commands::Status {
            extended,
            refresh,
            json,
        } => status::run(app, extended, refresh, json),
        Commands::Resolve { path } => resolve::run(app, path.as_deref()),
        Commands::ContentSaved => purge::run_content_saved(app),
        Commands::Clean { path } => purge::run_clean(app, path.as_deref()),
    }
}

fn main() {
    let cli = Cli::parse();
    let command_name = cli.command.name();

    let app = build_app(&cli.global);
    let _logging_guard = logging::init(
        app.as_ref()
            .ok()
            .and_then(|app| app.config.log_dir.as_deref()),
    );

    let app = match app {
        Ok(app) => app,
        Err(e) => {
            tracing::error!(error = %e, command = command_name, "wsa-purge setup failed");
            std::process::exit(1);
        }
    };

    if let Err(e) = dispatch(&app, cli.command) {
        tracing::error!(error = %e, command = command_name, "wsa-purge failed");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "wsa-purge",
            "purge",
            "--all",
            "--host",
            "example.com",
            "--https",
        ])
        .unwrap();
        assert_eq!(cli.global.host.as_deref(), Some("example.com"));
        assert!(cli.global.https);
        assert!(matches!(cli.command, Commands::Purge { all: true, path: None }));
    }

    #[test]
    fn https_flags_conflict() {
        let cli = Cli::try_parse_from(["wsa-purge", "status", "--no-https"]).unwrap();
        assert!(cli.global.no_https);
        assert!(!cli.global.https);

        let result = Cli::try_parse_from(["wsa-purge", "status", "--https", "--no-https"]);
        assert!(result.is_err());
    }

    #[test]
    fn status_flags() {
        let cli = Cli::try_parse_from(["wsa-purge", "status", "--extended", "--json"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Status {
                extended: true,
                refresh: false,
                json: true
            }
        ));
        assert_eq!(cli.command.name(), "status");
    }
}
