//! Tracing setup for the CLI.
//!
//! Always logs to stderr so stdout stays clean for `--json` output. When a
//! log directory is configured, a daily rolling file gets the same events.

use std::env;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub const DEBUG_LOG_ENV: &str = "WSA_DEBUG_LOG";
const LOG_FILE_PREFIX: &str = "wsa-purge.log";

fn debug_enabled() -> bool {
    env::var(DEBUG_LOG_ENV)
        .map(|value| is_truthy(&value))
        .unwrap_or(false)
}

fn is_truthy(value: &str) -> bool {
    matches!(value, "1" | "true" | "TRUE" | "yes" | "YES")
}

fn build_filter() -> EnvFilter {
    if debug_enabled() {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Installs the global subscriber. Hold the returned guard until exit so the
/// file writer flushes.
pub fn init(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(build_filter());

    let (file_layer, guard) = match log_dir.and_then(open_file_writer) {
        Some((writer, guard)) => {
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_filter(build_filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let _ = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init();

    guard
}

fn open_file_writer(
    log_dir: &Path,
) -> Option<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    if let Err(err) = fs_err::create_dir_all(log_dir) {
        eprintln!("wsa-purge: file logging disabled: {err}");
        return None;
    }
    let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    Some(tracing_appender::non_blocking(appender))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthy_values() {
        for value in ["1", "true", "TRUE", "yes", "YES"] {
            assert!(is_truthy(value), "{value}");
        }
        for value in ["", "0", "false", "no", "on"] {
            assert!(!is_truthy(value), "{value}");
        }
    }
}
