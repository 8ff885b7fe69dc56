//! Tracing setup.
//!
//! The filter comes from `QAHUB_LOG` (same syntax as `RUST_LOG`), falling
//! back to `qahub=info`, or `qahub=debug` with `--verbose`. CLI commands log
//! to stderr. The dashboard logs to a daily file under the config dir, since
//! anything written to the terminal would corrupt the alternate screen.

use crate::config::log_dir;
use crate::error::{QaHubError, Result};
use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "QAHUB_LOG";
pub const LOG_FILE_PREFIX: &str = "qahub.log";

fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "qahub=debug"
    } else {
        "qahub=info"
    }
}

pub fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| default_directive(verbose).into())
}

/// Log to stderr. Safe to call more than once; later calls are ignored.
pub fn init_cli(verbose: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Log to `<config>/logs/qahub.log.<date>`. Keep the guard alive for the
/// whole session or buffered lines are lost.
pub fn init_file(verbose: bool) -> Result<WorkerGuard> {
    let dir = log_dir()?;
    fs::create_dir_all(&dir)?;
    let appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| QaHubError::Config(format!("Failed to initialize logging: {e}")))?;
    Ok(guard)
}
