//! Tracing subscriber setup for hosts that don't install their own.

use std::env;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

pub const DEBUG_ENV_VAR: &str = "APPNAV_DEBUG_LOG";
const LOG_FILE_PREFIX: &str = "appnav.log";

/// Installs the global subscriber.
///
/// Returns a guard when logging to files; keep it alive or buffered lines
/// are lost. Does nothing if a subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = build_filter(config, debug_from_env());

    match config.directory.as_ref() {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .try_init()
                .ok()
                .map(|()| guard)
        }
        None => {
            if let Err(err) = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init()
            {
                tracing::debug!(error = %err, "Keeping the host's tracing subscriber");
            }
            None
        }
    }
}

fn debug_from_env() -> bool {
    env::var(DEBUG_ENV_VAR)
        .map(|value| is_truthy(&value))
        .unwrap_or(false)
}

fn is_truthy(value: &str) -> bool {
    matches!(value, "1" | "true" | "TRUE" | "yes" | "YES")
}

fn build_filter(config: &LoggingConfig, debug_env: bool) -> EnvFilter {
    if debug_env || config.debug {
        return EnvFilter::new("debug");
    }
    if let Some(directives) = config.filter.as_deref() {
        return EnvFilter::new(directives);
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}
