//! Runtime configuration loading.
//!
//! A missing file yields defaults. Every section and field is optional so a
//! host only has to write the knobs it changes:
//!
//! ```toml
//! [sync]
//! stop_grace_period_ms = 3000
//! initial_sync = false
//!
//! [logging]
//! debug = false
//! directory = "/data/logs"
//! ```

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AppNavError, Result};

const CONFIG_DIR_NAME: &str = "appnav";
const CONFIG_FILE_NAME: &str = "appnav.toml";
const DEFAULT_STOP_GRACE_PERIOD_MS: u64 = 3_000;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
pub struct AppNavConfig {
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SyncConfig {
    /// How long the loop keeps running after the last reason to sync went away.
    #[serde(default = "default_stop_grace_period_ms")]
    pub stop_grace_period_ms: u64,
    /// Run one sync when the orchestrator starts, even with nothing asking for it.
    #[serde(default)]
    pub initial_sync: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            stop_grace_period_ms: DEFAULT_STOP_GRACE_PERIOD_MS,
            initial_sync: false,
        }
    }
}

impl SyncConfig {
    pub fn stop_grace_period(&self) -> Duration {
        Duration::from_millis(self.stop_grace_period_ms)
    }
}

fn default_stop_grace_period_ms() -> u64 {
    DEFAULT_STOP_GRACE_PERIOD_MS
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub debug: bool,
    /// Overrides `RUST_LOG` when set.
    #[serde(default)]
    pub filter: Option<String>,
    /// Daily rolling log files go here; stderr when unset.
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

/// Returns the path of the default configuration file.
pub fn default_config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
        .ok_or(AppNavError::ConfigDirNotFound)
}

/// Loads the configuration, returning defaults if the file doesn't exist.
pub fn load_config(path: Option<PathBuf>) -> Result<AppNavConfig> {
    let config_path = match path {
        Some(path) => path,
        None => default_config_path()?,
    };

    if !config_path.exists() {
        return Ok(AppNavConfig::default());
    }

    let content =
        fs_err::read_to_string(&config_path).map_err(|source| AppNavError::ConfigRead {
            path: config_path.clone(),
            source,
        })?;
    toml::from_str::<AppNavConfig>(&content).map_err(|err| AppNavError::ConfigMalformed {
        path: config_path,
        details: err.to_string(),
    })
}
