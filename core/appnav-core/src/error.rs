//! Error types for appnav-core operations.
//! Stale navigation signals and cache misses are not errors; see the callers.

use std::path::PathBuf;

use appnav_ids::SessionId;

use crate::navigation::NavigationLevel;

/// All errors that can surface from appnav-core.
#[derive(Debug, thiserror::Error)]
pub enum AppNavError {
    // ─────────────────────────────────────────────────────────────────────
    // Navigation Errors
    // ─────────────────────────────────────────────────────────────────────
    /// An `enter_*` call arrived while the current state has no enclosing
    /// node for the requested level (e.g. a room without a space).
    #[error("Cannot enter {requested} while at {current}")]
    InvalidNavigation {
        requested: NavigationLevel,
        current: NavigationLevel,
    },

    // ─────────────────────────────────────────────────────────────────────
    // Session Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("No sync service available for session {0}")]
    UnknownSession(SessionId),

    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Configuration read failed: {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },

    #[error("Configuration directory not found")]
    ConfigDirNotFound,
}

/// Convenience type alias for Results using AppNavError.
pub type Result<T> = std::result::Result<T, AppNavError>;
