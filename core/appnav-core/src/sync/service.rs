//! Collaborators the orchestrator drives: the client's sync loop and the
//! network monitor.

use std::sync::Arc;

use appnav_ids::SessionId;
use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::watch;

/// State reported by the client's sync loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Idle,
    Running,
    /// Running, but the client currently cannot reach the server.
    Offline,
    Error,
    Terminated,
}

impl SyncState {
    /// The loop died on its own and will not recover without a new start.
    pub fn is_failure(&self) -> bool {
        matches!(self, SyncState::Error | SyncState::Terminated)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkStatus {
    Connected,
    Disconnected,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("Sync start failed: {0}")]
    StartFailed(String),

    #[error("Sync stop failed: {0}")]
    StopFailed(String),
}

/// One session's background sync loop.
///
/// `stop_sync` must only return once the loop has acknowledged the stop; the
/// orchestrator relies on that to never overlap two loops.
#[async_trait]
pub trait SyncService: Send + Sync {
    async fn start_sync(&self) -> Result<(), SyncError>;

    async fn stop_sync(&self) -> Result<(), SyncError>;

    fn state(&self) -> watch::Receiver<SyncState>;
}

/// Looks up the sync service of a signed-in session.
pub trait SyncServiceSource: Send + Sync {
    /// Returns None if the session is unknown (not an error)
    fn sync_service(&self, session_id: &SessionId) -> Option<Arc<dyn SyncService>>;
}

pub trait NetworkMonitor: Send + Sync {
    fn connectivity(&self) -> watch::Receiver<NetworkStatus>;
}
