//! Per-session sync orchestration.

mod orchestrator;
mod provider;
mod service;

pub use orchestrator::{should_sync, OrchestratorStatus, SyncOrchestrator, SyncPhase};
pub use provider::SyncOrchestratorProvider;
pub use service::{
    NetworkMonitor, NetworkStatus, SyncError, SyncService, SyncServiceSource, SyncState,
};
