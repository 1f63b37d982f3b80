//! # appnav-core
//!
//! Coordination layer between a messaging client's UI and its background
//! sync engine.
//!
//! ## Components
//!
//! - **Navigation**: where the user is (session → space → room → thread),
//!   with ownership tokens so only the screen that entered a level can leave it.
//! - **Foreground conditions**: the app is visible, a call is ringing or
//!   active, or a notification is being fetched.
//! - **Active rooms**: live room handles kept alive per session and destroyed
//!   exactly once when the session is cleared.
//! - **Sync orchestration**: starts the sync loop when the network is up and
//!   something needs it, and stops it a grace period after nothing does.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use appnav_core::{ForegroundStateTracker, SyncOrchestratorProvider};
//!
//! let config = appnav_core::load_config(None)?;
//! let _guard = appnav_core::logging::init(&config.logging);
//!
//! let foreground = Arc::new(ForegroundStateTracker::with_lifecycle(lifecycle));
//! foreground.start_observing_foreground();
//!
//! let provider = SyncOrchestratorProvider::new(client, foreground, network, config.sync);
//! provider.get_sync_orchestrator(&session_id)?.start().await;
//! ```

pub mod config;
pub mod error;
pub mod foreground;
pub mod logging;
pub mod navigation;
pub mod rooms;
pub mod sync;

#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

pub use appnav_ids::{IdError, RoomId, SessionId, SpaceId, ThreadId};
pub use config::{default_config_path, load_config, AppNavConfig, LoggingConfig, SyncConfig};
pub use error::{AppNavError, Result};
pub use foreground::{ForegroundState, ForegroundStateTracker, ProcessLifecycle};
pub use navigation::{
    AppNavigationState, NavigationLevel, NavigationState, NavigationStateStore, Owner,
};
pub use rooms::{ActiveRoomCache, CacheMode, RoomHandle};
pub use sync::{
    NetworkMonitor, NetworkStatus, OrchestratorStatus, SyncError, SyncOrchestrator,
    SyncOrchestratorProvider, SyncPhase, SyncService, SyncServiceSource, SyncState,
};
