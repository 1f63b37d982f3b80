//! One orchestrator per signed-in session.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use appnav_ids::SessionId;
use tracing::{debug, info};

use super::orchestrator::SyncOrchestrator;
use super::service::{NetworkMonitor, SyncServiceSource};
use crate::config::SyncConfig;
use crate::error::{AppNavError, Result};
use crate::foreground::ForegroundStateTracker;

pub struct SyncOrchestratorProvider {
    services: Arc<dyn SyncServiceSource>,
    foreground: Arc<ForegroundStateTracker>,
    network: Arc<dyn NetworkMonitor>,
    config: SyncConfig,
    orchestrators: Mutex<HashMap<SessionId, Arc<SyncOrchestrator>>>,
}

impl SyncOrchestratorProvider {
    pub fn new(
        services: Arc<dyn SyncServiceSource>,
        foreground: Arc<ForegroundStateTracker>,
        network: Arc<dyn NetworkMonitor>,
        config: SyncConfig,
    ) -> Self {
        Self {
            services,
            foreground,
            network,
            config,
            orchestrators: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the session's orchestrator, creating it on first request.
    ///
    /// Concurrent callers for the same session always receive the same
    /// instance. The orchestrator is not started.
    pub fn get_sync_orchestrator(&self, session_id: &SessionId) -> Result<Arc<SyncOrchestrator>> {
        let mut orchestrators = self.lock();
        if let Some(existing) = orchestrators.get(session_id) {
            return Ok(Arc::clone(existing));
        }

        let service = self
            .services
            .sync_service(session_id)
            .ok_or_else(|| AppNavError::UnknownSession(session_id.clone()))?;

        debug!(session_id = %session_id, "Creating sync orchestrator");
        let orchestrator = Arc::new(SyncOrchestrator::new(
            session_id.clone(),
            service,
            Arc::clone(&self.foreground),
            Arc::clone(&self.network),
            self.config.clone(),
        ));
        orchestrators.insert(session_id.clone(), Arc::clone(&orchestrator));
        Ok(orchestrator)
    }

    /// Returns the orchestrator only if one was already created.
    pub fn existing(&self, session_id: &SessionId) -> Option<Arc<SyncOrchestrator>> {
        self.lock().get(session_id).cloned()
    }

    /// Forgets a signed-out session and stops its orchestrator.
    ///
    /// The entry is removed before the stop completes, so a concurrent
    /// `get_sync_orchestrator` may create a successor while the old loop is
    /// still stopping. The successor sees the service as running, adopts the
    /// loop instead of starting another, and restarts only once the old stop
    /// reports `Idle`; two loops never run at once.
    ///
    /// Returns false if the session had no orchestrator.
    pub async fn remove_session(&self, session_id: &SessionId) -> bool {
        let removed = self.lock().remove(session_id);
        match removed {
            Some(orchestrator) => {
                info!(session_id = %session_id, "Removing sync orchestrator");
                orchestrator.stop().await;
                true
            }
            None => false,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SessionId, Arc<SyncOrchestrator>>> {
        self.orchestrators
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
