//! Starts and stops one session's sync loop from the foreground conditions
//! and network connectivity.
//!
//! All calls into the `SyncService` are made by a single worker task, one at a
//! time, so two loops can never overlap. `stop()` only returns once that
//! worker has stopped the loop and exited, and `start()` waits for an
//! in-flight `stop()` through the same lock.

use std::sync::Arc;

use appnav_ids::SessionId;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::service::{NetworkMonitor, NetworkStatus, SyncService, SyncState};
use crate::config::SyncConfig;
use crate::foreground::{ForegroundState, ForegroundStateTracker};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    Stopped,
    /// Started, nothing currently needs the loop.
    Idle,
    Syncing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrchestratorStatus {
    pub phase: SyncPhase,
    pub since: DateTime<Utc>,
}

/// The session should be syncing when it is reachable and something needs it.
pub fn should_sync(network: NetworkStatus, conditions: &ForegroundState) -> bool {
    network == NetworkStatus::Connected && conditions.any_active()
}

struct WorkerHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

pub struct SyncOrchestrator {
    session_id: SessionId,
    service: Arc<dyn SyncService>,
    foreground: Arc<ForegroundStateTracker>,
    network: Arc<dyn NetworkMonitor>,
    config: SyncConfig,
    status: Arc<watch::Sender<OrchestratorStatus>>,
    worker: Mutex<Option<WorkerHandle>>,
}

impl SyncOrchestrator {
    pub fn new(
        session_id: SessionId,
        service: Arc<dyn SyncService>,
        foreground: Arc<ForegroundStateTracker>,
        network: Arc<dyn NetworkMonitor>,
        config: SyncConfig,
    ) -> Self {
        let (status, _) = watch::channel(OrchestratorStatus {
            phase: SyncPhase::Stopped,
            since: Utc::now(),
        });
        Self {
            session_id,
            service,
            foreground,
            network,
            config,
            status: Arc::new(status),
            worker: Mutex::new(None),
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn status(&self) -> OrchestratorStatus {
        *self.status.borrow()
    }

    pub fn phase(&self) -> SyncPhase {
        self.status.borrow().phase
    }

    pub fn subscribe_status(&self) -> watch::Receiver<OrchestratorStatus> {
        self.status.subscribe()
    }

    /// Begins watching the conditions. Must be called from within a tokio
    /// runtime; calling it while started has no effect.
    pub async fn start(&self) {
        let mut worker = self.worker.lock().await;
        if worker.is_some() {
            debug!(session_id = %self.session_id, "Sync orchestrator already started");
            return;
        }

        info!(session_id = %self.session_id, "Starting sync orchestrator");
        publish_phase(&self.status, SyncPhase::Idle);

        let cancel = CancellationToken::new();
        let run = Worker {
            session_id: self.session_id.clone(),
            service: Arc::clone(&self.service),
            config: self.config.clone(),
            foreground: self.foreground.subscribe(),
            network: self.network.connectivity(),
            sync_state: self.service.state(),
            status: Arc::clone(&self.status),
            cancel: cancel.clone(),
            loop_active: false,
            suppressed: false,
            stop_deadline: None,
        };
        let task = tokio::spawn(run.run());
        *worker = Some(WorkerHandle { cancel, task });
    }

    /// Stops the loop if it runs and waits until it has acknowledged.
    pub async fn stop(&self) {
        let mut worker = self.worker.lock().await;
        let Some(handle) = worker.take() else {
            debug!(session_id = %self.session_id, "Sync orchestrator already stopped");
            return;
        };

        handle.cancel.cancel();
        if let Err(err) = handle.task.await {
            error!(
                session_id = %self.session_id,
                error = %err,
                "Sync orchestrator worker ended abnormally"
            );
        }
        publish_phase(&self.status, SyncPhase::Stopped);
        info!(session_id = %self.session_id, "Sync orchestrator stopped");
    }
}

impl Drop for SyncOrchestrator {
    fn drop(&mut self) {
        // The worker still stops a running loop on its way out
        if let Some(handle) = self.worker.get_mut().as_ref() {
            handle.cancel.cancel();
        }
    }
}

fn publish_phase(status: &watch::Sender<OrchestratorStatus>, phase: SyncPhase) {
    status.send_if_modified(|current| {
        if current.phase == phase {
            return false;
        }
        *current = OrchestratorStatus {
            phase,
            since: Utc::now(),
        };
        true
    });
}

enum Wake {
    Cancelled,
    StopDeadline,
    Foreground { open: bool },
    Network { open: bool },
    SyncState { open: bool },
}

struct Worker {
    session_id: SessionId,
    service: Arc<dyn SyncService>,
    config: SyncConfig,
    foreground: watch::Receiver<ForegroundState>,
    network: watch::Receiver<NetworkStatus>,
    sync_state: watch::Receiver<SyncState>,
    status: Arc<watch::Sender<OrchestratorStatus>>,
    cancel: CancellationToken,
    /// Whether a loop started by us (or found running) is still alive.
    loop_active: bool,
    /// Set after the loop failed; cleared when the conditions change again.
    suppressed: bool,
    stop_deadline: Option<Instant>,
}

impl Worker {
    async fn run(mut self) {
        let initial = *self.sync_state.borrow_and_update();
        if matches!(initial, SyncState::Running | SyncState::Offline) {
            debug!(session_id = %self.session_id, "Adopting running sync loop");
            self.loop_active = true;
        } else if self.config.initial_sync {
            info!(session_id = %self.session_id, "Running initial sync");
            self.start_loop().await;
        }

        let mut foreground_open = true;
        let mut network_open = true;
        let mut sync_state_open = true;
        let mut inputs_changed = true;

        loop {
            self.reconcile(inputs_changed).await;
            inputs_changed = false;

            let deadline = self.stop_deadline;
            let wake = tokio::select! {
                _ = self.cancel.cancelled() => Wake::Cancelled,
                _ = sleep_until(deadline) => Wake::StopDeadline,
                changed = self.foreground.changed(), if foreground_open => {
                    Wake::Foreground { open: changed.is_ok() }
                }
                changed = self.network.changed(), if network_open => {
                    Wake::Network { open: changed.is_ok() }
                }
                changed = self.sync_state.changed(), if sync_state_open => {
                    Wake::SyncState { open: changed.is_ok() }
                }
            };

            match wake {
                Wake::Cancelled => break,
                Wake::StopDeadline => {
                    self.stop_deadline = None;
                    self.stop_loop("grace period elapsed").await;
                }
                Wake::Foreground { open } => {
                    if !open {
                        warn!(session_id = %self.session_id, "Foreground signal closed");
                    }
                    foreground_open = open;
                    inputs_changed = open;
                }
                Wake::Network { open } => {
                    if !open {
                        warn!(session_id = %self.session_id, "Connectivity signal closed");
                    }
                    network_open = open;
                    inputs_changed = open;
                }
                Wake::SyncState { open: true } => self.on_sync_state(),
                Wake::SyncState { open: false } => {
                    warn!(session_id = %self.session_id, "Sync state signal closed");
                    sync_state_open = false;
                }
            }
        }

        self.stop_deadline = None;
        if self.loop_active {
            self.stop_loop("orchestrator stopped").await;
        }
    }

    async fn reconcile(&mut self, inputs_changed: bool) {
        let network = *self.network.borrow_and_update();
        let conditions = *self.foreground.borrow_and_update();
        let desired = should_sync(network, &conditions);

        if desired {
            if inputs_changed && self.suppressed {
                debug!(session_id = %self.session_id, "Conditions changed; sync may restart");
                self.suppressed = false;
            }
            if self.stop_deadline.take().is_some() {
                debug!(session_id = %self.session_id, "Pending sync stop cancelled");
            }
            if !self.loop_active && !self.suppressed {
                self.start_loop().await;
            }
        } else if self.loop_active {
            let grace = self.config.stop_grace_period();
            if grace.is_zero() {
                self.stop_loop("conditions no longer met").await;
            } else if self.stop_deadline.is_none() {
                debug!(
                    session_id = %self.session_id,
                    ?network,
                    ?conditions,
                    grace_ms = grace.as_millis() as u64,
                    "Scheduling sync stop"
                );
                self.stop_deadline = Some(Instant::now() + grace);
            }
        }

        let phase = if self.loop_active {
            SyncPhase::Syncing
        } else {
            SyncPhase::Idle
        };
        publish_phase(&self.status, phase);
    }

    fn on_sync_state(&mut self) {
        let state = *self.sync_state.borrow_and_update();
        match state {
            SyncState::Running | SyncState::Offline => {
                if !self.loop_active {
                    debug!(session_id = %self.session_id, ?state, "Sync loop reported running");
                    self.loop_active = true;
                }
            }
            SyncState::Idle => {
                if self.loop_active {
                    debug!(session_id = %self.session_id, "Sync loop went idle");
                    self.loop_active = false;
                    self.stop_deadline = None;
                }
            }
            SyncState::Error | SyncState::Terminated => {
                if self.loop_active {
                    warn!(
                        session_id = %self.session_id,
                        ?state,
                        "Sync loop failed; waiting for conditions to change"
                    );
                    self.suppressed = true;
                }
                self.loop_active = false;
                self.stop_deadline = None;
            }
        }
    }

    async fn start_loop(&mut self) {
        info!(session_id = %self.session_id, "Starting sync loop");
        match self.service.start_sync().await {
            Ok(()) => self.loop_active = true,
            Err(err) => {
                warn!(
                    session_id = %self.session_id,
                    error = %err,
                    "Failed to start sync loop; waiting for conditions to change"
                );
                self.suppressed = true;
            }
        }
    }

    async fn stop_loop(&mut self, reason: &'static str) {
        info!(session_id = %self.session_id, reason, "Stopping sync loop");
        if let Err(err) = self.service.stop_sync().await {
            warn!(session_id = %self.session_id, error = %err, "Failed to stop sync loop");
        }
        self.loop_active = false;
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeNetworkMonitor, FakeSyncService};
    use std::time::Duration;

    struct Harness {
        orchestrator: SyncOrchestrator,
        service: Arc<FakeSyncService>,
        foreground: Arc<ForegroundStateTracker>,
        network: Arc<FakeNetworkMonitor>,
    }

    fn harness(initial: SyncState, network: NetworkStatus, config: SyncConfig) -> Harness {
        let service = Arc::new(FakeSyncService::new(initial));
        let foreground = Arc::new(ForegroundStateTracker::default());
        let network = Arc::new(FakeNetworkMonitor::new(network));
        let orchestrator = SyncOrchestrator::new(
            SessionId::parse("@alice:example.org").unwrap(),
            service.clone(),
            foreground.clone(),
            network.clone(),
            config,
        );
        Harness {
            orchestrator,
            service,
            foreground,
            network,
        }
    }

    fn no_grace() -> SyncConfig {
        SyncConfig {
            stop_grace_period_ms: 0,
            initial_sync: false,
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[test]
    fn should_sync_requires_network_and_a_condition() {
        let mut conditions = ForegroundState::default();
        assert!(!should_sync(NetworkStatus::Connected, &conditions));
        conditions.has_ringing_call = true;
        assert!(should_sync(NetworkStatus::Connected, &conditions));
        assert!(!should_sync(NetworkStatus::Disconnected, &conditions));
    }

    #[tokio::test(start_paused = true)]
    async fn starts_idle_when_nothing_needs_sync() {
        let h = harness(SyncState::Idle, NetworkStatus::Connected, no_grace());
        assert_eq!(h.orchestrator.phase(), SyncPhase::Stopped);

        h.orchestrator.start().await;
        settle().await;

        assert_eq!(h.orchestrator.phase(), SyncPhase::Idle);
        assert_eq!(h.service.start_calls(), 0);

        h.foreground.set_in_foreground(true);
        settle().await;
        assert_eq!(h.orchestrator.phase(), SyncPhase::Syncing);
        assert_eq!(h.service.start_calls(), 1);

        h.orchestrator.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn start_twice_runs_one_loop() {
        let h = harness(SyncState::Idle, NetworkStatus::Connected, no_grace());
        h.foreground.set_in_foreground(true);

        h.orchestrator.start().await;
        h.orchestrator.start().await;
        settle().await;

        assert_eq!(h.service.start_calls(), 1);
        assert_eq!(h.service.live_loops(), 1);
        h.orchestrator.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_waits_for_the_loop_to_stop() {
        let h = harness(SyncState::Idle, NetworkStatus::Connected, no_grace());
        h.foreground.set_in_foreground(true);
        h.orchestrator.start().await;
        settle().await;
        assert_eq!(h.service.live_loops(), 1);

        h.orchestrator.stop().await;

        assert_eq!(h.service.stop_calls(), 1);
        assert_eq!(h.service.live_loops(), 0);
        assert_eq!(h.orchestrator.phase(), SyncPhase::Stopped);

        h.orchestrator.stop().await;
        assert_eq!(h.service.stop_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_then_start_never_overlaps() {
        let h = harness(SyncState::Idle, NetworkStatus::Connected, no_grace());
        h.foreground.set_in_foreground(true);
        h.orchestrator.start().await;
        settle().await;

        h.orchestrator.stop().await;
        h.orchestrator.start().await;
        settle().await;

        assert_eq!(h.service.start_calls(), 2);
        assert_eq!(h.service.live_loops(), 1);
        assert_eq!(h.service.max_live_loops(), 1);
        h.orchestrator.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn falling_edge_stops_after_grace_period() {
        let config = SyncConfig {
            stop_grace_period_ms: 3_000,
            initial_sync: false,
        };
        let h = harness(SyncState::Idle, NetworkStatus::Connected, config);
        h.foreground.set_in_foreground(true);
        h.orchestrator.start().await;
        settle().await;

        h.foreground.set_in_foreground(false);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(h.service.stop_calls(), 0);
        assert_eq!(h.orchestrator.phase(), SyncPhase::Syncing);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(h.service.stop_calls(), 1);
        assert_eq!(h.orchestrator.phase(), SyncPhase::Idle);
        h.orchestrator.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_stops_running_sync() {
        let h = harness(SyncState::Idle, NetworkStatus::Connected, no_grace());
        h.foreground.set_in_foreground(true);
        h.orchestrator.start().await;
        settle().await;

        h.network.set_status(NetworkStatus::Disconnected);
        settle().await;
        assert_eq!(h.service.stop_calls(), 1);
        assert_eq!(h.orchestrator.phase(), SyncPhase::Idle);

        h.network.set_status(NetworkStatus::Connected);
        settle().await;
        assert_eq!(h.service.start_calls(), 2);
        h.orchestrator.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn loop_failure_waits_for_conditions_to_change() {
        let h = harness(SyncState::Idle, NetworkStatus::Connected, no_grace());
        h.foreground.set_in_foreground(true);
        h.orchestrator.start().await;
        settle().await;

        h.service.emit_state(SyncState::Error);
        settle().await;
        assert_eq!(h.orchestrator.phase(), SyncPhase::Idle);
        assert_eq!(h.service.start_calls(), 1);

        h.foreground.set_syncing_notification_event(true);
        settle().await;
        assert_eq!(h.service.start_calls(), 2);
        assert_eq!(h.orchestrator.phase(), SyncPhase::Syncing);
        h.orchestrator.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn failed_start_is_not_retried_until_conditions_change() {
        let h = harness(SyncState::Idle, NetworkStatus::Connected, no_grace());
        h.service.fail_next_start();
        h.foreground.set_in_foreground(true);
        h.orchestrator.start().await;
        settle().await;

        assert_eq!(h.service.start_calls(), 1);
        assert_eq!(h.service.live_loops(), 0);
        assert_eq!(h.orchestrator.phase(), SyncPhase::Idle);

        h.foreground.set_in_call(true);
        settle().await;
        assert_eq!(h.service.start_calls(), 2);
        assert_eq!(h.service.live_loops(), 1);
        h.orchestrator.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn adopts_loop_that_is_already_running() {
        let h = harness(SyncState::Running, NetworkStatus::Connected, no_grace());
        h.foreground.set_in_foreground(true);
        h.orchestrator.start().await;
        settle().await;

        assert_eq!(h.service.start_calls(), 0);
        assert_eq!(h.orchestrator.phase(), SyncPhase::Syncing);
        h.orchestrator.stop().await;
        assert_eq!(h.service.stop_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn initial_sync_runs_even_offline() {
        let config = SyncConfig {
            stop_grace_period_ms: 3_000,
            initial_sync: true,
        };
        let h = harness(SyncState::Idle, NetworkStatus::Disconnected, config);
        h.orchestrator.start().await;
        settle().await;

        assert_eq!(h.service.start_calls(), 1);
        h.orchestrator.stop().await;
    }
}
