//! In-memory collaborators for unit and integration tests.
//!
//! Enabled for this crate's own tests and, through the `test-helpers`
//! feature, for hosts that want to drive the coordination layer without a
//! messaging client.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use appnav_ids::{RoomId, SessionId};
use async_trait::async_trait;
use tokio::sync::watch;

use crate::foreground::ProcessLifecycle;
use crate::rooms::RoomHandle;
use crate::sync::{NetworkMonitor, NetworkStatus, SyncError, SyncService, SyncServiceSource, SyncState};

/// Room handle that counts how often it was destroyed.
#[derive(Debug)]
pub struct FakeRoom {
    session_id: SessionId,
    room_id: RoomId,
    destroyed: AtomicUsize,
}

impl FakeRoom {
    pub fn new(session_id: SessionId, room_id: RoomId) -> Self {
        Self {
            session_id,
            room_id,
            destroyed: AtomicUsize::new(0),
        }
    }

    pub fn destroy_count(&self) -> usize {
        self.destroyed.load(Ordering::SeqCst)
    }
}

impl RoomHandle for FakeRoom {
    fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    fn destroy(&self) {
        self.destroyed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Sync service that records calls and tracks how many loops are alive.
///
/// `max_live_loops` above one means two loops overlapped.
pub struct FakeSyncService {
    state: watch::Sender<SyncState>,
    start_calls: AtomicUsize,
    stop_calls: AtomicUsize,
    live: AtomicUsize,
    max_live: AtomicUsize,
    fail_next_start: AtomicBool,
    stop_delay_ms: AtomicU64,
}

impl FakeSyncService {
    pub fn new(initial: SyncState) -> Self {
        let (state, _) = watch::channel(initial);
        let live = usize::from(matches!(initial, SyncState::Running | SyncState::Offline));
        Self {
            state,
            start_calls: AtomicUsize::new(0),
            stop_calls: AtomicUsize::new(0),
            live: AtomicUsize::new(live),
            max_live: AtomicUsize::new(live),
            fail_next_start: AtomicBool::new(false),
            stop_delay_ms: AtomicU64::new(0),
        }
    }

    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }

    pub fn live_loops(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn max_live_loops(&self) -> usize {
        self.max_live.load(Ordering::SeqCst)
    }

    pub fn current_state(&self) -> SyncState {
        *self.state.borrow()
    }

    /// Makes the next `start_sync` call fail without starting a loop.
    pub fn fail_next_start(&self) {
        self.fail_next_start.store(true, Ordering::SeqCst);
    }

    /// Makes `stop_sync` take this long before the loop reports `Idle`.
    pub fn set_stop_delay(&self, delay: Duration) {
        self.stop_delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Reports a state change as if the loop did it on its own.
    pub fn emit_state(&self, state: SyncState) {
        if state.is_failure() || state == SyncState::Idle {
            self.live.store(0, Ordering::SeqCst);
        }
        self.state.send_replace(state);
    }
}

#[async_trait]
impl SyncService for FakeSyncService {
    async fn start_sync(&self) -> Result<(), SyncError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;

        if self.fail_next_start.swap(false, Ordering::SeqCst) {
            return Err(SyncError::StartFailed("injected failure".to_string()));
        }

        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_live.fetch_max(live, Ordering::SeqCst);
        self.state.send_replace(SyncState::Running);
        Ok(())
    }

    async fn stop_sync(&self) -> Result<(), SyncError> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;

        let delay_ms = self.stop_delay_ms.load(Ordering::SeqCst);
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }

        let _ = self
            .live
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |live| live.checked_sub(1));
        self.state.send_replace(SyncState::Idle);
        Ok(())
    }

    fn state(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }
}

pub struct FakeNetworkMonitor {
    status: watch::Sender<NetworkStatus>,
}

impl FakeNetworkMonitor {
    pub fn new(initial: NetworkStatus) -> Self {
        let (status, _) = watch::channel(initial);
        Self { status }
    }

    pub fn set_status(&self, status: NetworkStatus) {
        self.status.send_replace(status);
    }
}

impl NetworkMonitor for FakeNetworkMonitor {
    fn connectivity(&self) -> watch::Receiver<NetworkStatus> {
        self.status.subscribe()
    }
}

pub struct FakeProcessLifecycle {
    foreground: watch::Sender<bool>,
}

impl FakeProcessLifecycle {
    pub fn new(in_foreground: bool) -> Self {
        let (foreground, _) = watch::channel(in_foreground);
        Self { foreground }
    }

    pub fn set_foreground(&self, in_foreground: bool) {
        self.foreground.send_replace(in_foreground);
    }

    /// Number of live receivers handed out by `foreground()`.
    pub fn subscriber_count(&self) -> usize {
        self.foreground.receiver_count()
    }
}

impl ProcessLifecycle for FakeProcessLifecycle {
    fn foreground(&self) -> watch::Receiver<bool> {
        self.foreground.subscribe()
    }
}

#[derive(Default)]
pub struct FakeSyncServiceSource {
    services: Mutex<HashMap<SessionId, Arc<dyn SyncService>>>,
}

impl FakeSyncServiceSource {
    pub fn insert(&self, session_id: SessionId, service: Arc<dyn SyncService>) {
        self.services.lock().unwrap().insert(session_id, service);
    }
}

impl SyncServiceSource for FakeSyncServiceSource {
    fn sync_service(&self, session_id: &SessionId) -> Option<Arc<dyn SyncService>> {
        self.services.lock().unwrap().get(session_id).cloned()
    }
}
