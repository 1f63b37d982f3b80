//! Conditions under which the app needs to stay connected.
//!
//! Each flag has exactly one source: the OS lifecycle for `in_foreground`,
//! the call subsystem for `has_ringing_call`/`in_call`, and notification
//! handling for `syncing_notification_event`. They are only combined by the
//! reader.

use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// OS-level visibility signal.
pub trait ProcessLifecycle: Send + Sync {
    /// Holds `true` while the app is visible to the user.
    fn foreground(&self) -> watch::Receiver<bool>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ForegroundState {
    pub in_foreground: bool,
    pub has_ringing_call: bool,
    pub in_call: bool,
    pub syncing_notification_event: bool,
}

impl ForegroundState {
    /// True when at least one condition wants the session online.
    pub fn any_active(&self) -> bool {
        self.in_foreground || self.has_ringing_call || self.in_call || self.syncing_notification_event
    }
}

pub struct ForegroundStateTracker {
    state: Arc<watch::Sender<ForegroundState>>,
    lifecycle: Option<Arc<dyn ProcessLifecycle>>,
    observer: Mutex<Option<JoinHandle<()>>>,
}

impl Default for ForegroundStateTracker {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ForegroundStateTracker {
    pub fn new(lifecycle: Option<Arc<dyn ProcessLifecycle>>) -> Self {
        let (state, _) = watch::channel(ForegroundState::default());
        Self {
            state: Arc::new(state),
            lifecycle,
            observer: Mutex::new(None),
        }
    }

    pub fn with_lifecycle(lifecycle: Arc<dyn ProcessLifecycle>) -> Self {
        Self::new(Some(lifecycle))
    }

    /// Mirrors the OS lifecycle into `in_foreground` until the tracker is dropped.
    ///
    /// Must be called from within a tokio runtime. Calling it again is a no-op.
    pub fn start_observing_foreground(&self) {
        let Some(lifecycle) = self.lifecycle.as_ref() else {
            debug!("No process lifecycle source; foreground flag is set manually");
            return;
        };

        // Recover from poisoning - the slot only ever holds a task handle
        let mut observer = self
            .observer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if observer.is_some() {
            return;
        }

        let mut signal = lifecycle.foreground();
        let state = Arc::clone(&self.state);
        *observer = Some(tokio::spawn(async move {
            loop {
                let visible = *signal.borrow_and_update();
                update_flag(&state, "in_foreground", visible, |s| &mut s.in_foreground);
                if signal.changed().await.is_err() {
                    debug!("Process lifecycle signal closed");
                    break;
                }
            }
        }));
    }

    pub fn snapshot(&self) -> ForegroundState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ForegroundState> {
        self.state.subscribe()
    }

    pub fn is_in_foreground(&self) -> bool {
        self.state.borrow().in_foreground
    }

    pub fn has_ringing_call(&self) -> bool {
        self.state.borrow().has_ringing_call
    }

    pub fn is_in_call(&self) -> bool {
        self.state.borrow().in_call
    }

    pub fn is_syncing_notification_event(&self) -> bool {
        self.state.borrow().syncing_notification_event
    }

    pub fn set_in_foreground(&self, value: bool) {
        update_flag(&self.state, "in_foreground", value, |s| &mut s.in_foreground);
    }

    pub fn set_has_ringing_call(&self, value: bool) {
        update_flag(&self.state, "has_ringing_call", value, |s| {
            &mut s.has_ringing_call
        });
    }

    pub fn set_in_call(&self, value: bool) {
        update_flag(&self.state, "in_call", value, |s| &mut s.in_call);
    }

    pub fn set_syncing_notification_event(&self, value: bool) {
        update_flag(&self.state, "syncing_notification_event", value, |s| {
            &mut s.syncing_notification_event
        });
    }
}

impl Drop for ForegroundStateTracker {
    fn drop(&mut self) {
        let observer = self
            .observer
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(handle) = observer.take() {
            handle.abort();
        }
    }
}

fn update_flag(
    state: &watch::Sender<ForegroundState>,
    flag: &'static str,
    value: bool,
    field: impl FnOnce(&mut ForegroundState) -> &mut bool,
) {
    state.send_if_modified(|current| {
        let slot = field(current);
        if *slot == value {
            return false;
        }
        *slot = value;
        debug!(flag, value, "Foreground condition changed");
        true
    });
}
