//! Single-writer holder of the current navigation state.
//!
//! Every enter/leave goes through `watch::Sender::send_if_modified`, so the
//! owner comparison in a leave and the swap it triggers happen under one lock
//! and cannot interleave with a concurrent enter. Readers get snapshots.

use appnav_ids::{RoomId, SessionId, SpaceId, ThreadId};
use tokio::sync::watch;
use tracing::{debug, warn};

use super::state::{AppNavigationState, NavigationState, Owner};
use super::transition::{next_state, NavigationEvent, Transition};
use crate::error::Result;
use crate::foreground::ForegroundStateTracker;

pub struct NavigationStateStore {
    state: watch::Sender<NavigationState>,
}

impl Default for NavigationStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationStateStore {
    pub fn new() -> Self {
        let (state, _) = watch::channel(NavigationState::Root);
        Self { state }
    }

    pub fn state(&self) -> NavigationState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<NavigationState> {
        self.state.subscribe()
    }

    pub fn app_navigation_state(&self, foreground: &ForegroundStateTracker) -> AppNavigationState {
        AppNavigationState {
            navigation_state: self.state(),
            is_in_foreground: foreground.is_in_foreground(),
        }
    }

    pub fn current_session_id(&self) -> Option<SessionId> {
        self.state.borrow().current_session_id().cloned()
    }

    pub fn current_space_id(&self) -> Option<SpaceId> {
        self.state.borrow().current_space_id().cloned()
    }

    pub fn current_room_id(&self) -> Option<RoomId> {
        self.state.borrow().current_room_id().cloned()
    }

    pub fn current_thread_id(&self) -> Option<ThreadId> {
        self.state.borrow().current_thread_id().cloned()
    }

    pub fn enter_session(&self, owner: &Owner, session_id: SessionId) -> Result<()> {
        self.apply(NavigationEvent::EnterSession {
            owner: owner.clone(),
            session_id,
        })
        .map(|_| ())
    }

    pub fn leave_session(&self, owner: &Owner) -> bool {
        self.leave(NavigationEvent::LeaveSession {
            owner: owner.clone(),
        })
    }

    /// `None` enters the "no space selected" scope.
    pub fn enter_space(&self, owner: &Owner, space_id: Option<SpaceId>) -> Result<()> {
        self.apply(NavigationEvent::EnterSpace {
            owner: owner.clone(),
            space_id,
        })
        .map(|_| ())
    }

    pub fn leave_space(&self, owner: &Owner) -> bool {
        self.leave(NavigationEvent::LeaveSpace {
            owner: owner.clone(),
        })
    }

    pub fn enter_room(&self, owner: &Owner, room_id: RoomId) -> Result<()> {
        self.apply(NavigationEvent::EnterRoom {
            owner: owner.clone(),
            room_id,
        })
        .map(|_| ())
    }

    pub fn leave_room(&self, owner: &Owner) -> bool {
        self.leave(NavigationEvent::LeaveRoom {
            owner: owner.clone(),
        })
    }

    pub fn enter_thread(&self, owner: &Owner, thread_id: ThreadId) -> Result<()> {
        self.apply(NavigationEvent::EnterThread {
            owner: owner.clone(),
            thread_id,
        })
        .map(|_| ())
    }

    pub fn leave_thread(&self, owner: &Owner) -> bool {
        self.leave(NavigationEvent::LeaveThread {
            owner: owner.clone(),
        })
    }

    /// Leaves never fail; a mismatch only means the signal is stale.
    fn leave(&self, event: NavigationEvent) -> bool {
        self.apply(event).unwrap_or(false)
    }

    fn apply(&self, event: NavigationEvent) -> Result<bool> {
        let mut outcome = Ok(false);
        self.state.send_if_modified(|state| match next_state(state, &event) {
            Ok(Transition::Changed(next)) => {
                debug!(
                    owner = %event.owner(),
                    from = %state.level(),
                    to = %next.level(),
                    "Navigation state changed"
                );
                *state = next;
                outcome = Ok(true);
                true
            }
            Ok(Transition::Unchanged) => {
                debug!(
                    owner = %event.owner(),
                    level = %event.level(),
                    current = %state.level(),
                    "Ignoring navigation event with no effect"
                );
                false
            }
            Err(err) => {
                warn!(owner = %event.owner(), error = %err, "Rejected navigation event");
                outcome = Err(err);
                false
            }
        });
        outcome
    }
}
