//! Maps enter/leave signals from UI components to navigation transitions.
//!
//! Enters replace whatever sits at their level, whoever created it. Leaves only
//! pop when the leaf is at their level and was created by the same owner, so a
//! late teardown from a replaced screen cannot erase the newer position.

use appnav_ids::{RoomId, SessionId, SpaceId, ThreadId};

use super::state::{
    NavigationLevel, NavigationState, Owner, RoomNode, SessionNode, SpaceNode, ThreadNode,
};
use crate::error::{AppNavError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationEvent {
    EnterSession {
        owner: Owner,
        session_id: SessionId,
    },
    LeaveSession {
        owner: Owner,
    },
    EnterSpace {
        owner: Owner,
        space_id: Option<SpaceId>,
    },
    LeaveSpace {
        owner: Owner,
    },
    EnterRoom {
        owner: Owner,
        room_id: RoomId,
    },
    LeaveRoom {
        owner: Owner,
    },
    EnterThread {
        owner: Owner,
        thread_id: ThreadId,
    },
    LeaveThread {
        owner: Owner,
    },
}

impl NavigationEvent {
    pub fn level(&self) -> NavigationLevel {
        match self {
            NavigationEvent::EnterSession { .. } | NavigationEvent::LeaveSession { .. } => {
                NavigationLevel::Session
            }
            NavigationEvent::EnterSpace { .. } | NavigationEvent::LeaveSpace { .. } => {
                NavigationLevel::Space
            }
            NavigationEvent::EnterRoom { .. } | NavigationEvent::LeaveRoom { .. } => {
                NavigationLevel::Room
            }
            NavigationEvent::EnterThread { .. } | NavigationEvent::LeaveThread { .. } => {
                NavigationLevel::Thread
            }
        }
    }

    pub fn owner(&self) -> &Owner {
        match self {
            NavigationEvent::EnterSession { owner, .. }
            | NavigationEvent::LeaveSession { owner }
            | NavigationEvent::EnterSpace { owner, .. }
            | NavigationEvent::LeaveSpace { owner }
            | NavigationEvent::EnterRoom { owner, .. }
            | NavigationEvent::LeaveRoom { owner }
            | NavigationEvent::EnterThread { owner, .. }
            | NavigationEvent::LeaveThread { owner } => owner,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Changed(NavigationState),
    /// Stale leave, level mismatch, or an enter identical to the current state.
    Unchanged,
}

pub fn next_state(current: &NavigationState, event: &NavigationEvent) -> Result<Transition> {
    let next = match event {
        NavigationEvent::EnterSession { owner, session_id } => {
            Some(NavigationState::Session(SessionNode {
                owner: owner.clone(),
                session_id: session_id.clone(),
            }))
        }
        NavigationEvent::EnterSpace { owner, space_id } => {
            let parent = enclosing(current, current.session_node(), NavigationLevel::Space)?;
            Some(NavigationState::Space(SpaceNode {
                owner: owner.clone(),
                space_id: space_id.clone(),
                parent,
            }))
        }
        NavigationEvent::EnterRoom { owner, room_id } => {
            let parent = enclosing(current, current.space_node(), NavigationLevel::Room)?;
            Some(NavigationState::Room(RoomNode {
                owner: owner.clone(),
                room_id: room_id.clone(),
                parent,
            }))
        }
        NavigationEvent::EnterThread { owner, thread_id } => {
            let parent = enclosing(current, current.room_node(), NavigationLevel::Thread)?;
            Some(NavigationState::Thread(ThreadNode {
                owner: owner.clone(),
                thread_id: thread_id.clone(),
                parent,
            }))
        }
        NavigationEvent::LeaveSession { owner } => match current {
            NavigationState::Session(node) if &node.owner == owner => Some(NavigationState::Root),
            _ => None,
        },
        NavigationEvent::LeaveSpace { owner } => match current {
            NavigationState::Space(node) if &node.owner == owner => {
                Some(NavigationState::Session(node.parent.clone()))
            }
            _ => None,
        },
        NavigationEvent::LeaveRoom { owner } => match current {
            NavigationState::Room(node) if &node.owner == owner => {
                Some(NavigationState::Space(node.parent.clone()))
            }
            _ => None,
        },
        NavigationEvent::LeaveThread { owner } => match current {
            NavigationState::Thread(node) if &node.owner == owner => {
                Some(NavigationState::Room(node.parent.clone()))
            }
            _ => None,
        },
    };

    Ok(match next {
        Some(state) if &state != current => Transition::Changed(state),
        _ => Transition::Unchanged,
    })
}

fn enclosing<T: Clone>(
    current: &NavigationState,
    parent: Option<&T>,
    requested: NavigationLevel,
) -> Result<T> {
    parent.cloned().ok_or(AppNavError::InvalidNavigation {
        requested,
        current: current.level(),
    })
}
