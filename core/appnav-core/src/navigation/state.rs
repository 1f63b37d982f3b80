//! Navigation state types.
//!
//! The node structs encode the hierarchy: a space can only hang off a session,
//! a room off a space, a thread off a room. `NavigationState` is the current
//! leaf of that chain.

use appnav_ids::{RoomId, SessionId, SpaceId, ThreadId};
use serde::Serialize;
use std::fmt;

/// Identifies the UI component that issued a transition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Owner(String);

impl Owner {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Fresh token for components without a stable identity of their own.
    pub fn generate() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Owner {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationLevel {
    Root,
    Session,
    Space,
    Room,
    Thread,
}

impl fmt::Display for NavigationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NavigationLevel::Root => "root",
            NavigationLevel::Session => "session",
            NavigationLevel::Space => "space",
            NavigationLevel::Room => "room",
            NavigationLevel::Thread => "thread",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionNode {
    pub owner: Owner,
    pub session_id: SessionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpaceNode {
    pub owner: Owner,
    /// `None` when the user is browsing rooms outside of any space.
    pub space_id: Option<SpaceId>,
    pub parent: SessionNode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomNode {
    pub owner: Owner,
    pub room_id: RoomId,
    pub parent: SpaceNode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadNode {
    pub owner: Owner,
    pub thread_id: ThreadId,
    pub parent: RoomNode,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "level", rename_all = "snake_case")]
pub enum NavigationState {
    #[default]
    Root,
    Session(SessionNode),
    Space(SpaceNode),
    Room(RoomNode),
    Thread(ThreadNode),
}

impl NavigationState {
    pub fn level(&self) -> NavigationLevel {
        match self {
            NavigationState::Root => NavigationLevel::Root,
            NavigationState::Session(_) => NavigationLevel::Session,
            NavigationState::Space(_) => NavigationLevel::Space,
            NavigationState::Room(_) => NavigationLevel::Room,
            NavigationState::Thread(_) => NavigationLevel::Thread,
        }
    }

    /// Owner of the current leaf; `Root` has none.
    pub fn owner(&self) -> Option<&Owner> {
        match self {
            NavigationState::Root => None,
            NavigationState::Session(node) => Some(&node.owner),
            NavigationState::Space(node) => Some(&node.owner),
            NavigationState::Room(node) => Some(&node.owner),
            NavigationState::Thread(node) => Some(&node.owner),
        }
    }

    pub fn session_node(&self) -> Option<&SessionNode> {
        match self {
            NavigationState::Root => None,
            NavigationState::Session(node) => Some(node),
            NavigationState::Space(node) => Some(&node.parent),
            NavigationState::Room(node) => Some(&node.parent.parent),
            NavigationState::Thread(node) => Some(&node.parent.parent.parent),
        }
    }

    pub fn space_node(&self) -> Option<&SpaceNode> {
        match self {
            NavigationState::Root | NavigationState::Session(_) => None,
            NavigationState::Space(node) => Some(node),
            NavigationState::Room(node) => Some(&node.parent),
            NavigationState::Thread(node) => Some(&node.parent.parent),
        }
    }

    pub fn room_node(&self) -> Option<&RoomNode> {
        match self {
            NavigationState::Root | NavigationState::Session(_) | NavigationState::Space(_) => {
                None
            }
            NavigationState::Room(node) => Some(node),
            NavigationState::Thread(node) => Some(&node.parent),
        }
    }

    pub fn thread_node(&self) -> Option<&ThreadNode> {
        match self {
            NavigationState::Thread(node) => Some(node),
            _ => None,
        }
    }

    pub fn current_session_id(&self) -> Option<&SessionId> {
        self.session_node().map(|node| &node.session_id)
    }

    /// `None` both above the space level and when no space is selected.
    pub fn current_space_id(&self) -> Option<&SpaceId> {
        self.space_node().and_then(|node| node.space_id.as_ref())
    }

    pub fn current_room_id(&self) -> Option<&RoomId> {
        self.room_node().map(|node| &node.room_id)
    }

    pub fn current_thread_id(&self) -> Option<&ThreadId> {
        self.thread_node().map(|node| &node.thread_id)
    }
}

/// Where the user is, and whether they can currently see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppNavigationState {
    pub navigation_state: NavigationState,
    pub is_in_foreground: bool,
}

impl AppNavigationState {
    /// True when the given room is on screen right now.
    pub fn is_viewing_room(&self, session_id: &SessionId, room_id: &RoomId) -> bool {
        self.is_in_foreground
            && self.navigation_state.current_session_id() == Some(session_id)
            && self.navigation_state.current_room_id() == Some(room_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thread_state() -> NavigationState {
        let session = SessionNode {
            owner: Owner::new("session-owner"),
            session_id: SessionId::parse("@alice:example.org").unwrap(),
        };
        let space = SpaceNode {
            owner: Owner::new("space-owner"),
            space_id: Some(SpaceId::parse("!space:example.org").unwrap()),
            parent: session,
        };
        let room = RoomNode {
            owner: Owner::new("room-owner"),
            room_id: RoomId::parse("!room:example.org").unwrap(),
            parent: space,
        };
        NavigationState::Thread(ThreadNode {
            owner: Owner::new("thread-owner"),
            thread_id: ThreadId::parse("$thread").unwrap(),
            parent: room,
        })
    }

    #[test]
    fn root_has_no_ids() {
        let state = NavigationState::Root;
        assert_eq!(state.level(), NavigationLevel::Root);
        assert!(state.owner().is_none());
        assert!(state.current_session_id().is_none());
        assert!(state.current_space_id().is_none());
        assert!(state.current_room_id().is_none());
        assert!(state.current_thread_id().is_none());
    }

    #[test]
    fn thread_exposes_whole_chain() {
        let state = thread_state();
        assert_eq!(state.level(), NavigationLevel::Thread);
        assert_eq!(state.owner(), Some(&Owner::new("thread-owner")));
        assert_eq!(
            state.current_session_id().map(|id| id.as_str()),
            Some("@alice:example.org")
        );
        assert_eq!(
            state.current_space_id().map(|id| id.as_str()),
            Some("!space:example.org")
        );
        assert_eq!(
            state.current_room_id().map(|id| id.as_str()),
            Some("!room:example.org")
        );
        assert_eq!(
            state.current_thread_id().map(|id| id.as_str()),
            Some("$thread")
        );
    }

    #[test]
    fn no_space_selected_reports_no_space_id() {
        let state = NavigationState::Space(SpaceNode {
            owner: Owner::new("space-owner"),
            space_id: None,
            parent: SessionNode {
                owner: Owner::new("session-owner"),
                session_id: SessionId::parse("@alice:example.org").unwrap(),
            },
        });
        assert!(state.space_node().is_some());
        assert!(state.current_space_id().is_none());
        assert!(state.current_session_id().is_some());
    }

    #[test]
    fn levels_are_ordered_by_depth() {
        assert!(NavigationLevel::Root < NavigationLevel::Session);
        assert!(NavigationLevel::Session < NavigationLevel::Space);
        assert!(NavigationLevel::Space < NavigationLevel::Room);
        assert!(NavigationLevel::Room < NavigationLevel::Thread);
    }

    #[test]
    fn generated_owners_are_unique() {
        assert_ne!(Owner::generate(), Owner::generate());
    }

    #[test]
    fn viewing_room_requires_foreground() {
        let state = thread_state();
        let session_id = SessionId::parse("@alice:example.org").unwrap();
        let room_id = RoomId::parse("!room:example.org").unwrap();

        let background = AppNavigationState {
            navigation_state: state.clone(),
            is_in_foreground: false,
        };
        assert!(!background.is_viewing_room(&session_id, &room_id));

        let foreground = AppNavigationState {
            navigation_state: state,
            is_in_foreground: true,
        };
        assert!(foreground.is_viewing_room(&session_id, &room_id));
    }

    #[test]
    fn serializes_with_level_tag() {
        let value = serde_json::to_value(thread_state()).unwrap();
        assert_eq!(value["level"], "thread");
        assert_eq!(value["thread_id"], "$thread");
        assert_eq!(value["parent"]["parent"]["space_id"], "!space:example.org");
    }
}
