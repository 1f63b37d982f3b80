//! Where the user currently is: session → space → room → thread.

mod state;
mod store;
mod transition;

pub use state::{
    AppNavigationState, NavigationLevel, NavigationState, Owner, RoomNode, SessionNode,
    SpaceNode, ThreadNode,
};
pub use store::NavigationStateStore;
pub use transition::{next_state, NavigationEvent, Transition};
