//! Live room handles and the per-session cache that keeps them alive.

mod cache;

pub use cache::{ActiveRoomCache, CacheMode};

use appnav_ids::{RoomId, SessionId};

/// A live, resource-owning room object created by the messaging client.
///
/// Implementors should:
/// - Keep `session_id`/`room_id` stable for the handle's lifetime
/// - Release subscriptions in `destroy`; it is called at most once by the cache
pub trait RoomHandle: Send + Sync {
    fn session_id(&self) -> &SessionId;

    fn room_id(&self) -> &RoomId;

    fn destroy(&self);
}
