//! Per-session cache of live room handles.
//!
//! Lock order is always sessions map → session's room list. Inserts hold the
//! map lock (read for a known session, write for a new one) for the whole
//! insert, and `clear` detaches a session under the write lock, so a room can
//! never land in a list that is being torn down. `destroy()` runs after all
//! locks are released.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use appnav_ids::{RoomId, SessionId};
use tracing::{debug, info};

use super::RoomHandle;

type SessionRooms<R> = Arc<Mutex<Vec<Arc<R>>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Several rooms per session, deduplicated by room id.
    #[default]
    MultiSlot,
    /// Only the most recently added room per session is kept.
    ///
    /// An evicted handle is forgotten, not destroyed: the caller that replaced
    /// it owns its teardown, and a later `clear` will not reach it.
    SingleSlot,
}

pub struct ActiveRoomCache<R: RoomHandle + ?Sized> {
    mode: CacheMode,
    sessions: RwLock<HashMap<SessionId, SessionRooms<R>>>,
}

impl<R: RoomHandle + ?Sized> Default for ActiveRoomCache<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RoomHandle + ?Sized> ActiveRoomCache<R> {
    pub fn new() -> Self {
        Self::with_mode(CacheMode::MultiSlot)
    }

    pub fn single_slot() -> Self {
        Self::with_mode(CacheMode::SingleSlot)
    }

    pub fn with_mode(mode: CacheMode) -> Self {
        Self {
            mode,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn mode(&self) -> CacheMode {
        self.mode
    }

    /// Caches `room` unless a handle for the same room is already cached.
    ///
    /// Returns the retained handle, which is the earlier one on a duplicate.
    /// In single-slot mode a different room evicts the previous one without
    /// destroying it.
    pub fn add_room(&self, room: Arc<R>) -> Arc<R> {
        let session_id = room.session_id().clone();

        {
            let sessions = self.read_sessions();
            if let Some(rooms) = sessions.get(&session_id) {
                return self.insert(&session_id, rooms, room);
            }
        }

        let mut sessions = self.write_sessions();
        let rooms = sessions.entry(session_id.clone()).or_default();
        self.insert(&session_id, rooms, room)
    }

    /// Most recently added room of the session.
    pub fn get_active_room(&self, session_id: &SessionId) -> Option<Arc<R>> {
        let sessions = self.read_sessions();
        let rooms = sessions.get(session_id)?;
        let rooms = lock_rooms(rooms);
        rooms.last().cloned()
    }

    pub fn get_active_room_matching(
        &self,
        session_id: &SessionId,
        room_id: &RoomId,
    ) -> Option<Arc<R>> {
        let sessions = self.read_sessions();
        let rooms = sessions.get(session_id)?;
        let rooms = lock_rooms(rooms);
        rooms
            .iter()
            .find(|room| room.room_id() == room_id)
            .cloned()
    }

    /// Forgets the room without destroying it; the caller owns its teardown.
    pub fn remove_room(&self, session_id: &SessionId, room_id: &RoomId) -> Option<Arc<R>> {
        let sessions = self.read_sessions();
        let rooms = sessions.get(session_id)?;
        let mut rooms = lock_rooms(rooms);
        let index = rooms.iter().position(|room| room.room_id() == room_id)?;
        debug!(session_id = %session_id, room_id = %room_id, "Removing room from cache");
        Some(rooms.remove(index))
    }

    pub fn room_count(&self, session_id: &SessionId) -> usize {
        let sessions = self.read_sessions();
        sessions
            .get(session_id)
            .map(|rooms| lock_rooms(rooms).len())
            .unwrap_or(0)
    }

    /// Drops every room of the session and destroys each of them once.
    pub fn clear(&self, session_id: &SessionId) {
        let detached = self.write_sessions().remove(session_id);
        let Some(rooms) = detached else {
            return;
        };

        let rooms = std::mem::take(&mut *lock_rooms(&rooms));
        info!(session_id = %session_id, count = rooms.len(), "Destroying cached rooms");
        for room in rooms {
            room.destroy();
        }
    }

    /// Process teardown: destroys the rooms of every session.
    pub fn clear_all(&self) {
        let detached: Vec<_> = self.write_sessions().drain().collect();
        for (session_id, rooms) in detached {
            let rooms = std::mem::take(&mut *lock_rooms(&rooms));
            info!(session_id = %session_id, count = rooms.len(), "Destroying cached rooms");
            for room in rooms {
                room.destroy();
            }
        }
    }

    fn insert(&self, session_id: &SessionId, rooms: &SessionRooms<R>, room: Arc<R>) -> Arc<R> {
        let mut rooms = lock_rooms(rooms);
        if let Some(existing) = rooms.iter().find(|cached| cached.room_id() == room.room_id()) {
            debug!(
                session_id = %session_id,
                room_id = %room.room_id(),
                "Room already cached; keeping existing handle"
            );
            return Arc::clone(existing);
        }

        if self.mode == CacheMode::SingleSlot && !rooms.is_empty() {
            debug!(
                session_id = %session_id,
                evicted = rooms.len(),
                "Replacing active room"
            );
            rooms.clear();
        }

        debug!(session_id = %session_id, room_id = %room.room_id(), "Caching room");
        rooms.push(Arc::clone(&room));
        room
    }

    // Recover from poisoning - a panicking caller cannot leave the map half-written
    fn read_sessions(&self) -> RwLockReadGuard<'_, HashMap<SessionId, SessionRooms<R>>> {
        self.sessions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_sessions(&self) -> RwLockWriteGuard<'_, HashMap<SessionId, SessionRooms<R>>> {
        self.sessions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn lock_rooms<R: ?Sized>(rooms: &Mutex<Vec<Arc<R>>>) -> MutexGuard<'_, Vec<Arc<R>>> {
    rooms.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
