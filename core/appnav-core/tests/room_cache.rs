use std::sync::Arc;

use appnav_core::testing::{FakeNetworkMonitor, FakeRoom, FakeSyncService, FakeSyncServiceSource};
use appnav_core::{
    ActiveRoomCache, ForegroundStateTracker, NavigationStateStore, NetworkStatus, Owner,
    RoomHandle, RoomId, SessionId, SyncConfig, SyncOrchestratorProvider, SyncState,
};

fn session(raw: &str) -> SessionId {
    SessionId::parse(raw).unwrap()
}

fn room(raw: &str) -> RoomId {
    RoomId::parse(raw).unwrap()
}

#[test]
fn adding_same_room_twice_keeps_first_handle() {
    let cache: ActiveRoomCache<dyn RoomHandle> = ActiveRoomCache::new();
    let s1 = session("@alice:example.org");
    let r1 = room("!r1:example.org");

    let first = Arc::new(FakeRoom::new(s1.clone(), r1.clone()));
    let second = Arc::new(FakeRoom::new(s1.clone(), r1.clone()));
    cache.add_room(first.clone());
    let found_once = cache.get_active_room_matching(&s1, &r1).unwrap();
    cache.add_room(second.clone());
    let found_twice = cache.get_active_room_matching(&s1, &r1).unwrap();

    assert!(Arc::ptr_eq(&found_once, &found_twice));
    assert!(std::ptr::eq(
        Arc::as_ptr(&found_once) as *const (),
        Arc::as_ptr(&first) as *const ()
    ));
    assert_eq!(second.destroy_count(), 0);
}

#[test]
fn clearing_one_session_leaves_others_alone() {
    let cache = ActiveRoomCache::new();
    let alice = session("@alice:example.org");
    let bob = session("@bob:example.org");
    let alice_room = Arc::new(FakeRoom::new(alice.clone(), room("!r1:example.org")));
    let bob_room = Arc::new(FakeRoom::new(bob.clone(), room("!r1:example.org")));
    cache.add_room(alice_room.clone());
    cache.add_room(bob_room.clone());

    cache.clear(&alice);
    cache.clear(&alice);

    assert_eq!(alice_room.destroy_count(), 1);
    assert_eq!(bob_room.destroy_count(), 0);
    assert!(cache.get_active_room(&alice).is_none());
    assert!(cache.get_active_room(&bob).is_some());
}

#[tokio::test(start_paused = true)]
async fn sign_out_tears_down_session_state() {
    let alice = session("@alice:example.org");
    let r1 = room("!r1:example.org");

    let service = Arc::new(FakeSyncService::new(SyncState::Idle));
    let source = FakeSyncServiceSource::default();
    source.insert(alice.clone(), service.clone());
    let foreground = Arc::new(ForegroundStateTracker::default());
    let provider = SyncOrchestratorProvider::new(
        Arc::new(source),
        foreground.clone(),
        Arc::new(FakeNetworkMonitor::new(NetworkStatus::Connected)),
        SyncConfig::default(),
    );
    let navigation = NavigationStateStore::new();
    let cache = ActiveRoomCache::new();

    let session_owner = Owner::generate();
    navigation.enter_session(&session_owner, alice.clone()).unwrap();
    navigation.enter_space(&Owner::generate(), None).unwrap();
    let room_owner = Owner::generate();
    navigation.enter_room(&room_owner, r1.clone()).unwrap();
    let handle = cache.add_room(Arc::new(FakeRoom::new(alice.clone(), r1.clone())));

    foreground.set_in_foreground(true);
    provider.get_sync_orchestrator(&alice).unwrap().start().await;
    tokio::time::sleep(std::time::Duration::from_millis(1)).await;
    assert_eq!(service.live_loops(), 1);

    assert!(navigation.leave_room(&room_owner));
    cache.clear(&alice);
    assert!(provider.remove_session(&alice).await);

    assert_eq!(handle.destroy_count(), 1);
    assert_eq!(service.live_loops(), 0);
    assert!(provider.existing(&alice).is_none());
    assert_eq!(navigation.current_session_id(), Some(alice));
}
