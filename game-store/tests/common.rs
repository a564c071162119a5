#![allow(dead_code)]

use std::sync::Arc;

use game_store::{MemoryStore, RoomRepository};
use game_types::{PlayerState, Room};

pub fn create_test_repository() -> (Arc<MemoryStore>, RoomRepository) {
    let store = Arc::new(MemoryStore::new());
    let repository = RoomRepository::new(store.clone());
    (store, repository)
}

pub fn create_test_room(room_id: &str) -> Room {
    let host = PlayerState::new("host".to_string(), "Alice".to_string(), 0);
    Room::new(room_id.to_string(), host, "CRANE".to_string(), 0)
}
