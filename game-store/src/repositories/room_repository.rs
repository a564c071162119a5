use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use game_types::{FieldWrite, GameError, PlayerState, Room, RoomStatus};
use serde_json::{Value, json};
use tracing::warn;

use crate::store::{DocumentStore, StoreError};

/// Typed snapshots of one room. `Ok(None)` means the room is gone.
pub type RoomStream = BoxStream<'static, Result<Option<Room>, GameError>>;

pub fn room_key(room_id: &str) -> String {
    format!("rooms/{}", room_id)
}

/// Field writes against a room document, applied as one atomic update.
#[derive(Debug, Clone, Default)]
pub struct RoomUpdate {
    fields: Vec<FieldWrite>,
}

impl RoomUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, write: FieldWrite) -> Self {
        self.fields.push(write);
        self
    }

    fn set(self, path: String, value: Value) -> Self {
        self.push(FieldWrite::new(path, value))
    }

    pub fn status(self, status: RoomStatus) -> Self {
        self.set("status".to_string(), json!(status))
    }

    /// `None` clears the winner.
    pub fn winner(self, winner: Option<&str>) -> Self {
        match winner {
            Some(id) => self.set("winner".to_string(), json!(id)),
            None => self.push(FieldWrite::delete("winner")),
        }
    }

    pub fn host(self, host: &str) -> Self {
        self.set("host".to_string(), json!(host))
    }

    pub fn target_word(self, word: &str) -> Self {
        self.set("targetWord".to_string(), json!(word))
    }

    /// Write a whole player entry.
    pub fn player(self, player: &PlayerState) -> Result<Self, GameError> {
        let value = serde_json::to_value(player).map_err(|e| StoreError::Serialization {
            key: format!("players/{}", player.id),
            message: e.to_string(),
        })?;
        Ok(self.set(format!("players/{}", player.id), value))
    }

    pub fn remove_player(self, player_id: &str) -> Self {
        self.push(FieldWrite::delete(format!("players/{}", player_id)))
    }

    /// Write one field of a player entry, using its wire name.
    pub fn player_field(self, player_id: &str, field: &str, value: Value) -> Self {
        self.set(format!("players/{}/{}", player_id, field), value)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_fields(self) -> Vec<FieldWrite> {
        self.fields
    }
}

#[derive(Clone)]
pub struct RoomRepository {
    store: Arc<dyn DocumentStore>,
}

impl RoomRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Decode a stored room. Player entries without a name can only come
    /// from a field write that landed after its owner left; they are dropped.
    fn decode(room_id: &str, value: Value) -> Result<Room, GameError> {
        let mut room: Room = serde_json::from_value(value).map_err(|e| GameError::Corrupt {
            room_id: room_id.to_string(),
            message: e.to_string(),
        })?;

        room.players.retain(|key, player| {
            if player.name.is_empty() {
                warn!("Dropping stray player entry {} in room {}", key, room_id);
                return false;
            }
            if player.id.is_empty() {
                player.id = key.clone();
            }
            true
        });

        Ok(room)
    }

    pub async fn find(&self, room_id: &str) -> Result<Option<Room>, GameError> {
        match self.store.get(&room_key(room_id)).await? {
            Some(value) => Ok(Some(Self::decode(room_id, value)?)),
            None => Ok(None),
        }
    }

    pub async fn exists(&self, room_id: &str) -> Result<bool, GameError> {
        Ok(self.store.get(&room_key(room_id)).await?.is_some())
    }

    /// Write the full room document, replacing anything under the same id.
    pub async fn save(&self, room: &Room) -> Result<(), GameError> {
        let value = serde_json::to_value(room).map_err(|e| GameError::Corrupt {
            room_id: room.id.clone(),
            message: e.to_string(),
        })?;
        self.store.set(&room_key(&room.id), value).await?;
        Ok(())
    }

    /// Returns `false` when the room no longer exists.
    pub async fn update(&self, room_id: &str, update: RoomUpdate) -> Result<bool, GameError> {
        if update.is_empty() {
            return self.exists(room_id).await;
        }
        Ok(self
            .store
            .update(&room_key(room_id), update.into_fields())
            .await?)
    }

    pub async fn delete(&self, room_id: &str) -> Result<(), GameError> {
        self.store.remove(&room_key(room_id)).await?;
        Ok(())
    }

    pub async fn watch(&self, room_id: &str) -> Result<RoomStream, GameError> {
        let room_id = room_id.to_string();
        let snapshots = self.store.subscribe(&room_key(&room_id)).await?;

        let rooms = snapshots.map(move |snapshot| -> Result<Option<Room>, GameError> {
            match snapshot? {
                Some(value) => Ok(Some(Self::decode(&room_id, value)?)),
                None => Ok(None),
            }
        });
        Ok(rooms.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    fn repository() -> (Arc<MemoryStore>, RoomRepository) {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), RoomRepository::new(store))
    }

    fn sample_room() -> Room {
        let host = PlayerState::new("p1".to_string(), "Alice".to_string(), 1);
        Room::new("AB12C9".to_string(), host, "CRANE".to_string(), 1)
    }

    #[tokio::test]
    async fn test_save_and_find() {
        let (_, repo) = repository();
        assert_eq!(repo.find("AB12C9").await.unwrap(), None);

        let room = sample_room();
        repo.save(&room).await.unwrap();
        assert_eq!(repo.find("AB12C9").await.unwrap(), Some(room));
        assert!(repo.exists("AB12C9").await.unwrap());
    }

    #[tokio::test]
    async fn test_update_builder() {
        let (_, repo) = repository();
        repo.save(&sample_room()).await.unwrap();

        let guest = PlayerState::new("p2".to_string(), "Bob".to_string(), 2);
        let update = RoomUpdate::new()
            .player(&guest)
            .unwrap()
            .status(RoomStatus::Playing)
            .winner(Some("p1"))
            .player_field("p1", "currentGuess", json!("CR"));
        assert!(repo.update("AB12C9", update).await.unwrap());

        let room = repo.find("AB12C9").await.unwrap().unwrap();
        assert_eq!(room.player_count(), 2);
        assert_eq!(room.status, RoomStatus::Playing);
        assert_eq!(room.winner.as_deref(), Some("p1"));
        assert_eq!(room.players["p1"].current_guess, "CR");

        let update = RoomUpdate::new().winner(None).remove_player("p2").host("p1");
        assert!(update.fields.contains(&FieldWrite::delete("winner")));
        assert!(update.fields.contains(&FieldWrite::delete("players/p2")));
        assert!(repo.update("AB12C9", update).await.unwrap());
        let room = repo.find("AB12C9").await.unwrap().unwrap();
        assert_eq!(room.winner, None);
        assert_eq!(room.player_count(), 1);
    }

    #[tokio::test]
    async fn test_update_missing_room() {
        let (_, repo) = repository();
        let applied = repo
            .update("NOPE00", RoomUpdate::new().status(RoomStatus::Playing))
            .await
            .unwrap();
        assert!(!applied);
        assert!(!repo.update("NOPE00", RoomUpdate::new()).await.unwrap());
    }

    #[tokio::test]
    async fn test_corrupt_document() {
        let (store, repo) = repository();
        store
            .set(&room_key("BAD000"), json!({ "status": "sideways" }))
            .await
            .unwrap();

        let result = repo.find("BAD000").await;
        assert!(matches!(result, Err(GameError::Corrupt { ref room_id, .. }) if room_id == "BAD000"));
    }

    #[tokio::test]
    async fn test_stray_player_entry_is_dropped() {
        let (_, repo) = repository();
        repo.save(&sample_room()).await.unwrap();

        // A late write for a player who already left
        let update = RoomUpdate::new().player_field("gone", "gameOver", json!(true));
        assert!(repo.update("AB12C9", update).await.unwrap());

        let room = repo.find("AB12C9").await.unwrap().unwrap();
        assert_eq!(room.player_count(), 1);
        assert!(room.player("gone").is_none());
    }

    #[tokio::test]
    async fn test_store_outage_maps_to_retryable_error() {
        let (store, repo) = repository();
        store.set_available(false);

        let err = repo.find("AB12C9").await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_watch_decodes_snapshots() {
        let (_, repo) = repository();
        let room = sample_room();
        repo.save(&room).await.unwrap();

        let mut rooms = repo.watch("AB12C9").await.unwrap();
        assert_eq!(rooms.next().await, Some(Ok(Some(room))));

        repo.delete("AB12C9").await.unwrap();
        assert_eq!(rooms.next().await, Some(Ok(None)));
    }
}
