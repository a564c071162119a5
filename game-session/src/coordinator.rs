use std::sync::Arc;

use game_core::{
    LeavePlan, MembershipRepair, RoomAction, RoomStateMachine, ScoringEngine, WordSource,
    fallback_target_word, is_playable_word,
};
use game_store::{DocumentStore, RoomRepository, RoomUpdate};
use game_types::{
    GameError, MAX_GUESSES, PlayerId, PlayerState, Room, RoomId, RoomStatus, WORD_LENGTH,
};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::ids::{generate_player_id, generate_room_code, normalize_room_code, now_millis};

/// Room operations against the shared store.
///
/// Every operation is a read-then-write sequence with no lock held across
/// the awaits in between, so two clients really do interleave. Writes touch
/// only the fields an operation owns and each one is a single atomic update.
/// Known races:
///
/// - Two joins can both pass the capacity check; at most one extra player
///   gets in.
/// - Both players finishing at once can each miss the other's `gameOver`.
///   `fetch_room`, `reconcile` and the reconciler task close that gap.
/// - A reset racing a guess submission can lose the guess.
/// - Both players leaving at once can each remove only themselves, leaving
///   an empty room or a host who is gone. Each leaver re-reads after its
///   write, and every read through the coordinator repairs membership.
pub struct SessionCoordinator {
    rooms: RoomRepository,
    words: Arc<dyn WordSource>,
    config: SessionConfig,
}

impl SessionCoordinator {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        words: Arc<dyn WordSource>,
        config: SessionConfig,
    ) -> Self {
        Self {
            rooms: RoomRepository::new(store),
            words,
            config,
        }
    }

    pub fn rooms(&self) -> &RoomRepository {
        &self.rooms
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn parse_room_id(room_id: &str) -> Result<RoomId, GameError> {
        normalize_room_code(room_id).ok_or_else(|| GameError::NotFound {
            room_id: room_id.to_string(),
        })
    }

    async fn load(&self, room_id: &str) -> Result<Room, GameError> {
        self.rooms
            .find(room_id)
            .await?
            .ok_or_else(|| GameError::NotFound {
                room_id: room_id.to_string(),
            })
    }

    /// A valid target word. Falls back to the curated list if the word
    /// source fails or hands back something unplayable.
    async fn pick_target_word(&self) -> String {
        match self.words.pick_target_word().await {
            Ok(word) if is_playable_word(&word) => word.trim().to_ascii_uppercase(),
            Ok(word) => {
                warn!("Word source returned unplayable word {:?}, using fallback", word);
                fallback_target_word()
            }
            Err(e) => {
                warn!("Word source failed, using fallback: {:?}", e);
                fallback_target_word()
            }
        }
    }

    /// A room code nobody is using, checked against the store a bounded
    /// number of times.
    async fn allocate_room_code(&self) -> Result<RoomId, GameError> {
        for _ in 0..self.config.room_code_attempts {
            let code = generate_room_code();
            if !self.rooms.exists(&code).await? {
                return Ok(code);
            }
            debug!("Room code {} already taken, regenerating", code);
        }

        Err(GameError::StoreUnavailable {
            message: "could not allocate a free room code".to_string(),
        })
    }

    pub async fn create_room(&self, name: &str) -> Result<(RoomId, PlayerId), GameError> {
        let name = RoomStateMachine::validate_name(name)?;
        let room_id = self.allocate_room_code().await?;
        let player_id = generate_player_id();
        let target_word = self.pick_target_word().await;
        let now = now_millis();

        let host = PlayerState::new(player_id.clone(), name, now);
        let room = Room::new(room_id.clone(), host, target_word, now);
        self.rooms.save(&room).await?;

        info!("Room {} created by {}", room_id, player_id);
        Ok((room_id, player_id))
    }

    /// A full room reports `Full` even if it has also started.
    pub async fn join_room(&self, room_id: &str, name: &str) -> Result<PlayerId, GameError> {
        let name = RoomStateMachine::validate_name(name)?;
        let room_id = Self::parse_room_id(room_id)?;
        let room = self
            .read_repaired(&room_id)
            .await?
            .ok_or_else(|| GameError::NotFound {
                room_id: room_id.clone(),
            })?;

        if let Err(e) = RoomStateMachine::check_join(&room) {
            info!("Join refused for room {}: {}", room_id, e);
            return Err(e);
        }

        // The whole entry in one write, so an abandoned join never leaves a
        // partial player behind
        let player = PlayerState::new(generate_player_id(), name, now_millis());
        let update = RoomUpdate::new().player(&player)?;
        if !self.rooms.update(&room_id, update).await? {
            return Err(GameError::NotFound { room_id });
        }

        info!("Player {} joined room {}", player.id, room_id);
        Ok(player.id)
    }

    /// Move a waiting two-player room to `playing`. Returns `false` when the
    /// room is not startable; host identity is the caller's to check.
    pub async fn start_game(&self, room_id: &str) -> Result<bool, GameError> {
        let room = self.load(room_id).await?;
        if !RoomStateMachine::can_start(&room) {
            warn!(
                "Start refused for room {} ({} players, {})",
                room_id,
                room.player_count(),
                room.status
            );
            return Ok(false);
        }

        let update = RoomUpdate::new().status(RoomStatus::Playing);
        if !self.rooms.update(room_id, update).await? {
            return Err(GameError::NotFound {
                room_id: room_id.to_string(),
            });
        }

        info!("Game started in room {}", room_id);
        Ok(true)
    }

    /// Record a player's board after a guess. `guesses` is the full list
    /// including `guess`; `game_over` and `won` are what the player computed.
    /// A list longer than the guess budget is refused with `GameOver`.
    pub async fn submit_guess(
        &self,
        room_id: &str,
        player_id: &str,
        guess: &str,
        guesses: Vec<String>,
        game_over: bool,
        won: bool,
    ) -> Result<(), GameError> {
        ScoringEngine::normalize(guess)?;
        if guesses.len() > MAX_GUESSES {
            warn!(
                "Player {} sent {} guesses for room {}",
                player_id,
                guesses.len(),
                room_id
            );
            return Err(GameError::GameOver);
        }
        let game_over = game_over || won || guesses.len() >= MAX_GUESSES;

        let mut update = RoomUpdate::new()
            .player_field(player_id, "guesses", json!(guesses))
            .player_field(player_id, "currentGuess", json!(""))
            .player_field(player_id, "gameOver", json!(game_over))
            .player_field(player_id, "won", json!(won))
            .player_field(player_id, "lastUpdated", json!(now_millis()));

        if won {
            update = update.winner(Some(player_id)).status(RoomStatus::Finished);
        }

        if !self.rooms.update(room_id, update).await? {
            return Err(GameError::NotFound {
                room_id: room_id.to_string(),
            });
        }

        debug!("Player {} submitted guess {} in room {}", player_id, guesses.len(), room_id);
        if won {
            info!("Player {} won room {}", player_id, room_id);
        } else if game_over {
            self.reconcile(room_id).await?;
        }

        Ok(())
    }

    /// Live preview of the letters a player has typed so far.
    pub async fn update_current_guess(
        &self,
        room_id: &str,
        player_id: &str,
        partial: &str,
    ) -> Result<(), GameError> {
        let partial = partial.trim().to_ascii_uppercase();
        let length = partial.chars().count();
        if length > WORD_LENGTH {
            return Err(GameError::InvalidGuessLength { length });
        }

        let update = RoomUpdate::new()
            .player_field(player_id, "currentGuess", json!(partial))
            .player_field(player_id, "lastUpdated", json!(now_millis()));

        if !self.rooms.update(room_id, update).await? {
            return Err(GameError::NotFound {
                room_id: room_id.to_string(),
            });
        }
        Ok(())
    }

    /// Record that a player is out of the round, then finish the room if
    /// everyone is.
    pub async fn mark_player_done(
        &self,
        room_id: &str,
        player_id: &str,
        won: bool,
    ) -> Result<(), GameError> {
        let update = RoomUpdate::new()
            .player_field(player_id, "gameOver", json!(true))
            .player_field(player_id, "won", json!(won))
            .player_field(player_id, "lastUpdated", json!(now_millis()));

        if !self.rooms.update(room_id, update).await? {
            return Err(GameError::NotFound {
                room_id: room_id.to_string(),
            });
        }

        info!("Player {} done in room {} (won: {})", player_id, room_id, won);
        self.reconcile(room_id).await?;
        Ok(())
    }

    /// Leave a room. Leaving a room that no longer exists, or that the
    /// player is not in, succeeds without writing anything.
    pub async fn leave_room(&self, room_id: &str, player_id: &str) -> Result<(), GameError> {
        let Some(room) = self.rooms.find(room_id).await? else {
            debug!("Leave for missing room {}", room_id);
            return Ok(());
        };

        match RoomStateMachine::leave_plan(&room, player_id) {
            LeavePlan::DeleteRoom => {
                self.rooms.delete(room_id).await?;
                info!("Last player {} left, room {} deleted", player_id, room_id);
            }
            LeavePlan::RemovePlayer { new_host } => {
                let mut update = RoomUpdate::new().remove_player(player_id);
                if let Some(host) = &new_host {
                    update = update.host(host);
                }
                self.rooms.update(room_id, update).await?;

                info!("Player {} left room {}", player_id, room_id);
                if let Some(host) = new_host {
                    info!("Host of room {} handed to {}", room_id, host);
                }

                // The other player may have left off the same read
                self.read_repaired(room_id).await?;
            }
            LeavePlan::NotMember => {
                debug!("Player {} is not in room {}", player_id, room_id);
            }
        }

        Ok(())
    }

    /// Start a new round in the same room: fresh target, every board
    /// cleared. Returns `false` if the room is still waiting.
    pub async fn reset_game(&self, room_id: &str) -> Result<bool, GameError> {
        let room = self.load(room_id).await?;
        let Some(status) = RoomStateMachine::next_status(room.status, RoomAction::Reset) else {
            warn!("Reset refused for room {} in {}", room_id, room.status);
            return Ok(false);
        };

        let target_word = self.pick_target_word().await;
        let mut update = RoomUpdate::new()
            .target_word(&target_word)
            .status(status)
            .winner(None);
        for player in RoomStateMachine::reset_players(&room, now_millis()).values() {
            update = update.player(player)?;
        }

        if !self.rooms.update(room_id, update).await? {
            return Err(GameError::NotFound {
                room_id: room_id.to_string(),
            });
        }

        info!("Room {} reset", room_id);
        Ok(true)
    }

    /// Read a room, repairing its membership and finishing it first if
    /// every player is already done.
    pub async fn fetch_room(&self, room_id: &str) -> Result<Option<Room>, GameError> {
        let Some(mut room) = self.read_repaired(room_id).await? else {
            return Ok(None);
        };

        if RoomStateMachine::needs_finish(&room) && self.finish(&room).await? {
            room.status = RoomStatus::Finished;
        }
        Ok(Some(room))
    }

    /// Re-run the membership and all-done checks. Returns `true` if this
    /// call finished the room. Safe to repeat.
    pub async fn reconcile(&self, room_id: &str) -> Result<bool, GameError> {
        match self.read_repaired(room_id).await? {
            Some(room) if RoomStateMachine::needs_finish(&room) => self.finish(&room).await,
            _ => Ok(false),
        }
    }

    /// Read a room and fix membership left broken by racing leaves.
    /// `None` if the room is gone or was deleted here.
    async fn read_repaired(&self, room_id: &str) -> Result<Option<Room>, GameError> {
        let Some(mut room) = self.rooms.find(room_id).await? else {
            return Ok(None);
        };

        match RoomStateMachine::membership_repair(&room) {
            None => Ok(Some(room)),
            Some(MembershipRepair::DeleteRoom) => {
                warn!("Room {} has no players left, deleting", room_id);
                self.rooms.delete(room_id).await?;
                Ok(None)
            }
            Some(MembershipRepair::ReassignHost(host)) => {
                warn!("Host of room {} is gone, handing to {}", room_id, host);
                if !self.rooms.update(room_id, RoomUpdate::new().host(&host)).await? {
                    return Ok(None);
                }
                room.host = host;
                Ok(Some(room))
            }
        }
    }

    async fn finish(&self, room: &Room) -> Result<bool, GameError> {
        let update = RoomUpdate::new().status(RoomStatus::Finished);
        let applied = self.rooms.update(&room.id, update).await?;
        if applied {
            info!("All players done, room {} finished", room.id);
        }
        Ok(applied)
    }
}
