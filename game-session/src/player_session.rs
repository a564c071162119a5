use std::sync::Arc;

use game_core::{
    GuessOutcome, GuessValidator, KeyboardHints, RoomEvent, RoomStateMachine, ScoringEngine,
    diff_rooms,
};
use game_types::{GameError, GuessRow, PlayerId, PlayerState, Room, RoomId, RoomStatus, WORD_LENGTH};
use tracing::{debug, info};

use crate::coordinator::SessionCoordinator;
use crate::ids::normalize_room_code;
use crate::sync::RoomView;

/// One player's side of a room: the letters being typed, the keyboard
/// hints, and the last room snapshot seen.
///
/// Store writes go through the coordinator. The local copy of the room is
/// refreshed by `apply_snapshot` and optimistically after a submit.
pub struct PlayerSession {
    coordinator: Arc<SessionCoordinator>,
    validator: Arc<dyn GuessValidator>,
    room_id: RoomId,
    player_id: PlayerId,
    room: Option<Room>,
    input: String,
    hints: KeyboardHints,
}

impl PlayerSession {
    async fn attach(
        coordinator: Arc<SessionCoordinator>,
        validator: Arc<dyn GuessValidator>,
        room_id: RoomId,
        player_id: PlayerId,
    ) -> Result<Self, GameError> {
        let room = coordinator.fetch_room(&room_id).await?;
        let mut session = Self {
            coordinator,
            validator,
            room_id,
            player_id,
            room: None,
            input: String::new(),
            hints: KeyboardHints::new(),
        };
        if let Some(room) = room {
            session.apply_snapshot(&RoomView::Present(room));
        }
        Ok(session)
    }

    pub async fn create(
        coordinator: Arc<SessionCoordinator>,
        validator: Arc<dyn GuessValidator>,
        name: &str,
    ) -> Result<Self, GameError> {
        let (room_id, player_id) = coordinator.create_room(name).await?;
        Self::attach(coordinator, validator, room_id, player_id).await
    }

    pub async fn join(
        coordinator: Arc<SessionCoordinator>,
        validator: Arc<dyn GuessValidator>,
        room_code: &str,
        name: &str,
    ) -> Result<Self, GameError> {
        let room_id = normalize_room_code(room_code).ok_or_else(|| GameError::NotFound {
            room_id: room_code.to_string(),
        })?;
        let player_id = coordinator.join_room(&room_id, name).await?;
        Self::attach(coordinator, validator, room_id, player_id).await
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    pub fn room(&self) -> Option<&Room> {
        self.room.as_ref()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn hints(&self) -> &KeyboardHints {
        &self.hints
    }

    pub fn me(&self) -> Option<&PlayerState> {
        self.room.as_ref()?.player(&self.player_id)
    }

    pub fn opponent(&self) -> Option<&PlayerState> {
        self.room.as_ref()?.opponent_of(&self.player_id)
    }

    pub fn is_host(&self) -> bool {
        self.room
            .as_ref()
            .is_some_and(|room| room.is_host(&self.player_id))
    }

    fn can_type(&self) -> bool {
        let playing = self
            .room
            .as_ref()
            .is_some_and(|room| room.status == RoomStatus::Playing);
        playing && self.me().is_some_and(|me| !me.game_over)
    }

    /// My board, fully visible.
    pub fn my_rows(&self) -> Vec<GuessRow> {
        match (self.room.as_ref(), self.me()) {
            (Some(room), Some(me)) => ScoringEngine::score_board(&me.guesses, &room.target_word, false),
            _ => Vec::new(),
        }
    }

    /// The opponent's board as colors only.
    pub fn opponent_rows(&self) -> Vec<GuessRow> {
        match (self.room.as_ref(), self.opponent()) {
            (Some(room), Some(opponent)) => {
                ScoringEngine::score_board(&opponent.guesses, &room.target_word, true)
            }
            _ => Vec::new(),
        }
    }

    /// Append a letter. Only ASCII letters are taken, up to five, while the
    /// player still has a game to play.
    pub fn type_letter(&mut self, letter: char) -> bool {
        if !self.can_type() || !letter.is_ascii_alphabetic() || self.input.len() >= WORD_LENGTH {
            return false;
        }
        self.input.push(letter.to_ascii_uppercase());
        true
    }

    pub fn backspace(&mut self) -> bool {
        if !self.can_type() {
            return false;
        }
        self.input.pop().is_some()
    }

    /// Share the typed letters with the opponent.
    pub async fn publish_input(&self) -> Result<(), GameError> {
        self.coordinator
            .update_current_guess(&self.room_id, &self.player_id, &self.input)
            .await
    }

    /// Submit the typed word. On any error the typed letters are kept so the
    /// player can retry.
    pub async fn submit(&mut self) -> Result<GuessOutcome, GameError> {
        let (room, me) = match (self.room.as_ref(), self.me()) {
            (Some(room), Some(me)) => (room, me),
            _ => {
                return Err(GameError::NotFound {
                    room_id: self.room_id.clone(),
                });
            }
        };
        if room.status != RoomStatus::Playing || me.game_over {
            return Err(GameError::GameOver);
        }

        let length = self.input.chars().count();
        if length != WORD_LENGTH {
            return Err(GameError::InvalidGuessLength { length });
        }

        if !self.validator.is_valid_guess(&self.input).await {
            return Err(GameError::InvalidGuessWord {
                word: self.input.clone(),
            });
        }

        let outcome = RoomStateMachine::play_guess(me, &self.input, &room.target_word)?;
        self.coordinator
            .submit_guess(
                &self.room_id,
                &self.player_id,
                &self.input,
                outcome.guesses.clone(),
                outcome.game_over,
                outcome.won,
            )
            .await?;

        self.hints.record(&self.input, &outcome.verdicts);
        self.input.clear();

        if let Some(room) = self.room.as_mut() {
            if let Some(me) = room.players.get_mut(&self.player_id) {
                me.guesses = outcome.guesses.clone();
                me.current_guess.clear();
                me.game_over = outcome.game_over;
                me.won = outcome.won;
            }
            if outcome.won {
                room.winner = Some(self.player_id.clone());
                room.status = RoomStatus::Finished;
            }
        }

        if outcome.won {
            info!("Player {} solved room {}", self.player_id, self.room_id);
        }
        Ok(outcome)
    }

    pub async fn start(&self) -> Result<bool, GameError> {
        if !self.is_host() {
            return Err(GameError::NotHost);
        }
        self.coordinator.start_game(&self.room_id).await
    }

    pub async fn reset(&mut self) -> Result<bool, GameError> {
        if !self.is_host() {
            return Err(GameError::NotHost);
        }
        let reset = self.coordinator.reset_game(&self.room_id).await?;
        if reset {
            self.input.clear();
            self.hints.clear();
        }
        Ok(reset)
    }

    pub async fn leave(self) -> Result<(), GameError> {
        self.coordinator
            .leave_room(&self.room_id, &self.player_id)
            .await
    }

    /// Take in a view from `ChangeSync` and report what changed. Hints are
    /// rebuilt from the stored board, so they follow resets and reconnects.
    pub fn apply_snapshot(&mut self, view: &RoomView) -> Vec<RoomEvent> {
        match view {
            RoomView::Present(room) => {
                let events = diff_rooms(self.room.as_ref(), Some(room));
                let was_reset = events
                    .iter()
                    .any(|event| matches!(event, RoomEvent::GameReset { .. }));

                let guesses = room
                    .player(&self.player_id)
                    .map(|me| me.guesses.as_slice())
                    .unwrap_or_default();
                self.hints = KeyboardHints::from_guesses(guesses, &room.target_word);
                if was_reset {
                    debug!("Room {} was reset, clearing typed letters", self.room_id);
                    self.input.clear();
                }

                self.room = Some(room.clone());
                events
            }
            RoomView::Gone => {
                let events = diff_rooms(self.room.as_ref(), None);
                self.room = None;
                self.input.clear();
                events
            }
            RoomView::Pending | RoomView::ConnectionLost(_) => Vec::new(),
        }
    }
}
