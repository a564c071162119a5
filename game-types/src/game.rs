use crate::{PlayerId, RoomId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

pub const WORD_LENGTH: usize = 5;
pub const MAX_GUESSES: usize = 6;
pub const MAX_PLAYERS: usize = 2;
pub const ROOM_CODE_LENGTH: usize = 6;
pub const MAX_NAME_LENGTH: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum RoomStatus {
    Waiting,  // Host waiting for an opponent / for start
    Playing,  // Both players guessing
    Finished, // Someone won, or everyone ran out of guesses
}

impl std::fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RoomStatus::Waiting => "waiting",
            RoomStatus::Playing => "playing",
            RoomStatus::Finished => "finished",
        };
        f.write_str(label)
    }
}

/// One player's board inside a room. Written only by its owner, except on
/// leave and reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PlayerState {
    #[serde(default)]
    pub id: PlayerId,
    #[serde(default)]
    pub name: String, // Empty only for a stray entry left by a late write
    #[serde(default)]
    pub guesses: Vec<String>,
    #[serde(default)]
    pub current_guess: String, // Live preview, 0-5 letters
    #[serde(default)]
    pub game_over: bool,
    #[serde(default)]
    pub won: bool,
    #[serde(default)]
    #[ts(type = "number")]
    pub last_updated: i64, // Epoch millis
}

impl PlayerState {
    pub fn new(id: PlayerId, name: String, now: i64) -> Self {
        Self {
            id,
            name,
            guesses: Vec::new(),
            current_guess: String::new(),
            game_over: false,
            won: false,
            last_updated: now,
        }
    }

    /// Same identity, fresh board.
    pub fn cleared(&self, now: i64) -> Self {
        Self::new(self.id.clone(), self.name.clone(), now)
    }

    pub fn guesses_remaining(&self) -> usize {
        MAX_GUESSES.saturating_sub(self.guesses.len())
    }
}

/// The shared room document. Single root; players are indexed sub-entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Room {
    pub id: RoomId,
    pub host: PlayerId,
    pub target_word: String,
    #[serde(default)]
    pub players: BTreeMap<PlayerId, PlayerState>,
    pub status: RoomStatus,
    #[ts(type = "number")]
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<PlayerId>,
}

impl Room {
    pub fn new(id: RoomId, host: PlayerState, target_word: String, now: i64) -> Self {
        let host_id = host.id.clone();
        let mut players = BTreeMap::new();
        players.insert(host_id.clone(), host);

        Self {
            id,
            host: host_id,
            target_word,
            players,
            status: RoomStatus::Waiting,
            created_at: now,
            winner: None,
        }
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= MAX_PLAYERS
    }

    pub fn player(&self, player_id: &str) -> Option<&PlayerState> {
        self.players.get(player_id)
    }

    pub fn is_host(&self, player_id: &str) -> bool {
        self.host == player_id
    }

    /// The other player in the room, if one has joined.
    pub fn opponent_of(&self, player_id: &str) -> Option<&PlayerState> {
        self.players.values().find(|p| p.id != player_id)
    }

    pub fn all_players_done(&self) -> bool {
        !self.players.is_empty() && self.players.values().all(|p| p.game_over)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum LetterStatus {
    Absent,  // Gray - letter not in word
    Present, // Yellow - correct letter in wrong position
    Correct, // Green - correct letter in correct position
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LetterResult {
    pub letter: String, // Empty when hidden from the opponent
    pub status: LetterStatus,
    pub position: i32,
}

/// A scored row of a board, as rendered for either player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GuessRow {
    pub letters: Vec<LetterResult>,
}
