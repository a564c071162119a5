use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Every failure a session operation can report. None of them is fatal:
/// leaving and re-joining a room always recovers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, thiserror::Error)]
#[ts(export)]
pub enum GameError {
    #[error("Room {room_id} not found")]
    NotFound { room_id: String },
    #[error("Room {room_id} is full")]
    Full { room_id: String },
    #[error("Game already in progress in room {room_id}")]
    AlreadyStarted { room_id: String },
    #[error("Guess must be exactly 5 letters, got {length}")]
    InvalidGuessLength { length: usize },
    #[error("Not in word list: {word}")]
    InvalidGuessWord { word: String },
    #[error("Store unavailable: {message}")]
    StoreUnavailable { message: String },
    #[error("Only the host can do that")]
    NotHost,
    #[error("Player name must be 1-15 characters")]
    InvalidName,
    #[error("Game is already over for this player")]
    GameOver,
    #[error("Stored room {room_id} is corrupt: {message}")]
    Corrupt { room_id: String, message: String },
}

impl GameError {
    /// Errors a caller can fix by retrying the same action unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GameError::StoreUnavailable { .. })
    }
}
