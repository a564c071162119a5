use game_types::{
    GameError, MAX_GUESSES, MAX_NAME_LENGTH, PlayerId, PlayerState, Room, RoomStatus,
};
use std::collections::BTreeMap;

use crate::{ScoringEngine, Verdicts};

/// Things that move a room between lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomAction {
    Start,
    WinningGuess,
    AllPlayersDone,
    Reset,
}

/// What leaving a room does to the shared record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeavePlan {
    /// The leaver was the last player; the room goes away.
    DeleteRoom,
    /// Drop the leaver's entry, handing the host role over if needed.
    RemovePlayer { new_host: Option<PlayerId> },
    /// The leaver is not in the room; nothing to do.
    NotMember,
}

/// Fix-up for a room whose membership was broken by racing leaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipRepair {
    /// Nobody is left; the room should not exist.
    DeleteRoom,
    /// The host is gone but someone remains.
    ReassignHost(PlayerId),
}

/// Result of playing one guess on a player's own board.
#[derive(Debug, Clone, PartialEq)]
pub struct GuessOutcome {
    pub verdicts: Verdicts,
    pub guesses: Vec<String>,
    pub game_over: bool,
    pub won: bool,
}

pub struct RoomStateMachine;

impl RoomStateMachine {
    /// Transition table. `None` means the action is illegal from `current`.
    pub fn next_status(current: RoomStatus, action: RoomAction) -> Option<RoomStatus> {
        match (current, action) {
            (RoomStatus::Waiting, RoomAction::Start) => Some(RoomStatus::Playing),
            (RoomStatus::Playing, RoomAction::WinningGuess)
            | (RoomStatus::Playing, RoomAction::AllPlayersDone) => Some(RoomStatus::Finished),
            (RoomStatus::Playing, RoomAction::Reset) | (RoomStatus::Finished, RoomAction::Reset) => {
                Some(RoomStatus::Playing)
            }
            _ => None,
        }
    }

    /// Join guard. A full room reports `Full` even when it has also started.
    pub fn check_join(room: &Room) -> Result<(), GameError> {
        if room.is_full() {
            return Err(GameError::Full {
                room_id: room.id.clone(),
            });
        }

        if room.status != RoomStatus::Waiting {
            return Err(GameError::AlreadyStarted {
                room_id: room.id.clone(),
            });
        }

        Ok(())
    }

    /// Start needs exactly two players in a waiting room. The host check is
    /// the caller's.
    pub fn can_start(room: &Room) -> bool {
        room.status == RoomStatus::Waiting && room.player_count() == game_types::MAX_PLAYERS
    }

    /// True when every player ran out of guesses but nobody recorded the
    /// finish, which happens when two `gameOver` writes race.
    pub fn needs_finish(room: &Room) -> bool {
        room.status == RoomStatus::Playing && room.all_players_done()
    }

    pub fn leave_plan(room: &Room, leaver: &str) -> LeavePlan {
        if !room.players.contains_key(leaver) {
            return LeavePlan::NotMember;
        }

        if room.player_count() <= 1 {
            return LeavePlan::DeleteRoom;
        }

        // Pick from the post-removal set only
        let new_host = if room.is_host(leaver) {
            room.players.keys().find(|id| id.as_str() != leaver).cloned()
        } else {
            None
        };

        LeavePlan::RemovePlayer { new_host }
    }

    /// Two leaves that read the same two-player room each remove only
    /// themselves, which can leave an empty room or a departed host.
    pub fn membership_repair(room: &Room) -> Option<MembershipRepair> {
        if room.players.is_empty() {
            return Some(MembershipRepair::DeleteRoom);
        }
        if !room.players.contains_key(&room.host) {
            return room
                .players
                .keys()
                .next()
                .cloned()
                .map(MembershipRepair::ReassignHost);
        }
        None
    }

    /// Every board cleared, every identity kept.
    pub fn reset_players(room: &Room, now: i64) -> BTreeMap<PlayerId, PlayerState> {
        room.players
            .iter()
            .map(|(id, player)| (id.clone(), player.cleared(now)))
            .collect()
    }

    /// Play `guess` on `player`'s board locally. Validity against the
    /// dictionary is checked before this.
    pub fn play_guess(
        player: &PlayerState,
        guess: &str,
        target: &str,
    ) -> Result<GuessOutcome, GameError> {
        if player.game_over {
            return Err(GameError::GameOver);
        }

        let verdicts = ScoringEngine::evaluate_guess(guess, target)?;
        let won = ScoringEngine::is_winning_guess(guess, target);

        let mut guesses = player.guesses.clone();
        guesses.push(guess.trim().to_ascii_uppercase());
        let game_over = won || guesses.len() >= MAX_GUESSES;

        Ok(GuessOutcome {
            verdicts,
            guesses,
            game_over,
            won,
        })
    }

    pub fn validate_name(name: &str) -> Result<String, GameError> {
        let name = name.trim();
        let length = name.chars().count();
        if length == 0 || length > MAX_NAME_LENGTH {
            return Err(GameError::InvalidName);
        }
        Ok(name.to_string())
    }

    /// Data-model invariants a settled room must satisfy. Returns a
    /// description of each one that is broken.
    pub fn invariant_violations(room: &Room) -> Vec<String> {
        let mut violations = Vec::new();

        if room.players.is_empty() || room.player_count() > game_types::MAX_PLAYERS {
            violations.push(format!("room has {} players", room.player_count()));
        }
        if !room.players.contains_key(&room.host) {
            violations.push(format!("host {} is not a player", room.host));
        }
        if let Some(winner) = &room.winner {
            if !room.players.contains_key(winner) {
                violations.push(format!("winner {} is not a player", winner));
            }
        }
        if room.status == RoomStatus::Finished && room.winner.is_none() && !room.all_players_done()
        {
            violations.push("finished without winner or all players done".to_string());
        }
        for player in room.players.values() {
            if player.won && !player.game_over {
                violations.push(format!("{} won but is not game over", player.id));
            }
            if player.guesses.len() >= MAX_GUESSES && !player.game_over {
                violations.push(format!("{} used every guess but is not game over", player.id));
            }
        }

        violations
    }
}
