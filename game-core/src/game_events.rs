use game_types::{PlayerId, Room, RoomId, RoomStatus};

/// Notable changes between two consecutive room snapshots.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    PlayerJoined {
        room_id: RoomId,
        player_id: PlayerId,
        name: String,
    },
    PlayerLeft {
        room_id: RoomId,
        player_id: PlayerId,
    },
    HostChanged {
        room_id: RoomId,
        host: PlayerId,
    },
    GameStarted {
        room_id: RoomId,
    },
    GuessSubmitted {
        room_id: RoomId,
        player_id: PlayerId,
        guess_count: usize,
    },
    PlayerFinished {
        room_id: RoomId,
        player_id: PlayerId,
        won: bool,
    },
    GameFinished {
        room_id: RoomId,
        winner: Option<PlayerId>,
    },
    GameReset {
        room_id: RoomId,
    },
    RoomClosed {
        room_id: RoomId,
    },
}

impl RoomEvent {
    pub fn room_id(&self) -> &str {
        match self {
            RoomEvent::PlayerJoined { room_id, .. } => room_id,
            RoomEvent::PlayerLeft { room_id, .. } => room_id,
            RoomEvent::HostChanged { room_id, .. } => room_id,
            RoomEvent::GameStarted { room_id } => room_id,
            RoomEvent::GuessSubmitted { room_id, .. } => room_id,
            RoomEvent::PlayerFinished { room_id, .. } => room_id,
            RoomEvent::GameFinished { room_id, .. } => room_id,
            RoomEvent::GameReset { room_id } => room_id,
            RoomEvent::RoomClosed { room_id } => room_id,
        }
    }
}

/// Derive events from a pair of snapshots. Snapshots are last-value-wins, so
/// intermediate states may have been skipped; events describe the net change.
/// The first snapshot of a subscription is a baseline and yields nothing.
pub fn diff_rooms(previous: Option<&Room>, next: Option<&Room>) -> Vec<RoomEvent> {
    let (previous, next) = match (previous, next) {
        (Some(previous), Some(next)) => (previous, next),
        (Some(previous), None) => {
            return vec![RoomEvent::RoomClosed {
                room_id: previous.id.clone(),
            }];
        }
        _ => return Vec::new(),
    };

    let room_id = next.id.clone();
    let mut events = Vec::new();

    for (id, player) in &next.players {
        if !previous.players.contains_key(id) {
            events.push(RoomEvent::PlayerJoined {
                room_id: room_id.clone(),
                player_id: id.clone(),
                name: player.name.clone(),
            });
        }
    }
    for id in previous.players.keys() {
        if !next.players.contains_key(id) {
            events.push(RoomEvent::PlayerLeft {
                room_id: room_id.clone(),
                player_id: id.clone(),
            });
        }
    }
    if previous.host != next.host {
        events.push(RoomEvent::HostChanged {
            room_id: room_id.clone(),
            host: next.host.clone(),
        });
    }

    let was_reset = previous.status != RoomStatus::Waiting
        && next.status == RoomStatus::Playing
        && (previous.status == RoomStatus::Finished || previous.target_word != next.target_word);

    if was_reset {
        events.push(RoomEvent::GameReset {
            room_id: room_id.clone(),
        });
        return events;
    }

    if previous.status == RoomStatus::Waiting && next.status != RoomStatus::Waiting {
        events.push(RoomEvent::GameStarted {
            room_id: room_id.clone(),
        });
    }

    for (id, player) in &next.players {
        let Some(before) = previous.players.get(id) else {
            continue;
        };

        if player.guesses.len() > before.guesses.len() {
            events.push(RoomEvent::GuessSubmitted {
                room_id: room_id.clone(),
                player_id: id.clone(),
                guess_count: player.guesses.len(),
            });
        }
        if player.game_over && !before.game_over {
            events.push(RoomEvent::PlayerFinished {
                room_id: room_id.clone(),
                player_id: id.clone(),
                won: player.won,
            });
        }
    }

    if previous.status != RoomStatus::Finished && next.status == RoomStatus::Finished {
        events.push(RoomEvent::GameFinished {
            room_id,
            winner: next.winner.clone(),
        });
    }

    events
}
