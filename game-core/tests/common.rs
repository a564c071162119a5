#![allow(dead_code)]

use game_core::{RoomStateMachine, WordValidator};
use game_types::{PlayerState, Room, RoomStatus};

/// Creates a test WordValidator with a known set of words
pub fn create_test_validator() -> WordValidator {
    let word_list = "crane\nslate\ntrace\nhello\nworld\nhouse\nmouse\ntrain\nplane\nwater\nstone\nbread\ncream";
    WordValidator::from_word_list(word_list)
}

/// Creates a test player with a predictable id
pub fn create_test_player(name: &str) -> PlayerState {
    PlayerState::new(format!("test-player-{}", name.to_lowercase()), name.to_string(), 0)
}

/// Creates a waiting room hosted by Alice with the given target
pub fn create_room_with_word(word: &str) -> Room {
    Room::new("AB12C9".to_string(), create_test_player("Alice"), word.to_string(), 0)
}

/// Creates a started two-player room (Alice hosting, Bob joined)
pub fn create_started_room(word: &str) -> Room {
    let mut room = create_room_with_word(word);
    let bob = create_test_player("Bob");
    room.players.insert(bob.id.clone(), bob);
    assert!(RoomStateMachine::can_start(&room));
    room.status = RoomStatus::Playing;
    room
}

/// Plays guesses for one player the way the coordinator would, applying
/// the finish rules after each one
pub fn play(room: &mut Room, name: &str, guesses: &[&str]) {
    let id = format!("test-player-{}", name.to_lowercase());
    for guess in guesses {
        let player = room.players.get(&id).expect("player in room").clone();
        let outcome = RoomStateMachine::play_guess(&player, guess, &room.target_word)
            .expect("guess accepted");

        let player = room.players.get_mut(&id).expect("player in room");
        player.guesses = outcome.guesses;
        player.game_over = outcome.game_over;
        player.won = outcome.won;

        if outcome.won {
            room.winner = Some(id.clone());
            room.status = RoomStatus::Finished;
        } else if RoomStateMachine::needs_finish(room) {
            room.status = RoomStatus::Finished;
        }
    }
}

/// Asserts the room satisfies every data-model invariant
pub fn assert_consistent(room: &Room) {
    let violations = RoomStateMachine::invariant_violations(room);
    assert!(violations.is_empty(), "Invariant violations: {:?}", violations);
}
