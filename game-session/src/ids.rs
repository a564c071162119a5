use game_types::{PlayerId, ROOM_CODE_LENGTH, RoomId};
use rand::Rng;

pub const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const PLAYER_SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const PLAYER_SUFFIX_LENGTH: usize = 7;

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn random_string(alphabet: &[u8], length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
        .collect()
}

/// Six characters from `A-Z0-9`.
pub fn generate_room_code() -> RoomId {
    random_string(ROOM_CODE_ALPHABET, ROOM_CODE_LENGTH)
}

/// `player_<millis>_<7 base36 chars>`, unique enough for two clients.
pub fn generate_player_id() -> PlayerId {
    format!(
        "player_{}_{}",
        now_millis(),
        random_string(PLAYER_SUFFIX_ALPHABET, PLAYER_SUFFIX_LENGTH)
    )
}

pub fn is_valid_room_code(value: &str) -> bool {
    value.len() == ROOM_CODE_LENGTH && value.bytes().all(|b| ROOM_CODE_ALPHABET.contains(&b))
}

/// Tidy a code as a user typed it. Returns `None` if it cannot be a room code.
pub fn normalize_room_code(input: &str) -> Option<RoomId> {
    let code = input.trim().to_ascii_uppercase();
    is_valid_room_code(&code).then_some(code)
}
