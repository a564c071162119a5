pub mod config;
pub mod errors;
pub mod game;
pub mod messages;

// Re-export all types
pub use config::*;
pub use errors::*;
pub use game::*;
pub use messages::*;

pub type RoomId = String;
pub type PlayerId = String;
