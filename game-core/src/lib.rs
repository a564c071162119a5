pub mod game_events;
pub mod hints;
pub mod room_state;
pub mod scoring;
pub mod word_validation;

// Re-export main components
pub use game_events::*;
pub use hints::*;
pub use room_state::*;
pub use scoring::*;
pub use word_validation::*;
