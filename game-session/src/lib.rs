pub mod config;
pub mod coordinator;
pub mod dictionary;
pub mod ids;
pub mod player_session;
pub mod reconciler;
pub mod sync;

pub use config::SessionConfig;
pub use coordinator::SessionCoordinator;
pub use dictionary::DictionaryValidator;
pub use player_session::PlayerSession;
pub use reconciler::Reconciler;
pub use sync::{ChangeSync, RoomView};
