pub mod memory;
pub mod paths;
pub mod remote;
pub mod repositories;
pub mod store;

pub use memory::MemoryStore;
pub use remote::RemoteStore;
pub use repositories::room_repository::{RoomRepository, RoomStream, RoomUpdate};
pub use store::{DocumentStore, Snapshot, SnapshotStream, StoreError};
