use std::sync::Arc;
use std::time::Duration;

use game_types::RoomId;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::coordinator::SessionCoordinator;

/// Background all-done check for a room a client is sitting in.
///
/// Ticks at a fixed interval and finishes the room if every player is done
/// but nobody recorded it. Stops by itself once the room is gone; aborted
/// on drop.
pub struct Reconciler {
    handle: JoinHandle<()>,
}

impl Reconciler {
    pub fn spawn(coordinator: Arc<SessionCoordinator>, room_id: RoomId, every: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;

                match coordinator.fetch_room(&room_id).await {
                    Ok(Some(_)) => {}
                    Ok(None) => {
                        info!("Room {} is gone, reconciler stopping", room_id);
                        break;
                    }
                    Err(e) if e.is_retryable() => {
                        debug!("Reconcile of room {} skipped: {}", room_id, e);
                    }
                    Err(e) => {
                        warn!("Reconcile of room {} failed: {}", room_id, e);
                    }
                }
            }
        });

        Self { handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for Reconciler {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
