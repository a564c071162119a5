use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures_util::StreamExt;
use game_store::RoomRepository;
use game_types::{Room, RoomId};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const RESUBSCRIBE_DELAY: Duration = Duration::from_millis(250);

/// What the local client currently knows about a room.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomView {
    /// Subscribed, no snapshot received yet.
    Pending,
    Present(Room),
    /// The room record was deleted.
    Gone,
    /// The store stopped answering. Clears on the next good snapshot; a
    /// subscription that could not be opened is retried until it can.
    ConnectionLost(String),
}

impl RoomView {
    pub fn room(&self) -> Option<&Room> {
        match self {
            RoomView::Present(room) => Some(room),
            _ => None,
        }
    }

    pub fn is_gone(&self) -> bool {
        matches!(self, RoomView::Gone)
    }
}

struct Subscription {
    task: JoinHandle<()>,
    view: watch::Receiver<RoomView>,
}

/// Republishes store snapshots of watched rooms as `RoomView`s.
///
/// One background task per room, shared by every local watcher of that
/// room. Views are last-value-wins.
pub struct ChangeSync {
    rooms: RoomRepository,
    subscriptions: DashMap<RoomId, Subscription>,
}

impl ChangeSync {
    pub fn new(rooms: RoomRepository) -> Self {
        Self {
            rooms,
            subscriptions: DashMap::new(),
        }
    }

    /// Watch a room. Must be called inside a Tokio runtime.
    pub fn subscribe(&self, room_id: &str) -> watch::Receiver<RoomView> {
        match self.subscriptions.entry(room_id.to_string()) {
            Entry::Occupied(entry) => entry.get().view.clone(),
            Entry::Vacant(entry) => {
                let (sender, view) = watch::channel(RoomView::Pending);
                let task = tokio::spawn(Self::forward(
                    self.rooms.clone(),
                    room_id.to_string(),
                    sender,
                ));

                info!("Subscribed to room {}", room_id);
                entry.insert(Subscription {
                    task,
                    view: view.clone(),
                });
                view
            }
        }
    }

    async fn forward(rooms: RoomRepository, room_id: RoomId, view: watch::Sender<RoomView>) {
        loop {
            match rooms.watch(&room_id).await {
                Ok(mut snapshots) => {
                    while let Some(snapshot) = snapshots.next().await {
                        let next = match snapshot {
                            Ok(Some(room)) => RoomView::Present(room),
                            Ok(None) => RoomView::Gone,
                            Err(e) => {
                                warn!("Lost connection to room {}: {}", room_id, e);
                                RoomView::ConnectionLost(e.to_string())
                            }
                        };
                        view.send_replace(next);
                    }

                    debug!("Snapshot stream for room {} ended", room_id);
                    view.send_replace(RoomView::ConnectionLost("subscription closed".to_string()));
                }
                Err(e) => {
                    warn!("Could not subscribe to room {}: {}", room_id, e);
                    view.send_replace(RoomView::ConnectionLost(e.to_string()));
                }
            }

            if view.is_closed() {
                return;
            }
            tokio::time::sleep(RESUBSCRIBE_DELAY).await;
        }
    }

    /// Stop watching a room and release its task. Returns whether a
    /// subscription existed; calling it again is harmless.
    pub fn unsubscribe(&self, room_id: &str) -> bool {
        match self.subscriptions.remove(room_id) {
            Some((_, subscription)) => {
                subscription.task.abort();
                info!("Unsubscribed from room {}", room_id);
                true
            }
            None => false,
        }
    }

    pub fn is_subscribed(&self, room_id: &str) -> bool {
        self.subscriptions.contains_key(room_id)
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Latest view of a watched room.
    pub fn current(&self, room_id: &str) -> Option<RoomView> {
        self.subscriptions
            .get(room_id)
            .map(|subscription| subscription.view.borrow().clone())
    }
}

impl Drop for ChangeSync {
    fn drop(&mut self) {
        for subscription in self.subscriptions.iter() {
            subscription.task.abort();
        }
    }
}
