use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::StreamExt;
use game_types::FieldWrite;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::paths;
use crate::store::{DocumentStore, Snapshot, SnapshotStream, StoreError};

const UNAVAILABLE: &str = "memory store is offline";

/// One document and the channel its subscribers watch. A slot outlives its
/// document while anyone is still subscribed.
struct Slot {
    value: Option<Value>,
    sender: watch::Sender<Snapshot>,
}

impl Slot {
    fn empty() -> Self {
        let (sender, _) = watch::channel(Ok(None));
        Self {
            value: None,
            sender,
        }
    }

    fn publish(&self) {
        self.sender.send_replace(Ok(self.value.clone()));
    }
}

/// A subscriber's receiver. When the last one for a key goes away and the
/// key holds no document, the slot is dropped with it.
struct Subscriber {
    receiver: Option<watch::Receiver<Snapshot>>,
    slots: Arc<DashMap<String, Slot>>,
    key: String,
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        // Release ours before counting the rest
        self.receiver = None;
        let removed = self.slots.remove_if(&self.key, |_, slot| {
            slot.value.is_none() && slot.sender.receiver_count() == 0
        });
        if removed.is_some() {
            debug!("released empty slot {}", self.key);
        }
    }
}

/// In-process `DocumentStore`.
///
/// Each key is guarded by its map shard, so a write and the notification it
/// produces happen under the same lock and subscribers never observe an
/// older value after a newer one.
pub struct MemoryStore {
    slots: Arc<DashMap<String, Slot>>,
    available: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            slots: Arc::new(DashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate losing or regaining the backing store. While offline every
    /// operation fails and every open subscription reports the failure.
    pub fn set_available(&self, available: bool) {
        let was = self.available.swap(available, Ordering::SeqCst);
        if was == available {
            return;
        }

        if available {
            debug!("Memory store back online");
        } else {
            warn!("Memory store going offline");
        }

        for slot in self.slots.iter() {
            if available {
                slot.publish();
            } else {
                slot.sender
                    .send_replace(Err(StoreError::Unavailable(UNAVAILABLE.to_string())));
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Number of documents currently stored.
    pub fn document_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.value.is_some()).count()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.is_available() {
            Ok(())
        } else {
            Err(StoreError::Unavailable(UNAVAILABLE.to_string()))
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        self.check_available()?;
        Ok(self.slots.get(key).and_then(|slot| slot.value.clone()))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.check_available()?;
        debug!("set {}", key);

        let mut slot = self.slots.entry(key.to_string()).or_insert_with(Slot::empty);
        slot.value = Some(value);
        slot.publish();
        Ok(())
    }

    async fn update(&self, key: &str, fields: Vec<FieldWrite>) -> Result<bool, StoreError> {
        self.check_available()?;

        let Some(mut slot) = self.slots.get_mut(key) else {
            debug!("update {} skipped: no such document", key);
            return Ok(false);
        };
        let Some(current) = slot.value.as_ref() else {
            debug!("update {} skipped: no such document", key);
            return Ok(false);
        };

        // Build the new value first so a bad path leaves the document untouched
        let mut next = current.clone();
        for field in fields {
            if !paths::apply_write(&mut next, &field.path, field.value) {
                return Err(StoreError::InvalidPath {
                    key: key.to_string(),
                    path: field.path,
                });
            }
        }

        debug!("update {}", key);
        slot.value = Some(next);
        slot.publish();
        Ok(true)
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.check_available()?;
        debug!("remove {}", key);

        if let Some(mut slot) = self.slots.get_mut(key) {
            slot.value = None;
            slot.publish();
        }
        self.slots
            .remove_if(key, |_, slot| slot.sender.receiver_count() == 0);
        Ok(())
    }

    async fn subscribe(&self, key: &str) -> Result<SnapshotStream, StoreError> {
        self.check_available()?;
        debug!("subscribe {}", key);

        let receiver = self
            .slots
            .entry(key.to_string())
            .or_insert_with(Slot::empty)
            .sender
            .subscribe();
        let subscriber = Subscriber {
            receiver: Some(receiver),
            slots: self.slots.clone(),
            key: key.to_string(),
        };

        let stream = futures_util::stream::unfold(
            (subscriber, true),
            |(mut subscriber, first)| async move {
                let receiver = subscriber.receiver.as_mut()?;
                if !first && receiver.changed().await.is_err() {
                    return None;
                }
                let snapshot = receiver.borrow_and_update().clone();
                Some((snapshot, (subscriber, false)))
            },
        );

        Ok(stream.boxed())
    }
}
