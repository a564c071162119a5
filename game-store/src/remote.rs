use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures_util::{SinkExt, StreamExt};
use game_types::{FieldWrite, StoreRequest, StoreResponse};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::store::{DocumentStore, Snapshot, SnapshotStream, StoreError};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const CONNECTION_CLOSED: &str = "store connection closed";

/// State shared between the client handle and its socket tasks.
struct Shared {
    outbox: mpsc::UnboundedSender<StoreRequest>,
    pending: DashMap<u64, oneshot::Sender<StoreResponse>>,
    // `None` until the host sends the first snapshot
    watches: DashMap<String, watch::Sender<Option<Snapshot>>>,
    connected: AtomicBool,
}

impl Shared {
    fn route(&self, response: StoreResponse) {
        match response {
            StoreResponse::Value { request_id, .. }
            | StoreResponse::Ack { request_id, .. }
            | StoreResponse::Error {
                request_id: Some(request_id),
                ..
            } => match self.pending.remove(&request_id) {
                Some((_, reply)) => {
                    let _ = reply.send(response);
                }
                None => debug!("Reply for abandoned request {}", request_id),
            },
            StoreResponse::Snapshot { key, value } => {
                if let Some(watch) = self.watches.get(&key) {
                    watch.send_replace(Some(Ok(value)));
                }
            }
            StoreResponse::SubscriptionLost { key, message } => {
                // The host may still hold the subscription; drop it on both
                // ends so the next subscriber starts clean
                if let Entry::Occupied(entry) = self.watches.entry(key.clone()) {
                    warn!("Subscription to {} lost: {}", key, message);
                    entry
                        .get()
                        .send_replace(Some(Err(StoreError::Unavailable(message))));
                    let _ = self.outbox.send(StoreRequest::Unsubscribe { key });
                    entry.remove();
                }
            }
            StoreResponse::Error {
                request_id: None,
                message,
            } => warn!("Store host error: {}", message),
            StoreResponse::HeartbeatAck => {}
        }
    }

    /// Fail everything in flight once the socket is gone.
    fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.pending.clear();
        self.watches.retain(|_, watch| {
            watch.send_replace(Some(Err(StoreError::Unavailable(
                CONNECTION_CLOSED.to_string(),
            ))));
            false
        });
    }

    fn check_connected(&self) -> Result<(), StoreError> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable(CONNECTION_CLOSED.to_string()))
        }
    }
}

/// A local subscriber of one key. The last one to go unsubscribes.
struct Watcher {
    receiver: Option<watch::Receiver<Option<Snapshot>>>,
    shared: Arc<Shared>,
    key: String,
}

impl Drop for Watcher {
    fn drop(&mut self) {
        let Some(receiver) = self.receiver.take() else {
            return;
        };
        drop(receiver);

        if let Entry::Occupied(entry) = self.shared.watches.entry(self.key.clone()) {
            if entry.get().receiver_count() == 0 {
                debug!("Unsubscribing from {}", self.key);
                let _ = self.shared.outbox.send(StoreRequest::Unsubscribe {
                    key: self.key.clone(),
                });
                entry.remove();
            }
        }
    }
}

/// `DocumentStore` backed by a store host over a websocket.
///
/// Requests are matched to replies by id. Every local subscriber of a key
/// shares one host subscription. Host-side failures surface as
/// `StoreError::Unavailable`, and so does a dropped connection, after which
/// every call fails until a new client is connected.
pub struct RemoteStore {
    shared: Arc<Shared>,
    next_request_id: AtomicU64,
    request_timeout: Duration,
    tasks: Vec<JoinHandle<()>>,
}

impl RemoteStore {
    /// Connect to a store host, e.g. `ws://127.0.0.1:3000/ws`.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        Self::connect_with_timeout(url, DEFAULT_REQUEST_TIMEOUT).await
    }

    pub async fn connect_with_timeout(
        url: &str,
        request_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let (socket, _response) = connect_async(url)
            .await
            .map_err(|e| StoreError::Unavailable(format!("connect to {url} failed: {e}")))?;
        info!("Connected to store host at {}", url);

        let (mut sink, mut frames) = socket.split();
        let (outbox, mut requests) = mpsc::unbounded_channel::<StoreRequest>();
        let shared = Arc::new(Shared {
            outbox,
            pending: DashMap::new(),
            watches: DashMap::new(),
            connected: AtomicBool::new(true),
        });

        let writer = tokio::spawn(async move {
            let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
            heartbeat.tick().await;
            loop {
                let request = tokio::select! {
                    request = requests.recv() => match request {
                        Some(request) => request,
                        None => break,
                    },
                    _ = heartbeat.tick() => StoreRequest::Heartbeat,
                };

                let text = match serde_json::to_string(&request) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Dropping unencodable request: {:?}", e);
                        continue;
                    }
                };
                if let Err(e) = sink.send(Message::text(text)).await {
                    warn!("Store host write failed: {}", e);
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let reader = {
            let shared = shared.clone();
            tokio::spawn(async move {
                while let Some(frame) = frames.next().await {
                    let text = match frame {
                        Ok(Message::Text(text)) => text,
                        Ok(Message::Close(_)) => break,
                        Ok(_) => continue,
                        Err(e) => {
                            warn!("Store host read failed: {}", e);
                            break;
                        }
                    };
                    match serde_json::from_str::<StoreResponse>(text.as_str()) {
                        Ok(response) => shared.route(response),
                        Err(e) => warn!("Unreadable store host message: {}", e),
                    }
                }

                warn!("Store host connection closed");
                shared.disconnect();
            })
        };

        Ok(Self {
            shared,
            next_request_id: AtomicU64::new(1),
            request_timeout,
            tasks: vec![writer, reader],
        })
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    /// Keys with at least one live local subscriber.
    pub fn subscription_count(&self) -> usize {
        self.shared.watches.len()
    }

    async fn request(
        &self,
        build: impl FnOnce(u64) -> StoreRequest,
    ) -> Result<StoreResponse, StoreError> {
        self.shared.check_connected()?;

        let request_id = self.next_request_id.fetch_add(1, Ordering::SeqCst);
        let (reply, response) = oneshot::channel();
        self.shared.pending.insert(request_id, reply);

        // A disconnect between the check and the insert would miss us
        if let Err(e) = self.shared.check_connected() {
            self.shared.pending.remove(&request_id);
            return Err(e);
        }
        if self.shared.outbox.send(build(request_id)).is_err() {
            self.shared.pending.remove(&request_id);
            return Err(StoreError::Unavailable(CONNECTION_CLOSED.to_string()));
        }

        match tokio::time::timeout(self.request_timeout, response).await {
            Ok(Ok(StoreResponse::Error { message, .. })) => Err(StoreError::Unavailable(message)),
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(StoreError::Unavailable(CONNECTION_CLOSED.to_string())),
            Err(_) => {
                self.shared.pending.remove(&request_id);
                Err(StoreError::Unavailable(format!(
                    "request {} timed out",
                    request_id
                )))
            }
        }
    }
}

impl Drop for RemoteStore {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

fn unexpected(response: StoreResponse) -> StoreError {
    StoreError::Unavailable(format!("unexpected reply from store host: {:?}", response))
}

#[async_trait]
impl DocumentStore for RemoteStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let key = key.to_string();
        match self.request(|request_id| StoreRequest::Get { request_id, key }).await? {
            StoreResponse::Value { value, .. } => Ok(value),
            other => Err(unexpected(other)),
        }
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let key = key.to_string();
        match self
            .request(|request_id| StoreRequest::Set {
                request_id,
                key,
                value,
            })
            .await?
        {
            StoreResponse::Ack { .. } => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    async fn update(&self, key: &str, fields: Vec<FieldWrite>) -> Result<bool, StoreError> {
        let key = key.to_string();
        match self
            .request(|request_id| StoreRequest::Update {
                request_id,
                key,
                fields,
            })
            .await?
        {
            StoreResponse::Ack { applied, .. } => Ok(applied),
            other => Err(unexpected(other)),
        }
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let key = key.to_string();
        match self.request(|request_id| StoreRequest::Remove { request_id, key }).await? {
            StoreResponse::Ack { .. } => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    async fn subscribe(&self, key: &str) -> Result<SnapshotStream, StoreError> {
        self.shared.check_connected()?;

        let receiver = match self.shared.watches.entry(key.to_string()) {
            Entry::Occupied(entry) => entry.get().subscribe(),
            Entry::Vacant(entry) => {
                debug!("Subscribing to {}", key);
                self.shared
                    .outbox
                    .send(StoreRequest::Subscribe {
                        key: key.to_string(),
                    })
                    .map_err(|_| StoreError::Unavailable(CONNECTION_CLOSED.to_string()))?;
                let (sender, receiver) = watch::channel(None);
                entry.insert(sender);
                receiver
            }
        };

        let watcher = Watcher {
            receiver: Some(receiver),
            shared: self.shared.clone(),
            key: key.to_string(),
        };

        let stream =
            futures_util::stream::unfold((watcher, true), |(mut watcher, first)| async move {
                let receiver = watcher.receiver.as_mut()?;
                if !first {
                    receiver.changed().await.ok()?;
                }
                // Skip the placeholder until the host's first snapshot lands
                loop {
                    let current = receiver.borrow_and_update().clone();
                    if let Some(snapshot) = current {
                        return Some((snapshot, (watcher, false)));
                    }
                    receiver.changed().await.ok()?;
                }
            });

        Ok(stream.boxed())
    }
}
