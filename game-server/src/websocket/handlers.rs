use futures_util::StreamExt;
use game_store::{DocumentStore, StoreError};
use game_types::{StoreRequest, StoreResponse};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::websocket::RateLimiter;
use crate::websocket::registry::{ClientId, ClientRegistry};

/// Runs one client's requests against the store and queues the replies.
pub struct RequestHandler {
    client: ClientId,
    registry: Arc<ClientRegistry>,
    store: Arc<dyn DocumentStore>,
    limiter: RateLimiter,
}

impl RequestHandler {
    pub fn new(
        client: ClientId,
        registry: Arc<ClientRegistry>,
        store: Arc<dyn DocumentStore>,
        limiter: RateLimiter,
    ) -> Self {
        Self {
            client,
            registry,
            store,
            limiter,
        }
    }

    /// Handle one text frame. Bad or throttled requests get an `Error`
    /// reply and the session carries on; `false` means the client is gone.
    pub async fn on_text(&mut self, text: &str) -> bool {
        self.registry.touch(self.client);

        let request: StoreRequest = match serde_json::from_str(text) {
            Ok(request) => request,
            Err(e) => {
                return self.reply(StoreResponse::Error {
                    request_id: None,
                    message: format!("Invalid JSON message: {}", e),
                });
            }
        };

        if !self.limiter.check_rate_limit() {
            warn!("{} is over its rate limit", self.client);
            return self.reply(StoreResponse::Error {
                request_id: request.request_id(),
                message: "Rate limit exceeded".to_string(),
            });
        }

        match self.answer(request).await {
            Some(response) => self.reply(response),
            None => true,
        }
    }

    /// The direct reply to a request, if it has one.
    async fn answer(&self, request: StoreRequest) -> Option<StoreResponse> {
        let response = match request {
            StoreRequest::Get { request_id, key } => {
                debug!("{} get {}", self.client, key);
                let result = self.store.get(&key).await;
                settle(request_id, result, |value| StoreResponse::Value { request_id, value })
            }
            StoreRequest::Set {
                request_id,
                key,
                value,
            } => {
                debug!("{} set {}", self.client, key);
                let result = self.store.set(&key, value).await.map(|()| true);
                settle(request_id, result, |applied| StoreResponse::Ack { request_id, applied })
            }
            StoreRequest::Update {
                request_id,
                key,
                fields,
            } => {
                debug!("{} update {} ({} fields)", self.client, key, fields.len());
                let result = self.store.update(&key, fields).await;
                settle(request_id, result, |applied| StoreResponse::Ack { request_id, applied })
            }
            StoreRequest::Remove { request_id, key } => {
                debug!("{} remove {}", self.client, key);
                let result = self.store.remove(&key).await.map(|()| true);
                settle(request_id, result, |applied| StoreResponse::Ack { request_id, applied })
            }
            StoreRequest::Subscribe { key } => return self.subscribe(key).await,
            StoreRequest::Unsubscribe { key } => {
                if !self.registry.unwatch(self.client, &key) {
                    debug!("{} was not watching {}", self.client, key);
                }
                return None;
            }
            StoreRequest::Heartbeat => StoreResponse::HeartbeatAck,
        };
        Some(response)
    }

    /// Start forwarding snapshots of `key`. Only a failed subscribe has a
    /// direct reply.
    async fn subscribe(&self, key: String) -> Option<StoreResponse> {
        info!("{} watching {}", self.client, key);

        let mut snapshots = match self.store.subscribe(&key).await {
            Ok(snapshots) => snapshots,
            Err(e) => {
                return Some(StoreResponse::SubscriptionLost {
                    key,
                    message: e.to_string(),
                });
            }
        };
        let outbox = self.registry.outbox(self.client)?;

        let watched = key.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(snapshot) = snapshots.next().await {
                let response = match snapshot {
                    Ok(value) => StoreResponse::Snapshot {
                        key: watched.clone(),
                        value,
                    },
                    Err(e) => StoreResponse::SubscriptionLost {
                        key: watched.clone(),
                        message: e.to_string(),
                    },
                };
                if outbox.send(response).is_err() {
                    return;
                }
            }

            let _ = outbox.send(StoreResponse::SubscriptionLost {
                key: watched,
                message: "subscription closed".to_string(),
            });
        });

        self.registry.watch(self.client, key, forwarder);
        None
    }

    fn reply(&self, response: StoreResponse) -> bool {
        self.registry.push(self.client, response)
    }
}

fn settle<T>(
    request_id: u64,
    result: Result<T, StoreError>,
    ok: impl FnOnce(T) -> StoreResponse,
) -> StoreResponse {
    match result {
        Ok(value) => ok(value),
        Err(e) => {
            warn!("Store error on request {}: {}", request_id, e);
            StoreResponse::Error {
                request_id: Some(request_id),
                message: e.to_string(),
            }
        }
    }
}
