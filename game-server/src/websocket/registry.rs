use dashmap::DashMap;
use game_types::StoreResponse;
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(Uuid);

impl ClientId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0.simple())
    }
}

/// A connected client: where its replies go and which documents it watches.
struct Client {
    outbox: mpsc::UnboundedSender<StoreResponse>,
    last_seen: Instant,
    watches: HashMap<String, JoinHandle<()>>,
}

impl Drop for Client {
    fn drop(&mut self) {
        for (_, forwarder) in self.watches.drain() {
            forwarder.abort();
        }
    }
}

/// Every client connected to this host, keyed by id. Dropping a client's
/// entry closes its outbox, which ends its socket session, and stops all of
/// its snapshot forwarders.
#[derive(Default)]
pub struct ClientRegistry {
    clients: DashMap<ClientId, Client>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a client. The receiver yields everything pushed to it.
    pub fn register(&self) -> (ClientId, mpsc::UnboundedReceiver<StoreResponse>) {
        let id = ClientId::random();
        let (outbox, inbox) = mpsc::unbounded_channel();
        self.clients.insert(
            id,
            Client {
                outbox,
                last_seen: Instant::now(),
                watches: HashMap::new(),
            },
        );
        (id, inbox)
    }

    pub fn unregister(&self, id: ClientId) {
        if self.clients.remove(&id).is_some() {
            debug!("{} unregistered", id);
        }
    }

    pub fn touch(&self, id: ClientId) {
        if let Some(mut client) = self.clients.get_mut(&id) {
            client.last_seen = Instant::now();
        }
    }

    /// Queue a reply. `false` once the client is gone.
    pub fn push(&self, id: ClientId, response: StoreResponse) -> bool {
        self.clients
            .get(&id)
            .is_some_and(|client| client.outbox.send(response).is_ok())
    }

    /// A handle for forwarders that push on their own schedule.
    pub fn outbox(&self, id: ClientId) -> Option<mpsc::UnboundedSender<StoreResponse>> {
        self.clients.get(&id).map(|client| client.outbox.clone())
    }

    /// Track the forwarder for `key`, stopping any earlier one. A forwarder
    /// for a client that already left is stopped at once.
    pub fn watch(&self, id: ClientId, key: String, forwarder: JoinHandle<()>) {
        let Some(mut client) = self.clients.get_mut(&id) else {
            forwarder.abort();
            return;
        };
        if let Some(replaced) = client.watches.insert(key, forwarder) {
            replaced.abort();
        }
    }

    /// Stop forwarding `key`. `false` if nothing was being forwarded.
    pub fn unwatch(&self, id: ClientId, key: &str) -> bool {
        let forwarder = self
            .clients
            .get_mut(&id)
            .and_then(|mut client| client.watches.remove(key));
        forwarder.map(|forwarder| forwarder.abort()).is_some()
    }

    /// Drop clients silent for longer than `idle`. Returns how many went.
    pub fn evict_idle(&self, idle: Duration) -> usize {
        let before = self.clients.len();
        self.clients.retain(|id, client| {
            let keep = client.last_seen.elapsed() <= idle;
            if !keep {
                info!("Evicting idle {}", id);
            }
            keep
        });
        before.saturating_sub(self.clients.len())
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn watch_count(&self, id: ClientId) -> usize {
        self.clients
            .get(&id)
            .map_or(0, |client| client.watches.len())
    }
}
