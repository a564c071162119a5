use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use game_store::DocumentStore;
use game_types::StoreResponse;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use warp::ws::{Message, WebSocket};

pub mod handlers;
pub mod rate_limiter;
pub mod registry;

use handlers::RequestHandler;
pub use rate_limiter::RateLimiter;
pub use registry::{ClientId, ClientRegistry};

/// Serve one websocket client until either side hangs up or the registry
/// drops it. Its subscriptions end with it.
pub async fn serve_client(
    socket: WebSocket,
    registry: Arc<ClientRegistry>,
    store: Arc<dyn DocumentStore>,
    limiter: RateLimiter,
) {
    let (client, inbox) = registry.register();
    info!("{} connected", client);

    let (sink, frames) = socket.split();
    let handler = RequestHandler::new(client, registry.clone(), store, limiter);

    tokio::select! {
        _ = read_requests(frames, handler) => {},
        _ = write_replies(sink, inbox, client) => {},
    }

    registry.unregister(client);
    info!("{} disconnected", client);
}

async fn read_requests(mut frames: SplitStream<WebSocket>, mut handler: RequestHandler) {
    while let Some(frame) = frames.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Websocket read failed: {}", e);
                return;
            }
        };
        if frame.is_close() {
            return;
        }
        // Pings are answered by warp
        let Ok(text) = frame.to_str() else {
            continue;
        };
        if !handler.on_text(text).await {
            return;
        }
    }
}

async fn write_replies(
    mut sink: SplitSink<WebSocket, Message>,
    mut inbox: mpsc::UnboundedReceiver<StoreResponse>,
    client: ClientId,
) {
    while let Some(response) = inbox.recv().await {
        let text = match serde_json::to_string(&response) {
            Ok(text) => text,
            Err(e) => {
                error!("Could not encode reply for {}: {:?}", client, e);
                continue;
            }
        };
        if let Err(e) = sink.send(Message::text(text)).await {
            warn!("Websocket write to {} failed: {:?}", client, e);
            return;
        }
    }
}
