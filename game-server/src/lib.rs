use game_store::DocumentStore;
use std::sync::Arc;
use warp::Filter;

use crate::config::ServerConfig;
use crate::websocket::{ClientRegistry, RateLimiter};

pub mod config;
pub mod websocket;

pub fn create_routes(
    store: Arc<dyn DocumentStore>,
    registry: Arc<ClientRegistry>,
    config: ServerConfig,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let registry_filter = warp::any().map(move || registry.clone());

    let store_filter = warp::any().map(move || store.clone());

    // Fresh bucket for every client
    let (burst, refill) = (config.rate_limit_burst, config.rate_limit_refill);
    let rate_limiter_filter = warp::any().map(move || RateLimiter::new(burst, refill));

    let websocket = warp::path("ws")
        .and(warp::ws())
        .and(registry_filter)
        .and(store_filter)
        .and(rate_limiter_filter)
        .map(
            |ws: warp::ws::Ws,
             registry: Arc<ClientRegistry>,
             store: Arc<dyn DocumentStore>,
             limiter: RateLimiter| {
                ws.on_upgrade(move |socket| websocket::serve_client(socket, registry, store, limiter))
            },
        );

    // Health check endpoint
    let health = warp::path("health")
        .and(warp::get())
        .map(|| warp::reply::with_status("OK", warp::http::StatusCode::OK));

    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type"])
        .allow_methods(vec!["GET"]);

    websocket
        .or(health)
        .with(cors)
        .with(warp::log("game_server"))
}
