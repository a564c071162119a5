use anyhow::Context;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use game_server::{config::ServerConfig, create_routes, websocket::ClientRegistry};
use game_store::{DocumentStore, MemoryStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting room store server...");

    let config = ServerConfig::from_env().context("Failed to read server configuration")?;
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
    let registry = Arc::new(ClientRegistry::new());

    let routes = create_routes(store, registry.clone(), config.clone());

    // Idle clients are dropped, which closes their sockets
    let idle_after = config.connection_timeout;
    tokio::spawn(async move {
        let mut sweep = tokio::time::interval(Duration::from_secs(30));
        loop {
            sweep.tick().await;
            let evicted = registry.evict_idle(idle_after);
            if evicted > 0 {
                info!("Evicted {} idle clients", evicted);
            }
        }
    });

    let host: IpAddr = config
        .host
        .parse()
        .with_context(|| format!("Invalid HOST {:?}", config.host))?;

    info!("Server starting on {}:{}", host, config.port);

    let (addr, server) = warp::serve(routes)
        .try_bind_with_graceful_shutdown((host, config.port), shutdown_signal())
        .context("Failed to bind server address")?;

    info!(
        "Server started successfully on {}. Press Ctrl+C to stop.",
        addr
    );
    server.await;
    info!("Server shutdown complete.");
    Ok(())
}

/// Resolves on SIGINT (Ctrl+C) or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use signal::unix::SignalKind;

        match (
            signal::unix::signal(SignalKind::interrupt()),
            signal::unix::signal(SignalKind::terminate()),
        ) {
            (Ok(mut sigint), Ok(mut sigterm)) => {
                tokio::select! {
                    _ = sigint.recv() => {
                        info!("Received SIGINT, shutting down gracefully...");
                    }
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, shutting down gracefully...");
                    }
                }
            }
            _ => {
                warn!("Could not install signal handlers, falling back to Ctrl+C");
                if signal::ctrl_c().await.is_ok() {
                    info!("Received Ctrl+C, shutting down gracefully...");
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        if signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }
}
