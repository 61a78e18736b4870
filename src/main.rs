//! Light Cache demo server
//!
//! Serves a few endpoints behind the response cache so the cache lifecycle
//! can be observed end to end.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use light_cache::{api::create_router, AppState, CacheConfig, CacheOptions, ServerConfig};

/// Main entry point for the demo server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load cache and server configuration from environment variables
/// 3. Build immutable cache options and choose the storage backend
/// 4. Load the snapshot, if persistence is configured
/// 5. Serve the router until SIGINT/SIGTERM
/// 6. Destroy the cache once, flushing the snapshot
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "light_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Light Cache demo server");

    let server = ServerConfig::from_env();
    let options = CacheOptions::from_config(CacheConfig::from_env())
        .context("invalid cache configuration")?;
    info!(
        "Configuration loaded: ttl={}ms, methods={:?}, statuses={:?}, persist_dir={:?}, port={}",
        options.ttl_ms(),
        options.methods_to_cache,
        options.statuses_to_cache,
        options.persist_dir,
        server.server_port
    );

    let state = AppState::from_options(options);
    state
        .cache
        .setup()
        .await
        .context("failed to load cache snapshot")?;
    info!("Cache storage initialized");

    let cache = state.cache.clone();
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], server.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    // Teardown hook: runs exactly once, after in-flight requests drained.
    if let Err(err) = cache.destroy().await {
        warn!("Cache teardown incomplete: {}", err);
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
