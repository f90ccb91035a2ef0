//! Predictdash - data layer for a price prediction dashboard
//!
//! Serves cached backend data to the dashboard through a JSON gateway.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use predictdash::{create_router, spawn_cleanup_task, AppState, Config};

/// Main entry point for the dashboard gateway.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build cache store, queue, orchestrator and upstream client
/// 4. Start background cleanup task
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM and flush the cache
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "predictdash=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Predictdash gateway");

    let config = Config::from_env();
    info!(
        "Configuration loaded: backend={}, cache_ttl={}s, queue_capacity={}, task_timeout={}s, port={}",
        config.api_base_url,
        config.cache_ttl,
        config.queue_capacity,
        config.task_timeout,
        config.server_port
    );

    let state = AppState::from_config(&config).context("Failed to initialize application state")?;
    info!("Data layer initialized");

    let cleanup_handle = spawn_cleanup_task(state.cache().clone(), config.cleanup_interval());
    info!("Background cleanup task started");

    let app = create_router(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    cleanup_handle.abort();
    state.prefetch.abort_all();
    state.service.queue().shutdown();
    warn!("Background work stopped");

    let cache = state.cache().clone();
    match tokio::task::spawn_blocking(move || cache.flush()).await {
        Ok(Ok(())) => info!("Cache flushed to storage"),
        Ok(Err(e)) => warn!("Failed to flush cache: {}", e),
        Err(e) => warn!("Cache flush task failed: {}", e),
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
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
