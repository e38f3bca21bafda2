//! Farm Cache - inspection server
//!
//! Runs a file-persisted cache behind a small HTTP API so the stats panel
//! and developers can look inside it.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use farm_cache::api::{create_router, AppState};
use farm_cache::{spawn_stats_poller, Cache, Config, FileStorage};

/// Main entry point for the cache inspection server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the cache, restore its snapshot and start TTL cleanup
/// 4. Start the periodic stats log line
/// 5. Serve the HTTP API until SIGINT/SIGTERM
/// 6. Stop background tasks and write a final snapshot
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "farm_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Farm Cache inspection server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: max_size={}, ttl={}ms, cleanup_interval={}ms, persistence={}, port={}",
        config.cache.max_size,
        config.cache.ttl_ms,
        config.cache.cleanup_interval_ms,
        config.cache.enable_persistence,
        config.server_port
    );

    let cache: Cache = Cache::builder(config.cache.clone())
        .storage(Arc::new(FileStorage::new(&config.data_dir)))
        .build();
    cache.init().await;

    let stats_poller = (config.stats_log_interval_ms > 0).then(|| {
        spawn_stats_poller(
            cache.downgrade(),
            Duration::from_millis(config.stats_log_interval_ms),
            |stats| {
                info!(
                    "Cache stats: size={}/{}, hit_rate={}%, hits={}, misses={}, evictions={}",
                    stats.size, stats.max_size, stats.hit_rate, stats.hits, stats.misses, stats.evictions
                );
            },
        )
    });

    let app = create_router(AppState::new(cache.clone()));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(handle) = stats_poller {
        handle.abort();
    }
    cache.destroy().await;

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
