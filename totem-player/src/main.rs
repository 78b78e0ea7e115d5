//! totem-player - Main entry point
//!
//! Loads configuration, restores the playback position for the configured
//! device and serves the display surface over HTTP until shut down.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use totem_common::db::init_database;
use totem_common::events::EventBus;
use totem_player::config::{Args, PlayerConfig, RuntimeSettings};
use totem_player::db::SqliteIndexStore;
use totem_player::playback::{start_monitoring, PlaybackEngine};
use totem_player::{api, BackendClient};

const DEFAULT_LOG_FILTER: &str = "totem_player=info,totem_common=info,tower_http=info";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = PlayerConfig::load(&args).context("Failed to load configuration")?;

    // RUST_LOG wins over the TOML level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(toml_filter(&config.log_level)))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting totem-player v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!("Root folder: {}", config.root_folder.display());
    info!("Database: {}", config.database_path.display());
    info!("Playlist backend: {}", config.api_url);

    let db_pool = init_database(&config.database_path)
        .await
        .context("Failed to initialize database")?;
    let settings = RuntimeSettings::load(&db_pool)
        .await
        .context("Failed to load runtime settings")?;

    let client = BackendClient::new(
        &config.api_url,
        config.api_token.clone(),
        settings.http_request_timeout(),
    )
    .context("Failed to build backend client")?;

    let engine = PlaybackEngine::new(
        Arc::new(client.clone()),
        Arc::new(SqliteIndexStore::new(db_pool.clone())),
        EventBus::new(100),
        settings.min_display(),
    );
    info!("Playback engine initialized");

    match &config.device_id {
        Some(device_id) => {
            if let Err(e) = engine.start(device_id).await {
                warn!("Initial playlist load failed, waiting for start/reload: {}", e);
            }
        }
        None => info!("No device configured, waiting for POST /api/v1/player/start"),
    }

    let tasks = start_monitoring(
        engine.clone(),
        client,
        settings.refresh_interval(),
        settings.heartbeat_interval(),
    );

    let app = api::create_router(api::AppState {
        engine: engine.clone(),
        port: config.port,
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    engine.stop().await;
    for task in tasks {
        task.abort();
    }
    db_pool.close().await;

    info!("Server shutdown complete");
    Ok(())
}

/// Bare level names from the TOML file apply to our crates only
fn toml_filter(level: &str) -> String {
    let level = level.trim();
    if level.contains('=') || level.contains(',') {
        level.to_string()
    } else {
        format!(
            "totem_player={0},totem_common={0},tower_http={0}",
            level
        )
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
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
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
