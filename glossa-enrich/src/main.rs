//! glossa-enrich - word enrichment service
//!
//! Serves `POST /api/words/enrich`, `DELETE /api/words/cache` and `GET /health`.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt};

use glossa_enrich::config::{build_coordinator, resolve_service_config, CliOverrides};
use glossa_enrich::AppState;

/// Command-line arguments for glossa-enrich
#[derive(Parser, Debug)]
#[command(name = "glossa-enrich")]
#[command(about = "Word enrichment service")]
#[command(version)]
struct Args {
    /// Path to glossa.toml
    #[arg(short, long, env = "GLOSSA_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides [server] port)
    #[arg(short, long, env = "GLOSSA_PORT")]
    port: Option<u16>,

    /// Folder holding the word database (overrides root_folder)
    #[arg(short, long, env = "GLOSSA_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Installed before config resolution so its messages are kept; the
    // [logging] level is swapped in afterwards unless RUST_LOG is set
    let from_env = tracing_subscriber::EnvFilter::try_from_default_env().ok();
    let use_config_level = from_env.is_none();
    let (filter, filter_handle) = reload::Layer::new(
        from_env.unwrap_or_else(|| "glossa_enrich=info,glossa_common=info,tower_http=info".into()),
    );
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = resolve_service_config(&CliOverrides {
        config: args.config,
        port: args.port,
        root_folder: args.root_folder,
    })
    .context("Failed to resolve configuration")?;

    if use_config_level {
        let level = &config.logging.level;
        filter_handle
            .reload(tracing_subscriber::EnvFilter::new(format!(
                "glossa_enrich={0},glossa_common={0},tower_http={0}",
                level
            )))
            .context("Failed to apply [logging] level")?;
    }

    info!(
        "Starting glossa-enrich {} ({}, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP")
    );

    let db_path = config.database_path();
    info!("Database: {}", db_path.display());
    let pool = glossa_common::db::init_database(&db_path)
        .await
        .context("Failed to open word database")?;

    let coordinator =
        build_coordinator(&config, pool).context("Failed to build enrichment pipeline")?;
    let app = glossa_enrich::build_router(AppState::new(coordinator));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid [server] host/port")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
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
