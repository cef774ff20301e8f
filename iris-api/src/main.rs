//! iris-api - Deepfake detection API server
//!
//! Accounts with TOTP second factor, analysis relay to the classifier
//! services, narrative interpretation, per-user history and the article
//! collection, all under `/api`.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use iris_api::services::{RateLimiters, SessionRegistry};
use iris_common::config::IrisConfig;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often expired session tokens and idle rate-limit entries are swept
const SWEEP_INTERVAL: Duration = Duration::from_secs(600);

/// Command-line arguments for iris-api
#[derive(Parser, Debug)]
#[command(name = "iris-api")]
#[command(about = "Deepfake detection API server")]
#[command(version)]
struct Args {
    /// TOML config file (default: <config dir>/iris/iris-api.toml)
    #[arg(short, long, env = "IRIS_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "IRIS_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(long, env = "IRIS_HOST")]
    host: Option<String>,

    /// SQLite database file
    #[arg(short, long, env = "IRIS_DATABASE")]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = IrisConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(database) = args.database {
        config.database.path = database;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("iris_api={level},iris_common={level},tower_http=info", level = config.logging.level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting iris-api v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!("Database: {}", config.database.path.display());

    let bind_address = config.bind_address();
    let state = iris_api::build_state(config)
        .await
        .context("Failed to initialize application state")?;
    info!("Inference backend: {}", state.inference.name());

    let shutdown = CancellationToken::new();
    spawn_sweeper(state.sessions.clone(), state.limiters.clone(), shutdown.clone());

    let app = iris_api::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_address))?;
    info!("Listening on http://{}", bind_address);
    info!("Health check: http://{}/api/health", bind_address);

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            server_shutdown.cancel();
        })
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Periodically drop expired bearer tokens and idle clients until shutdown
fn spawn_sweeper(sessions: SessionRegistry, limiters: RateLimiters, shutdown: CancellationToken) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {
                    let removed = sessions.prune_expired().await;
                    if removed > 0 {
                        info!("Pruned {} expired sessions", removed);
                    }
                    let tracked = limiters.prune();
                    debug!(tracked, "Rate limiter entries pruned");
                }
            }
        }
    });
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
            Ok(mut sig) => {
                sig.recv().await;
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
