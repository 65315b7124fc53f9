//! mosaic-tiles - reference tile service entry point

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use mosaic_common::config::LoggingConfig;
use mosaic_common::logging::init_tracing;
use tokio::signal;
use tracing::{info, warn};

/// Command-line arguments for mosaic-tiles
#[derive(Parser, Debug)]
#[command(name = "mosaic-tiles")]
#[command(about = "Reference SVG tile service for the mosaic client")]
#[command(version)]
struct Args {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1", env = "MOSAIC_TILES_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8765", env = "MOSAIC_TILES_PORT")]
    port: u16,

    /// Log filter when RUST_LOG is unset
    #[arg(long, default_value = "info,tower_http=debug")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _logging = init_tracing(&LoggingConfig {
        level: args.log_level.clone(),
        file: None,
    })
    .context("Failed to initialize logging")?;

    info!("Starting mosaic-tiles v{}", env!("CARGO_PKG_VERSION"));

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", args.host, args.port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!("mosaic-tiles listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, mosaic_tiles::build_router())
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
            warn!("Failed to install Ctrl+C handler: {}", e);
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
