use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tansaku::net::HttpTransport;
use tansaku::prelude::*;
use tansaku::server::{self, AppState};
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Torznab bridge for DMHY and ACG.RIP RSS feeds.
#[derive(Debug, Parser)]
#[command(name = "tansaku-server", version, about)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "TANSAKU_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, overrides `server.host`
    #[arg(long)]
    host: Option<String>,

    /// Listen port, overrides `server.port`
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tansaku=info")))
        .with_target(true)
        .init();

    let args = Args::parse();
    let mut config = Config::load(args.config.as_deref()).context("failed to load configuration")?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let indexers = Indexers::from_config(&config, Arc::new(HttpTransport::new()))
        .context("failed to build indexers")?;
    info!(indexers = ?indexers.list_ids(), "indexers ready");

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid listen address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(%addr, "tansaku listening");

    let app = server::router(AppState::new(indexers, config.server.title.clone()));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C"),
        _ = terminate => info!("received SIGTERM"),
    }
}
