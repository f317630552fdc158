use anyhow::{Context, Result};
use log::info;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::perplexity::Perplexity;
use crate::server::router;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;

/// Runs the API and web UI until Ctrl-C.
#[tracing::instrument(skip(config))]
pub async fn serve(config: Config, addr: SocketAddr) -> Result<()> {
    let api = Perplexity::from_config(&config)?;
    let app = router(Arc::new(api));

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    let local = listener.local_addr()?;
    info!("Aurora listening on http://{} (UI at /, API at /api)", local);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Aurora stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
