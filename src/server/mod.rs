//! HTTP control surface and realtime channel.

pub mod server;
mod state;
mod ws;

pub use server::make_app;
pub use state::ServerState;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Bind and serve the control surface until the token is cancelled.
pub async fn run_server(
    state: ServerState,
    bind_address: &str,
    port: u16,
    cancel: CancellationToken,
) -> Result<()> {
    let addr: SocketAddr = format!("{bind_address}:{port}")
        .parse()
        .with_context(|| format!("invalid bind address {bind_address}:{port}"))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding control surface to {addr}"))?;
    info!(%addr, "control surface listening");

    let app = make_app(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .context("control surface server failed")
}
