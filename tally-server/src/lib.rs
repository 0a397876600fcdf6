//! HTTP + WebSocket surface for the overlay widget.
//!
//! Three routes: the widget document itself, the follower-count API it
//! polls, and the persistent channel it listens on for follow notices.
//! CORS is wide open — the widget is meant to be embeddable from anywhere
//! (streaming software, a browser source, a separate host).
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;

pub mod routes;
pub mod state;
pub mod ws;

pub use state::AppState;

/// Build the application router with all routes and middleware.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(routes::widget))
        .route("/api/followers/:creator", get(routes::followers))
        .route("/ws", get(ws::upgrade))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until the shutdown channel fires.
pub async fn serve(
    addr: SocketAddr,
    state: Arc<AppState>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("server shutting down");
        })
        .await
        .context("server error")?;
    Ok(())
}
