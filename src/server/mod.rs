//! HTTP adapter: the extract-and-bill operation as a JSON endpoint.

pub mod error;
pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::core::vision::VisionClient;

/// Read-only state shared by every request.
#[derive(Clone)]
pub struct AppState {
    /// Client for downloading meter images
    pub http: reqwest::Client,
    pub vision: Arc<dyn VisionClient>,
    /// Body limit for multipart uploads; axum's 2 MB default is too small for photos
    pub max_upload_bytes: usize,
}

pub fn router(state: AppState) -> Router {
    let upload_limit = state.max_upload_bytes;
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/upload-analyze",
            post(handlers::analyze_upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/upload-analyze/{*rest}", get(handlers::analyze_url))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(state: AppState, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
