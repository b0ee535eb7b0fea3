// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP server for the detection node

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use super::detect::detect_handler;
use super::handlers::health_handler;
use crate::config::DetectConfig;
use crate::vision::{DetectionModelManager, DetectionPipeline};

/// Shared state handed to every request
#[derive(Debug, Clone)]
pub struct AppState {
    pub pipeline: DetectionPipeline,
    /// Upper bound on a request body
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(pipeline: DetectionPipeline, max_upload_bytes: usize) -> Self {
        Self {
            pipeline,
            max_upload_bytes,
        }
    }

    pub fn from_manager(manager: DetectionModelManager, config: &DetectConfig) -> Self {
        Self::new(manager.into_pipeline(), config.max_upload_bytes)
    }
}

/// Build the router with all routes and layers
pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/detect", post(detect_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl+C
pub async fn start_server(state: Arc<AppState>, addr: &str) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    serve(listener, state).await
}

/// Serve on an already bound listener until Ctrl+C
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<()> {
    let local_addr = listener.local_addr()?;
    info!("Detection server listening on {}", local_addr);

    axum::serve(listener, create_app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Detection server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
