// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP surface: application state, router, and listener

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::api::detect::detect_handler;
use crate::api::errors::ApiError;
use crate::api::handlers::{classes_handler, health_handler, stats_handler};
use crate::classes::ClassMap;
use crate::detector::ObjectDetector;

/// Application context built once at startup and injected into every handler.
///
/// Everything here is read-only after construction; handlers share it through
/// cheap `Arc` clones with no locking.
#[derive(Clone)]
pub struct AppState {
    /// Loaded inference capability, absent when startup loading failed
    pub detector: Option<Arc<dyn ObjectDetector>>,
    /// Fixed class whitelist
    pub classes: Arc<ClassMap>,
}

impl AppState {
    pub fn new(detector: Option<Arc<dyn ObjectDetector>>) -> Self {
        Self {
            detector,
            classes: Arc::new(ClassMap::default()),
        }
    }

    /// Whether the inference capability is available.
    pub fn is_loaded(&self) -> bool {
        self.detector.is_some()
    }
}

/// Build the router with all endpoints and the permissive CORS layer.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/detect", post(detect_handler))
        .route("/classes", get(classes_handler))
        .route("/stats", get(stats_handler))
        .fallback(fallback_handler)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Bind the listener and serve until the process exits.
pub async fn start_server(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("API server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn fallback_handler() -> ApiError {
    ApiError::NotFound("Endpoint não encontrado".to_string())
}
