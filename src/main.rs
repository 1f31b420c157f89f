// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use satvision_node::{
    api::{start_server, AppState},
    config::NodeConfig,
    detector::YoloDetector,
};
use std::{env, sync::Arc};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    info!(
        "Starting Satvision node {} ({})",
        satvision_node::version::VERSION,
        satvision_node::version::BUILD_DATE
    );

    let config = NodeConfig::default();

    // Best-effort model load: a missing model degrades /detect to 503 but
    // never prevents the server from starting.
    let detector = match YoloDetector::new(&config.weights_path) {
        Ok(detector) => {
            info!("YOLO model loaded from {}", config.weights_path.display());
            Some(Arc::new(detector) as Arc<dyn satvision_node::detector::ObjectDetector>)
        }
        Err(e) => {
            error!(
                "Failed to load YOLO model, serving without detection: {:#}",
                e
            );
            None
        }
    };

    let state = AppState::new(detector);

    info!("Detectable classes: {}", state.classes.len());
    info!("Server available at http://{}", config.bind_addr);

    start_server(state, config.bind_addr).await
}
