// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod classes;
pub mod config;
pub mod detector;
pub mod pipeline;
pub mod version;
pub mod vision;

// Re-export main types
pub use api::{build_router, start_server, ApiError, AppState, DetectRequest, DetectResponse};
pub use classes::ClassMap;
pub use config::NodeConfig;
pub use detector::{ObjectDetector, RawDetection, YoloDetector};
pub use pipeline::{run_detection, Detection, DetectionOutcome, DetectionStats};
