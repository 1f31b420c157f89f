// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection response types

use serde::{Deserialize, Serialize};

use crate::pipeline::{Detection, DetectionOutcome, DetectionStats};

/// Response from a successful detection run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectResponse {
    pub success: bool,
    pub detections: Vec<Detection>,
    /// Annotated frame as a `data:image/jpeg;base64,` URI
    pub annotated_image: String,
    pub stats: DetectionStats,
}

impl From<DetectionOutcome> for DetectResponse {
    fn from(outcome: DetectionOutcome) -> Self {
        Self {
            success: true,
            detections: outcome.detections,
            annotated_image: outcome.annotated_image,
            stats: outcome.stats,
        }
    }
}
