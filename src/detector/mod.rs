// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Object detection capability
//!
//! The pipeline consumes detection through the [`ObjectDetector`] trait so the
//! concrete backend stays swappable; the node ships a YOLOv8 ONNX backend.

pub mod yolo;

use anyhow::Result;
use image::RgbImage;

pub use yolo::YoloDetector;

/// A raw candidate box as returned by the inference capability, in source
/// image pixel coordinates. Whitelist and threshold filtering happen later,
/// in the pipeline.
#[derive(Debug, Clone)]
pub struct RawDetection {
    /// Detector class id (COCO indexing for the shipped backend)
    pub class_id: u32,
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
    /// Corner coordinates [x1, y1, x2, y2]
    pub bbox: [f32; 4],
}

/// A pretrained detector: given an RGB grid, returns zero or more candidate
/// boxes. Order of the returned boxes is not meaningful.
pub trait ObjectDetector: Send + Sync {
    fn detect(&self, image: &RgbImage) -> Result<Vec<RawDetection>>;
}
