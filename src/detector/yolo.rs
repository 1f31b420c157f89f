// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLOv8 ONNX detection backend
//!
//! Runs the yolov8n model through ONNX Runtime on CPU. Input frames are
//! letterboxed to 640x640; the raw `[1, 4 + classes, anchors]` output is
//! decoded with a per-anchor class argmax and reduced by greedy NMS before
//! the boxes are mapped back to source pixel coordinates.

use anyhow::{Context, Result};
use image::{imageops, Rgb, RgbImage};
use ndarray::{Array4, ArrayViewD, IxDyn};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::{ObjectDetector, RawDetection};

/// Expected model input size (square)
pub const YOLO_INPUT_SIZE: u32 = 640;

/// Raw score floor applied while decoding the output tensor. The pipeline
/// applies the stricter surface threshold on top of this.
const RAW_CONFIDENCE_FLOOR: f32 = 0.25;

/// IoU threshold for greedy non-maximum suppression
const NMS_IOU_THRESHOLD: f32 = 0.45;

/// Letterbox padding fill value (Ultralytics convention)
const PAD_COLOR: u8 = 114;

/// YOLOv8 detector backed by an ONNX Runtime session
pub struct YoloDetector {
    /// ONNX Runtime session (run requires exclusive access)
    session: Arc<Mutex<Session>>,
    /// Model input name
    input_name: String,
}

impl std::fmt::Debug for YoloDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoloDetector")
            .field("input_name", &self.input_name)
            .finish_non_exhaustive()
    }
}

impl YoloDetector {
    /// Load the YOLO model from an ONNX weights file
    ///
    /// # Errors
    /// Returns error if:
    /// - Weights file not found
    /// - ONNX Runtime initialization fails
    pub fn new<P: AsRef<Path>>(weights_path: P) -> Result<Self> {
        let weights_path = weights_path.as_ref();

        if !weights_path.exists() {
            anyhow::bail!("YOLO weights not found: {}", weights_path.display());
        }

        info!("Loading YOLO model from {}", weights_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(4)
            .context("Failed to set intra threads")?
            .commit_from_file(weights_path)
            .context(format!(
                "Failed to load YOLO model from {}",
                weights_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());

        debug!("YOLO model loaded - input: {}", input_name);

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
        })
    }

    /// Letterbox the frame to 640x640 and build a normalized NCHW tensor.
    ///
    /// Returns the tensor together with the scale and padding needed to map
    /// box coordinates back to the source image.
    fn preprocess(&self, image: &RgbImage) -> (Array4<f32>, f32, f32, f32) {
        let (orig_w, orig_h) = (image.width() as f32, image.height() as f32);
        let size = YOLO_INPUT_SIZE as f32;

        let scale = (size / orig_w).min(size / orig_h);
        let new_w = ((orig_w * scale).round() as u32).max(1);
        let new_h = ((orig_h * scale).round() as u32).max(1);
        let pad_x = (size - new_w as f32) / 2.0;
        let pad_y = (size - new_h as f32) / 2.0;

        let resized = imageops::resize(image, new_w, new_h, imageops::FilterType::Triangle);
        let mut canvas = RgbImage::from_pixel(
            YOLO_INPUT_SIZE,
            YOLO_INPUT_SIZE,
            Rgb([PAD_COLOR, PAD_COLOR, PAD_COLOR]),
        );
        imageops::overlay(&mut canvas, &resized, pad_x as i64, pad_y as i64);

        let mut input = Array4::<f32>::zeros((
            1,
            3,
            YOLO_INPUT_SIZE as usize,
            YOLO_INPUT_SIZE as usize,
        ));
        for (x, y, pixel) in canvas.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            input[[0, 0, y, x]] = pixel[0] as f32 / 255.0;
            input[[0, 1, y, x]] = pixel[1] as f32 / 255.0;
            input[[0, 2, y, x]] = pixel[2] as f32 / 255.0;
        }

        (input, scale, pad_x, pad_y)
    }

    /// Decode the `[1, 4 + classes, anchors]` output tensor into candidate
    /// boxes in source pixel coordinates.
    fn parse_output(
        &self,
        output: ArrayViewD<f32>,
        scale: f32,
        pad_x: f32,
        pad_y: f32,
        orig_w: f32,
        orig_h: f32,
    ) -> Result<Vec<RawDetection>> {
        let shape = output.shape();
        if shape.len() != 3 || shape[0] != 1 || shape[1] <= 4 {
            anyhow::bail!(
                "Unexpected YOLO output shape: {:?}, expected [1, 4 + classes, anchors]",
                shape
            );
        }

        let num_classes = shape[1] - 4;
        let num_anchors = shape[2];
        let mut candidates = Vec::new();

        for a in 0..num_anchors {
            let mut best_class = 0usize;
            let mut best_score = 0.0f32;
            for c in 0..num_classes {
                let score = output[IxDyn(&[0, 4 + c, a])];
                if score > best_score {
                    best_score = score;
                    best_class = c;
                }
            }

            if best_score < RAW_CONFIDENCE_FLOOR {
                continue;
            }

            let cx = output[IxDyn(&[0, 0, a])];
            let cy = output[IxDyn(&[0, 1, a])];
            let w = output[IxDyn(&[0, 2, a])];
            let h = output[IxDyn(&[0, 3, a])];

            // De-letterbox back to source pixels
            let x1 = ((cx - w / 2.0 - pad_x) / scale).clamp(0.0, orig_w);
            let y1 = ((cy - h / 2.0 - pad_y) / scale).clamp(0.0, orig_h);
            let x2 = ((cx + w / 2.0 - pad_x) / scale).clamp(0.0, orig_w);
            let y2 = ((cy + h / 2.0 - pad_y) / scale).clamp(0.0, orig_h);

            if x2 <= x1 || y2 <= y1 {
                continue;
            }

            candidates.push(RawDetection {
                class_id: best_class as u32,
                confidence: best_score,
                bbox: [x1, y1, x2, y2],
            });
        }

        Ok(nms_filter(candidates, NMS_IOU_THRESHOLD))
    }
}

impl ObjectDetector for YoloDetector {
    fn detect(&self, image: &RgbImage) -> Result<Vec<RawDetection>> {
        let (orig_w, orig_h) = (image.width() as f32, image.height() as f32);
        let (input, scale, pad_x, pad_y) = self.preprocess(image);

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("YOLO session lock poisoned"))?;

        let input_value = Value::from_array(input).context("Failed to create input tensor")?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("YOLO inference failed")?;

        let output_tensor = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        let detections =
            self.parse_output(output_tensor.view(), scale, pad_x, pad_y, orig_w, orig_h)?;

        debug!("YOLO returned {} candidate boxes", detections.len());

        Ok(detections)
    }
}

/// Greedy class-aware non-maximum suppression
fn nms_filter(mut candidates: Vec<RawDetection>, iou_threshold: f32) -> Vec<RawDetection> {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut kept: Vec<RawDetection> = Vec::new();
    'outer: for candidate in candidates {
        for existing in &kept {
            if existing.class_id == candidate.class_id
                && iou(&candidate.bbox, &existing.bbox) >= iou_threshold
            {
                continue 'outer;
            }
        }
        kept.push(candidate);
    }
    kept
}

/// Intersection over union of two `[x1, y1, x2, y2]` boxes
fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let ix1 = a[0].max(b[0]);
    let iy1 = a[1].max(b[1]);
    let ix2 = a[2].min(b[2]);
    let iy2 = a[3].min(b[3]);

    let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
    if inter <= 0.0 {
        return 0.0;
    }

    let area_a = (a[2] - a[0]).max(0.0) * (a[3] - a[1]).max(0.0);
    let area_b = (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0);
    inter / (area_a + area_b - inter)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(class_id: u32, confidence: f32, bbox: [f32; 4]) -> RawDetection {
        RawDetection {
            class_id,
            confidence,
            bbox,
        }
    }

    #[test]
    fn test_iou_disjoint_boxes() {
        assert_eq!(iou(&[0.0, 0.0, 10.0, 10.0], &[20.0, 20.0, 30.0, 30.0]), 0.0);
    }

    #[test]
    fn test_iou_identical_boxes() {
        let b = [5.0, 5.0, 15.0, 25.0];
        assert!((iou(&b, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_nms_suppresses_overlapping_same_class() {
        let kept = nms_filter(
            vec![
                det(2, 0.9, [0.0, 0.0, 10.0, 10.0]),
                det(2, 0.6, [1.0, 1.0, 11.0, 11.0]),
            ],
            0.45,
        );
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].confidence, 0.9);
    }

    #[test]
    fn test_nms_keeps_overlapping_different_classes() {
        let kept = nms_filter(
            vec![
                det(2, 0.9, [0.0, 0.0, 10.0, 10.0]),
                det(7, 0.6, [1.0, 1.0, 11.0, 11.0]),
            ],
            0.45,
        );
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_nms_keeps_distant_same_class() {
        let kept = nms_filter(
            vec![
                det(0, 0.8, [0.0, 0.0, 10.0, 10.0]),
                det(0, 0.7, [100.0, 100.0, 110.0, 110.0]),
            ],
            0.45,
        );
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_missing_weights_file_is_an_error() {
        let result = YoloDetector::new("./does/not/exist.onnx");
        assert!(result.is_err());
    }
}
