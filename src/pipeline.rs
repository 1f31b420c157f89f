// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection request pipeline
//!
//! Orchestrates a single request: invoke the detector on the full grid,
//! filter candidates against the class whitelist and confidence threshold,
//! draw annotations on a working copy, compute summary statistics, and
//! re-encode the annotated frame.

use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Instant;
use thiserror::Error;
use tracing::info;

use crate::classes::ClassMap;
use crate::detector::ObjectDetector;
use crate::vision::{encode_annotated_image, Annotator, ImageError};

/// Detections at or below this confidence are not surfaced.
pub const CONFIDENCE_THRESHOLD: f32 = 0.3;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Failed to encode annotated image: {0}")]
    Encode(#[from] ImageError),
}

/// Axis-aligned box in source pixel coordinates, floor-truncated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

/// A qualifying detection surfaced to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    /// Display label from the class whitelist
    #[serde(rename = "class")]
    pub class_label: String,
    /// Confidence score, rounded to 3 decimals
    pub confidence: f64,
    pub bbox: BoundingBox,
}

/// Summary statistics over one pipeline invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionStats {
    pub total_objects: usize,
    /// Distinct labels present, in first-seen order
    pub classes_found: Vec<String>,
    /// Mean of surfaced confidences, rounded to 3 decimals; 0 when empty
    pub avg_confidence: f64,
    /// Wall-clock seconds for the whole pipeline invocation
    pub processing_time: f64,
}

/// Everything the `/detect` handler needs to shape its response.
#[derive(Debug, Clone)]
pub struct DetectionOutcome {
    pub detections: Vec<Detection>,
    pub annotated_image: String,
    pub stats: DetectionStats,
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Run the full detection pipeline on a decoded frame.
///
/// Candidates are processed in the order the detector returned them; no
/// re-sorting is performed. A candidate is kept only if its class id is in
/// the whitelist and its confidence strictly exceeds the threshold.
pub fn run_detection(
    detector: &dyn ObjectDetector,
    classes: &ClassMap,
    image: &RgbImage,
) -> Result<DetectionOutcome, PipelineError> {
    let started = Instant::now();

    info!(
        "Starting detection on {}x{} image",
        image.width(),
        image.height()
    );

    let candidates = detector
        .detect(image)
        .map_err(|e| PipelineError::Inference(format!("{e:#}")))?;

    // The embedded font is parsed once for the process lifetime
    static ANNOTATOR: OnceLock<Annotator> = OnceLock::new();
    let annotator = ANNOTATOR.get_or_init(Annotator::new);
    let mut annotated = image.clone();
    let mut detections = Vec::new();
    let mut classes_found: Vec<String> = Vec::new();

    for candidate in &candidates {
        if candidate.confidence <= CONFIDENCE_THRESHOLD {
            continue;
        }
        let Some(label) = classes.label_for(candidate.class_id) else {
            continue;
        };

        let [x1, y1, x2, y2] = candidate.bbox;
        let bbox = BoundingBox {
            x1: x1.floor() as i32,
            y1: y1.floor() as i32,
            x2: x2.floor() as i32,
            y2: y2.floor() as i32,
        };

        annotator.draw_detection(
            &mut annotated,
            (bbox.x1, bbox.y1, bbox.x2, bbox.y2),
            label,
            candidate.confidence,
        );

        if !classes_found.iter().any(|c| c.as_str() == label) {
            classes_found.push(label.to_string());
        }

        detections.push(Detection {
            class_label: label.to_string(),
            confidence: round3(candidate.confidence as f64),
            bbox,
        });
    }

    let avg_confidence = if detections.is_empty() {
        0.0
    } else {
        round3(detections.iter().map(|d| d.confidence).sum::<f64>() / detections.len() as f64)
    };

    let annotated_image = encode_annotated_image(&annotated)?;

    let stats = DetectionStats {
        total_objects: detections.len(),
        classes_found,
        avg_confidence,
        processing_time: started.elapsed().as_secs_f64(),
    };

    info!(
        "Detection complete: {} objects in {:.2}s",
        stats.total_objects, stats.processing_time
    );

    Ok(DetectionOutcome {
        detections,
        annotated_image,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::RawDetection;
    use anyhow::Result;
    use image::Rgb;

    /// Detector double returning a scripted candidate list.
    struct ScriptedDetector {
        candidates: Vec<RawDetection>,
        fail: bool,
    }

    impl ScriptedDetector {
        fn returning(candidates: Vec<RawDetection>) -> Self {
            Self {
                candidates,
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                candidates: Vec::new(),
                fail: true,
            }
        }
    }

    impl ObjectDetector for ScriptedDetector {
        fn detect(&self, _image: &RgbImage) -> Result<Vec<RawDetection>> {
            if self.fail {
                anyhow::bail!("backend exploded");
            }
            Ok(self.candidates.clone())
        }
    }

    fn test_image() -> RgbImage {
        RgbImage::from_pixel(120, 80, Rgb([90, 90, 90]))
    }

    fn candidate(class_id: u32, confidence: f32, bbox: [f32; 4]) -> RawDetection {
        RawDetection {
            class_id,
            confidence,
            bbox,
        }
    }

    #[test]
    fn test_keeps_whitelisted_confident_candidate() {
        let detector =
            ScriptedDetector::returning(vec![candidate(2, 0.75, [10.0, 20.0, 60.0, 70.0])]);
        let outcome = run_detection(&detector, &ClassMap::default(), &test_image()).unwrap();

        assert_eq!(outcome.detections.len(), 1);
        let detection = &outcome.detections[0];
        assert_eq!(detection.class_label, "carro");
        assert_eq!(detection.confidence, 0.75);
        assert_eq!(
            detection.bbox,
            BoundingBox {
                x1: 10,
                y1: 20,
                x2: 60,
                y2: 70
            }
        );
        assert_eq!(outcome.stats.total_objects, 1);
        assert_eq!(outcome.stats.classes_found, vec!["carro".to_string()]);
        assert!(outcome.annotated_image.starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn test_drops_low_confidence_candidates() {
        // Exactly at the threshold is excluded: the bound is strict
        let detector = ScriptedDetector::returning(vec![
            candidate(2, 0.3, [10.0, 10.0, 30.0, 30.0]),
            candidate(2, 0.1, [40.0, 10.0, 60.0, 30.0]),
        ]);
        let outcome = run_detection(&detector, &ClassMap::default(), &test_image()).unwrap();

        assert!(outcome.detections.is_empty());
        assert_eq!(outcome.stats.total_objects, 0);
        assert_eq!(outcome.stats.avg_confidence, 0.0);
    }

    #[test]
    fn test_drops_unmapped_class_ids() {
        // COCO id 13 (bench) is outside the whitelist and dropped silently
        let detector = ScriptedDetector::returning(vec![
            candidate(13, 0.95, [10.0, 10.0, 30.0, 30.0]),
            candidate(7, 0.8, [40.0, 10.0, 90.0, 60.0]),
        ]);
        let outcome = run_detection(&detector, &ClassMap::default(), &test_image()).unwrap();

        assert_eq!(outcome.detections.len(), 1);
        assert_eq!(outcome.detections[0].class_label, "caminhão");
    }

    #[test]
    fn test_avg_confidence_is_rounded_mean() {
        let detector = ScriptedDetector::returning(vec![
            candidate(0, 0.5, [0.0, 0.0, 10.0, 10.0]),
            candidate(2, 0.8, [20.0, 0.0, 40.0, 10.0]),
        ]);
        let outcome = run_detection(&detector, &ClassMap::default(), &test_image()).unwrap();

        assert_eq!(outcome.stats.avg_confidence, 0.65);
        assert_eq!(outcome.stats.classes_found.len(), 2);
    }

    #[test]
    fn test_confidence_rounded_to_three_decimals() {
        let detector =
            ScriptedDetector::returning(vec![candidate(2, 0.87654, [5.0, 5.0, 25.0, 25.0])]);
        let outcome = run_detection(&detector, &ClassMap::default(), &test_image()).unwrap();
        assert_eq!(outcome.detections[0].confidence, 0.877);
    }

    #[test]
    fn test_coordinates_are_floor_truncated() {
        let detector =
            ScriptedDetector::returning(vec![candidate(8, 0.6, [10.9, 20.7, 60.2, 70.99])]);
        let outcome = run_detection(&detector, &ClassMap::default(), &test_image()).unwrap();
        assert_eq!(
            outcome.detections[0].bbox,
            BoundingBox {
                x1: 10,
                y1: 20,
                x2: 60,
                y2: 70
            }
        );
    }

    #[test]
    fn test_candidate_order_is_preserved() {
        let detector = ScriptedDetector::returning(vec![
            candidate(8, 0.4, [0.0, 0.0, 10.0, 10.0]),
            candidate(2, 0.9, [20.0, 0.0, 30.0, 10.0]),
            candidate(8, 0.6, [40.0, 0.0, 50.0, 10.0]),
        ]);
        let outcome = run_detection(&detector, &ClassMap::default(), &test_image()).unwrap();

        let labels: Vec<_> = outcome
            .detections
            .iter()
            .map(|d| d.class_label.as_str())
            .collect();
        assert_eq!(labels, vec!["barco", "carro", "barco"]);
        // Distinct labels in first-seen order
        assert_eq!(
            outcome.stats.classes_found,
            vec!["barco".to_string(), "carro".to_string()]
        );
    }

    #[test]
    fn test_empty_result_still_returns_annotated_image() {
        let detector = ScriptedDetector::returning(vec![]);
        let outcome = run_detection(&detector, &ClassMap::default(), &test_image()).unwrap();

        assert!(outcome.detections.is_empty());
        assert_eq!(outcome.stats.avg_confidence, 0.0);
        assert!(outcome.annotated_image.starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn test_repeated_invocations_share_the_annotator() {
        // The annotator is initialized once; later runs must annotate the same way
        let detector =
            ScriptedDetector::returning(vec![candidate(2, 0.75, [10.0, 20.0, 60.0, 70.0])]);
        let first = run_detection(&detector, &ClassMap::default(), &test_image()).unwrap();
        let second = run_detection(&detector, &ClassMap::default(), &test_image()).unwrap();

        assert_eq!(first.detections.len(), second.detections.len());
        assert_eq!(first.annotated_image, second.annotated_image);
    }

    #[test]
    fn test_inference_failure_maps_to_pipeline_error() {
        let detector = ScriptedDetector::failing();
        let result = run_detection(&detector, &ClassMap::default(), &test_image());
        assert!(matches!(result, Err(PipelineError::Inference(_))));
    }

    #[test]
    fn test_detection_serializes_class_field() {
        let detection = Detection {
            class_label: "carro".to_string(),
            confidence: 0.75,
            bbox: BoundingBox {
                x1: 1,
                y1: 2,
                x2: 3,
                y2: 4,
            },
        };
        let json = serde_json::to_string(&detection).unwrap();
        assert!(json.contains("\"class\":\"carro\""));
        assert!(json.contains("\"x1\":1"));
    }
}
