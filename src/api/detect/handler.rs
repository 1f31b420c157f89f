// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection endpoint handler

use axum::extract::rejection::JsonRejection;
use axum::{extract::State, Json};
use tracing::{info, warn};

use super::request::DetectRequest;
use super::response::DetectResponse;
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::pipeline::run_detection;
use crate::vision::decode_base64_image;

/// POST /detect - Run object detection on a base64-encoded image
///
/// # Request
/// - `image`: Base64-encoded image data, bare or as a data URI (required)
///
/// # Response
/// - `success`: always true on the success path
/// - `detections`: whitelisted boxes with label, confidence, and pixel bbox
/// - `annotated_image`: input frame with boxes drawn, as a JPEG data URI
/// - `stats`: object count, distinct labels, average confidence, elapsed time
///
/// # Errors
/// - 400 Bad Request: unparseable body, missing `image` field, or
///   undecodable payload
/// - 503 Service Unavailable: model not loaded
/// - 500 Internal Server Error: inference or encoding failed
pub async fn detect_handler(
    State(state): State<AppState>,
    payload: Result<Json<DetectRequest>, JsonRejection>,
) -> Result<Json<DetectResponse>, ApiError> {
    let detector = state.detector.as_ref().ok_or_else(|| {
        warn!("Detection requested without a loaded model");
        ApiError::ServiceUnavailable("Modelo YOLO não está carregado".to_string())
    })?;

    // A body axum could not parse as JSON still gets the uniform error shape
    let Json(request) = payload.map_err(|e| {
        warn!("Malformed detection request body: {}", e);
        ApiError::InvalidRequest("Erro ao processar requisição".to_string())
    })?;

    let payload = request.validate().map_err(|e| {
        warn!("Detection request without image payload");
        e
    })?;

    let (image, info) = decode_base64_image(payload).map_err(|e| {
        warn!("Failed to decode image: {}", e);
        ApiError::InvalidRequest("Erro ao processar imagem".to_string())
    })?;

    info!(
        "Detect request: {}x{} image, {} bytes",
        info.width, info.height, info.size_bytes
    );

    let outcome = run_detection(detector.as_ref(), &state.classes, &image).map_err(|e| {
        warn!("Detection pipeline failed: {}", e);
        ApiError::InternalError(format!("Erro interno: {e}"))
    })?;

    Ok(Json(DetectResponse::from(outcome)))
}
