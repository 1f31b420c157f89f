// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection request type and validation

use serde::{Deserialize, Serialize};

use crate::api::errors::ApiError;

/// Request for object detection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectRequest {
    /// Base64-encoded image data, optionally as a data URI
    #[serde(default)]
    pub image: Option<String>,
}

impl DetectRequest {
    /// Validate the detection request before it reaches the pipeline
    pub fn validate(&self) -> Result<&str, ApiError> {
        match self.image.as_deref() {
            Some(image) if !image.is_empty() => Ok(image),
            _ => Err(ApiError::InvalidRequest("Imagem não fornecida".to_string())),
        }
    }
}
