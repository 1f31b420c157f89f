// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Status endpoint handlers: /health, /classes, /stats

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::api::http_server::AppState;

/// Payload for GET /health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub model_loaded: bool,
    pub timestamp: String,
    pub classes_available: usize,
}

/// Payload for GET /classes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassesResponse {
    pub classes: BTreeMap<u32, String>,
    pub total_classes: usize,
    pub model_loaded: bool,
}

/// Payload for GET /stats
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub model_loaded: bool,
    pub uptime: String,
    pub total_classes: usize,
    pub classes: Vec<String>,
}

/// GET /health - Readiness probe
///
/// Returns 200 when the model is loaded and 503 otherwise, independent of
/// request history.
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let loaded = state.is_loaded();
    let (status, message) = if loaded {
        ("ok", "Servidor YOLO está funcionando")
    } else {
        ("model_not_loaded", "Modelo YOLO não carregado")
    };

    let response = HealthResponse {
        status: status.to_string(),
        message: message.to_string(),
        model_loaded: loaded,
        timestamp: Utc::now().to_rfc3339(),
        classes_available: state.classes.len(),
    };

    let code = if loaded {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(response))
}

/// GET /classes - The fixed set of detectable classes
pub async fn classes_handler(State(state): State<AppState>) -> Json<ClassesResponse> {
    let classes = state
        .classes
        .entries()
        .iter()
        .map(|(&id, &label)| (id, label.to_string()))
        .collect();

    Json(ClassesResponse {
        classes,
        total_classes: state.classes.len(),
        model_loaded: state.is_loaded(),
    })
}

/// GET /stats - Node status summary
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        model_loaded: state.is_loaded(),
        uptime: Utc::now().to_rfc3339(),
        total_classes: state.classes.len(),
        classes: state
            .classes
            .labels()
            .into_iter()
            .map(str::to_string)
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "ok".to_string(),
            message: "Servidor YOLO está funcionando".to_string(),
            model_loaded: true,
            timestamp: "2025-01-01T00:00:00+00:00".to_string(),
            classes_available: 20,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"ok\""));
        assert!(json.contains("\"classes_available\":20"));
    }

    #[test]
    fn test_classes_response_uses_string_keys_on_the_wire() {
        let mut classes = BTreeMap::new();
        classes.insert(2u32, "carro".to_string());
        let response = ClassesResponse {
            classes,
            total_classes: 1,
            model_loaded: false,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"2\":\"carro\""));
    }
}
