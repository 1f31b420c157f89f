// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Node configuration
//!
//! The node deliberately exposes no CLI or environment configuration surface;
//! these values are a fixed table constructed once at startup.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Fixed configuration for the detection node.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Address the HTTP listener binds to.
    pub bind_addr: SocketAddr,
    /// Path to the ONNX weights file loaded at startup.
    pub weights_path: PathBuf,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5000".parse().expect("static bind address"),
            weights_path: PathBuf::from("./models/yolov8n.onnx"),
        }
    }
}
