// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Whitelist of detector classes surfaced by the node
//!
//! The detector is trained on the full COCO label space; only the subset
//! relevant for satellite/aerial imagery is ever reported. Ids outside the
//! table are dropped silently, not treated as errors.

use std::collections::BTreeMap;

/// Detector class id → display label, keyed by the detector's COCO indexing.
const SATELLITE_CLASSES: &[(u32, &str)] = &[
    (0, "pessoa"),
    (1, "bicicleta"),
    (2, "carro"),
    (3, "motocicleta"),
    (4, "avião"),
    (5, "ônibus"),
    (6, "trem"),
    (7, "caminhão"),
    (8, "barco"),
    (9, "semáforo"),
    (14, "pássaro"),
    (15, "gato"),
    (16, "cachorro"),
    (17, "cavalo"),
    (18, "ovelha"),
    (19, "vaca"),
    (20, "elefante"),
    (21, "urso"),
    (22, "zebra"),
    (23, "girafa"),
];

/// Fixed class id → label table, built once at startup and shared read-only.
///
/// Decoupled from any particular detector's internal indexing: swapping
/// detectors only requires updating [`SATELLITE_CLASSES`].
#[derive(Debug, Clone)]
pub struct ClassMap {
    entries: BTreeMap<u32, &'static str>,
}

impl Default for ClassMap {
    fn default() -> Self {
        Self {
            entries: SATELLITE_CLASSES.iter().copied().collect(),
        }
    }
}

impl ClassMap {
    /// Whether the given detector class id is surfaced by this node.
    pub fn is_relevant(&self, class_id: u32) -> bool {
        self.entries.contains_key(&class_id)
    }

    /// Display label for a class id, if whitelisted.
    pub fn label_for(&self, class_id: u32) -> Option<&'static str> {
        self.entries.get(&class_id).copied()
    }

    /// Number of whitelisted classes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All display labels, in class-id order.
    pub fn labels(&self) -> Vec<&'static str> {
        self.entries.values().copied().collect()
    }

    /// The full id → label table, for the `/classes` payload.
    pub fn entries(&self) -> &BTreeMap<u32, &'static str> {
        &self.entries
    }
}
