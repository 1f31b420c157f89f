// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing module
//!
//! This module provides:
//! - Base64/data-URI image decode and JPEG re-encode
//! - Box and label drawing for annotated response images

pub mod annotate;
pub mod image_utils;

pub use annotate::Annotator;
pub use image_utils::{
    decode_base64_image, detect_format, encode_annotated_image, ImageError, ImageInfo,
};
