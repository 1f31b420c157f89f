// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image codec for the detection pipeline
//!
//! Inbound payloads are base64 strings, optionally carrying a
//! `data:<mime>;base64,` prefix. Outbound annotated frames are re-encoded as
//! JPEG and returned as a data URI.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, RgbImage};
use thiserror::Error;

/// Maximum image size (10MB)
const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

/// JPEG quality for the annotated response image.
pub const JPEG_QUALITY: u8 = 85;

/// Custom error types for image processing
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Image data is too large: {0} bytes (max: {1} bytes)")]
    TooLarge(usize, usize),

    #[error("Invalid base64 encoding: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("Unsupported image format")]
    UnsupportedFormat,

    #[error("Failed to decode image: {0}")]
    DecodeFailed(String),

    #[error("Image data is empty")]
    EmptyData,

    #[error("Failed to encode image: {0}")]
    EncodeFailed(String),
}

/// Image information extracted during loading
#[derive(Debug, Clone)]
pub struct ImageInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Detected format
    pub format: ImageFormat,
    /// Size in bytes
    pub size_bytes: usize,
}

/// Decode a base64-encoded image payload into a 3-channel RGB grid
///
/// Accepts either bare base64 or a data URI; everything up to and including
/// the first comma is stripped before decoding.
///
/// # Returns
/// * `Ok((RgbImage, ImageInfo))` - The decoded image and metadata
/// * `Err(ImageError)` - Malformed base64, unparseable bytes, or an
///   unsupported container format. Callers treat all of these as client
///   input errors.
pub fn decode_base64_image(payload: &str) -> Result<(RgbImage, ImageInfo), ImageError> {
    // Strip a data-URI prefix ("data:image/png;base64,....") if present
    let base64_str = match payload.split_once(',') {
        Some((_, rest)) => rest,
        None => payload,
    };

    if base64_str.is_empty() {
        return Err(ImageError::EmptyData);
    }

    let bytes = STANDARD.decode(base64_str)?;

    if bytes.len() > MAX_IMAGE_SIZE {
        return Err(ImageError::TooLarge(bytes.len(), MAX_IMAGE_SIZE));
    }

    if bytes.is_empty() {
        return Err(ImageError::EmptyData);
    }

    // Detect format from magic bytes
    let format = detect_format(&bytes)?;

    let img = image::load_from_memory_with_format(&bytes, format)
        .map_err(|e| ImageError::DecodeFailed(e.to_string()))?;

    let info = ImageInfo {
        width: img.width(),
        height: img.height(),
        format,
        size_bytes: bytes.len(),
    };

    tracing::debug!(
        "Decoded image: {}x{}, {} bytes ({:?})",
        info.width,
        info.height,
        info.size_bytes,
        info.format
    );

    // Normalize to 3-channel RGB regardless of the source color type
    Ok((img.to_rgb8(), info))
}

/// Encode an annotated RGB grid as a JPEG data URI
///
/// The grid is serialized at fixed quality 85, base64-encoded, and prefixed
/// with `data:image/jpeg;base64,`. Fails on an empty grid; since encoding
/// runs after successful inference this surfaces as a server error.
pub fn encode_annotated_image(image: &RgbImage) -> Result<String, ImageError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(ImageError::EmptyData);
    }

    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY)
        .encode_image(image)
        .map_err(|e| ImageError::EncodeFailed(e.to_string()))?;

    Ok(format!(
        "data:image/jpeg;base64,{}",
        STANDARD.encode(&bytes)
    ))
}

/// Detect image format from magic bytes
///
/// # Returns
/// * `Ok(ImageFormat)` - Detected format
/// * `Err(ImageError::UnsupportedFormat)` - If format cannot be detected
pub fn detect_format(bytes: &[u8]) -> Result<ImageFormat, ImageError> {
    if bytes.len() < 4 {
        return Err(ImageError::UnsupportedFormat);
    }

    match bytes {
        // PNG: 89 50 4E 47 (0x89 P N G)
        [0x89, 0x50, 0x4E, 0x47, ..] => Ok(ImageFormat::Png),

        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Ok(ImageFormat::Jpeg),

        // WebP: RIFF .... WEBP
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Ok(ImageFormat::WebP),

        // GIF: GIF87a or GIF89a
        [0x47, 0x49, 0x46, 0x38, x, ..] if *x == 0x37 || *x == 0x39 => Ok(ImageFormat::Gif),

        // BMP: BM
        [0x42, 0x4D, ..] => Ok(ImageFormat::Bmp),

        // TIFF: II (little-endian) or MM (big-endian)
        [0x49, 0x49, 0x2A, 0x00, ..] | [0x4D, 0x4D, 0x00, 0x2A, ..] => Ok(ImageFormat::Tiff),

        _ => Err(ImageError::UnsupportedFormat),
    }
}
