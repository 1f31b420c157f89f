// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Box and label drawing for annotated response images

use ab_glyph::{FontRef, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

const LABEL_FONT_SIZE: f32 = 18.0;
const LABEL_OFFSET_Y: i32 = 10;
const BOX_THICKNESS: i32 = 2;
const ANNOTATION_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

const FONT_DATA: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

/// Draws detection rectangles and confidence labels onto a working copy.
pub struct Annotator {
    font: FontRef<'static>,
    scale: PxScale,
}

impl Annotator {
    pub fn new() -> Self {
        // The font is embedded at compile time, so this cannot fail at runtime
        let font = FontRef::try_from_slice(FONT_DATA).expect("embedded font is valid");
        Self {
            font,
            scale: PxScale::from(LABEL_FONT_SIZE),
        }
    }

    /// Draw a 2px rectangle outline with a `"<label>: <confidence>"` text
    /// placed just above the box's top-left corner.
    ///
    /// Coordinates are clamped to the image bounds for drawing only; callers
    /// report the unclamped box to the client. Degenerate boxes are skipped.
    pub fn draw_detection(
        &self,
        image: &mut RgbImage,
        bbox: (i32, i32, i32, i32),
        label: &str,
        confidence: f32,
    ) {
        let (width, height) = (image.width() as i32, image.height() as i32);
        if width == 0 || height == 0 {
            return;
        }
        let (x1, y1, x2, y2) = bbox;

        let x1 = x1.clamp(0, width - 1);
        let y1 = y1.clamp(0, height - 1);
        let x2 = x2.clamp(0, width - 1);
        let y2 = y2.clamp(0, height - 1);

        if x1 >= x2 || y1 >= y2 {
            return;
        }

        for t in 0..BOX_THICKNESS {
            let rect_w = x2 - x1 - 2 * t;
            let rect_h = y2 - y1 - 2 * t;
            if rect_w <= 0 || rect_h <= 0 {
                break;
            }
            let rect = Rect::at(x1 + t, y1 + t).of_size(rect_w as u32, rect_h as u32);
            draw_hollow_rect_mut(image, rect, ANNOTATION_COLOR);
        }

        let text = format!("{}: {:.2}", label, confidence);
        let text_y = (y1 - LABEL_OFFSET_Y).max(0);
        draw_text_mut(
            image,
            ANNOTATION_COLOR,
            x1,
            text_y,
            self.scale,
            &self.font,
            &text,
        );
    }
}

impl Default for Annotator {
    fn default() -> Self {
        Self::new()
    }
}
