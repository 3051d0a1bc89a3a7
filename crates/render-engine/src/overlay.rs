//! Timestamp and label burn-in.
//!
//! Draws a semi-opaque plate in the top-left corner sized to the rendered
//! timestamp text, then the timestamp in white over it. An optional label
//! is drawn near the opposite corner without a plate. This is a pure
//! in-place transform of one frame; a missing font is reported at
//! construction and degrades the encode, it never fails a job.

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use chrono::{DateTime, Utc};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};
use snaplapse_common::{SnaplapseError, SnaplapseResult};

/// Well-known system font locations, tried in order.
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
];

const TIMESTAMP_SCALE: f32 = 28.0;
const LABEL_SCALE: f32 = 20.0;
const PLATE_ORIGIN: u32 = 10;
const PLATE_PADDING: u32 = 10;
/// Plate blend: output = 0.6·black + 0.4·image.
const PLATE_IMAGE_WEIGHT: f32 = 0.4;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Draws timestamp/label overlays onto decoded frames.
pub struct OverlayRenderer {
    font: FontVec,
}

impl OverlayRenderer {
    /// Load a font from the first usable well-known system location.
    pub fn load() -> SnaplapseResult<Self> {
        for candidate in FONT_CANDIDATES {
            let path = Path::new(candidate);
            if !path.exists() {
                continue;
            }
            match Self::from_font_file(path) {
                Ok(renderer) => {
                    tracing::debug!(font = candidate, "Loaded overlay font");
                    return Ok(renderer);
                }
                Err(e) => {
                    tracing::debug!(font = candidate, error = %e, "Skipping unusable font");
                }
            }
        }
        Err(SnaplapseError::render(
            "no usable overlay font found on this system",
        ))
    }

    /// Load a specific font file.
    pub fn from_font_file(path: &Path) -> SnaplapseResult<Self> {
        let bytes = std::fs::read(path)?;
        let font = FontVec::try_from_vec(bytes)
            .map_err(|e| SnaplapseError::render(format!("invalid font {}: {e}", path.display())))?;
        Ok(Self { font })
    }

    /// Burn the capture timestamp (and optional label) into `frame`.
    pub fn burn(&self, frame: &mut RgbImage, timestamp: DateTime<Utc>, label: Option<&str>) {
        let text = timestamp.format("%Y-%m-%d %H:%M:%S").to_string();
        let scale = PxScale::from(TIMESTAMP_SCALE);
        let (text_w, text_h) = text_size(scale, &self.font, &text);
        let (width, height) = frame.dimensions();

        let x0 = PLATE_ORIGIN.min(width);
        let y0 = PLATE_ORIGIN.min(height);
        let x1 = (x0 + text_w + 2 * PLATE_PADDING).min(width);
        let y1 = (y0 + text_h + 2 * PLATE_PADDING).min(height);

        for y in y0..y1 {
            for x in x0..x1 {
                let pixel = frame.get_pixel_mut(x, y);
                pixel.0 = pixel.0.map(|c| (c as f32 * PLATE_IMAGE_WEIGHT) as u8);
            }
        }

        draw_text_mut(
            frame,
            WHITE,
            (x0 + PLATE_PADDING) as i32,
            (y0 + PLATE_PADDING) as i32,
            scale,
            &self.font,
            &text,
        );

        if let Some(label) = label {
            let label_scale = PxScale::from(LABEL_SCALE);
            let (label_w, label_h) = text_size(label_scale, &self.font, label);
            let x = width.saturating_sub(label_w + PLATE_ORIGIN);
            let y = height.saturating_sub(label_h + PLATE_ORIGIN);
            draw_text_mut(
                frame,
                WHITE,
                x as i32,
                y as i32,
                label_scale,
                &self.font,
                label,
            );
        }
    }
}
