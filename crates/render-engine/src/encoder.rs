//! The timelapse encoding loop.

use std::path::PathBuf;

use image::imageops::{self, FilterType};
use snaplapse_common::{SnaplapseError, SnaplapseResult};
use snaplapse_frame_model::{FrameDescriptor, VideoArtifact};

use crate::codec::CodecNegotiator;
use crate::overlay::OverlayRenderer;
use crate::progress::{report, EncodeStage, ProgressCallback};
use crate::writer::open_with_fallback;

/// Encodes an ordered frame list into a single timelapse video.
///
/// The first frame fixes the canonical output dimensions; later frames
/// with different dimensions are stretched to match. Unreadable frames
/// after the first are skipped with a warning, so the output may contain
/// fewer frames than were requested.
pub struct TimelapseEncoder {
    videos_dir: PathBuf,
}

impl TimelapseEncoder {
    pub fn new(videos_dir: impl Into<PathBuf>) -> Self {
        Self {
            videos_dir: videos_dir.into(),
        }
    }

    /// Encode `frames` at `fps` into `<videos_dir>/<output_name stem><ext>`
    /// where the extension comes from codec negotiation.
    ///
    /// `progress` is invoked after each processed frame and at stage
    /// transitions. Blocks until the encode finishes; long jobs belong on
    /// a background worker.
    pub fn encode(
        &self,
        frames: &[FrameDescriptor],
        output_name: &str,
        fps: u32,
        burn_timestamp: bool,
        progress: Option<ProgressCallback>,
    ) -> SnaplapseResult<VideoArtifact> {
        if frames.is_empty() {
            return Err(SnaplapseError::input("No snapshots provided"));
        }

        let total = frames.len();
        report(&progress, 0, total, EncodeStage::Preparing);

        // The first frame must decode: it defines the output geometry.
        let first = image::open(&frames[0].path)
            .map_err(|e| {
                tracing::error!(path = %frames[0].path.display(), error = %e, "First frame unreadable");
                SnaplapseError::first_frame(&frames[0].path)
            })?
            .to_rgb8();
        let (width, height) = first.dimensions();

        std::fs::create_dir_all(&self.videos_dir)?;
        let preferred = CodecNegotiator::negotiate(&self.videos_dir);
        let (mut writer, codec, output_path) =
            open_with_fallback(&self.videos_dir, output_name, &preferred, width, height, fps)?;

        let overlay = if burn_timestamp {
            match OverlayRenderer::load() {
                Ok(renderer) => Some(renderer),
                Err(e) => {
                    tracing::warn!(error = %e, "Timestamp burn-in unavailable, encoding without overlays");
                    None
                }
            }
        } else {
            None
        };

        let mut pending_first = Some(first);
        let mut written = 0usize;
        for (index, descriptor) in frames.iter().enumerate() {
            let decoded = match pending_first.take() {
                Some(img) => Some(img),
                None => match image::open(&descriptor.path) {
                    Ok(img) => Some(img.to_rgb8()),
                    Err(e) => {
                        tracing::warn!(
                            path = %descriptor.path.display(),
                            error = %e,
                            "Could not read image, skipping"
                        );
                        None
                    }
                },
            };

            if let Some(mut img) = decoded {
                if img.dimensions() != (width, height) {
                    img = imageops::resize(&img, width, height, FilterType::Triangle);
                }
                if let (Some(renderer), Some(at)) = (overlay.as_ref(), descriptor.capture_time) {
                    renderer.burn(&mut img, at, descriptor.label.as_deref());
                }
                writer.write_frame(&img)?;
                written += 1;
            }

            report(&progress, index + 1, total, EncodeStage::Processing);
        }

        report(&progress, total, total, EncodeStage::Encoding);
        let frame_count = writer.finish()?;

        let size = std::fs::metadata(&output_path).map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            return Err(SnaplapseError::output_validation(&output_path));
        }

        tracing::info!(
            output = %output_path.display(),
            frames = frame_count,
            skipped = total - written,
            codec = %codec,
            "Timelapse rendered"
        );
        report(&progress, total, total, EncodeStage::Complete);

        Ok(VideoArtifact {
            path: output_path,
            frame_count,
            width,
            height,
            codec,
        })
    }
}
