//! Side-by-side comparison rendering.
//!
//! Tiles one frame per snapshot group horizontally into a composite and
//! encodes the composite sequence. Groups shorter than the longest one
//! hold their last frame; empty groups and unreadable frames render as
//! black tiles at their position.

use std::path::PathBuf;

use image::imageops::{self, FilterType};
use image::RgbImage;
use snaplapse_common::{SnaplapseError, SnaplapseResult};
use snaplapse_frame_model::{FrameDescriptor, VideoArtifact};

use crate::codec::CodecNegotiator;
use crate::progress::{report, EncodeStage, ProgressCallback};
use crate::writer::open_with_fallback;

/// Index into a group's frame list for composite frame `frame_idx`,
/// holding the last frame once the group is exhausted.
pub(crate) fn tile_index(frame_idx: usize, len: usize) -> usize {
    frame_idx.min(len.saturating_sub(1))
}

/// Per-group decode cache: the last attempted source index and its tile.
/// `None` inside means that index was unreadable and renders black.
type TileCache = Option<(usize, Option<RgbImage>)>;

/// Build the composite frame for `frame_idx`, one tile per group left to
/// right. Tiles start black; an empty group or an unreadable frame leaves
/// its tile black for this index. Exhausted groups repeat their last
/// frame via the cache instead of re-decoding it every composite frame.
pub(crate) fn compose_row(
    groups: &[Vec<FrameDescriptor>],
    frame_idx: usize,
    tile_w: u32,
    tile_h: u32,
    cache: &mut [TileCache],
) -> RgbImage {
    let mut composite = RgbImage::new(tile_w * groups.len() as u32, tile_h);

    for (group_idx, group) in groups.iter().enumerate() {
        if group.is_empty() {
            continue;
        }
        let idx = tile_index(frame_idx, group.len());
        let cached = matches!(&cache[group_idx], Some((at, _)) if *at == idx);
        if !cached {
            let tile = match image::open(&group[idx].path) {
                Ok(img) => {
                    let mut img = img.to_rgb8();
                    if img.dimensions() != (tile_w, tile_h) {
                        img = imageops::resize(&img, tile_w, tile_h, FilterType::Triangle);
                    }
                    Some(img)
                }
                Err(e) => {
                    tracing::warn!(
                        path = %group[idx].path.display(),
                        error = %e,
                        "Could not read comparison frame, tile stays black"
                    );
                    None
                }
            };
            cache[group_idx] = Some((idx, tile));
        }

        if let Some((_, Some(tile))) = &cache[group_idx] {
            imageops::replace(
                &mut composite,
                tile,
                (group_idx as u32 * tile_w) as i64,
                0,
            );
        }
    }

    composite
}

/// Renders several frame sequences into one horizontally tiled video.
pub struct ComparisonCompositor {
    videos_dir: PathBuf,
}

impl ComparisonCompositor {
    pub fn new(videos_dir: impl Into<PathBuf>) -> Self {
        Self {
            videos_dir: videos_dir.into(),
        }
    }

    /// Composite `groups` into `<videos_dir>/<output_name stem><ext>`.
    ///
    /// The tile size comes from the first readable frame across all groups
    /// in order; every tile is resized to it. The video length is the
    /// longest group's length.
    pub fn composite(
        &self,
        groups: &[Vec<FrameDescriptor>],
        output_name: &str,
        fps: u32,
        progress: Option<ProgressCallback>,
    ) -> SnaplapseResult<VideoArtifact> {
        if groups.is_empty() || groups.iter().all(|g| g.is_empty()) {
            return Err(SnaplapseError::input("No snapshot groups provided"));
        }

        let total = groups.iter().map(|g| g.len()).max().unwrap_or(0);
        report(&progress, 0, total, EncodeStage::Preparing);

        let (tile_w, tile_h) = Self::tile_dimensions(groups)?;
        let width = tile_w * groups.len() as u32;
        let height = tile_h;

        std::fs::create_dir_all(&self.videos_dir)?;
        let preferred = CodecNegotiator::negotiate(&self.videos_dir);
        let (mut writer, codec, output_path) =
            open_with_fallback(&self.videos_dir, output_name, &preferred, width, height, fps)?;

        let mut cache: Vec<TileCache> = groups.iter().map(|_| None).collect();
        for frame_idx in 0..total {
            let composite = compose_row(groups, frame_idx, tile_w, tile_h, &mut cache);
            writer.write_frame(&composite)?;
            report(&progress, frame_idx + 1, total, EncodeStage::Processing);
        }

        report(&progress, total, total, EncodeStage::Encoding);
        let frame_count = writer.finish()?;

        let size = std::fs::metadata(&output_path).map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            return Err(SnaplapseError::output_validation(&output_path));
        }

        tracing::info!(
            output = %output_path.display(),
            groups = groups.len(),
            frames = frame_count,
            codec = %codec,
            "Comparison rendered"
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

    /// Dimensions of the first readable frame, scanning groups in order.
    fn tile_dimensions(groups: &[Vec<FrameDescriptor>]) -> SnaplapseResult<(u32, u32)> {
        for group in groups {
            for descriptor in group {
                match image::open(&descriptor.path) {
                    Ok(img) => {
                        let img = img.to_rgb8();
                        return Ok(img.dimensions());
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %descriptor.path.display(),
                            error = %e,
                            "Could not read image while sizing tiles"
                        );
                    }
                }
            }
        }
        Err(SnaplapseError::NoReadableFrames)
    }
}
