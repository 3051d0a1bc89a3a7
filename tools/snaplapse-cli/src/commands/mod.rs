//! CLI subcommands.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, NaiveDateTime, Utc};
use snaplapse_frame_model::FrameDescriptor;

pub mod check;
pub mod compare;
pub mod render;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "webp"];

/// Filename stem layouts snapshot tools commonly use.
const STEM_TIME_FORMATS: &[&str] = &["%Y%m%d_%H%M%S", "%Y%m%d-%H%M%S", "%Y-%m-%d_%H-%M-%S"];

/// Collect the image files of `dir` as frame descriptors, sorted by
/// filename. Capture time comes from the filename when it encodes one,
/// from the file's modification time otherwise.
pub fn collect_frames(dir: &Path) -> anyhow::Result<Vec<FrameDescriptor>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("could not read snapshot directory {}", dir.display()))?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();

    Ok(paths
        .into_iter()
        .map(|path| {
            let capture_time = capture_time_for(&path);
            let mut descriptor = FrameDescriptor::new(path);
            if let Some(at) = capture_time {
                descriptor = descriptor.with_capture_time(at);
            }
            descriptor
        })
        .collect())
}

fn capture_time_for(path: &Path) -> Option<DateTime<Utc>> {
    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
        for format in STEM_TIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(stem, format) {
                return Some(naive.and_utc());
            }
        }
    }
    let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok()?;
    Some(DateTime::<Utc>::from(modified))
}

/// The directory videos land in: an explicit flag wins, the configured
/// default otherwise.
pub fn resolve_videos_dir(flag: Option<PathBuf>) -> PathBuf {
    flag.unwrap_or_else(|| snaplapse_common::config::AppConfig::load().videos_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_collect_frames_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.png", "a.jpg", "notes.txt", "c.JPEG"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let frames = collect_frames(dir.path()).unwrap();
        let names: Vec<_> = frames
            .iter()
            .map(|f| f.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.jpg", "b.png", "c.JPEG"]);
    }

    #[test]
    fn test_capture_time_parsed_from_filename() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("20240501_123000.jpg");
        std::fs::write(&path, b"x").unwrap();

        let at = capture_time_for(&path).unwrap();
        assert_eq!(at.hour(), 12);
        assert_eq!(at.minute(), 30);
    }

    #[test]
    fn test_capture_time_falls_back_to_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot_oddly_named.jpg");
        std::fs::write(&path, b"x").unwrap();

        assert!(capture_time_for(&path).is_some());
    }
}
