//! End-to-end pipeline tests. These exercise a real ffmpeg binary and are
//! skipped when none is on PATH.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use image::{Rgb, RgbImage};
use snaplapse_frame_model::FrameDescriptor;
use snaplapse_render_engine::{
    ffmpeg_available, ComparisonCompositor, EncodeStage, TimelapseEncoder,
};

fn require_ffmpeg() -> bool {
    if ffmpeg_available() {
        true
    } else {
        eprintln!("skipping pipeline test, ffmpeg not on PATH");
        false
    }
}

fn write_png(dir: &Path, name: &str, width: u32, height: u32, shade: u8) -> PathBuf {
    let path = dir.join(name);
    RgbImage::from_pixel(width, height, Rgb([shade, shade, shade]))
        .save(&path)
        .unwrap();
    path
}

fn frames_in(dir: &Path, count: usize, width: u32, height: u32) -> Vec<FrameDescriptor> {
    (0..count)
        .map(|i| {
            let path = write_png(dir, &format!("frame_{i:03}.png"), width, height, (i * 20) as u8);
            FrameDescriptor::new(path)
        })
        .collect()
}

#[test]
fn test_timelapse_produces_nonempty_video() {
    if !require_ffmpeg() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let frames = frames_in(dir.path(), 5, 64, 48);

    let encoder = TimelapseEncoder::new(dir.path().join("videos"));
    let artifact = encoder
        .encode(&frames, "timelapse_test", 10, false, None)
        .unwrap();

    assert_eq!(artifact.frame_count, 5);
    assert_eq!((artifact.width, artifact.height), (64, 48));
    assert!(artifact.path.exists());
    assert!(std::fs::metadata(&artifact.path).unwrap().len() > 0);
    assert!(artifact
        .path
        .to_string_lossy()
        .ends_with(&artifact.codec.container_ext));
}

#[test]
fn test_unreadable_middle_frame_is_skipped() {
    if !require_ffmpeg() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let mut frames = frames_in(dir.path(), 4, 64, 48);
    let bogus = dir.path().join("frame_bad.png");
    std::fs::write(&bogus, b"not an image").unwrap();
    frames.insert(2, FrameDescriptor::new(bogus));

    let encoder = TimelapseEncoder::new(dir.path().join("videos"));
    let artifact = encoder
        .encode(&frames, "timelapse_skip", 10, false, None)
        .unwrap();

    assert_eq!(artifact.frame_count, 4);
}

#[test]
fn test_mismatched_dimensions_resize_to_first_frame() {
    if !require_ffmpeg() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let frames = vec![
        FrameDescriptor::new(write_png(dir.path(), "a.png", 64, 48, 10)),
        FrameDescriptor::new(write_png(dir.path(), "b.png", 128, 96, 120)),
        FrameDescriptor::new(write_png(dir.path(), "c.png", 32, 32, 240)),
    ];

    let encoder = TimelapseEncoder::new(dir.path().join("videos"));
    let artifact = encoder
        .encode(&frames, "timelapse_resize", 10, false, None)
        .unwrap();

    assert_eq!(artifact.frame_count, 3);
    assert_eq!((artifact.width, artifact.height), (64, 48));
}

#[test]
fn test_progress_reaches_complete_and_is_monotonic() {
    if !require_ffmpeg() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let frames = frames_in(dir.path(), 3, 32, 32);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let encoder = TimelapseEncoder::new(dir.path().join("videos"));
    encoder
        .encode(
            &frames,
            "timelapse_progress",
            10,
            false,
            Some(Box::new(move |p| sink.lock().unwrap().push(p))),
        )
        .unwrap();

    let reports = seen.lock().unwrap();
    assert!(!reports.is_empty());
    assert_eq!(reports.first().unwrap().stage, EncodeStage::Preparing);
    assert_eq!(reports.last().unwrap().stage, EncodeStage::Complete);
    assert_eq!(reports.last().unwrap().percent, 100);
    for pair in reports.windows(2) {
        assert!(pair[1].percent >= pair[0].percent);
    }
}

#[test]
fn test_comparison_tiles_groups_horizontally() {
    if !require_ffmpeg() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let left = dir.path().join("left");
    let right = dir.path().join("right");
    std::fs::create_dir_all(&left).unwrap();
    std::fs::create_dir_all(&right).unwrap();

    let groups = vec![frames_in(&left, 4, 64, 48), frames_in(&right, 2, 64, 48)];

    let compositor = ComparisonCompositor::new(dir.path().join("videos"));
    let artifact = compositor
        .composite(&groups, "comparison_test", 10, None)
        .unwrap();

    // Two tiles wide, and the shorter group holds its last frame out to
    // the longer group's length.
    assert_eq!((artifact.width, artifact.height), (128, 48));
    assert_eq!(artifact.frame_count, 4);
}

#[test]
fn test_comparison_with_one_unreadable_group_still_renders() {
    if !require_ffmpeg() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good");
    std::fs::create_dir_all(&good).unwrap();

    let bogus = dir.path().join("broken.png");
    std::fs::write(&bogus, b"not an image").unwrap();
    let groups = vec![frames_in(&good, 3, 64, 48), vec![FrameDescriptor::new(bogus)]];

    let compositor = ComparisonCompositor::new(dir.path().join("videos"));
    let artifact = compositor
        .composite(&groups, "comparison_black_tile", 10, None)
        .unwrap();

    assert_eq!((artifact.width, artifact.height), (128, 48));
    assert_eq!(artifact.frame_count, 3);
}
