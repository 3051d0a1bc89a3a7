//! Video artifacts: the terminal output of a successful encode.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// An encoder/container pair selected by codec negotiation.
///
/// Produced once per process lifetime and cached; all subsequent encodes
/// use the same choice unless negotiation is explicitly re-run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecChoice {
    /// ffmpeg encoder name (e.g. "libx264").
    pub encoder: String,

    /// Container file extension including the dot (e.g. ".mp4").
    pub container_ext: String,
}

impl CodecChoice {
    pub fn new(encoder: impl Into<String>, container_ext: impl Into<String>) -> Self {
        Self {
            encoder: encoder.into(),
            container_ext: container_ext.into(),
        }
    }
}

impl std::fmt::Display for CodecChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.encoder, self.container_ext)
    }
}

/// A successfully rendered video file.
///
/// Ownership of the file passes to the caller; the engine takes no further
/// responsibility for its lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoArtifact {
    /// Where the video was written.
    pub path: PathBuf,

    /// Frames actually written (may be fewer than requested when
    /// unreadable frames were skipped).
    pub frame_count: usize,

    /// Output width in pixels.
    pub width: u32,

    /// Output height in pixels.
    pub height: u32,

    /// The codec/container the video was encoded with.
    pub codec: CodecChoice,
}

/// Serializable metadata describing one rendered artifact, written as a
/// JSON sidecar so the catalogue layer can register the video for later
/// listing and download.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub artifact: VideoArtifact,

    /// Playback rate the video was rendered at.
    pub fps: u32,

    /// How many frames the caller requested (before per-frame skips).
    pub requested_frames: usize,

    /// Capture time of the first input frame, if known.
    pub start_time: Option<DateTime<Utc>>,

    /// Capture time of the last input frame, if known.
    pub end_time: Option<DateTime<Utc>>,

    /// When the artifact was rendered.
    pub created_at: DateTime<Utc>,
}

impl ArtifactRecord {
    pub fn new(artifact: VideoArtifact, fps: u32, requested_frames: usize) -> Self {
        Self {
            artifact,
            fps,
            requested_frames,
            start_time: None,
            end_time: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_time_range(
        mut self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Self {
        self.start_time = start;
        self.end_time = end;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_artifact() -> VideoArtifact {
        VideoArtifact {
            path: PathBuf::from("/videos/timelapse_20240501.mp4"),
            frame_count: 40,
            width: 1920,
            height: 1080,
            codec: CodecChoice::new("libx264", ".mp4"),
        }
    }

    #[test]
    fn test_codec_choice_display() {
        let choice = CodecChoice::new("mjpeg", ".avi");
        assert_eq!(choice.to_string(), "mjpeg (.avi)");
    }

    #[test]
    fn test_record_carries_requested_vs_written_counts() {
        let record = ArtifactRecord::new(sample_artifact(), 10, 42);
        assert_eq!(record.requested_frames, 42);
        assert_eq!(record.artifact.frame_count, 40);
        assert!(record.start_time.is_none());
    }
}
