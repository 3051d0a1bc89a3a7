//! Frame descriptors: the minimal unit of encoder input.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One still image to be encoded into a video.
///
/// Descriptors are immutable and owned by the caller for the duration of
/// one encode call; the engine never mutates or persists them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameDescriptor {
    /// Path to the image file on disk.
    pub path: PathBuf,

    /// When the snapshot was captured, if known. Required for timestamp
    /// burn-in; frames without one are written unannotated.
    pub capture_time: Option<DateTime<Utc>>,

    /// Optional short label (e.g. camera or project name) drawn near the
    /// opposite corner of the timestamp.
    pub label: Option<String>,
}

impl FrameDescriptor {
    /// A bare descriptor with no capture time or label.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            capture_time: None,
            label: None,
        }
    }

    pub fn with_capture_time(mut self, at: DateTime<Utc>) -> Self {
        self.capture_time = Some(at);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}
