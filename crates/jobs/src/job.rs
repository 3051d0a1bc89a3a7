//! Job descriptions and observable state.

use std::path::PathBuf;

use serde::Serialize;
use snaplapse_frame_model::FrameDescriptor;
use snaplapse_render_engine::EncodeStage;
use uuid::Uuid;

/// Lifecycle of a render job.
///
/// Forward-only: `pending → preparing → processing → encoding → complete`.
/// Successful and failed encodes both land in `complete`, distinguished
/// by the job's result; `error` absorbs from any state but is reserved
/// for uncaught worker failures. Once a job reports `complete` or `error`
/// it never reports anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Preparing,
    Processing,
    Encoding,
    Complete,
    Error,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Preparing => "preparing",
            JobStatus::Processing => "processing",
            JobStatus::Encoding => "encoding",
            JobStatus::Complete => "complete",
            JobStatus::Error => "error",
        }
    }

    /// Whether the job can make no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Error)
    }

    pub(crate) fn from_stage(stage: EncodeStage) -> Self {
        match stage {
            EncodeStage::Preparing => JobStatus::Preparing,
            EncodeStage::Processing => JobStatus::Processing,
            EncodeStage::Encoding => JobStatus::Encoding,
            EncodeStage::Complete => JobStatus::Complete,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Work a job carries out.
#[derive(Debug, Clone)]
pub enum JobRequest {
    Timelapse {
        frames: Vec<FrameDescriptor>,
        output_name: String,
        fps: u32,
        burn_timestamp: bool,
    },
    Comparison {
        groups: Vec<Vec<FrameDescriptor>>,
        output_name: String,
        fps: u32,
    },
}

impl JobRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            JobRequest::Timelapse { .. } => "timelapse",
            JobRequest::Comparison { .. } => "comparison",
        }
    }
}

/// Point-in-time copy of a job's observable state, safe to hold after the
/// registry lock is released.
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub id: Uuid,
    pub kind: &'static str,
    pub status: JobStatus,
    /// Frames processed so far; non-decreasing across polls.
    pub current: usize,
    /// Total frames the job will process, once known.
    pub total: usize,
    pub percent: u8,
    /// `None` while running; `Some(false)` for a finished-but-failed job.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
}
