//! Progress reporting for encode operations.

/// Stages an encode moves through. Transitions are forward-only; the job
/// layer adds its own `pending`/`error` states around these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeStage {
    Preparing,
    Processing,
    Encoding,
    Complete,
}

impl EncodeStage {
    pub fn as_str(self) -> &'static str {
        match self {
            EncodeStage::Preparing => "preparing",
            EncodeStage::Processing => "processing",
            EncodeStage::Encoding => "encoding",
            EncodeStage::Complete => "complete",
        }
    }
}

/// A single progress report emitted after each processed frame.
#[derive(Debug, Clone, Copy)]
pub struct EncodeProgress {
    /// Frames processed so far (including skipped ones).
    pub current: usize,

    /// Total frames requested.
    pub total: usize,

    /// Completion percentage in [0, 100].
    pub percent: u8,

    /// Current stage.
    pub stage: EncodeStage,
}

impl EncodeProgress {
    pub fn new(current: usize, total: usize, stage: EncodeStage) -> Self {
        let percent = if total == 0 {
            0
        } else {
            ((current * 100) / total).min(100) as u8
        };
        Self {
            current,
            total,
            percent,
            stage,
        }
    }
}

/// Progress callback invoked by the encoder/compositor after each frame.
pub type ProgressCallback = Box<dyn Fn(EncodeProgress) + Send>;

/// Emit a progress report if a callback is installed.
pub(crate) fn report(
    progress: &Option<ProgressCallback>,
    current: usize,
    total: usize,
    stage: EncodeStage,
) {
    if let Some(cb) = progress {
        cb(EncodeProgress::new(current, total, stage));
    }
}
