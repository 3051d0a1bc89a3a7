//! Error types shared across Snaplapse crates.

use std::path::PathBuf;

/// Top-level error type for Snaplapse operations.
#[derive(Debug, thiserror::Error)]
pub enum SnaplapseError {
    /// The caller handed the engine nothing to encode.
    #[error("{message}")]
    Input { message: String },

    /// The first frame of a sequence could not be decoded. The first frame
    /// fixes the canonical output dimensions, so this is fatal for the call.
    #[error("Could not read first image: {path}")]
    FirstFrame { path: PathBuf },

    /// No frame of any group could be decoded to fix the tile dimensions.
    #[error("Could not read any images")]
    NoReadableFrames,

    /// No encoder/container combination could be opened, even after the
    /// guaranteed-fallback retry.
    #[error("Failed to initialize video writer: {message}")]
    WriterInit { message: String },

    /// The writer reported success but the output file is missing or empty.
    #[error("Video file was not created or is empty: {path}")]
    OutputValidation { path: PathBuf },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using SnaplapseError.
pub type SnaplapseResult<T> = Result<T, SnaplapseError>;

impl SnaplapseError {
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input {
            message: msg.into(),
        }
    }

    pub fn first_frame(path: impl Into<PathBuf>) -> Self {
        Self::FirstFrame { path: path.into() }
    }

    pub fn writer_init(msg: impl Into<String>) -> Self {
        Self::WriterInit {
            message: msg.into(),
        }
    }

    pub fn output_validation(path: impl Into<PathBuf>) -> Self {
        Self::OutputValidation { path: path.into() }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }
}
