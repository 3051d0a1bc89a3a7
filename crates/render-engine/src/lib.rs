//! Snaplapse Render Engine
//!
//! Turns ordered lists of snapshot frames into encoded video files.
//!
//! # Pipeline Architecture
//!
//! ```text
//! frame list ──► decode ──► resize to canonical ──► timestamp burn-in
//!                                                        │
//!                                                        ▼
//!                                            rawvideo pipe to ffmpeg
//!                                                        │
//!                                                        ▼
//!                                                   output video
//! ```
//!
//! The encoder/container pair is negotiated once per process by probing
//! the local ffmpeg build ([`codec`]); unreadable non-canonical frames are
//! skipped rather than aborting the job; heterogeneous frame dimensions
//! are stretched to match the first frame.

pub mod codec;
pub mod comparison;
pub mod encoder;
pub mod overlay;
pub mod progress;
pub mod writer;

pub use codec::{ffmpeg_available, CodecNegotiator};
pub use comparison::ComparisonCompositor;
pub use encoder::TimelapseEncoder;
pub use overlay::OverlayRenderer;
pub use progress::{EncodeProgress, EncodeStage, ProgressCallback};
pub use writer::VideoWriter;
