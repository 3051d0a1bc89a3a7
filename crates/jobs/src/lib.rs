//! Snaplapse Jobs
//!
//! Background render jobs for long-running encodes. Each submitted job
//! runs on its own thread; callers poll for status snapshots and collect
//! the finished artifact exactly once with a consuming finalize.

pub mod job;
pub mod registry;

pub use job::{JobRequest, JobSnapshot, JobStatus};
pub use registry::{FinalizeError, JobRegistry, DEFAULT_RETENTION};
