//! The job registry.
//!
//! One mutex-guarded map holds every job's state; worker threads and
//! pollers both go through it, and the lock is only ever held for short
//! map operations, never across an encode.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use snaplapse_common::SnaplapseResult;
use snaplapse_frame_model::VideoArtifact;
use snaplapse_render_engine::{
    ComparisonCompositor, EncodeStage, ProgressCallback, TimelapseEncoder,
};
use uuid::Uuid;

use crate::job::{JobRequest, JobSnapshot, JobStatus};

/// How long finished jobs stay pollable before a sweep may drop them.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(60 * 60);

/// Why a finalize call could not hand out an artifact.
#[derive(Debug, thiserror::Error)]
pub enum FinalizeError {
    #[error("job not found")]
    NotFound,

    #[error("job is not complete yet (status: {0})")]
    NotComplete(JobStatus),

    #[error("{0}")]
    Failed(String),
}

struct JobEntry {
    kind: &'static str,
    status: JobStatus,
    current: usize,
    total: usize,
    percent: u8,
    /// Terminal result: the artifact, or the failure message. Present
    /// exactly when the status is terminal.
    outcome: Option<Result<VideoArtifact, String>>,
    created_at: Instant,
}

impl JobEntry {
    fn snapshot(&self, id: Uuid) -> JobSnapshot {
        JobSnapshot {
            id,
            kind: self.kind,
            status: self.status,
            current: self.current,
            total: self.total,
            percent: self.percent,
            success: self.outcome.as_ref().map(|o| o.is_ok()),
            error: self
                .outcome
                .as_ref()
                .and_then(|o| o.as_ref().err().cloned()),
            output: self
                .outcome
                .as_ref()
                .and_then(|o| o.as_ref().ok())
                .map(|a| a.path.clone()),
        }
    }
}

type JobMap = Arc<Mutex<HashMap<Uuid, JobEntry>>>;

/// Tracks background render jobs from submission to collection.
///
/// Cloning is cheap and every clone observes the same jobs.
#[derive(Clone)]
pub struct JobRegistry {
    jobs: JobMap,
    videos_dir: PathBuf,
    retention: Duration,
}

impl JobRegistry {
    pub fn new(videos_dir: impl Into<PathBuf>) -> Self {
        Self::with_retention(videos_dir, DEFAULT_RETENTION)
    }

    pub fn with_retention(videos_dir: impl Into<PathBuf>, retention: Duration) -> Self {
        Self {
            jobs: Arc::new(Mutex::new(HashMap::new())),
            videos_dir: videos_dir.into(),
            retention,
        }
    }

    /// Start a job on its own thread and return its id immediately.
    ///
    /// Submission also sweeps jobs created longer than the retention
    /// window ago; there is no timer thread, so an idle registry holds
    /// its entries until the next submit.
    pub fn submit(&self, request: JobRequest) -> Uuid {
        let id = Uuid::new_v4();
        let kind = request.kind();

        {
            let mut jobs = self.lock();
            Self::sweep(&mut jobs, self.retention);
            jobs.insert(
                id,
                JobEntry {
                    kind,
                    status: JobStatus::Pending,
                    current: 0,
                    total: 0,
                    percent: 0,
                    outcome: None,
                    created_at: Instant::now(),
                },
            );
        }

        let jobs = Arc::clone(&self.jobs);
        let videos_dir = self.videos_dir.clone();
        tracing::info!(%id, kind, "Job submitted");

        std::thread::Builder::new()
            .name(format!("render-job-{id}"))
            .spawn(move || run_job(jobs, id, videos_dir, request))
            // Thread spawn only fails under resource exhaustion; record it
            // as a job error rather than panicking the caller.
            .map_err(|e| {
                let mut jobs = lock_map(&self.jobs);
                if let Some(entry) = jobs.get_mut(&id) {
                    entry.status = JobStatus::Error;
                    entry.outcome = Some(Err(format!("could not start worker thread: {e}")));
                }
            })
            .ok();

        id
    }

    /// Point-in-time view of one job, or `None` when it does not exist
    /// (never submitted, already finalized, or swept).
    pub fn poll(&self, id: Uuid) -> Option<JobSnapshot> {
        self.lock().get(&id).map(|entry| entry.snapshot(id))
    }

    /// Snapshots of every tracked job.
    pub fn list(&self) -> Vec<JobSnapshot> {
        self.lock()
            .iter()
            .map(|(id, entry)| entry.snapshot(*id))
            .collect()
    }

    /// Collect a finished job's result and drop the job.
    ///
    /// Consuming: the first call on a terminal job removes the entry, so
    /// a second call for the same id returns `NotFound`. A failed job is
    /// consumed the same way, surfacing its error message once as
    /// `Failed`.
    pub fn finalize(&self, id: Uuid) -> Result<VideoArtifact, FinalizeError> {
        let mut jobs = self.lock();
        let status = jobs.get(&id).map(|e| e.status).ok_or(FinalizeError::NotFound)?;
        if !status.is_terminal() {
            return Err(FinalizeError::NotComplete(status));
        }

        // A terminal entry always carries its outcome; the worker stores
        // both under one lock acquisition.
        let entry = jobs.remove(&id).ok_or(FinalizeError::NotFound)?;
        match entry.outcome {
            Some(Ok(artifact)) => Ok(artifact),
            Some(Err(message)) => Err(FinalizeError::Failed(message)),
            None => Err(FinalizeError::Failed("job finished without a result".into())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, JobEntry>> {
        lock_map(&self.jobs)
    }

    // Eviction keys on creation time, so a job outliving the retention
    // window is dropped from the registry even if its worker is still
    // running; the worker tolerates its entry being gone.
    fn sweep(jobs: &mut HashMap<Uuid, JobEntry>, retention: Duration) {
        let before = jobs.len();
        jobs.retain(|_, entry| entry.created_at.elapsed() < retention);
        let swept = before - jobs.len();
        if swept > 0 {
            tracing::debug!(swept, "Swept expired jobs");
        }
    }
}

fn lock_map(jobs: &JobMap) -> MutexGuard<'_, HashMap<Uuid, JobEntry>> {
    // A worker panicking while holding the lock leaves the map usable;
    // its own entry is marked errored by the panic handler.
    jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn run_job(jobs: JobMap, id: Uuid, videos_dir: PathBuf, request: JobRequest) {
    let progress_jobs = Arc::clone(&jobs);
    let progress: ProgressCallback = Box::new(move |p| {
        // The worker itself flips the entry to complete together with the
        // artifact, so the callback never reports the final stage.
        if p.stage == EncodeStage::Complete {
            return;
        }
        let mut jobs = lock_map(&progress_jobs);
        if let Some(entry) = jobs.get_mut(&id) {
            if entry.status.is_terminal() {
                return;
            }
            entry.status = JobStatus::from_stage(p.stage);
            entry.current = entry.current.max(p.current);
            entry.total = p.total;
            entry.percent = entry.percent.max(p.percent);
        }
    });

    let result = catch_unwind(AssertUnwindSafe(|| execute(&videos_dir, request, progress)));

    let mut jobs = lock_map(&jobs);
    let Some(entry) = jobs.get_mut(&id) else {
        return;
    };
    match result {
        Ok(Ok(artifact)) => {
            tracing::info!(%id, output = %artifact.path.display(), "Job complete");
            entry.status = JobStatus::Complete;
            entry.current = entry.total;
            entry.percent = 100;
            entry.outcome = Some(Ok(artifact));
        }
        // A classified encode failure is still a completed job; the
        // failure result distinguishes it from a successful one.
        Ok(Err(e)) => {
            tracing::error!(%id, error = %e, "Job failed");
            entry.status = JobStatus::Complete;
            entry.outcome = Some(Err(e.to_string()));
        }
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "render worker panicked".to_string());
            tracing::error!(%id, panic = %message, "Job worker panicked");
            entry.status = JobStatus::Error;
            entry.outcome = Some(Err(message));
        }
    }
}

fn execute(
    videos_dir: &std::path::Path,
    request: JobRequest,
    progress: ProgressCallback,
) -> SnaplapseResult<VideoArtifact> {
    match request {
        JobRequest::Timelapse {
            frames,
            output_name,
            fps,
            burn_timestamp,
        } => TimelapseEncoder::new(videos_dir).encode(
            &frames,
            &output_name,
            fps,
            burn_timestamp,
            Some(progress),
        ),
        JobRequest::Comparison {
            groups,
            output_name,
            fps,
        } => ComparisonCompositor::new(videos_dir).composite(
            &groups,
            &output_name,
            fps,
            Some(progress),
        ),
    }
}
