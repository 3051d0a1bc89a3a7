//! Job lifecycle tests. Fast-failing jobs need no ffmpeg; full encode
//! flows are skipped when no ffmpeg binary is on PATH.

use std::path::Path;
use std::time::{Duration, Instant};

use image::{Rgb, RgbImage};
use snaplapse_frame_model::FrameDescriptor;
use snaplapse_jobs::{FinalizeError, JobRegistry, JobRequest, JobStatus};
use snaplapse_render_engine::ffmpeg_available;
use uuid::Uuid;

fn wait_for_terminal(registry: &JobRegistry, id: Uuid) -> JobStatus {
    let deadline = Instant::now() + Duration::from_secs(30);
    loop {
        let snapshot = registry.poll(id).expect("job disappeared while running");
        if snapshot.status.is_terminal() {
            return snapshot.status;
        }
        assert!(Instant::now() < deadline, "job did not finish in time");
        std::thread::sleep(Duration::from_millis(10));
    }
}

fn frames_in(dir: &Path, count: usize) -> Vec<FrameDescriptor> {
    (0..count)
        .map(|i| {
            let path = dir.join(format!("frame_{i:03}.png"));
            RgbImage::from_pixel(48, 32, Rgb([(i * 30) as u8, 0, 0]))
                .save(&path)
                .unwrap();
            FrameDescriptor::new(path)
        })
        .collect()
}

fn empty_timelapse(output_name: &str) -> JobRequest {
    JobRequest::Timelapse {
        frames: vec![],
        output_name: output_name.into(),
        fps: 10,
        burn_timestamp: false,
    }
}

#[test]
fn test_failed_encode_lands_in_complete_with_failure_result() {
    let dir = tempfile::tempdir().unwrap();
    let registry = JobRegistry::new(dir.path().join("videos"));

    let id = registry.submit(empty_timelapse("job_empty"));
    assert!(registry.list().iter().any(|s| s.id == id));

    // A classified failure completes the job; only the result flags it
    // as unsuccessful.
    assert_eq!(wait_for_terminal(&registry, id), JobStatus::Complete);
    let snapshot = registry.poll(id).unwrap();
    assert_eq!(snapshot.success, Some(false));
    assert_eq!(snapshot.error.as_deref(), Some("No snapshots provided"));
    assert!(snapshot.output.is_none());

    match registry.finalize(id) {
        Err(FinalizeError::Failed(message)) => assert_eq!(message, "No snapshots provided"),
        other => panic!("expected Failed, got {other:?}"),
    }

    // Consumed: the job is gone.
    assert!(matches!(registry.finalize(id), Err(FinalizeError::NotFound)));
    assert!(registry.poll(id).is_none());
}

#[test]
fn test_unknown_job_id() {
    let dir = tempfile::tempdir().unwrap();
    let registry = JobRegistry::new(dir.path().join("videos"));

    let id = Uuid::new_v4();
    assert!(registry.poll(id).is_none());
    assert!(matches!(registry.finalize(id), Err(FinalizeError::NotFound)));
}

#[test]
fn test_expired_jobs_are_swept_on_next_submit() {
    let dir = tempfile::tempdir().unwrap();
    let registry = JobRegistry::with_retention(dir.path().join("videos"), Duration::ZERO);

    let first = registry.submit(empty_timelapse("job_sweep_a"));
    wait_for_terminal(&registry, first);

    // Nothing is swept while the registry sits idle.
    assert!(registry.poll(first).is_some());

    let second = registry.submit(empty_timelapse("job_sweep_b"));
    assert!(registry.poll(first).is_none());
    wait_for_terminal(&registry, second);
}

#[test]
fn test_in_flight_job_is_not_complete() {
    let dir = tempfile::tempdir().unwrap();

    // A FIFO as the first frame blocks the worker in the decode until we
    // open the write end, holding the job deterministically in flight.
    let fifo = dir.path().join("gate.png");
    let status = std::process::Command::new("mkfifo")
        .arg(&fifo)
        .status()
        .expect("mkfifo");
    assert!(status.success());

    let registry = JobRegistry::new(dir.path().join("videos"));
    let id = registry.submit(JobRequest::Timelapse {
        frames: vec![FrameDescriptor::new(fifo.clone())],
        output_name: "job_gated".into(),
        fps: 10,
        burn_timestamp: false,
    });

    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let snapshot = registry.poll(id).unwrap();
        if snapshot.status == JobStatus::Preparing {
            break;
        }
        assert!(Instant::now() < deadline, "job never started preparing");
        std::thread::sleep(Duration::from_millis(5));
    }

    assert!(matches!(
        registry.finalize(id),
        Err(FinalizeError::NotComplete(_))
    ));

    // Unblock the worker with garbage; the unreadable first frame is a
    // classified failure, so the job completes unsuccessfully.
    std::fs::write(&fifo, b"not an image").unwrap();
    assert_eq!(wait_for_terminal(&registry, id), JobStatus::Complete);
    assert_eq!(registry.poll(id).unwrap().success, Some(false));
}

#[test]
fn test_timelapse_job_completes_and_finalize_yields_artifact() {
    if !ffmpeg_available() {
        eprintln!("skipping job flow test, ffmpeg not on PATH");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let frames = frames_in(dir.path(), 5);
    let registry = JobRegistry::new(dir.path().join("videos"));

    let id = registry.submit(JobRequest::Timelapse {
        frames,
        output_name: "job_full".into(),
        fps: 10,
        burn_timestamp: false,
    });

    assert_eq!(wait_for_terminal(&registry, id), JobStatus::Complete);
    let snapshot = registry.poll(id).unwrap();
    assert_eq!(snapshot.percent, 100);
    assert_eq!(snapshot.success, Some(true));
    assert!(snapshot.output.is_some());

    let artifact = registry.finalize(id).unwrap();
    assert_eq!(artifact.frame_count, 5);
    assert!(artifact.path.exists());

    assert!(matches!(registry.finalize(id), Err(FinalizeError::NotFound)));
}

#[test]
fn test_comparison_job_completes() {
    if !ffmpeg_available() {
        eprintln!("skipping job flow test, ffmpeg not on PATH");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let left = dir.path().join("left");
    let right = dir.path().join("right");
    std::fs::create_dir_all(&left).unwrap();
    std::fs::create_dir_all(&right).unwrap();

    let registry = JobRegistry::new(dir.path().join("videos"));
    let id = registry.submit(JobRequest::Comparison {
        groups: vec![frames_in(&left, 3), frames_in(&right, 2)],
        output_name: "job_compare".into(),
        fps: 10,
    });

    assert_eq!(wait_for_terminal(&registry, id), JobStatus::Complete);
    let artifact = registry.finalize(id).unwrap();
    assert_eq!(artifact.frame_count, 3);
}
