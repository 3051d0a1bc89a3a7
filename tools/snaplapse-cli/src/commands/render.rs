//! Render a snapshot directory into a timelapse video.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use snaplapse_frame_model::{ArtifactRecord, FrameDescriptor, VideoArtifact};
use snaplapse_jobs::{FinalizeError, JobRegistry, JobRequest};
use snaplapse_render_engine::TimelapseEncoder;

use super::{collect_frames, resolve_videos_dir};

pub fn run(
    dir: PathBuf,
    output: Option<String>,
    fps: u32,
    burn_timestamp: bool,
    background: bool,
    videos_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let output = output.unwrap_or_else(|| {
        format!("timelapse_{}", chrono::Utc::now().format("%Y%m%d_%H%M%S"))
    });
    let frames = collect_frames(&dir)?;
    if frames.is_empty() {
        bail!("no snapshot images found in {}", dir.display());
    }
    println!(
        "Rendering {} frames from {} at {} fps",
        frames.len(),
        dir.display(),
        fps
    );

    let videos_dir = resolve_videos_dir(videos_dir);
    let requested = frames.len();
    let start_time = frames.first().and_then(|f| f.capture_time);
    let end_time = frames.last().and_then(|f| f.capture_time);

    let artifact = if background {
        run_background(videos_dir, frames, output, fps, burn_timestamp)?
    } else {
        TimelapseEncoder::new(videos_dir).encode(&frames, &output, fps, burn_timestamp, None)?
    };

    write_sidecar(&artifact, fps, requested, start_time, end_time)?;

    println!("Wrote {}", artifact.path.display());
    println!(
        "  {} frames, {}x{}, codec {}",
        artifact.frame_count, artifact.width, artifact.height, artifact.codec
    );
    if artifact.frame_count < requested {
        println!(
            "  {} unreadable frames were skipped",
            requested - artifact.frame_count
        );
    }
    Ok(())
}

/// Submit to the job registry and poll until terminal, printing progress
/// as it changes.
fn run_background(
    videos_dir: PathBuf,
    frames: Vec<FrameDescriptor>,
    output_name: String,
    fps: u32,
    burn_timestamp: bool,
) -> anyhow::Result<VideoArtifact> {
    let registry = JobRegistry::new(videos_dir);
    let id = registry.submit(JobRequest::Timelapse {
        frames,
        output_name,
        fps,
        burn_timestamp,
    });
    println!("Submitted job {id}");

    let mut last_line = String::new();
    loop {
        let Some(snapshot) = registry.poll(id) else {
            bail!("job {id} disappeared from the registry");
        };
        let line = format!("  [{}] {}%", snapshot.status, snapshot.percent);
        if line != last_line {
            println!("{line}");
            last_line = line;
        }
        if snapshot.status.is_terminal() {
            break;
        }
        std::thread::sleep(Duration::from_millis(200));
    }

    match registry.finalize(id) {
        Ok(artifact) => Ok(artifact),
        Err(FinalizeError::Failed(message)) => bail!("render job failed: {message}"),
        Err(e) => bail!("could not finalize job {id}: {e}"),
    }
}

/// Write the `<video>.meta.json` sidecar next to the artifact.
fn write_sidecar(
    artifact: &VideoArtifact,
    fps: u32,
    requested: usize,
    start_time: Option<chrono::DateTime<chrono::Utc>>,
    end_time: Option<chrono::DateTime<chrono::Utc>>,
) -> anyhow::Result<()> {
    let record = ArtifactRecord::new(artifact.clone(), fps, requested)
        .with_time_range(start_time, end_time);
    let sidecar = artifact.path.with_extension(format!(
        "{}.meta.json",
        artifact
            .path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default()
    ));
    let json = serde_json::to_string_pretty(&record)?;
    std::fs::write(&sidecar, json)
        .with_context(|| format!("could not write sidecar {}", sidecar.display()))?;
    Ok(())
}
