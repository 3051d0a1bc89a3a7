//! Render several snapshot directories side by side.

use std::path::PathBuf;

use anyhow::bail;
use snaplapse_render_engine::ComparisonCompositor;

use super::{collect_frames, resolve_videos_dir};

pub fn run(
    dirs: Vec<PathBuf>,
    output: String,
    fps: u32,
    videos_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut groups = Vec::with_capacity(dirs.len());
    for dir in &dirs {
        let frames = collect_frames(dir)?;
        if frames.is_empty() {
            println!("Warning: no snapshot images in {}, tile will be black", dir.display());
        }
        groups.push(frames);
    }
    if groups.iter().all(|g| g.is_empty()) {
        bail!("no snapshot images found in any of the given directories");
    }

    let longest = groups.iter().map(|g| g.len()).max().unwrap_or(0);
    println!(
        "Comparing {} directories ({} composite frames) at {} fps",
        dirs.len(),
        longest,
        fps
    );

    let videos_dir = resolve_videos_dir(videos_dir);
    let artifact = ComparisonCompositor::new(videos_dir).composite(&groups, &output, fps, None)?;

    println!("Wrote {}", artifact.path.display());
    println!(
        "  {} frames, {}x{}, codec {}",
        artifact.frame_count, artifact.width, artifact.height, artifact.codec
    );
    Ok(())
}
