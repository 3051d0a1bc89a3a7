//! Check ffmpeg and codec availability.

use snaplapse_render_engine::{ffmpeg_available, CodecNegotiator, OverlayRenderer};

use super::resolve_videos_dir;

pub fn run(force: bool) -> anyhow::Result<()> {
    println!("Snaplapse System Check");
    println!("{}", "=".repeat(50));

    if !ffmpeg_available() {
        println!("[FAIL] ffmpeg: not found on PATH");
        println!();
        println!("Install ffmpeg to render videos.");
        return Ok(());
    }
    println!("[OK] ffmpeg: found on PATH");

    let probe_dir = resolve_videos_dir(None);
    let choice = if force {
        CodecNegotiator::renegotiate(&probe_dir)
    } else {
        CodecNegotiator::negotiate(&probe_dir)
    };
    println!("[OK] Negotiated codec: {choice}");

    match OverlayRenderer::load() {
        Ok(_) => println!("[OK] Overlay font: found"),
        Err(e) => println!("[WARN] Overlay font: {e} (timestamp burn-in will be skipped)"),
    }

    println!();
    println!("Snaplapse is ready. Videos will be written to {}", probe_dir.display());
    Ok(())
}
