//! Codec negotiation.
//!
//! Video encoder availability varies by platform and ffmpeg build, so the
//! engine probes an ordered preference list once per process by encoding a
//! single throwaway frame, and caches the first pair that works. When
//! nothing works the guaranteed-available MJPEG/AVI pair is used: codec
//! unavailability degrades quality, it never fails negotiation.

use std::path::Path;
use std::process::Command;
use std::sync::Mutex;

use image::RgbImage;
use snaplapse_common::{SnaplapseError, SnaplapseResult};
use snaplapse_frame_model::CodecChoice;

use crate::writer::VideoWriter;

/// Preference order, best first.
const PREFERRED: &[(&str, &str)] = &[
    ("libx264", ".mp4"),
    ("libopenh264", ".mp4"),
    ("mpeg4", ".mp4"),
    ("libvpx-vp9", ".webm"),
];

/// Guaranteed-available pair used when every preferred probe fails and as
/// the one-shot retry when a negotiated writer fails to open.
const FALLBACK: (&str, &str) = ("mjpeg", ".avi");

const PROBE_WIDTH: u32 = 100;
const PROBE_HEIGHT: u32 = 100;

/// Process-wide negotiated choice. Owned by this module; callers only ever
/// reach it through [`CodecNegotiator`]. The lock is held across the first
/// probe sequence so concurrent first callers wait and observe one cached
/// value, and only one set of probe files is ever created.
static CODEC_CACHE: Mutex<Option<CodecChoice>> = Mutex::new(None);

/// Probes and caches the encoder/container pair used for all encodes.
pub struct CodecNegotiator;

impl CodecNegotiator {
    /// Negotiate the codec choice, probing on first call and returning the
    /// cached result afterwards. Never fails: when no preferred pair
    /// works, the fallback pair is returned unprobed.
    pub fn negotiate(probe_dir: &Path) -> CodecChoice {
        let mut cache = CODEC_CACHE
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(choice) = cache.as_ref() {
            return choice.clone();
        }

        let choice = Self::probe_all(probe_dir);
        *cache = Some(choice.clone());
        choice
    }

    /// Drop the cached choice and negotiate again. Only needed when the
    /// platform's codec situation changed under a running process.
    pub fn renegotiate(probe_dir: &Path) -> CodecChoice {
        {
            let mut cache = CODEC_CACHE
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            *cache = None;
        }
        Self::negotiate(probe_dir)
    }

    /// The guaranteed-available pair.
    pub fn fallback_choice() -> CodecChoice {
        CodecChoice::new(FALLBACK.0, FALLBACK.1)
    }

    fn probe_all(probe_dir: &Path) -> CodecChoice {
        if let Err(e) = std::fs::create_dir_all(probe_dir) {
            tracing::warn!(dir = %probe_dir.display(), error = %e, "Could not create probe directory");
            return Self::fallback_choice();
        }

        for (encoder, ext) in PREFERRED {
            let choice = CodecChoice::new(*encoder, *ext);
            if Self::probe_pair(probe_dir, &choice) {
                tracing::info!(encoder, container = ext, "Negotiated video codec");
                return choice;
            }
        }

        tracing::info!(
            encoder = FALLBACK.0,
            container = FALLBACK.1,
            "No preferred codec available, using fallback"
        );
        Self::fallback_choice()
    }

    /// Encode one black frame to a throwaway file. The file is deleted
    /// whether or not the probe succeeds.
    fn probe_pair(probe_dir: &Path, choice: &CodecChoice) -> bool {
        let probe_path = probe_dir.join(format!("_codec_probe{}", choice.container_ext));
        let result = Self::run_probe(&probe_path, choice);
        let _ = std::fs::remove_file(&probe_path);

        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(encoder = %choice.encoder, error = %e, "Codec probe failed");
                false
            }
        }
    }

    fn run_probe(probe_path: &Path, choice: &CodecChoice) -> SnaplapseResult<()> {
        let mut writer = VideoWriter::open(probe_path, choice, PROBE_WIDTH, PROBE_HEIGHT, 1)?;
        writer.write_frame(&RgbImage::new(PROBE_WIDTH, PROBE_HEIGHT))?;
        writer.finish()?;

        let size = std::fs::metadata(probe_path).map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            return Err(SnaplapseError::output_validation(probe_path));
        }
        Ok(())
    }
}

/// Whether an ffmpeg binary is reachable on PATH.
pub fn ffmpeg_available() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negotiation_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let first = CodecNegotiator::negotiate(dir.path());
        let second = CodecNegotiator::negotiate(dir.path());
        assert_eq!(first, second);
    }

    #[test]
    fn test_no_probe_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        CodecNegotiator::negotiate(dir.path());
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("_codec_probe"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_fallback_choice_is_mjpeg_avi() {
        let fallback = CodecNegotiator::fallback_choice();
        assert_eq!(fallback.encoder, "mjpeg");
        assert_eq!(fallback.container_ext, ".avi");
    }
}
