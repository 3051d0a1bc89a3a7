//! Raw frame sink backed by an ffmpeg child process.
//!
//! Frames are streamed as rgb24 rawvideo over the child's stdin; ffmpeg
//! handles encoding and container muxing. stderr is drained on a helper
//! thread so ffmpeg can never block on a full pipe.

use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;
use std::time::Duration;

use image::RgbImage;
use snaplapse_common::{SnaplapseError, SnaplapseResult};
use snaplapse_frame_model::CodecChoice;

use crate::codec::CodecNegotiator;

/// Streams raw frames into an encoding ffmpeg process.
#[derive(Debug)]
pub struct VideoWriter {
    child: Child,
    stdin: Option<BufWriter<ChildStdin>>,
    stderr_task: Option<JoinHandle<String>>,
    path: PathBuf,
    width: u32,
    height: u32,
    frames_written: usize,
    finished: bool,
}

impl VideoWriter {
    /// Spawn an ffmpeg process encoding rgb24 rawvideo from stdin into
    /// `path` with the given codec choice.
    pub fn open(
        path: &Path,
        codec: &CodecChoice,
        width: u32,
        height: u32,
        fps: u32,
    ) -> SnaplapseResult<Self> {
        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-y", "-hide_banner", "-loglevel", "error"])
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24"])
            .arg("-s")
            .arg(format!("{width}x{height}"))
            .arg("-r")
            .arg(fps.to_string())
            .args(["-i", "pipe:0", "-an"])
            .arg("-c:v")
            .arg(&codec.encoder);

        // H.264-family encoders need a player-compatible pixel format.
        if codec.encoder.contains("264") {
            cmd.args(["-pix_fmt", "yuv420p", "-movflags", "+faststart"]);
        }

        cmd.arg(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| {
            SnaplapseError::writer_init(format!(
                "failed to start ffmpeg for encoder {}: {e}",
                codec.encoder
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SnaplapseError::render("failed to capture ffmpeg stdin"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| SnaplapseError::render("failed to capture ffmpeg stderr"))?;

        let stderr_task = std::thread::spawn(move || -> String {
            let mut reader = std::io::BufReader::new(stderr);
            let mut output = String::new();
            match reader.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        // An unusable encoder makes ffmpeg exit before reading any input;
        // poll briefly so the caller can retry with the fallback pair
        // instead of failing mid-stream. The window is a heuristic: an
        // encoder that fails slower than this surfaces at finish() with
        // its stderr attached, and negotiation has already probed the
        // encoder on the normal path.
        let mut startup_exit = None;
        for _ in 0..8 {
            std::thread::sleep(Duration::from_millis(10));
            if let Some(status) = child.try_wait()? {
                startup_exit = Some(status);
                break;
            }
        }
        if let Some(status) = startup_exit {
            let detail = stderr_task.join().unwrap_or_default();
            return Err(SnaplapseError::writer_init(format!(
                "ffmpeg exited during startup for encoder {} (status {status}): {}",
                codec.encoder,
                detail.trim()
            )));
        }

        Ok(Self {
            child,
            stdin: Some(BufWriter::new(stdin)),
            stderr_task: Some(stderr_task),
            path: path.to_path_buf(),
            width,
            height,
            frames_written: 0,
            finished: false,
        })
    }

    /// Stream one frame. The frame must match the dimensions the writer
    /// was opened with.
    pub fn write_frame(&mut self, frame: &RgbImage) -> SnaplapseResult<()> {
        debug_assert_eq!(frame.dimensions(), (self.width, self.height));

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| SnaplapseError::render("video writer already finished"))?;
        stdin.write_all(frame.as_raw()).map_err(|e| {
            SnaplapseError::render(format!("failed to stream frame to ffmpeg: {e}"))
        })?;
        self.frames_written += 1;
        Ok(())
    }

    /// Close the input stream, wait for ffmpeg to finish, and surface its
    /// stderr on failure. Returns the number of frames written.
    ///
    /// On a flush or wait error `finished` stays unset, so the drop
    /// handler kills and reaps the child instead of leaving a zombie.
    pub fn finish(mut self) -> SnaplapseResult<usize> {
        if let Some(mut stdin) = self.stdin.take() {
            stdin.flush().map_err(|e| {
                SnaplapseError::render(format!("failed to flush frames to ffmpeg: {e}"))
            })?;
            // Dropping stdin signals end of stream.
        }

        let status = self
            .child
            .wait()
            .map_err(|e| SnaplapseError::render(format!("failed to wait on ffmpeg: {e}")))?;
        self.finished = true;

        let stderr_output = self
            .stderr_task
            .take()
            .map(|t| t.join().unwrap_or_else(|_| "<failed to join stderr reader>".to_string()))
            .unwrap_or_default();

        if !status.success() {
            return Err(SnaplapseError::render(format!(
                "ffmpeg encode failed (status {status}): {}",
                stderr_output.trim()
            )));
        }

        Ok(self.frames_written)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn frames_written(&self) -> usize {
        self.frames_written
    }
}

impl Drop for VideoWriter {
    fn drop(&mut self) {
        if !self.finished {
            // Abandoned mid-encode; don't leave a child process behind.
            drop(self.stdin.take());
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Open a writer for `output_name` under `videos_dir`, retrying once with
/// the guaranteed-fallback encoder/container when the preferred pair
/// fails. Bounded: at most two attempts.
pub(crate) fn open_with_fallback(
    videos_dir: &Path,
    output_name: &str,
    preferred: &CodecChoice,
    width: u32,
    height: u32,
    fps: u32,
) -> SnaplapseResult<(VideoWriter, CodecChoice, PathBuf)> {
    let stem = output_stem(output_name);
    let fallback = CodecNegotiator::fallback_choice();

    let mut attempts = vec![preferred.clone()];
    if *preferred != fallback {
        attempts.push(fallback);
    }

    let mut last_error = String::new();
    for (attempt, choice) in attempts.iter().enumerate() {
        let path = videos_dir.join(format!("{stem}{}", choice.container_ext));
        match VideoWriter::open(&path, choice, width, height, fps) {
            Ok(writer) => {
                if attempt > 0 {
                    tracing::warn!(
                        encoder = %choice.encoder,
                        "Preferred encoder failed to open, using fallback"
                    );
                }
                return Ok((writer, choice.clone(), path));
            }
            Err(e) => {
                tracing::warn!(encoder = %choice.encoder, error = %e, "Video writer failed to open");
                last_error = e.to_string();
            }
        }
    }

    Err(SnaplapseError::writer_init(format!(
        "no encoder/container combination could be opened: {last_error}"
    )))
}

/// Strip any caller-supplied extension; the negotiated container decides
/// the real one.
pub(crate) fn output_stem(output_name: &str) -> String {
    Path::new(output_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| output_name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ffmpeg_available;

    #[test]
    fn test_output_stem_strips_extension() {
        assert_eq!(output_stem("timelapse_20240501.mp4"), "timelapse_20240501");
        assert_eq!(output_stem("plain"), "plain");
        assert_eq!(output_stem("dotted.name.avi"), "dotted.name");
    }

    #[test]
    fn test_open_rejects_unknown_encoder() {
        if !ffmpeg_available() {
            eprintln!("skipping writer test, ffmpeg not on PATH");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let err = VideoWriter::open(
            &dir.path().join("out.avi"),
            &CodecChoice::new("definitely_not_an_encoder", ".avi"),
            32,
            32,
            10,
        )
        .unwrap_err();
        assert!(matches!(err, SnaplapseError::WriterInit { .. }));
    }

    #[test]
    fn test_finish_reaps_child_when_flush_fails() {
        if !ffmpeg_available() {
            eprintln!("skipping writer test, ffmpeg not on PATH");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.avi");
        let mut writer =
            VideoWriter::open(&path, &CodecChoice::new("mjpeg", ".avi"), 32, 32, 10).unwrap();
        let pid = writer.child.id();

        // Kill ffmpeg under the writer, then queue one frame small enough
        // to sit in the stdin buffer so the broken pipe surfaces at the
        // flush inside finish.
        writer.child.kill().unwrap();
        std::thread::sleep(Duration::from_millis(100));
        let _ = writer.write_frame(&RgbImage::new(32, 32));

        assert!(writer.finish().is_err());

        // The child must be reaped on the error path, not left as a
        // zombie until process exit.
        if let Ok(stat) = std::fs::read_to_string(format!("/proc/{pid}/stat")) {
            assert!(!stat.contains(") Z"), "ffmpeg child left unreaped: {stat}");
        }
    }
}
