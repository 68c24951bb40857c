use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use image::imageops::FilterType;
use image::RgbImage;
use serde::Serialize;

use crate::events::{EventSink, SessionEvent, SessionEventKind};
use crate::naming::FRAME_EXT;
use crate::{Result, TimelapseError};

/// Name of the assembled video inside the destination directory.
pub const VIDEO_FILE_NAME: &str = "out.mp4";

/// One frame-to-video assembly run. Transient; owns nothing beyond its
/// parameters and exists only for the duration of `assemble`.
#[derive(Debug, Clone)]
pub struct VideoAssemblyJob {
    pub source_dir: PathBuf,
    pub dest_dir: PathBuf,
    pub frame_size: (u32, u32),
    pub frame_rate: f64,
}

/// Sidecar metadata written next to the finished video.
#[derive(Debug, Serialize)]
struct VideoMetadata {
    width: u32,
    height: u32,
    frame_rate: f64,
    frame_count: usize,
}

/// Ordered write sink for encoded video frames.
///
/// `finish` flushes and finalizes the output; dropping a sink without
/// calling it discards any partial output instead of leaving a file that
/// looks complete.
pub trait VideoSink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()>;
    fn finish(self: Box<Self>) -> Result<()>;
}

impl VideoAssemblyJob {
    /// Encodes every frame image under `source_dir`, in capture order, into
    /// `<dest_dir>/out.mp4`. Returns the output path.
    ///
    /// Fails with `NoFramesFound` before creating the destination directory
    /// or starting the encoder. A frame that fails to decode aborts the
    /// whole job; the partial output is discarded rather than surfaced as a
    /// finished video.
    pub fn assemble(&self, events: &dyn EventSink) -> Result<PathBuf> {
        let frames = collect_frames(&self.source_dir)?;

        std::fs::create_dir_all(&self.dest_dir).map_err(|source| {
            TimelapseError::DirectoryCreate {
                path: self.dest_dir.clone(),
                source,
            }
        })?;
        let output = self.dest_dir.join(VIDEO_FILE_NAME);
        let sink = FfmpegSink::spawn(&output, self.frame_size, self.frame_rate)?;

        let frame_count = self.encode_frames(&frames, Box::new(sink), events)?;

        let metadata = VideoMetadata {
            width: self.frame_size.0,
            height: self.frame_size.1,
            frame_rate: self.frame_rate,
            frame_count,
        };
        let sidecar = self.dest_dir.join(format!("{VIDEO_FILE_NAME}.json"));
        std::fs::write(&sidecar, serde_json::to_string_pretty(&metadata)?)?;

        events.emit(&SessionEvent::now(SessionEventKind::AssemblyComplete {
            output: output.clone(),
        }));
        Ok(output)
    }

    /// Decodes `frames` in order and streams them into `sink`.
    ///
    /// Frames whose dimensions differ from the job's frame size are resized
    /// exactly; device-side mode clamping makes that reachable in practice.
    fn encode_frames(
        &self,
        frames: &[PathBuf],
        mut sink: Box<dyn VideoSink>,
        events: &dyn EventSink,
    ) -> Result<usize> {
        let (width, height) = self.frame_size;
        let total = frames.len();
        for (index, path) in frames.iter().enumerate() {
            let decoded = image::open(path)?.into_rgb8();
            let frame = if decoded.dimensions() == self.frame_size {
                decoded
            } else {
                image::imageops::resize(&decoded, width, height, FilterType::Triangle)
            };
            sink.write_frame(&frame)?;
            events.emit(&SessionEvent::now(SessionEventKind::AssemblyProgress {
                done: index + 1,
                total,
            }));
        }
        sink.finish()?;
        Ok(total)
    }
}

/// Lists the frame images under `dir` in capture order.
///
/// Sorting is by filename prefix, then by the parsed numeric disambiguation
/// suffix, so `_2` correctly precedes `_10` even though a plain string sort
/// would not put it there.
pub fn collect_frames(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut frames = Vec::new();
    if dir.is_dir() {
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == FRAME_EXT) {
                frames.push(path);
            }
        }
    }
    if frames.is_empty() {
        return Err(TimelapseError::NoFramesFound(dir.to_path_buf()));
    }
    frames.sort_by_key(|path| sort_key(path));
    Ok(frames)
}

/// Capture-order key for a frame path: `(second prefix, numeric suffix)`.
fn sort_key(path: &Path) -> (String, u64) {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let parts: Vec<&str> = stem.splitn(3, '_').collect();
    if parts.len() == 3 {
        if let Ok(n) = parts[2].parse::<u64>() {
            return (format!("{}_{}", parts[0], parts[1]), n);
        }
    }
    (stem.to_string(), 0)
}

/// Encoder sink backed by an `ffmpeg` child process.
///
/// Raw RGB24 frames are piped over stdin and encoded as H.264 in an MP4
/// container. If the sink is dropped before `finish`, the child is killed
/// and the partial output file removed.
pub struct FfmpegSink {
    child: Child,
    stdin: Option<ChildStdin>,
    output: PathBuf,
    finished: bool,
}

impl FfmpegSink {
    pub fn spawn(output: &Path, frame_size: (u32, u32), frame_rate: f64) -> Result<Self> {
        let (width, height) = frame_size;
        let mut child = Command::new("ffmpeg")
            .args([
                "-y",
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgb24",
                "-s",
                &format!("{width}x{height}"),
                "-r",
                &frame_rate.to_string(),
                "-i",
                "pipe:0",
                "-c:v",
                "libx264",
                "-pix_fmt",
                "yuv420p",
                "-movflags",
                "+faststart",
            ])
            .arg(output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| TimelapseError::EncoderInit(format!("failed to spawn ffmpeg: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| TimelapseError::EncoderInit("ffmpeg stdin not piped".to_string()))?;

        tracing::debug!(output = %output.display(), width, height, frame_rate, "ffmpeg started");
        Ok(Self {
            child,
            stdin: Some(stdin),
            output: output.to_path_buf(),
            finished: false,
        })
    }

    fn discard_partial_output(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        if let Err(e) = std::fs::remove_file(&self.output) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(output = %self.output.display(), error = %e, "failed to remove partial video");
            }
        }
    }
}

impl VideoSink for FfmpegSink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| TimelapseError::EncoderWrite("encoder already closed".to_string()))?;
        stdin
            .write_all(frame.as_raw())
            .map_err(|e| TimelapseError::EncoderWrite(e.to_string()))
    }

    fn finish(mut self: Box<Self>) -> Result<()> {
        // Closing stdin signals EOF so ffmpeg finalizes the container.
        drop(self.stdin.take());
        let status = self
            .child
            .wait()
            .map_err(|e| TimelapseError::EncoderWrite(e.to_string()))?;
        self.finished = true;
        if !status.success() {
            let _ = std::fs::remove_file(&self.output);
            return Err(TimelapseError::EncoderWrite(format!(
                "ffmpeg exited with {status}"
            )));
        }
        Ok(())
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if !self.finished {
            self.discard_partial_output();
        }
    }
}
