use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Result, TimelapseError};

/// Default directory that captured frames are written to.
pub const DEFAULT_IMAGE_DIR: &str = "capture_images";
/// Default directory that assembled videos are written to.
pub const DEFAULT_VIDEO_DIR: &str = "video_out";

/// Configuration for one capture session.
///
/// Immutable once the session starts. Resolution and frame rate are requests,
/// not guarantees: the capture device may clamp them to the nearest supported
/// mode, so the effective values come from the opened [`crate::FrameSource`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
    pub device_index: u32,
    pub cycle_millis: u64,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_video_dir")]
    pub video_dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_IMAGE_DIR)
}

fn default_video_dir() -> PathBuf {
    PathBuf::from(DEFAULT_VIDEO_DIR)
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            frame_rate: 30.0,
            device_index: 1,
            cycle_millis: 1_000,
            output_dir: default_output_dir(),
            video_dir: default_video_dir(),
        }
    }
}

impl CaptureConfig {
    /// Loads a configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| TimelapseError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values that a session could not run with.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(TimelapseError::InvalidConfig(format!(
                "frame size {}x{} must be non-zero",
                self.width, self.height
            )));
        }
        if !(self.frame_rate > 0.0) {
            return Err(TimelapseError::InvalidConfig(format!(
                "frame rate {} must be positive",
                self.frame_rate
            )));
        }
        if self.cycle_millis == 0 {
            return Err(TimelapseError::InvalidConfig(
                "capture cycle must be at least 1 ms".to_string(),
            ));
        }
        Ok(())
    }
}
