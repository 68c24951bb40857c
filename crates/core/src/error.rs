use std::path::PathBuf;

/// Result alias that carries the custom [`TimelapseError`] type.
pub type Result<T> = std::result::Result<T, TimelapseError>;

/// Common error type for the core crate.
///
/// Every failure mode surfaces through this enum so the lifecycle controller
/// can report it; nothing is swallowed below that layer.
#[derive(Debug, thiserror::Error)]
pub enum TimelapseError {
    /// The capture device could not be opened at session start.
    #[error("capture device {index} unavailable: {reason}")]
    DeviceUnavailable { index: u32, reason: String },
    /// A frame read failed mid-session. Fatal for the session.
    #[error("frame read failed: {0}")]
    ReadFailure(String),
    /// An output directory could not be created.
    #[error("failed to create directory {}: {source}", path.display())]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Assembly was requested against a directory with no frame images.
    #[error("no frames found in {}", .0.display())]
    NoFramesFound(PathBuf),
    /// The video encoder could not be started.
    #[error("failed to start video encoder: {0}")]
    EncoderInit(String),
    /// Writing to or finalizing the video encoder failed.
    #[error("video encoder write failed: {0}")]
    EncoderWrite(String),
    /// A second capture session was started while one is still running.
    #[error("a capture session is already running")]
    SessionActive,
    /// Assembly was requested while a capture session holds the directory.
    #[error("capture session is still writing to {}, refusing to assemble", .0.display())]
    AssemblyWhileCapturing(PathBuf),
    /// Rejected configuration values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Wrapper around image decode/encode errors.
    #[error("{0}")]
    Image(#[from] image::ImageError),
    /// Wrapper around JSON (de)serialization errors.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}
