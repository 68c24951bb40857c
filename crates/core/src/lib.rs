//! Core library for the timelapse capture and assembly tool.
//!
//! The crate is organised as one module per subsystem: frame sourcing from a
//! capture device, collision-free frame naming, the fixed-cadence capture
//! scheduler, frame-to-video assembly, and the session lifecycle controller
//! that ties them together. The CLI shell, signal wiring, and the terminal
//! confirm prompt live in the app crate and reach the core through the
//! [`FrameSource`], [`Confirm`], and [`EventSink`] seams.

pub mod assembler;
pub mod config;
pub mod error;
pub mod events;
pub mod naming;
pub mod scheduler;
pub mod session;
pub mod source;

pub use assembler::{collect_frames, FfmpegSink, VideoAssemblyJob, VideoSink, VIDEO_FILE_NAME};
pub use config::{CaptureConfig, DEFAULT_IMAGE_DIR, DEFAULT_VIDEO_DIR};
pub use error::{Result, TimelapseError};
pub use events::{EventSink, LogSink, SessionEvent, SessionEventKind};
pub use scheduler::{CaptureScheduler, SessionState, StopHandle};
pub use session::{Confirm, LifecycleController};
pub use source::{CameraSource, FrameSource};
