use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Local};

/// What happened during a session, without the timestamp.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEventKind {
    /// One frame was captured and persisted at the given path.
    CaptureSuccess { path: PathBuf },
    /// A frame read failed; the session stops after this event.
    CaptureFailure { detail: String },
    /// One frame of `total` was encoded into the output video.
    AssemblyProgress { done: usize, total: usize },
    /// The output video was finalized.
    AssemblyComplete { output: PathBuf },
}

/// A timestamped observability event emitted by the scheduler and assembler.
#[derive(Debug, Clone)]
pub struct SessionEvent {
    pub timestamp: DateTime<Local>,
    pub kind: SessionEventKind,
}

impl SessionEvent {
    pub fn now(kind: SessionEventKind) -> Self {
        Self {
            timestamp: Local::now(),
            kind,
        }
    }
}

/// Receiver for session events. Implementations must not fail; reporting is
/// best-effort and never interrupts capture or assembly.
pub trait EventSink {
    fn emit(&self, event: &SessionEvent);
}

/// Default sink that forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: &SessionEvent) {
        let ts = event.timestamp.format("%Y-%m-%d %H:%M:%S");
        match &event.kind {
            SessionEventKind::CaptureSuccess { path } => {
                tracing::info!(timestamp = %ts, path = %path.display(), "capture success");
            }
            SessionEventKind::CaptureFailure { detail } => {
                tracing::error!(timestamp = %ts, %detail, "capture failed");
            }
            SessionEventKind::AssemblyProgress { done, total } => {
                tracing::info!(done, total, "assembly progress");
            }
            SessionEventKind::AssemblyComplete { output } => {
                tracing::info!(output = %output.display(), "assembly complete");
            }
        }
    }
}

/// Test sink that records every event it receives.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SessionEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kinds(&self) -> Vec<SessionEventKind> {
        self.events
            .lock()
            .expect("event sink poisoned")
            .iter()
            .map(|e| e.kind.clone())
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &SessionEvent) {
        self.events
            .lock()
            .expect("event sink poisoned")
            .push(event.clone());
    }
}
