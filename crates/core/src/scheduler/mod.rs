use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;
use image::ImageFormat;

use crate::events::{EventSink, SessionEvent, SessionEventKind};
use crate::source::FrameSource;
use crate::{naming, CaptureConfig, Result, TimelapseError};

/// Upper bound on how long the loop sleeps between due-time checks, which
/// also bounds how late a stop request can be observed.
const MAX_IDLE_POLL: Duration = Duration::from_millis(50);

/// Lifecycle of one capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    Stopped,
}

/// Cooperative stop signal shared between the scheduler loop and whoever
/// requests shutdown (a Ctrl-C handler, another thread, a test).
///
/// Raising it is always safe: before a session starts it makes the loop
/// exit at its first check, and raising it twice is harmless.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests that the running session stop at its next loop check.
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Pulls frames from a [`FrameSource`] at a fixed cadence and persists each
/// one under a freshly allocated name.
///
/// Cadence uses a next-due deadline advanced by one cycle after each capture
/// and compared with `>=`, so loop overhead cannot silently skip ticks the
/// way a wall-clock-modulo check would. If the loop falls more than a full
/// cycle behind, missed ticks are dropped rather than captured in a burst.
#[derive(Debug)]
pub struct CaptureScheduler {
    config: CaptureConfig,
    state: SessionState,
}

impl CaptureScheduler {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Runs the capture loop until `stop` is raised or a read fails.
    ///
    /// The source is released exactly once, on every exit path. An in-flight
    /// capture always completes before the loop exits; stop requests are
    /// only observed between iterations.
    pub fn run(
        &mut self,
        source: &mut dyn FrameSource,
        events: &dyn EventSink,
        stop: &StopHandle,
    ) -> Result<()> {
        self.state = SessionState::Running;
        let cycle = Duration::from_millis(self.config.cycle_millis);
        let poll = cycle.min(MAX_IDLE_POLL);
        let mut next_due = Instant::now();

        let result = loop {
            if stop.is_stopped() {
                break Ok(());
            }
            let now = Instant::now();
            if now >= next_due {
                if let Err(err) = self.capture_once(source, events) {
                    events.emit(&SessionEvent::now(SessionEventKind::CaptureFailure {
                        detail: err.to_string(),
                    }));
                    break Err(err);
                }
                while next_due <= Instant::now() {
                    next_due += cycle;
                }
            } else {
                std::thread::sleep(poll.min(next_due - now));
            }
        };

        source.release();
        self.state = SessionState::Stopped;
        result
    }

    /// Captures one frame and writes it to the output directory.
    fn capture_once(
        &self,
        source: &mut dyn FrameSource,
        events: &dyn EventSink,
    ) -> Result<PathBuf> {
        let frame = source.read_frame()?;

        let dir = &self.config.output_dir;
        std::fs::create_dir_all(dir).map_err(|source| TimelapseError::DirectoryCreate {
            path: dir.clone(),
            source,
        })?;

        let name = naming::allocate(dir, Local::now())?;
        let path = dir.join(name);
        frame.save_with_format(&path, ImageFormat::Jpeg)?;

        events.emit(&SessionEvent::now(SessionEventKind::CaptureSuccess {
            path: path.clone(),
        }));
        Ok(path)
    }
}
