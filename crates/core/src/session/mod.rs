use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::assembler::VideoAssemblyJob;
use crate::events::EventSink;
use crate::scheduler::{CaptureScheduler, StopHandle};
use crate::source::FrameSource;
use crate::{CaptureConfig, Result, TimelapseError};

/// Blocking yes/no question put to the user, e.g. a terminal prompt.
/// Only consulted when a running session is interrupted.
pub trait Confirm {
    fn ask_yes_no(&mut self, prompt: &str) -> bool;
}

/// Owns one capture session end to end: runs the scheduler, and on an
/// external interruption optionally hands the captured frames to the
/// assembler.
///
/// The output directory has a single writer. While a session is running the
/// controller refuses to assemble from it; assembly after an interruption
/// only starts once the scheduler has fully stopped.
pub struct LifecycleController {
    config: CaptureConfig,
    capturing: AtomicBool,
}

impl LifecycleController {
    pub fn new(config: CaptureConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            capturing: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Runs a capture session until `stop` is raised or the source fails.
    ///
    /// On a clean (interrupted) stop, asks `confirm` whether to assemble the
    /// captured frames and blocks until assembly completes; returns the
    /// video path if one was produced. A source failure surfaces as an error
    /// without prompting.
    pub fn run(
        &self,
        source: &mut dyn FrameSource,
        confirm: &mut dyn Confirm,
        events: &dyn EventSink,
        stop: &StopHandle,
    ) -> Result<Option<PathBuf>> {
        if self.capturing.swap(true, Ordering::SeqCst) {
            return Err(TimelapseError::SessionActive);
        }
        let mut scheduler = CaptureScheduler::new(self.config.clone());
        let session = scheduler.run(source, events, stop);
        self.capturing.store(false, Ordering::SeqCst);
        session?;

        if confirm.ask_yes_no("Make video? [y/n] ") {
            let output = self.assembly_job().assemble(events)?;
            return Ok(Some(output));
        }
        Ok(None)
    }

    /// Assembles a previously captured frame set without capturing anything.
    pub fn make_video_only(&self, events: &dyn EventSink) -> Result<PathBuf> {
        if self.capturing.load(Ordering::SeqCst) {
            return Err(TimelapseError::AssemblyWhileCapturing(
                self.config.output_dir.clone(),
            ));
        }
        self.assembly_job().assemble(events)
    }

    fn assembly_job(&self) -> VideoAssemblyJob {
        VideoAssemblyJob {
            source_dir: self.config.output_dir.clone(),
            dest_dir: self.config.video_dir.clone(),
            frame_size: (self.config.width, self.config.height),
            frame_rate: self.config.frame_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingSink;
    use crate::source::testing::ScriptedSource;
    use std::sync::Arc;
    use std::time::Duration;

    struct ScriptedConfirm {
        answer: bool,
        asked: usize,
    }

    impl ScriptedConfirm {
        fn new(answer: bool) -> Self {
            Self { answer, asked: 0 }
        }
    }

    impl Confirm for ScriptedConfirm {
        fn ask_yes_no(&mut self, _prompt: &str) -> bool {
            self.asked += 1;
            self.answer
        }
    }

    fn controller(tmp: &std::path::Path) -> LifecycleController {
        let config = CaptureConfig {
            cycle_millis: 5,
            output_dir: tmp.join("frames"),
            video_dir: tmp.join("video"),
            ..CaptureConfig::default()
        };
        LifecycleController::new(config).unwrap()
    }

    #[test]
    fn rejects_invalid_configuration() {
        let config = CaptureConfig {
            cycle_millis: 0,
            ..CaptureConfig::default()
        };
        assert!(LifecycleController::new(config).is_err());
    }

    #[test]
    fn interrupted_session_declining_video_returns_none() {
        let tmp = tempfile::tempdir().unwrap();
        let controller = controller(tmp.path());
        let mut source = ScriptedSource::unlimited();
        let mut confirm = ScriptedConfirm::new(false);
        let sink = RecordingSink::new();
        let stop = StopHandle::new();
        stop.stop();

        let output = controller
            .run(&mut source, &mut confirm, &sink, &stop)
            .unwrap();

        assert!(output.is_none());
        assert_eq!(confirm.asked, 1);
    }

    #[test]
    fn source_failure_surfaces_without_prompting() {
        let tmp = tempfile::tempdir().unwrap();
        let controller = controller(tmp.path());
        let mut source = ScriptedSource::failing_after(0);
        let mut confirm = ScriptedConfirm::new(true);
        let sink = RecordingSink::new();
        let stop = StopHandle::new();

        let err = controller
            .run(&mut source, &mut confirm, &sink, &stop)
            .unwrap_err();

        assert!(matches!(err, TimelapseError::ReadFailure(_)));
        assert_eq!(confirm.asked, 0, "failure must not prompt for assembly");
    }

    #[test]
    fn make_video_only_on_empty_directory_fails_cleanly() {
        let tmp = tempfile::tempdir().unwrap();
        let controller = controller(tmp.path());
        let sink = RecordingSink::new();

        let err = controller.make_video_only(&sink).unwrap_err();

        assert!(matches!(err, TimelapseError::NoFramesFound(_)));
        assert!(!tmp.path().join("video").exists());
    }

    #[test]
    fn assembly_is_refused_while_a_session_holds_the_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let controller = Arc::new(controller(tmp.path()));
        let stop = StopHandle::new();

        let worker = {
            let controller = Arc::clone(&controller);
            let stop = stop.clone();
            std::thread::spawn(move || {
                let mut source = ScriptedSource::unlimited();
                let mut confirm = ScriptedConfirm::new(false);
                let sink = RecordingSink::new();
                controller.run(&mut source, &mut confirm, &sink, &stop)
            })
        };

        // Before the worker enters its loop the directory is simply empty;
        // once it is running, assembly must be refused outright.
        let sink = RecordingSink::new();
        let mut refused = false;
        for _ in 0..200 {
            match controller.make_video_only(&sink) {
                Err(TimelapseError::AssemblyWhileCapturing(_)) => {
                    refused = true;
                    break;
                }
                Err(TimelapseError::NoFramesFound(_)) => {
                    std::thread::sleep(Duration::from_millis(5));
                }
                other => panic!("unexpected assembly result: {other:?}"),
            }
        }
        assert!(refused, "running session never blocked assembly");

        stop.stop();
        worker.join().unwrap().unwrap();
    }

    #[test]
    fn assembly_job_mirrors_the_session_configuration() {
        let tmp = tempfile::tempdir().unwrap();
        let controller = controller(tmp.path());
        let job = controller.assembly_job();

        assert_eq!(job.source_dir, controller.config().output_dir);
        assert_eq!(job.dest_dir, controller.config().video_dir);
        assert_eq!(
            job.frame_size,
            (controller.config().width, controller.config().height)
        );
        assert_eq!(job.frame_rate, controller.config().frame_rate);
    }
}
