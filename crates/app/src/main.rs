use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use timelapse_core::{
    CameraSource, CaptureConfig, Confirm, LifecycleController, LogSink, StopHandle,
};
use tracing_subscriber::EnvFilter;

fn main() {
    init_tracing();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        tracing::error!(error = %err, "timelapse failed");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> timelapse_core::Result<()> {
    let only_make_video = cli.only_make_video;
    let config = build_config(cli)?;
    let controller = LifecycleController::new(config)?;
    let events = LogSink;

    if only_make_video {
        let output = controller.make_video_only(&events)?;
        tracing::info!(output = %output.display(), "video written");
        return Ok(());
    }

    let stop = StopHandle::new();
    {
        let stop = stop.clone();
        if let Err(err) = ctrlc::set_handler(move || stop.stop()) {
            tracing::warn!(error = %err, "Ctrl-C handler not installed; stop with SIGKILL only");
        }
    }

    let mut source = CameraSource::open(controller.config())?;
    let mut confirm = StdinConfirm;
    tracing::info!(
        dir = %controller.config().output_dir.display(),
        cycle_ms = controller.config().cycle_millis,
        "capture started (Ctrl-C to stop)"
    );

    match controller.run(&mut source, &mut confirm, &events, &stop)? {
        Some(output) => tracing::info!(output = %output.display(), "video written"),
        None => tracing::info!("capture finished, frames kept on disk"),
    }
    Ok(())
}

fn build_config(cli: Cli) -> timelapse_core::Result<CaptureConfig> {
    let mut config = match &cli.config {
        Some(path) => CaptureConfig::from_json_file(path)?,
        None => CaptureConfig::default(),
    };
    if let Some(size) = cli.size {
        config.width = size[0];
        config.height = size[1];
    }
    if let Some(cycle) = cli.cycle {
        config.cycle_millis = cycle;
    }
    if let Some(capnum) = cli.capnum {
        config.device_index = capnum;
    }
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    if let Some(dir) = cli.video_dir {
        config.video_dir = dir;
    }
    config.validate()?;
    Ok(config)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

/// Answers the post-interrupt "make video?" question from stdin.
struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn ask_yes_no(&mut self, prompt: &str) -> bool {
        print!("\n{prompt}");
        let _ = std::io::stdout().flush();
        let mut line = String::new();
        if std::io::stdin().read_line(&mut line).is_err() {
            return false;
        }
        matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Fixed-cadence webcam time-lapse capture and assembly", long_about = None)]
struct Cli {
    /// Skip capture and assemble the existing frames into a video.
    #[arg(short = 'o', long)]
    only_make_video: bool,
    /// Capture width and height in pixels.
    #[arg(short, long, num_args = 2, value_names = ["WIDTH", "HEIGHT"])]
    size: Option<Vec<u32>>,
    /// Capture cycle in milliseconds.
    #[arg(short = 't', long)]
    cycle: Option<u64>,
    /// Capture device index.
    #[arg(short, long)]
    capnum: Option<u32>,
    /// Directory captured frames are written to.
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Directory the assembled video is written to.
    #[arg(long)]
    video_dir: Option<PathBuf>,
    /// JSON configuration file; flags override values it sets.
    #[arg(long)]
    config: Option<PathBuf>,
}
