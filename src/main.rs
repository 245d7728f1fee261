use clap::Parser;
use log::{info, warn};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use overlens::surface::{Command, parse_command};
use overlens::{
    AppConfig, ControlEvent, DetectionLoop, DirectorySink, LabelFont, LogSurface,
    OverlayRenderer, ScriptedDetector, StillImageSource,
};

#[derive(Parser)]
#[command(name = "overlens")]
#[command(about = "Overlay smoothed object detections on a live frame feed")]
struct Cli {
    /// Image file or directory of images used as the camera feed
    #[arg(long, value_name = "PATH")]
    frames: PathBuf,

    /// Detection script (TOML) replayed by the detector
    #[arg(long, value_name = "FILE")]
    script: PathBuf,

    /// Configuration file (TOML)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory for captured snapshots
    #[arg(long, value_name = "DIR")]
    export_dir: Option<PathBuf>,

    /// Processing rate in cycles per second
    #[arg(long)]
    fps: Option<u32>,

    /// Minimum confidence in percent
    #[arg(long)]
    confidence: Option<u32>,

    /// Start with detection enabled
    #[arg(long)]
    ai: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(dir) = args.export_dir {
        config.export_dir = dir;
    }
    if let Some(fps) = args.fps {
        config.session.set_frame_rate(fps);
    }
    if let Some(percent) = args.confidence {
        config.session.set_confidence_percent(percent);
    }
    if args.ai {
        config.session.set_ai_enabled(true);
    }

    let detector = ScriptedDetector::load(&args.script)?;
    let renderer = OverlayRenderer::new(LabelFont::discover(config.font_path.as_deref()));

    let mut detection_loop = DetectionLoop::with_config(
        Box::new(StillImageSource::new(&args.frames)),
        Box::new(detector),
        Box::new(LogSurface::new()),
        Box::new(DirectorySink::new(&config.export_dir)),
        &config,
    )
    .with_renderer(renderer);

    let (tx, rx) = mpsc::channel::<ControlEvent>(32);
    tokio::spawn(read_commands(tx));

    info!(
        "Running at {:?} per cycle, confidence >= {:.2}, AI {}",
        config.session.cycle_interval(),
        config.session.confidence_threshold(),
        if config.session.ai_enabled() { "on" } else { "off" }
    );
    detection_loop.run(rx).await
}

/// Forward stdin commands to the loop; dropping `tx` stops it
async fn read_commands(tx: mpsc::Sender<ControlEvent>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read command: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match parse_command(&line) {
            Ok(Command::Control(event)) => {
                if tx.send(event).await.is_err() {
                    break;
                }
            }
            Ok(Command::Quit) => break,
            Err(e) => warn!("{}", e),
        }
    }
}
