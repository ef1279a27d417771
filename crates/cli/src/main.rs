use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use crossbeam_channel::{select, Receiver};

use moodcam_core::detection::infrastructure::model_loader::ModelLoader;
use moodcam_core::expression::domain::mood::MoodLabel;
use moodcam_core::expression::domain::mood_reducer::FaceSelection;
use moodcam_core::pipeline::expression_detector::ExpressionDetector;
use moodcam_core::pipeline::expression_poller::{PollerMessage, TickReport};
use moodcam_core::pipeline::mood_state::MoodSnapshot;
use moodcam_core::pipeline::tick_logger::SummaryTickLogger;
use moodcam_core::shared::model_resolver::ProgressFn;
use moodcam_core::shared::settings::Settings;
use moodcam_core::video::domain::frame_source::FrameSource;
use moodcam_core::video::domain::image_writer::{ImageWriter, SnapshotError};
use moodcam_core::video::infrastructure::ffmpeg_camera::{CameraConfig, CameraEvent, FfmpegCamera};
use moodcam_core::video::infrastructure::image_file_writer::ImageFileWriter;

const STATUS_INTERVAL: Duration = Duration::from_millis(100);

/// Live facial expression readout from a webcam.
#[derive(Parser)]
#[command(name = "moodcam")]
struct Cli {
    /// Capture device (e.g. /dev/video0, 0, "video=Integrated Camera") or a video file.
    #[arg(long)]
    device: Option<String>,

    /// ffmpeg input format (v4l2, avfoundation, dshow). "auto" lets ffmpeg detect it.
    #[arg(long)]
    format: Option<String>,

    /// Capture width in pixels.
    #[arg(long)]
    width: Option<u32>,

    /// Capture height in pixels.
    #[arg(long)]
    height: Option<u32>,

    /// Milliseconds between detection ticks.
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long)]
    confidence: Option<f64>,

    /// Which face decides the label: first or largest.
    #[arg(long)]
    face_selection: Option<FaceSelection>,

    /// Download models from this base URL instead of the default locations.
    #[arg(long)]
    model_base_url: Option<String>,

    /// Directory searched for model files before downloading.
    #[arg(long)]
    models_dir: Option<PathBuf>,

    /// Settings file (JSON). Defaults to the per-user settings file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Save an annotated PNG whenever the label changes.
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    /// Stop after this many seconds.
    #[arg(long)]
    duration_secs: Option<u64>,

    /// Print labels without ANSI colors.
    #[arg(long)]
    no_color: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let settings = build_settings(&cli)?;

    let loader = ModelLoader::from_settings(&settings)?;
    let mut detector = ExpressionDetector::from_settings(&settings)
        .with_tick_logger(Box::new(SummaryTickLogger::new()));
    eprintln!("Loading models...");
    detector.load_models(move || {
        let progress: &ProgressFn = &download_progress;
        loader.load(Some(progress))
    });

    let mut camera = FfmpegCamera::start(CameraConfig::from_settings(&settings))?;

    let (interrupt_tx, interrupt_rx) = crossbeam_channel::bounded(1);
    ctrlc::set_handler(move || {
        let _ = interrupt_tx.try_send(());
    })?;
    let deadline = match cli.duration_secs {
        Some(secs) => crossbeam_channel::after(Duration::from_secs(secs)),
        None => crossbeam_channel::never(),
    };
    let status = crossbeam_channel::tick(STATUS_INTERVAL);

    let mut messages: Receiver<PollerMessage> = crossbeam_channel::never();
    let mut presenter = Presenter::new(cli.snapshot_dir.clone(), !cli.no_color);
    let mut events = camera.events().clone();
    let mut models_announced = false;
    // A finished file leaves its last frame in place; keep going until that
    // frame has been analyzed once.
    let mut stream_ended = false;

    loop {
        select! {
            recv(events) -> event => match event {
                Ok(CameraEvent::Live(info)) => {
                    log::info!(
                        "Camera live: {} ({}, {}x{})",
                        info.device, info.codec, info.width, info.height
                    );
                    let source: Arc<dyn FrameSource> = camera.frames();
                    if let Some(rx) = detector.on_stream_live(source) {
                        messages = rx;
                    }
                }
                Ok(CameraEvent::Ended) | Err(_) => {
                    log::info!("Camera stream ended");
                    stream_ended = true;
                    events = crossbeam_channel::never();
                }
                Ok(CameraEvent::Failed(message)) => {
                    return Err(format!("camera failed: {message}").into());
                }
            },
            recv(messages) -> message => match message {
                Ok(message) => {
                    presenter.handle(message);
                    if stream_ended {
                        break;
                    }
                }
                Err(_) => break,
            },
            recv(status) -> _ => {
                if !models_announced && detector.is_ready() {
                    eprintln!("Models loaded");
                    models_announced = true;
                }
                if stream_ended && !detector.is_ready() && !detector.is_loading() {
                    break;
                }
            },
            recv(interrupt_rx) -> _ => {
                log::info!("Interrupted, shutting down");
                break;
            },
            recv(deadline) -> _ => break,
        }
    }

    detector.shutdown();
    camera.stop();

    if let Some(summary) = detector.summary() {
        eprintln!("\n{summary}");
    }
    if !detector.is_ready() {
        log::warn!("Models never finished loading; no expressions were detected");
    }
    Ok(())
}

/// Settings file (or defaults) with command-line overrides applied.
fn build_settings(cli: &Cli) -> Result<Settings, Box<dyn std::error::Error>> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load(),
    };
    apply_overrides(&mut settings, cli);
    settings.validate()?;
    Ok(settings)
}

fn apply_overrides(settings: &mut Settings, cli: &Cli) {
    if let Some(device) = &cli.device {
        settings.camera_device = device.clone();
    }
    if let Some(format) = &cli.format {
        settings.camera_format = (format.as_str() != "auto").then(|| format.clone());
    }
    if let Some(width) = cli.width {
        settings.video_width = width;
    }
    if let Some(height) = cli.height {
        settings.video_height = height;
    }
    if let Some(ms) = cli.interval_ms {
        settings.poll_interval_ms = ms;
    }
    if let Some(confidence) = cli.confidence {
        settings.confidence = confidence;
    }
    if let Some(selection) = cli.face_selection {
        settings.face_selection = selection;
    }
    if let Some(url) = &cli.model_base_url {
        settings.model_base_url = Some(url.clone());
    }
    if let Some(dir) = &cli.models_dir {
        settings.bundled_model_dir = Some(dir.clone());
    }
}

/// Prints label changes and writes snapshots.
struct Presenter {
    last_label: Option<MoodLabel>,
    snapshot_dir: Option<PathBuf>,
    writer: ImageFileWriter,
    color: bool,
    failed_snapshots: usize,
}

impl Presenter {
    fn new(snapshot_dir: Option<PathBuf>, color: bool) -> Self {
        Self {
            last_label: None,
            snapshot_dir,
            writer: ImageFileWriter::new(),
            color,
            failed_snapshots: 0,
        }
    }

    /// Prints the label when it changes. A snapshot that cannot be written
    /// is logged and the session goes on.
    fn handle(&mut self, message: PollerMessage) {
        match message {
            PollerMessage::Tick(report) => {
                if self.last_label == Some(report.snapshot.label) {
                    return;
                }
                self.last_label = Some(report.snapshot.label);
                println!("{}", render_line(&report.snapshot, self.color));
                if let Err(e) = self.save_snapshot(&report) {
                    log::error!("Snapshot for tick {} not saved: {e}", report.snapshot.tick);
                    self.failed_snapshots += 1;
                }
            }
            PollerMessage::Failed { tick, message } => {
                log::debug!("Skipped tick {tick}: {message}");
            }
        }
    }

    fn save_snapshot(&self, report: &TickReport) -> Result<(), SnapshotError> {
        let Some(dir) = &self.snapshot_dir else {
            return Ok(());
        };
        let path = dir.join(snapshot_file_name(&report.snapshot));
        let annotated = report.overlay.rasterize(&report.frame);
        self.writer.write(&path, &annotated)?;
        log::info!("Saved {}", path.display());
        Ok(())
    }
}

fn render_line(snapshot: &MoodSnapshot, color: bool) -> String {
    let faces = match snapshot.face_count {
        1 => "1 face".to_string(),
        n => format!("{n} faces"),
    };
    if !color {
        return format!("{}  ({faces})", snapshot.text);
    }
    let c = snapshot.color;
    format!(
        "\x1b[48;2;{};{};{}m\x1b[38;2;255;255;255m {} \x1b[0m  ({faces})",
        c.r, c.g, c.b, snapshot.text
    )
}

fn snapshot_file_name(snapshot: &MoodSnapshot) -> String {
    let label = match snapshot.label {
        MoodLabel::Detected(expression) => expression.key(),
        MoodLabel::NoFace => "no-face",
        MoodLabel::Pending => "pending",
    };
    format!("tick-{:06}-{label}.png", snapshot.tick)
}

fn download_progress(name: &str, downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading {name}... {pct}%");
        if downloaded >= total {
            eprintln!();
        }
    } else {
        eprint!("\rDownloading {name}... {downloaded} bytes");
    }
}
