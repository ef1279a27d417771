use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use thiserror::Error;

use crate::shared::frame::Frame;
use crate::shared::settings::Settings;
use crate::video::domain::frame_source::LatestFrame;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("ffmpeg: {0}")]
    Ffmpeg(#[from] ffmpeg_next::Error),
    #[error("unknown capture format '{0}'")]
    UnknownFormat(String),
    #[error("'{0}' did not open as an input")]
    NotAnInput(String),
    #[error("no video stream in '{0}'")]
    NoVideoStream(String),
    #[error("failed to spawn capture thread: {0}")]
    Spawn(#[source] std::io::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CameraConfig {
    /// Device path or name (`/dev/video0`, `0`, `video=...`) or any ffmpeg input.
    pub device: String,
    /// libavdevice input format; `None` lets ffmpeg detect the format of `device`.
    pub format: Option<String>,
    /// Output frame size; decoded frames are scaled to it.
    pub width: u32,
    pub height: u32,
    pub framerate: Option<u32>,
}

impl CameraConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            device: settings.camera_device.clone(),
            format: settings.camera_format.clone(),
            width: settings.video_width,
            height: settings.video_height,
            framerate: None,
        }
    }
}

/// Stream properties reported once the first frame is decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamInfo {
    pub device: String,
    pub codec: String,
    pub width: u32,
    pub height: u32,
}

pub enum CameraEvent {
    /// Sent exactly once, after the first frame reached the frame slot.
    Live(StreamInfo),
    /// The input ran out of packets (files, unplugged devices).
    Ended,
    Failed(String),
}

/// Captures frames from a webcam (or any ffmpeg input) on a dedicated thread
/// and keeps only the most recent one in a [`LatestFrame`] slot.
///
/// All ffmpeg state lives on the capture thread.
pub struct FfmpegCamera {
    frames: Arc<LatestFrame>,
    events: Receiver<CameraEvent>,
    stop: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl FfmpegCamera {
    pub fn start(config: CameraConfig) -> Result<Self, CameraError> {
        let frames = Arc::new(LatestFrame::new());
        let (tx, events) = crossbeam_channel::unbounded();
        let stop = Arc::new(AtomicBool::new(false));

        let thread_frames = frames.clone();
        let thread_stop = stop.clone();
        let join = thread::Builder::new()
            .name("camera-capture".into())
            .spawn(move || {
                let event = match capture(&config, &thread_frames, &thread_stop, &tx) {
                    Ok(()) => CameraEvent::Ended,
                    Err(e) => {
                        log::error!("Camera capture failed: {e}");
                        CameraEvent::Failed(e.to_string())
                    }
                };
                if !thread_stop.load(Ordering::Relaxed) {
                    let _ = tx.send(event);
                }
            })
            .map_err(CameraError::Spawn)?;

        Ok(Self {
            frames,
            events,
            stop,
            join: Some(join),
        })
    }

    /// Frame slot to hand to the poller.
    pub fn frames(&self) -> Arc<LatestFrame> {
        self.frames.clone()
    }

    pub fn events(&self) -> &Receiver<CameraEvent> {
        &self.events
    }

    /// Stops capturing and waits for the capture thread. Idempotent.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for FfmpegCamera {
    fn drop(&mut self) {
        self.stop();
    }
}

fn open_input(
    config: &CameraConfig,
) -> Result<ffmpeg_next::format::context::Input, CameraError> {
    let mut options = ffmpeg_next::Dictionary::new();
    let Some(name) = &config.format else {
        return Ok(ffmpeg_next::format::input_with_dictionary(
            &config.device,
            options,
        )?);
    };

    options.set("video_size", &format!("{}x{}", config.width, config.height));
    if let Some(fps) = config.framerate {
        options.set("framerate", &fps.to_string());
    }
    let format = ffmpeg_next::device::input::video()
        .find(|f| f.name() == name)
        .ok_or_else(|| CameraError::UnknownFormat(name.clone()))?;
    match ffmpeg_next::format::open_with(
        &config.device,
        &ffmpeg_next::format::Format::Input(format),
        options,
    )? {
        ffmpeg_next::format::context::Context::Input(input) => Ok(input),
        _ => Err(CameraError::NotAnInput(config.device.clone())),
    }
}

fn capture(
    config: &CameraConfig,
    frames: &LatestFrame,
    stop: &AtomicBool,
    events: &Sender<CameraEvent>,
) -> Result<(), CameraError> {
    ffmpeg_next::init()?;
    ffmpeg_next::device::register_all();

    let mut ictx = open_input(config)?;
    let (stream_index, time_base, mut decoder) = {
        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| CameraError::NoVideoStream(config.device.clone()))?;
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        (stream.index(), stream.time_base(), codec_ctx.decoder().video()?)
    };
    let mut pacer = (!is_capture_device(&ictx)).then(|| Pacer::new(time_base));
    let codec = decoder
        .codec()
        .map(|c| c.name().to_string())
        .unwrap_or_default();
    log::info!(
        "Opened {} ({codec}, {}x{}), scaling to {}x{}",
        display_name(&config.device),
        decoder.width(),
        decoder.height(),
        config.width,
        config.height
    );

    // Built on the first decoded frame: some devices only settle their pixel
    // format once data flows.
    let mut scaler: Option<ffmpeg_next::software::scaling::Context> = None;
    let mut index = 0usize;
    let mut decoded = ffmpeg_next::util::frame::video::Video::empty();

    for (stream, packet) in ictx.packets() {
        if stop.load(Ordering::Relaxed) {
            return Ok(());
        }
        if stream.index() != stream_index || decoder.send_packet(&packet).is_err() {
            continue;
        }
        while decoder.receive_frame(&mut decoded).is_ok() {
            let scaler = match &mut scaler {
                Some(s) => s,
                slot @ None => slot.insert(ffmpeg_next::software::scaling::Context::get(
                    decoded.format(),
                    decoded.width(),
                    decoded.height(),
                    ffmpeg_next::format::Pixel::RGB24,
                    config.width,
                    config.height,
                    ffmpeg_next::software::scaling::Flags::BILINEAR,
                )?),
            };
            let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
            scaler.run(&decoded, &mut rgb_frame)?;

            if let (Some(pacer), Some(pts)) =
                (pacer.as_mut(), decoded.timestamp().or(decoded.pts()))
            {
                if !sleep_unless_stopped(pacer.delay(pts, Instant::now()), stop) {
                    return Ok(());
                }
            }

            let pixels = extract_rgb_pixels(&rgb_frame, config.width, config.height);
            frames.publish(Frame::new(pixels, config.width, config.height, 3, index));
            if index == 0 {
                let _ = events.send(CameraEvent::Live(StreamInfo {
                    device: config.device.clone(),
                    codec: codec.clone(),
                    width: config.width,
                    height: config.height,
                }));
            }
            index += 1;
        }
    }
    log::info!("Capture input ended after {index} frames");
    Ok(())
}

/// Recorded inputs (files, streams) are paced; libavdevice grabbers already
/// deliver frames in real time.
fn is_capture_device(ictx: &ffmpeg_next::format::context::Input) -> bool {
    let name = ictx.format().name();
    ffmpeg_next::device::input::video().any(|f| f.name() == name)
}

/// Holds recorded frames back until their presentation time, so a file
/// plays at its own frame rate instead of as fast as it decodes.
struct Pacer {
    time_base: f64,
    origin: Option<(i64, Instant)>,
}

impl Pacer {
    fn new(time_base: ffmpeg_next::Rational) -> Self {
        Self {
            time_base: f64::from(time_base),
            origin: None,
        }
    }

    /// Wait before showing the frame stamped `pts`. The first frame is
    /// shown at once and anchors the clock.
    fn delay(&mut self, pts: i64, now: Instant) -> Duration {
        let (first_pts, start) = *self.origin.get_or_insert((pts, now));
        let offset = (pts - first_pts) as f64 * self.time_base;
        match Duration::try_from_secs_f64(offset) {
            Ok(offset) => (start + offset).saturating_duration_since(now),
            Err(_) => Duration::ZERO,
        }
    }
}

/// Sleeps in short steps so a stop request is noticed. Returns `false` when
/// stopped.
fn sleep_unless_stopped(duration: Duration, stop: &AtomicBool) -> bool {
    const STEP: Duration = Duration::from_millis(20);
    let deadline = Instant::now() + duration;
    loop {
        if stop.load(Ordering::Relaxed) {
            return false;
        }
        let left = deadline.saturating_duration_since(Instant::now());
        if left.is_zero() {
            return true;
        }
        thread::sleep(left.min(STEP));
    }
}

fn display_name(device: &str) -> String {
    Path::new(device)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| device.to_string())
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer,
/// dropping the row padding ffmpeg adds when stride > width * 3.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let row_bytes = width as usize * 3;

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        pixels.extend_from_slice(&data[start..start + row_bytes]);
    }
    pixels
}
