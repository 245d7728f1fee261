use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use image::{Rgba, RgbaImage};
use time::OffsetDateTime;
use tokio::time::Instant;

use overlens::clock::Clock;
use overlens::detection::{DetectFuture, DetectResult, Detector};
use overlens::{
    AppConfig, BoundingBox, CameraSelection, CaptureConstraints, ControlSurface, DetectionLoop,
    FrameSource, OverlayError, RawDetection, Sink, Status, Summary,
};

pub const FRAME_GRAY: Rgba<u8> = Rgba([90, 90, 90, 255]);

/// Creates a solid gray test frame
pub fn solid_frame(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_pixel(width, height, FRAME_GRAY)
}

pub fn detection(label: &str, confidence: f32) -> RawDetection {
    RawDetection::new(label, BoundingBox::new(20.0, 40.0, 30.0, 20.0), confidence)
}

pub fn detection_at(label: &str, confidence: f32, x: f32, y: f32, w: f32, h: f32) -> RawDetection {
    RawDetection::new(label, BoundingBox::new(x, y, w, h), confidence)
}

// ---------------------------------------------------------------- clock

#[derive(Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
    wall: OffsetDateTime,
}

impl ManualClock {
    pub fn new(wall: OffsetDateTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
            wall,
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap()
    }

    fn wall(&self) -> OffsetDateTime {
        self.wall
    }
}

// ---------------------------------------------------------------- frame source

#[derive(Default)]
pub struct FakeSourceState {
    pub frame: Option<RgbaImage>,
    pub acquired: bool,
    pub failing: HashSet<String>,
    pub selections: Vec<CameraSelection>,
    pub frames_served: usize,
}

/// Frame source whose device list and failures are controlled by the test
#[derive(Clone)]
pub struct FakeSource {
    pub state: Arc<Mutex<FakeSourceState>>,
}

impl FakeSource {
    pub fn new(frame: RgbaImage) -> Self {
        let state = FakeSourceState {
            frame: Some(frame),
            ..Default::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Make selecting `selection` fail until `heal` is called
    pub fn fail(&self, selection: &CameraSelection) {
        self.state
            .lock()
            .unwrap()
            .failing
            .insert(selection.to_string());
    }

    pub fn heal(&self, selection: &CameraSelection) {
        self.state
            .lock()
            .unwrap()
            .failing
            .remove(&selection.to_string());
    }

    pub fn selections(&self) -> Vec<CameraSelection> {
        self.state.lock().unwrap().selections.clone()
    }

    pub fn frames_served(&self) -> usize {
        self.state.lock().unwrap().frames_served
    }
}

impl FrameSource for FakeSource {
    fn is_ready(&self) -> bool {
        let state = self.state.lock().unwrap();
        state.acquired && state.frame.is_some()
    }

    fn current_frame(&mut self) -> Option<RgbaImage> {
        let mut state = self.state.lock().unwrap();
        if !state.acquired {
            return None;
        }
        state.frames_served += 1;
        state.frame.clone()
    }

    fn select(&mut self, constraints: &CaptureConstraints) -> Result<(), OverlayError> {
        let mut state = self.state.lock().unwrap();
        state.selections.push(constraints.selection.clone());
        if state.failing.contains(&constraints.selection.to_string()) {
            state.acquired = false;
            return Err(OverlayError::SourceUnavailable(format!(
                "{} not found",
                constraints.selection
            )));
        }
        state.acquired = true;
        Ok(())
    }

    fn release(&mut self) {
        self.state.lock().unwrap().acquired = false;
    }
}

// ---------------------------------------------------------------- detector

pub struct FakeDetectorState {
    pub ready: bool,
    pub calls: usize,
    pub responses: VecDeque<DetectResult>,
    pub latency: Duration,
}

/// Detector answering from a queue of canned results (empty batch when drained)
#[derive(Clone)]
pub struct FakeDetector {
    pub state: Arc<Mutex<FakeDetectorState>>,
}

impl FakeDetector {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeDetectorState {
                ready: true,
                calls: 0,
                responses: VecDeque::new(),
                latency: Duration::ZERO,
            })),
        }
    }

    pub fn respond(&self, result: DetectResult) {
        self.state.lock().unwrap().responses.push_back(result);
    }

    pub fn respond_with(&self, batch: Vec<RawDetection>) {
        self.respond(Ok(batch));
    }

    pub fn set_ready(&self, ready: bool) {
        self.state.lock().unwrap().ready = ready;
    }

    pub fn set_latency(&self, latency: Duration) {
        self.state.lock().unwrap().latency = latency;
    }

    pub fn calls(&self) -> usize {
        self.state.lock().unwrap().calls
    }
}

impl Detector for FakeDetector {
    fn name(&self) -> &str {
        "fake"
    }

    fn is_ready(&self) -> bool {
        self.state.lock().unwrap().ready
    }

    fn detect(&mut self, _frame: RgbaImage) -> DetectFuture {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        let result = state.responses.pop_front().unwrap_or_else(|| Ok(Vec::new()));
        let latency = state.latency;
        Box::pin(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            result
        })
    }
}

// ---------------------------------------------------------------- control surface

#[derive(Default)]
pub struct SurfaceLog {
    pub statuses: Vec<Status>,
    pub summaries: Vec<Summary>,
    pub clears: usize,
}

/// Control surface that records everything it is told
#[derive(Clone, Default)]
pub struct RecordingSurface {
    pub log: Arc<Mutex<SurfaceLog>>,
}

impl RecordingSurface {
    pub fn last_status(&self) -> Option<Status> {
        self.log.lock().unwrap().statuses.last().cloned()
    }

    pub fn status_messages(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .statuses
            .iter()
            .map(|status| status.message.clone())
            .collect()
    }

    pub fn last_summary(&self) -> Option<Summary> {
        self.log.lock().unwrap().summaries.last().cloned()
    }

    pub fn summaries(&self) -> usize {
        self.log.lock().unwrap().summaries.len()
    }

    pub fn clears(&self) -> usize {
        self.log.lock().unwrap().clears
    }
}

impl ControlSurface for RecordingSurface {
    fn update_status(&mut self, status: Status) {
        self.log.lock().unwrap().statuses.push(status);
    }

    fn show_objects(&mut self, summary: &Summary) {
        self.log.lock().unwrap().summaries.push(summary.clone());
    }

    fn clear_objects(&mut self) {
        self.log.lock().unwrap().clears += 1;
    }
}

// ---------------------------------------------------------------- sink

/// Sink keeping exported snapshots in memory
#[derive(Clone, Default)]
pub struct MemorySink {
    pub exports: Arc<Mutex<Vec<(String, RgbaImage)>>>,
    pub fail: Arc<Mutex<bool>>,
}

impl MemorySink {
    pub fn names(&self) -> Vec<String> {
        self.exports
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }
}

impl Sink for MemorySink {
    fn export(&mut self, file_name: &str, image: &RgbaImage) -> anyhow::Result<PathBuf> {
        if *self.fail.lock().unwrap() {
            anyhow::bail!("disk full");
        }
        self.exports
            .lock()
            .unwrap()
            .push((file_name.to_string(), image.clone()));
        Ok(PathBuf::from("/snapshots").join(file_name))
    }
}

// ---------------------------------------------------------------- harness

/// A detection loop wired to fakes, plus handles to inspect them
pub struct Harness {
    pub detection_loop: DetectionLoop,
    pub source: FakeSource,
    pub detector: FakeDetector,
    pub surface: RecordingSurface,
    pub sink: MemorySink,
    pub clock: ManualClock,
}

/// 2023-11-14T22:13:20Z
pub fn fixed_wall_clock() -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(1_700_000_000).expect("valid timestamp")
}

pub fn harness() -> Harness {
    harness_with(AppConfig::default())
}

pub fn harness_with(config: AppConfig) -> Harness {
    let source = FakeSource::new(solid_frame(200, 120));
    let detector = FakeDetector::new();
    let surface = RecordingSurface::default();
    let sink = MemorySink::default();
    let clock = ManualClock::new(fixed_wall_clock());

    let detection_loop = DetectionLoop::with_config(
        Box::new(source.clone()),
        Box::new(detector.clone()),
        Box::new(surface.clone()),
        Box::new(sink.clone()),
        &config,
    )
    .with_clock(Box::new(clock.clone()));

    Harness {
        detection_loop,
        source,
        detector,
        surface,
        sink,
        clock,
    }
}

/// Harness already acquired and with AI enabled
pub fn running_harness() -> Harness {
    let mut h = harness();
    h.detection_loop.start();
    h.detection_loop.set_ai_enabled(true);
    h
}
