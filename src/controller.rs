//! The detection loop.
//!
//! One task drives everything: a tick fires every `cycle_interval`, draws the
//! newest frame and, when AI is on and nothing is in flight, starts a detector
//! call. The call completes on the same task, so the in-flight flag needs no
//! lock. Tests drive `tick` and `finish_detection` by hand instead of `run`.

use std::time::Duration;

use image::RgbaImage;
use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::clock::{Clock, SystemClock};
use crate::config::{AppConfig, SessionConfig, SummarySource};
use crate::detection::{
    ColorRegistry, DetectFuture, DetectResult, DetectionHistory, Detector, Summary, build_summary,
    filter_by_confidence, with_timeout,
};
use crate::overlay::{OverlayRenderer, fit_to_width};
use crate::sink::{Sink, snapshot_file_name};
use crate::source::{CameraSelection, CaptureConstraints, FrameSource};
use crate::surface::{ControlEvent, ControlSurface, Status};

/// Mutable state of one running session
#[derive(Debug, Default)]
pub struct Session {
    pub config: SessionConfig,
    pub history: DetectionHistory,
    pub colors: ColorRegistry,
    detecting: bool,
    generation: u64,
}

impl Session {
    pub fn new(config: SessionConfig, retention: Duration) -> Self {
        Self {
            config,
            history: DetectionHistory::with_retention(retention),
            colors: ColorRegistry::new(),
            detecting: false,
            generation: 0,
        }
    }

    /// Whether a detector call is outstanding
    pub fn is_detecting(&self) -> bool {
        self.detecting
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Waiting for both a frame source and a loaded detector
    Idle,
    Running,
}

/// A detector call started by `tick`
pub struct PendingDetection {
    generation: u64,
    future: DetectFuture,
}

impl PendingDetection {
    pub async fn resolve(self) -> DetectionOutcome {
        DetectionOutcome {
            generation: self.generation,
            result: self.future.await,
        }
    }
}

impl std::fmt::Debug for PendingDetection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingDetection")
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

/// Completed detector call, ready for `finish_detection`
#[derive(Debug)]
pub struct DetectionOutcome {
    generation: u64,
    pub result: DetectResult,
}

#[derive(Debug, Clone)]
struct LoopOptions {
    max_surface_width: u32,
    detector_timeout: Option<Duration>,
    source_retry: Duration,
    summary_source: SummarySource,
    camera: CameraSelection,
}

impl From<&AppConfig> for LoopOptions {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            max_surface_width: cfg.max_surface_width,
            detector_timeout: cfg.detector_timeout,
            source_retry: cfg.source_retry,
            summary_source: cfg.summary_source,
            camera: cfg.camera.clone(),
        }
    }
}

/// Orchestrates capture, detection, history, rendering and reporting
pub struct DetectionLoop {
    source: Box<dyn FrameSource>,
    detector: Box<dyn Detector>,
    surface: Box<dyn ControlSurface>,
    sink: Box<dyn Sink>,
    clock: Box<dyn Clock>,
    renderer: OverlayRenderer,
    session: Session,
    options: LoopOptions,
    state: LoopState,
    canvas: Option<RgbaImage>,
    retry_at: Option<Instant>,
}

impl DetectionLoop {
    pub fn with_config(
        source: Box<dyn FrameSource>,
        detector: Box<dyn Detector>,
        surface: Box<dyn ControlSurface>,
        sink: Box<dyn Sink>,
        config: &AppConfig,
    ) -> Self {
        Self {
            source,
            detector,
            surface,
            sink,
            clock: Box::new(SystemClock),
            renderer: OverlayRenderer::default(),
            session: Session::new(config.session.clone(), config.retention),
            options: LoopOptions::from(config),
            state: LoopState::Idle,
            canvas: None,
            retry_at: None,
        }
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_renderer(mut self, renderer: OverlayRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The output surface as last drawn
    pub fn canvas(&self) -> Option<&RgbaImage> {
        self.canvas.as_ref()
    }

    /// Detections currently eligible for rendering
    pub fn visible_detections(&self) -> usize {
        self.session.history.query(self.clock.now()).count()
    }

    /// Acquire the configured camera
    pub fn start(&mut self) {
        let camera = self.options.camera.clone();
        self.switch_camera(camera);
    }

    /// Release the current stream and acquire `selection`, falling back to the
    /// default constraints on failure
    pub fn switch_camera(&mut self, selection: CameraSelection) {
        self.surface
            .update_status(Status::normal("Switching camera..."));
        self.source.release();
        self.update_state();

        match self.source.select(&CaptureConstraints::new(selection.clone())) {
            Ok(()) => {
                self.retry_at = None;
                info!("Camera '{}' acquired", selection);
                self.surface
                    .update_status(Status::success("Camera switched successfully"));
            }
            Err(e) => {
                warn!("Error switching to camera '{}': {}", selection, e);
                self.surface
                    .update_status(Status::error(format!("Failed to switch camera: {}", e)));
                self.acquire_default();
            }
        }
        self.update_state();
    }

    fn acquire_default(&mut self) {
        match self.source.select(&CaptureConstraints::default()) {
            Ok(()) => {
                self.retry_at = None;
                self.surface.update_status(Status::normal("Camera ready"));
            }
            Err(e) => {
                warn!(
                    "Camera error: {}; retrying in {:?}",
                    e, self.options.source_retry
                );
                self.surface
                    .update_status(Status::error(format!("Camera error: {}", e)));
                self.retry_at = Some(self.clock.now() + self.options.source_retry);
            }
        }
    }

    fn update_state(&mut self) {
        let ready = self.source.is_ready() && self.detector.is_ready();
        let next = if ready {
            LoopState::Running
        } else {
            LoopState::Idle
        };
        if next != self.state {
            info!("Detection loop {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    /// One cycle: redraw the latest frame and, if allowed, start a detection.
    ///
    /// Returns the detector call to await; at most one is ever outstanding.
    pub fn tick(&mut self) -> Option<PendingDetection> {
        let now = self.clock.now();
        if self.retry_at.is_some_and(|at| now >= at) {
            self.retry_at = None;
            self.acquire_default();
        }

        self.update_state();
        if self.state != LoopState::Running {
            return None;
        }

        self.redraw_frame();
        let canvas = self.canvas.as_ref()?;

        if !self.session.config.ai_enabled() || self.session.detecting {
            return None;
        }

        self.session.detecting = true;
        let mut future = self.detector.detect(canvas.clone());
        if let Some(limit) = self.options.detector_timeout {
            future = with_timeout(future, limit);
        }
        debug!("Dispatched detection to {}", self.detector.name());
        Some(PendingDetection {
            generation: self.session.generation,
            future,
        })
    }

    /// Merge a completed detection, redraw and report.
    ///
    /// Failures are logged and dropped; the next tick is the retry.
    pub fn finish_detection(&mut self, outcome: DetectionOutcome) {
        self.session.detecting = false;

        if outcome.generation != self.session.generation {
            debug!("Discarding detection started before AI was disabled");
            return;
        }

        let raw = match outcome.result {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Detection error: {}", e);
                return;
            }
        };

        let now = self.clock.now();
        let batch = filter_by_confidence(raw, self.session.config.confidence_threshold());
        let batch_summary = match self.options.summary_source {
            SummarySource::Batch => Some(build_summary(&batch, &mut self.session.colors)),
            SummarySource::History => None,
        };
        self.session.history.merge(batch, now);

        self.redraw_frame();
        if let Some(canvas) = self.canvas.as_mut() {
            self.renderer.render(
                canvas,
                self.session.history.query(now),
                &mut self.session.colors,
            );
        }

        let summary = match batch_summary {
            Some(summary) => summary,
            None => build_summary(
                self.session.history.query(now),
                &mut self.session.colors,
            ),
        };
        self.surface.show_objects(&summary);
    }

    fn redraw_frame(&mut self) {
        if let Some(frame) = self.source.current_frame() {
            self.canvas = Some(fit_to_width(frame, self.options.max_surface_width));
        }
    }

    pub fn set_ai_enabled(&mut self, enabled: bool) {
        self.session.config.set_ai_enabled(enabled);
        if enabled {
            self.surface
                .update_status(Status::normal("AI detection activated"));
        } else {
            self.session.history.clear();
            self.session.generation += 1;
            self.surface.clear_objects();
            self.surface
                .update_status(Status::normal("AI detection deactivated"));
        }
    }

    /// Export the current surface through the sink
    pub fn capture(&mut self) {
        let Some(canvas) = self.canvas.as_ref() else {
            self.surface
                .update_status(Status::error("No frame to capture yet"));
            return;
        };

        let saved = snapshot_file_name(self.clock.wall())
            .and_then(|name| self.sink.export(&name, canvas));
        match saved {
            Ok(path) => {
                info!("Saved snapshot to {}", path.display());
                self.surface
                    .update_status(Status::success(format!("Image saved: {}", path.display())));
            }
            Err(e) => {
                warn!("Snapshot export failed: {:#}", e);
                self.surface
                    .update_status(Status::error(format!("Failed to save image: {}", e)));
            }
        }
    }

    pub fn apply(&mut self, event: ControlEvent) {
        debug!("Control event: {:?}", event);
        match event {
            ControlEvent::SetAiEnabled(enabled) => self.set_ai_enabled(enabled),
            ControlEvent::SetFrameRate(fps) => self.session.config.set_frame_rate(fps),
            ControlEvent::SetCycleInterval(interval) => {
                self.session.config.set_cycle_interval(interval)
            }
            ControlEvent::SetConfidencePercent(percent) => {
                self.session.config.set_confidence_percent(percent)
            }
            ControlEvent::CaptureFrame => self.capture(),
            ControlEvent::SelectCamera(selection) => self.switch_camera(selection),
        }
    }

    /// Drive the loop until the control channel closes
    pub async fn run(&mut self, mut control: mpsc::Receiver<ControlEvent>) -> anyhow::Result<()> {
        self.start();

        let mut in_flight: Option<PendingDetection> = None;
        let mut next_tick = Instant::now();

        loop {
            tokio::select! {
                biased;

                event = control.recv() => match event {
                    Some(event) => self.apply(event),
                    None => {
                        info!("Control surface closed; stopping detection loop");
                        break;
                    }
                },

                outcome = wait_for(&mut in_flight), if in_flight.is_some() => {
                    in_flight = None;
                    self.finish_detection(outcome);
                }

                _ = tokio::time::sleep_until(next_tick) => {
                    if let Some(pending) = self.tick() {
                        in_flight = Some(pending);
                    }
                    // Re-read every tick so interval changes apply on the next one.
                    next_tick = Instant::now() + self.session.config.cycle_interval();
                }
            }
        }

        Ok(())
    }
}

async fn wait_for(pending: &mut Option<PendingDetection>) -> DetectionOutcome {
    match pending {
        Some(pending) => {
            let result = (&mut pending.future).await;
            DetectionOutcome {
                generation: pending.generation,
                result,
            }
        }
        None => std::future::pending().await,
    }
}
