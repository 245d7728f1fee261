use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use log::warn;
use serde::Deserialize;

use crate::detection::HISTORY_DURATION;
use crate::error::OverlayError;
use crate::source::CameraSelection;

pub const DEFAULT_CYCLE_INTERVAL: Duration = Duration::from_millis(16);
pub const MIN_CYCLE_INTERVAL: Duration = Duration::from_millis(1);
pub const MAX_CYCLE_INTERVAL: Duration = Duration::from_millis(1000);
pub const MIN_FPS: u32 = 1;
pub const MAX_FPS: u32 = 60;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;
pub const DEFAULT_MAX_SURFACE_WIDTH: u32 = 800;
pub const DEFAULT_SOURCE_RETRY: Duration = Duration::from_millis(2000);

/// Settings the control surface may change while the loop runs.
///
/// Setters never fail: out-of-range input is logged and clamped.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    cycle_interval: Duration,
    confidence_threshold: f32,
    ai_enabled: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cycle_interval: DEFAULT_CYCLE_INTERVAL,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            ai_enabled: false,
        }
    }
}

impl SessionConfig {
    pub fn cycle_interval(&self) -> Duration {
        self.cycle_interval
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    pub fn ai_enabled(&self) -> bool {
        self.ai_enabled
    }

    pub fn set_ai_enabled(&mut self, enabled: bool) {
        self.ai_enabled = enabled;
    }

    pub fn set_cycle_interval(&mut self, interval: Duration) {
        self.cycle_interval = match check_cycle_interval(interval) {
            Ok(interval) => interval,
            Err(e) => {
                warn!("{}; clamping", e);
                interval.clamp(MIN_CYCLE_INTERVAL, MAX_CYCLE_INTERVAL)
            }
        };
    }

    /// Frame-rate control: `fps` frames per second becomes a `1 s / fps` cycle
    pub fn set_frame_rate(&mut self, fps: u32) {
        let fps = if (MIN_FPS..=MAX_FPS).contains(&fps) {
            fps
        } else {
            warn!("{}; clamping", OverlayError::out_of_range("frame rate", fps));
            fps.clamp(MIN_FPS, MAX_FPS)
        };
        self.set_cycle_interval(Duration::from_nanos(1_000_000_000 / u64::from(fps)));
    }

    pub fn set_confidence_threshold(&mut self, threshold: f32) {
        match check_confidence(threshold) {
            Ok(threshold) => self.confidence_threshold = threshold,
            Err(e) if threshold.is_nan() => {
                warn!("{}; keeping {}", e, self.confidence_threshold);
            }
            Err(e) => {
                warn!("{}; clamping", e);
                self.confidence_threshold = threshold.clamp(0.0, 1.0);
            }
        }
    }

    /// Slider-style control in whole percent
    pub fn set_confidence_percent(&mut self, percent: u32) {
        self.set_confidence_threshold(percent as f32 / 100.0);
    }
}

pub fn check_cycle_interval(interval: Duration) -> Result<Duration, OverlayError> {
    if (MIN_CYCLE_INTERVAL..=MAX_CYCLE_INTERVAL).contains(&interval) {
        Ok(interval)
    } else {
        Err(OverlayError::out_of_range(
            "cycle interval",
            format!("{}ms", interval.as_millis()),
        ))
    }
}

pub fn check_confidence(threshold: f32) -> Result<f32, OverlayError> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(threshold)
    } else {
        Err(OverlayError::out_of_range("confidence threshold", threshold))
    }
}

/// Which detections feed the object list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummarySource {
    /// Every detection still inside the retention window
    #[default]
    History,
    /// Only the latest filtered batch
    Batch,
}

impl FromStr for SummarySource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "history" => Ok(Self::History),
            "batch" => Ok(Self::Batch),
            other => Err(anyhow!("unknown summary source '{}'", other)),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct AppConfigFile {
    session: Option<SessionConfigFile>,
    history_ms: Option<u64>,
    max_surface_width: Option<u32>,
    font_path: Option<PathBuf>,
    export_dir: Option<PathBuf>,
    detector_timeout_ms: Option<u64>,
    source_retry_ms: Option<u64>,
    summary_source: Option<SummarySource>,
    camera: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct SessionConfigFile {
    cycle_interval_ms: Option<u64>,
    fps: Option<u32>,
    confidence_threshold: Option<f32>,
    ai_enabled: Option<bool>,
}

/// Startup configuration for a running session
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub session: SessionConfig,
    pub retention: Duration,
    pub max_surface_width: u32,
    pub font_path: Option<PathBuf>,
    pub export_dir: PathBuf,
    pub detector_timeout: Option<Duration>,
    pub source_retry: Duration,
    pub summary_source: SummarySource,
    pub camera: CameraSelection,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            retention: HISTORY_DURATION,
            max_surface_width: DEFAULT_MAX_SURFACE_WIDTH,
            font_path: None,
            export_dir: PathBuf::from("."),
            detector_timeout: None,
            source_retry: DEFAULT_SOURCE_RETRY,
            summary_source: SummarySource::History,
            camera: CameraSelection::Environment,
        }
    }
}

impl AppConfig {
    /// Load from `path` (or `OVERLENS_CONFIG`), apply environment overrides, validate
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var("OVERLENS_CONFIG").ok().map(PathBuf::from);
        let file_cfg = match path.map(Path::to_path_buf).or(env_path) {
            Some(path) => read_config_file(&path)?,
            None => AppConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse TOML text without consulting the environment
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let file: AppConfigFile = toml::from_str(raw).context("invalid config")?;
        let mut cfg = Self::from_file(file);
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: AppConfigFile) -> Self {
        let defaults = Self::default();

        let mut session = SessionConfig::default();
        if let Some(file_session) = file.session {
            if let Some(fps) = file_session.fps {
                session.set_frame_rate(fps);
            }
            if let Some(ms) = file_session.cycle_interval_ms {
                session.set_cycle_interval(Duration::from_millis(ms));
            }
            if let Some(threshold) = file_session.confidence_threshold {
                session.set_confidence_threshold(threshold);
            }
            if let Some(enabled) = file_session.ai_enabled {
                session.set_ai_enabled(enabled);
            }
        }

        Self {
            session,
            retention: file
                .history_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.retention),
            max_surface_width: file
                .max_surface_width
                .unwrap_or(defaults.max_surface_width),
            font_path: file.font_path,
            export_dir: file.export_dir.unwrap_or(defaults.export_dir),
            detector_timeout: file.detector_timeout_ms.map(Duration::from_millis),
            source_retry: file
                .source_retry_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.source_retry),
            summary_source: file.summary_source.unwrap_or_default(),
            camera: file
                .camera
                .as_deref()
                .map(CameraSelection::from)
                .unwrap_or(defaults.camera),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(fps) = std::env::var("OVERLENS_FPS") {
            let fps: u32 = fps
                .trim()
                .parse()
                .map_err(|_| anyhow!("OVERLENS_FPS must be an integer frame rate"))?;
            self.session.set_frame_rate(fps);
        }
        if let Ok(confidence) = std::env::var("OVERLENS_CONFIDENCE") {
            let percent: u32 = confidence
                .trim()
                .parse()
                .map_err(|_| anyhow!("OVERLENS_CONFIDENCE must be an integer percentage"))?;
            self.session.set_confidence_percent(percent);
        }
        if let Ok(dir) = std::env::var("OVERLENS_EXPORT_DIR") {
            if !dir.trim().is_empty() {
                self.export_dir = PathBuf::from(dir);
            }
        }
        if let Ok(font) = std::env::var("OVERLENS_FONT") {
            if !font.trim().is_empty() {
                self.font_path = Some(PathBuf::from(font));
            }
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        if self.retention.is_zero() {
            return Err(anyhow!("history_ms must be greater than zero"));
        }
        if self.max_surface_width == 0 {
            return Err(anyhow!("max_surface_width must be greater than zero"));
        }
        if self.source_retry.is_zero() {
            return Err(anyhow!("source_retry_ms must be greater than zero"));
        }
        if self.detector_timeout.is_some_and(|timeout| timeout.is_zero()) {
            warn!("detector_timeout_ms = 0 disables the timeout");
            self.detector_timeout = None;
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<AppConfigFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("Invalid config file {}", path.display()))
}
