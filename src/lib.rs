pub mod clock;
pub mod config;
pub mod controller;
pub mod detection;
pub mod error;
pub mod models;
pub mod overlay;
pub mod sink;
pub mod source;
pub mod surface;

pub use models::{BoundingBox, Color, LabelCount, RawDetection, TimestampedDetection};
pub use config::{AppConfig, SessionConfig, SummarySource};
pub use controller::{DetectionLoop, DetectionOutcome, LoopState, PendingDetection, Session};
pub use detection::{
    ColorRegistry, DetectionHistory, Detector, ScriptedDetector, Summary, HISTORY_DURATION,
};
pub use error::OverlayError;
pub use overlay::{LabelFont, OverlayRenderer};
pub use sink::{DirectorySink, Sink, snapshot_file_name};
pub use source::{CameraSelection, CaptureConstraints, FrameSource, StillImageSource};
pub use surface::{ControlEvent, ControlSurface, LogSurface, Status, StatusKind};
