#![allow(dead_code)]

mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from overlens for tests
pub use overlens::{
    AppConfig, BoundingBox, CameraSelection, Color, ColorRegistry, ControlEvent,
    DetectionHistory, DetectionLoop, LoopState, OverlayError, RawDetection, Status, StatusKind,
    Summary, SummarySource,
};
