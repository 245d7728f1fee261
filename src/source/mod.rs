//! Frame acquisition.
//!
//! The loop pulls the latest frame on every tick; sources never push. A source
//! that has no frame yet (or lost its device) reports not-ready and the loop
//! idles until it comes back.

pub mod still;

use std::fmt;

use image::RgbaImage;

use crate::error::OverlayError;

pub use still::StillImageSource;

pub const IDEAL_WIDTH: u32 = 1280;
pub const IDEAL_HEIGHT: u32 = 720;

/// Which camera to acquire
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CameraSelection {
    /// Rear-facing camera; the fallback constraint set
    #[default]
    Environment,
    /// Front-facing camera
    User,
    /// A specific device by id
    Device(String),
}

impl From<&str> for CameraSelection {
    fn from(value: &str) -> Self {
        match value.trim() {
            "environment" => Self::Environment,
            "user" => Self::User,
            other => Self::Device(other.to_string()),
        }
    }
}

impl fmt::Display for CameraSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Environment => f.write_str("environment"),
            Self::User => f.write_str("user"),
            Self::Device(id) => f.write_str(id),
        }
    }
}

/// Stream request handed to the source on (re)acquisition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConstraints {
    pub selection: CameraSelection,
    pub ideal_width: u32,
    pub ideal_height: u32,
}

impl CaptureConstraints {
    pub fn new(selection: CameraSelection) -> Self {
        Self {
            selection,
            ideal_width: IDEAL_WIDTH,
            ideal_height: IDEAL_HEIGHT,
        }
    }
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self::new(CameraSelection::Environment)
    }
}

/// Pull-based frame source
pub trait FrameSource: Send {
    /// Whether a stream is acquired and producing frames
    fn is_ready(&self) -> bool;

    /// Latest available frame, or `None` when not ready
    fn current_frame(&mut self) -> Option<RgbaImage>;

    /// Release the current stream and acquire one matching `constraints`.
    ///
    /// On error the source is left not-ready.
    fn select(&mut self, constraints: &CaptureConstraints) -> Result<(), OverlayError>;

    /// Release the current stream
    fn release(&mut self) {}
}
