pub mod colors;
pub mod history;
pub mod scripted;
pub mod summary;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use image::RgbaImage;

use crate::error::OverlayError;
use crate::models::RawDetection;

pub use colors::ColorRegistry;
pub use history::{DetectionHistory, HISTORY_DURATION};
pub use scripted::ScriptedDetector;
pub use summary::{Summary, build_summary, summarize};

/// Result of one detector invocation
pub type DetectResult = Result<Vec<RawDetection>, OverlayError>;

/// In-flight detector call. Owns everything it needs so it can outlive the tick
/// that started it.
pub type DetectFuture = Pin<Box<dyn Future<Output = DetectResult> + Send + 'static>>;

/// Object detector capability
pub trait Detector: Send {
    /// Human-readable name (used in log output)
    fn name(&self) -> &str;

    /// Whether the model is loaded and `detect` may be called
    fn is_ready(&self) -> bool {
        true
    }

    /// Start detection on a snapshot of the current surface
    fn detect(&mut self, frame: RgbaImage) -> DetectFuture;
}

/// Keep detections with `confidence >= threshold`
pub fn filter_by_confidence(batch: Vec<RawDetection>, threshold: f32) -> Vec<RawDetection> {
    batch
        .into_iter()
        .filter(|detection| detection.confidence >= threshold)
        .collect()
}

/// Bound a detector call; an expired call resolves as `DetectorTimeout`
pub fn with_timeout(future: DetectFuture, limit: Duration) -> DetectFuture {
    Box::pin(async move {
        match tokio::time::timeout(limit, future).await {
            Ok(result) => result,
            Err(_) => Err(OverlayError::DetectorTimeout(limit)),
        }
    })
}
