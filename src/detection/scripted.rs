use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use image::RgbaImage;
use serde::Deserialize;

use crate::detection::{DetectFuture, Detector};
use crate::error::OverlayError;
use crate::models::{BoundingBox, RawDetection};

#[derive(Debug, Deserialize)]
struct ScriptFile {
    latency_ms: Option<u64>,
    fail_every: Option<usize>,
    #[serde(default)]
    batches: Vec<ScriptBatch>,
}

#[derive(Debug, Deserialize)]
struct ScriptBatch {
    #[serde(default)]
    detections: Vec<ScriptDetection>,
}

#[derive(Debug, Deserialize)]
struct ScriptDetection {
    label: String,
    confidence: f32,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

impl From<ScriptDetection> for RawDetection {
    fn from(d: ScriptDetection) -> Self {
        RawDetection::new(d.label, BoundingBox::new(d.x, d.y, d.width, d.height), d.confidence)
    }
}

/// Detector that replays pre-recorded batches, one per call, cycling.
///
/// Stands in for a model when driving the overlay from the command line.
/// Every `fail_every`-th call fails instead of returning a batch.
#[derive(Debug, Clone)]
pub struct ScriptedDetector {
    batches: Vec<Vec<RawDetection>>,
    latency: Duration,
    fail_every: Option<usize>,
    calls: usize,
}

impl ScriptedDetector {
    pub fn new(batches: Vec<Vec<RawDetection>>) -> Self {
        Self {
            batches,
            latency: Duration::ZERO,
            fail_every: None,
            calls: 0,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_fail_every(mut self, every: usize) -> Self {
        self.fail_every = (every > 0).then_some(every);
        self
    }

    /// Load a script from TOML
    pub fn from_toml_str(raw: &str) -> anyhow::Result<Self> {
        let file: ScriptFile = toml::from_str(raw).context("invalid detection script")?;
        let batches = file
            .batches
            .into_iter()
            .map(|batch| batch.detections.into_iter().map(RawDetection::from).collect())
            .collect();
        let mut detector = Self::new(batches)
            .with_latency(Duration::from_millis(file.latency_ms.unwrap_or(0)));
        if let Some(every) = file.fail_every {
            detector = detector.with_fail_every(every);
        }
        Ok(detector)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read detection script {:?}", path))?;
        Self::from_toml_str(&raw)
            .with_context(|| format!("Failed to parse detection script {:?}", path))
    }

    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl Detector for ScriptedDetector {
    fn name(&self) -> &str {
        "scripted"
    }

    fn detect(&mut self, _frame: RgbaImage) -> DetectFuture {
        let call = self.calls;
        self.calls += 1;

        let result = match self.fail_every {
            Some(every) if (call + 1) % every == 0 => Err(OverlayError::DetectorFailure(
                format!("scripted failure on call {}", call + 1),
            )),
            _ if self.batches.is_empty() => Ok(Vec::new()),
            _ => Ok(self.batches[call % self.batches.len()].clone()),
        };

        let latency = self.latency;
        Box::pin(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            result
        })
    }
}
