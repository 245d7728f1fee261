use std::time::Duration;

use tokio::time::Instant;

use crate::models::{RawDetection, TimestampedDetection};

/// Default retention window for merged detections
pub const HISTORY_DURATION: Duration = Duration::from_millis(1000);

/// Time-windowed buffer of recently observed detections.
///
/// Entries are neither deduplicated nor tracked: the same object seen on
/// consecutive frames yields overlapping entries that expire independently,
/// which keeps boxes on screen across a few missed frames.
#[derive(Debug, Clone)]
pub struct DetectionHistory {
    entries: Vec<TimestampedDetection>,
    retention: Duration,
}

impl DetectionHistory {
    pub fn new() -> Self {
        Self::with_retention(HISTORY_DURATION)
    }

    pub fn with_retention(retention: Duration) -> Self {
        Self {
            entries: Vec::new(),
            retention,
        }
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Append `batch` stamped with `now`, then drop everything that has aged out
    pub fn merge<I>(&mut self, batch: I, now: Instant)
    where
        I: IntoIterator<Item = RawDetection>,
    {
        self.entries.extend(batch.into_iter().map(|detection| TimestampedDetection {
            detection,
            observed_at: now,
        }));
        self.evict(now);
    }

    /// Drop entries with `now - observed_at >= retention`
    pub fn evict(&mut self, now: Instant) {
        let retention = self.retention;
        self.entries.retain(|entry| is_live(entry, now, retention));
    }

    /// Entries still inside the window at `now`, in insertion order
    pub fn query(&self, now: Instant) -> impl Iterator<Item = &TimestampedDetection> {
        let retention = self.retention;
        self.entries
            .iter()
            .filter(move |entry| is_live(entry, now, retention))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of stored entries, including any not yet evicted
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for DetectionHistory {
    fn default() -> Self {
        Self::new()
    }
}

fn is_live(entry: &TimestampedDetection, now: Instant, retention: Duration) -> bool {
    now.saturating_duration_since(entry.observed_at) < retention
}
