use std::collections::HashMap;

use crate::detection::colors::ColorRegistry;
use crate::models::{LabelCount, RawDetection, TimestampedDetection};

/// What the object list and counter badge display
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    /// Total detections counted, shown on the badge
    pub total: usize,
    /// Per-label counts ordered by label
    pub entries: Vec<LabelCount>,
}

impl Summary {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn badge_visible(&self) -> bool {
        self.total > 0
    }
}

/// Anything that carries a detection label
pub trait Labeled {
    fn label(&self) -> &str;
}

impl Labeled for RawDetection {
    fn label(&self) -> &str {
        &self.label
    }
}

impl Labeled for TimestampedDetection {
    fn label(&self) -> &str {
        &self.detection.label
    }
}

impl<T: Labeled + ?Sized> Labeled for &T {
    fn label(&self) -> &str {
        (**self).label()
    }
}

/// Count detections per label, ordered lexicographically (case-sensitive) by label.
///
/// Labels compare by UTF-16 code units, as a browser string sort does; this
/// differs from byte order only for characters above U+FFFF.
pub fn summarize<I>(detections: I, colors: &mut ColorRegistry) -> Vec<LabelCount>
where
    I: IntoIterator,
    I::Item: Labeled,
{
    let mut counts: HashMap<String, usize> = HashMap::new();
    for detection in detections {
        *counts.entry(detection.label().to_string()).or_insert(0) += 1;
    }

    let mut labels: Vec<(String, usize)> = counts.into_iter().collect();
    labels.sort_by(|(a, _), (b, _)| a.encode_utf16().cmp(b.encode_utf16()));

    labels
        .into_iter()
        .map(|(label, count)| {
            let color = colors.color_for(&label);
            LabelCount { label, count, color }
        })
        .collect()
}

/// `summarize` plus the badge total
pub fn build_summary<I>(detections: I, colors: &mut ColorRegistry) -> Summary
where
    I: IntoIterator,
    I::Item: Labeled,
{
    let entries = summarize(detections, colors);
    let total = entries.iter().map(|entry| entry.count).sum();
    Summary { total, entries }
}
