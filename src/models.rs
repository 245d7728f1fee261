use tokio::time::Instant;

/// Bounding box in surface pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }
}

/// A single detection as reported by the detector for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
    pub label: String,
    pub bbox: BoundingBox,
    pub confidence: f32,
}

impl RawDetection {
    pub fn new(label: impl Into<String>, bbox: BoundingBox, confidence: f32) -> Self {
        Self {
            label: label.into(),
            bbox,
            confidence,
        }
    }

    /// Overlay caption, e.g. "dog (87%)"
    pub fn caption(&self) -> String {
        format!("{} ({}%)", self.label, (self.confidence * 100.0).round() as i64)
    }
}

/// A detection retained by the history, stamped with the time it was merged
#[derive(Debug, Clone, PartialEq)]
pub struct TimestampedDetection {
    pub detection: RawDetection,
    pub observed_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl From<i32> for Color {
    fn from(value: i32) -> Self {
        let r = ((value & 0xFF0000) >> 16) as u8;
        let g = ((value & 0x00FF00) >> 8) as u8;
        let b = (value & 0x0000FF) as u8;
        Color { r, g, b }
    }
}

impl From<Color> for image::Rgba<u8> {
    fn from(color: Color) -> Self {
        image::Rgba([color.r, color.g, color.b, 255])
    }
}

/// One row of the object list shown next to the video
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
    pub color: Color,
}
