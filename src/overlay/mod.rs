//! Drawing detections onto the output surface.
//!
//! Each detection gets an unfilled 3px box in its label color and a caption
//! ("label (NN%)") in white on a translucent dark tab sitting just above the
//! box.

pub mod font;

use image::{Pixel, Rgba, RgbaImage, imageops::FilterType};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use log::warn;

use crate::detection::ColorRegistry;
use crate::models::{BoundingBox, TimestampedDetection};

pub use font::LabelFont;

pub const STROKE_WIDTH: i32 = 3;
pub const LABEL_PADDING: u32 = 10;
pub const LABEL_HEIGHT: u32 = 22;
pub const LABEL_OFFSET: i32 = 24;
pub const TEXT_INSET: i32 = 5;
pub const BASELINE_OFFSET: f32 = 9.0;

/// Rounded coordinates are clamped to this magnitude; far past any surface, and
/// small enough that stroke and caption offsets cannot overflow
const COORD_LIMIT: f32 = (1 << 16) as f32;

const LABEL_BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 179]);
const LABEL_TEXT: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Draws boxes and captions. Holds no per-frame state.
#[derive(Debug, Clone, Default)]
pub struct OverlayRenderer {
    font: Option<LabelFont>,
}

impl OverlayRenderer {
    pub fn new(font: Option<LabelFont>) -> Self {
        if font.is_none() {
            warn!("No label font available; captions will be drawn without text");
        }
        Self { font }
    }

    /// Draw `detections` in order onto `surface`
    pub fn render<'a, I>(&self, surface: &mut RgbaImage, detections: I, colors: &mut ColorRegistry)
    where
        I: IntoIterator<Item = &'a TimestampedDetection>,
    {
        for entry in detections {
            let detection = &entry.detection;
            if !is_drawable(&detection.bbox) {
                warn!("Skipping '{}' with unusable box {:?}", detection.label, detection.bbox);
                continue;
            }
            let color = colors.color_for(&detection.label);
            draw_box(surface, &detection.bbox, color.into());
            self.draw_caption(surface, &detection.bbox, &detection.caption());
        }
    }

    /// Width of the caption tab for `text`
    pub fn label_width(&self, text: &str) -> u32 {
        let text_width = match &self.font {
            Some(font) => font.text_width(text),
            None => font::estimated_text_width(text),
        };
        text_width + LABEL_PADDING
    }

    fn draw_caption(&self, surface: &mut RgbaImage, bbox: &BoundingBox, text: &str) {
        let left = to_px(bbox.x);
        let top = to_px(bbox.y);

        fill_blended(
            surface,
            left,
            top - LABEL_OFFSET,
            self.label_width(text),
            LABEL_HEIGHT,
            LABEL_BACKGROUND,
        );

        if let Some(font) = &self.font {
            let text_top = to_px(bbox.y - BASELINE_OFFSET - font.ascent());
            draw_text_mut(
                surface,
                LABEL_TEXT,
                left + TEXT_INSET,
                text_top,
                font.scale(),
                font.font(),
                text,
            );
        }
    }
}

/// Unfilled rectangle with the stroke centred on the box outline
fn draw_box(surface: &mut RgbaImage, bbox: &BoundingBox, color: Rgba<u8>) {
    let x = to_px(bbox.x);
    let y = to_px(bbox.y);
    let width = to_px(bbox.width);
    let height = to_px(bbox.height);

    let half = STROKE_WIDTH / 2;
    for inset in -half..=half {
        let w = width - 2 * inset;
        let h = height - 2 * inset;
        if w < 1 || h < 1 {
            continue;
        }
        let rect = Rect::at(x + inset, y + inset).of_size(w as u32, h as u32);
        draw_hollow_rect_mut(surface, rect, color);
    }
}

/// Alpha-blend a solid rectangle, clipped to the surface
fn fill_blended(surface: &mut RgbaImage, x: i32, y: i32, width: u32, height: u32, color: Rgba<u8>) {
    let (surface_w, surface_h) = surface.dimensions();
    let x0 = x.max(0) as u32;
    let y0 = y.max(0) as u32;
    let x1 = x.saturating_add_unsigned(width).clamp(0, surface_w as i32) as u32;
    let y1 = y.saturating_add_unsigned(height).clamp(0, surface_h as i32) as u32;

    for py in y0..y1 {
        for px in x0..x1 {
            surface.get_pixel_mut(px, py).blend(&color);
        }
    }
}

fn is_drawable(bbox: &BoundingBox) -> bool {
    [bbox.x, bbox.y, bbox.width, bbox.height]
        .iter()
        .all(|v| v.is_finite())
}

fn to_px(value: f32) -> i32 {
    value.round().clamp(-COORD_LIMIT, COORD_LIMIT) as i32
}

/// Scale `frame` down to `max_width`, keeping its aspect ratio
pub fn fit_to_width(frame: RgbaImage, max_width: u32) -> RgbaImage {
    let (width, height) = frame.dimensions();
    if width <= max_width || width == 0 {
        return frame;
    }
    let ratio = max_width as f32 / width as f32;
    let scaled_height = ((height as f32 * ratio).round() as u32).max(1);
    image::imageops::resize(&frame, max_width, scaled_height, FilterType::Triangle)
}
