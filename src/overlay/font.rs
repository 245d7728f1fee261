use std::path::{Path, PathBuf};

use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use anyhow::Context;
use log::debug;

/// Nominal label font size in pixels (em size)
pub const LABEL_FONT_PX: f32 = 14.0;

/// Average advance of a bold 14px glyph, used when no font is available
const FALLBACK_ADVANCE: f32 = 8.0;

const SYSTEM_BOLD_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Bold.ttf",
    "/Library/Fonts/Arial Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "C:\\Windows\\Fonts\\arialbd.ttf",
];

/// Bold font used for box captions
#[derive(Clone)]
pub struct LabelFont {
    font: FontArc,
    scale: PxScale,
}

impl std::fmt::Debug for LabelFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LabelFont").field("scale", &self.scale).finish()
    }
}

impl LabelFont {
    pub fn from_bytes(bytes: Vec<u8>) -> anyhow::Result<Self> {
        let font = FontArc::try_from_vec(bytes)
            .map_err(|e| anyhow::anyhow!("Failed to parse font: {}", e))?;
        let scale = em_scale(&font, LABEL_FONT_PX);
        Ok(Self { font, scale })
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("Failed to read font {:?}", path))?;
        Self::from_bytes(bytes).with_context(|| format!("Failed to load font {:?}", path))
    }

    /// First loadable font among `preferred` and common system locations
    pub fn discover(preferred: Option<&Path>) -> Option<Self> {
        let candidates = preferred
            .map(Path::to_path_buf)
            .into_iter()
            .chain(SYSTEM_BOLD_FONTS.iter().map(PathBuf::from));

        for path in candidates {
            match Self::load(&path) {
                Ok(font) => {
                    debug!("Using label font {:?}", path);
                    return Some(font);
                }
                Err(e) => debug!("{:#}", e),
            }
        }
        None
    }

    pub fn font(&self) -> &FontArc {
        &self.font
    }

    pub fn scale(&self) -> PxScale {
        self.scale
    }

    /// Rendered width of `text` in pixels
    pub fn text_width(&self, text: &str) -> u32 {
        imageproc::drawing::text_size(self.scale, &self.font, text).0
    }

    /// Distance from the top of the text box to the baseline
    pub fn ascent(&self) -> f32 {
        self.font.as_scaled(self.scale).ascent()
    }
}

/// Width estimate when no font is loaded
pub fn estimated_text_width(text: &str) -> u32 {
    (text.chars().count() as f32 * FALLBACK_ADVANCE).round() as u32
}

// PxScale is the ascent-to-descent height; CSS-style sizes are em sizes.
fn em_scale(font: &FontArc, px: f32) -> PxScale {
    match font.units_per_em() {
        Some(units_per_em) if units_per_em > 0.0 => {
            PxScale::from(px * font.height_unscaled() / units_per_em)
        }
        _ => PxScale::from(px),
    }
}
