use std::path::PathBuf;

use anyhow::{Context, Result};
use image::RgbaImage;
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcOffset};

use crate::error::OverlayError;

/// Receives rendered snapshots on demand
pub trait Sink: Send {
    /// Store `image` under `file_name`, returning where it went
    fn export(&mut self, file_name: &str, image: &RgbaImage) -> Result<PathBuf>;
}

/// `detection-<UTC ISO-8601 to the second, colons as hyphens>.png`
pub fn snapshot_file_name(at: OffsetDateTime) -> Result<String> {
    let iso = at
        .to_offset(UtcOffset::UTC)
        .format(&Rfc3339)
        .context("Failed to format snapshot timestamp")?;
    let seconds: String = iso.chars().take(19).collect();
    Ok(format!("detection-{}.png", seconds.replace(':', "-")))
}

/// Writes PNG snapshots into a directory
#[derive(Debug, Clone)]
pub struct DirectorySink {
    output_dir: PathBuf,
}

impl DirectorySink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

impl Sink for DirectorySink {
    fn export(&mut self, file_name: &str, image: &RgbaImage) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("Failed to create export directory {:?}", self.output_dir)
        })?;
        let output_path = self.output_dir.join(file_name);
        image
            .save_with_format(&output_path, image::ImageFormat::Png)
            .map_err(|e| OverlayError::Export(format!("{}: {}", output_path.display(), e)))?;
        Ok(output_path)
    }
}
