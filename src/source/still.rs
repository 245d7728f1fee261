use std::path::{Path, PathBuf};

use image::RgbaImage;
use log::{debug, info};

use crate::error::OverlayError;
use crate::source::{CameraSelection, CaptureConstraints, FrameSource};

/// Frame source backed by still images on disk.
///
/// A path is either one image or a directory of images; frames are served in
/// file-name order and repeat. `Environment` and `User` map to the default
/// path, `Device(id)` treats the id as another path.
pub struct StillImageSource {
    default_path: PathBuf,
    frames: Vec<RgbaImage>,
    cursor: usize,
}

impl StillImageSource {
    /// Create the source without acquiring anything yet
    pub fn new(default_path: impl Into<PathBuf>) -> Self {
        Self {
            default_path: default_path.into(),
            frames: Vec::new(),
            cursor: 0,
        }
    }

    fn path_for(&self, selection: &CameraSelection) -> PathBuf {
        match selection {
            CameraSelection::Environment | CameraSelection::User => self.default_path.clone(),
            CameraSelection::Device(id) => PathBuf::from(id),
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for StillImageSource {
    fn is_ready(&self) -> bool {
        !self.frames.is_empty()
    }

    fn current_frame(&mut self) -> Option<RgbaImage> {
        if self.frames.is_empty() {
            return None;
        }
        let frame = self.frames[self.cursor % self.frames.len()].clone();
        self.cursor = (self.cursor + 1) % self.frames.len();
        Some(frame)
    }

    fn select(&mut self, constraints: &CaptureConstraints) -> Result<(), OverlayError> {
        self.release();
        let path = self.path_for(&constraints.selection);
        let frames = load_frames(&path)?;
        info!(
            "Acquired {} frame(s) from {} (ideal {}x{})",
            frames.len(),
            path.display(),
            constraints.ideal_width,
            constraints.ideal_height
        );
        self.frames = frames;
        Ok(())
    }

    fn release(&mut self) {
        self.frames.clear();
        self.cursor = 0;
    }
}

fn load_frames(path: &Path) -> Result<Vec<RgbaImage>, OverlayError> {
    let files = if path.is_dir() {
        let entries = std::fs::read_dir(path).map_err(|e| {
            OverlayError::SourceUnavailable(format!("{}: {}", path.display(), e))
        })?;
        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.is_file())
            .collect();
        files.sort();
        files
    } else {
        vec![path.to_path_buf()]
    };

    let mut frames = Vec::new();
    for file in files {
        match image::open(&file) {
            Ok(img) => frames.push(img.to_rgba8()),
            Err(e) if path.is_dir() => debug!("Skipping {}: {}", file.display(), e),
            Err(e) => {
                return Err(OverlayError::SourceUnavailable(format!(
                    "{}: {}",
                    file.display(),
                    e
                )));
            }
        }
    }

    if frames.is_empty() {
        return Err(OverlayError::SourceUnavailable(format!(
            "no decodable images at {}",
            path.display()
        )));
    }
    Ok(frames)
}
