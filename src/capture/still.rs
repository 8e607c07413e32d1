//! A video source that replays still images as camera frames.
//!
//! Each call for the current frame advances to the next image, wrapping
//! around at the end.

use image::RgbaImage;
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

use super::camera::{StreamConstraints, VideoSource, VideoStream};
use crate::error::ScanError;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "webp", "tif", "tiff"];

pub struct StillImageSource {
    paths: Vec<PathBuf>,
}

impl StillImageSource {
    /// Builds a source from files and directories. Directories contribute
    /// their image files in name order.
    pub fn new(inputs: &[PathBuf]) -> Self {
        let mut paths = Vec::new();
        for input in inputs {
            if input.is_dir() {
                paths.extend(list_images(input));
            } else {
                paths.push(input.clone());
            }
        }
        Self { paths }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

fn list_images(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to read {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();
    paths
}

impl VideoSource for StillImageSource {
    fn open(&self, constraints: &StreamConstraints) -> Result<Box<dyn VideoStream>, ScanError> {
        if self.paths.is_empty() {
            return Err(ScanError::CameraUnavailable("no camera frames available".to_string()));
        }

        let mut frames = Vec::with_capacity(self.paths.len());
        for path in &self.paths {
            let img = image::open(path).map_err(|e| {
                ScanError::CameraUnavailable(format!("failed to load {}: {}", path.display(), e))
            })?;
            frames.push(img.to_rgba8());
        }

        info!(
            "Replaying {} still frame(s) (requested {}x{} {:?})",
            frames.len(),
            constraints.ideal_width,
            constraints.ideal_height,
            constraints.facing
        );

        Ok(Box::new(StillImageStream { frames, next: 0 }))
    }
}

struct StillImageStream {
    frames: Vec<RgbaImage>,
    next: usize,
}

impl VideoStream for StillImageStream {
    fn dimensions(&self) -> Option<(u32, u32)> {
        self.frames.get(self.next).map(|f| f.dimensions())
    }

    fn current_frame(&mut self) -> Option<RgbaImage> {
        if self.frames.is_empty() {
            return None;
        }
        let frame = self.frames[self.next].clone();
        self.next = (self.next + 1) % self.frames.len();
        Some(frame)
    }

    fn stop(&mut self) {
        self.frames.clear();
        self.next = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::camera::FacingMode;
    use image::Rgba;
    use tempfile::tempdir;

    fn constraints() -> StreamConstraints {
        StreamConstraints {
            facing: FacingMode::Environment,
            ideal_width: 1280,
            ideal_height: 720,
        }
    }

    #[test]
    fn test_replays_directory_in_order() {
        let dir = tempdir().unwrap();
        RgbaImage::from_pixel(4, 2, Rgba([0, 0, 0, 255]))
            .save(dir.path().join("b.png"))
            .unwrap();
        RgbaImage::from_pixel(6, 3, Rgba([255, 255, 255, 255]))
            .save(dir.path().join("a.png"))
            .unwrap();
        fs::write(dir.path().join("notes.txt"), "not an image").unwrap();

        let source = StillImageSource::new(&[dir.path().to_path_buf()]);
        assert_eq!(source.len(), 2);

        let mut stream = source.open(&constraints()).unwrap();
        assert_eq!(stream.dimensions(), Some((6, 3)));
        assert_eq!(stream.current_frame().unwrap().dimensions(), (6, 3));
        assert_eq!(stream.current_frame().unwrap().dimensions(), (4, 2));
        assert_eq!(stream.current_frame().unwrap().dimensions(), (6, 3));

        stream.stop();
        assert_eq!(stream.dimensions(), None);
        assert!(stream.current_frame().is_none());
    }

    #[test]
    fn test_empty_source_is_unavailable() {
        let source = StillImageSource::new(&[]);
        assert!(matches!(
            source.open(&constraints()),
            Err(ScanError::CameraUnavailable(_))
        ));
    }

    #[test]
    fn test_unreadable_file_is_unavailable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.png");
        fs::write(&path, b"nope").unwrap();

        let source = StillImageSource::new(&[path]);
        assert!(matches!(
            source.open(&constraints()),
            Err(ScanError::CameraUnavailable(_))
        ));
    }
}
