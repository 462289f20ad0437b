//! Local still-image frame source.
//!
//! This module provides `ImageSequenceSource` for a single image file or a
//! directory of images. Files are decoded one at a time, in file-name order,
//! as they are read. Video containers are handled by the ffmpeg or opencv
//! sources instead.

use anyhow::{anyhow, Context, Result};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use super::{FrameSource, ReadOutcome};
use crate::frame::Frame;

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// True when `path` has an image extension this source can decode.
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// Frames from a still image or a directory of images.
pub struct ImageSequenceSource {
    root: PathBuf,
    pending: VecDeque<PathBuf>,
    frame_count: u64,
    closed: bool,
}

impl ImageSequenceSource {
    pub fn open(path: &Path) -> Result<Self> {
        let pending: VecDeque<PathBuf> = if path.is_dir() {
            let mut entries = std::fs::read_dir(path)
                .with_context(|| format!("failed to list {}", path.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_image_path(p))
                .collect::<Vec<_>>();
            entries.sort();
            entries.into()
        } else if is_image_path(path) {
            VecDeque::from([path.to_path_buf()])
        } else {
            return Err(anyhow!("{} is not a supported image", path.display()));
        };

        if pending.is_empty() {
            return Err(anyhow!("{} contains no images", path.display()));
        }

        Ok(Self {
            root: path.to_path_buf(),
            pending,
            frame_count: 0,
            closed: false,
        })
    }

    /// Images not yet read.
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    fn decode(&self, path: &Path) -> Result<Frame> {
        let image = image::open(path)
            .with_context(|| format!("failed to decode {}", path.display()))?
            .to_rgb8();
        Ok(Frame::new(image, self.frame_count))
    }
}

impl FrameSource for ImageSequenceSource {
    fn describe(&self) -> String {
        format!(
            "{} ({} image(s) queued)",
            self.root.display(),
            self.pending.len()
        )
    }

    fn read(&mut self) -> ReadOutcome {
        if self.closed {
            return ReadOutcome::EndOfStream;
        }
        let Some(path) = self.pending.pop_front() else {
            return ReadOutcome::EndOfStream;
        };
        self.frame_count += 1;
        match self.decode(&path) {
            Ok(frame) => ReadOutcome::Frame(frame),
            Err(e) => ReadOutcome::Failed(e),
        }
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.pending.clear();
            log::debug!(
                "ImageSequenceSource: closed {} after {} frame(s)",
                self.root.display(),
                self.frame_count
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn write_png(dir: &Path, name: &str, shade: u8) {
        RgbImage::from_pixel(4, 3, Rgb([shade, shade, shade]))
            .save(dir.join(name))
            .unwrap();
    }

    fn shade_of(outcome: ReadOutcome) -> u8 {
        match outcome {
            ReadOutcome::Frame(frame) => frame.pixels()[0],
            _ => panic!("expected a frame"),
        }
    }

    #[test]
    fn directory_is_read_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "b.png", 20);
        write_png(dir.path(), "a.png", 10);
        write_png(dir.path(), "c.png", 30);
        std::fs::write(dir.path().join("notes.txt"), b"skip me").unwrap();

        let mut source = ImageSequenceSource::open(dir.path()).unwrap();
        assert_eq!(source.remaining(), 3);
        assert_eq!(shade_of(source.read()), 10);
        assert_eq!(shade_of(source.read()), 20);
        assert_eq!(shade_of(source.read()), 30);
        assert!(matches!(source.read(), ReadOutcome::EndOfStream));
    }

    #[test]
    fn single_image_yields_one_frame() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "still.png", 77);
        let mut source = ImageSequenceSource::open(&dir.path().join("still.png")).unwrap();
        match source.read() {
            ReadOutcome::Frame(frame) => {
                assert_eq!((frame.width(), frame.height()), (4, 3));
                assert_eq!(frame.sequence(), 1);
            }
            _ => panic!("expected a frame"),
        }
        assert!(matches!(source.read(), ReadOutcome::EndOfStream));
    }

    #[test]
    fn empty_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ImageSequenceSource::open(dir.path()).is_err());
    }

    #[test]
    fn corrupt_image_fails_the_read() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.png"), b"not a png").unwrap();
        let mut source = ImageSequenceSource::open(dir.path()).unwrap();
        assert!(matches!(source.read(), ReadOutcome::Failed(_)));
    }

    #[test]
    fn extension_check_ignores_case() {
        assert!(is_image_path(Path::new("shot.JPG")));
        assert!(!is_image_path(Path::new("clip.mp4")));
        assert!(!is_image_path(Path::new("README")));
    }
}
