//! Frame sources.
//!
//! This module resolves a `SourceSpec` into a concrete frame source:
//! - `stub://` URLs: synthetic test pattern (always available)
//! - Still images and directories of images (always available)
//! - Video files and stream URLs (feature: ingest-ffmpeg, or opencv)
//! - Capture devices by index (feature: opencv)
//!
//! Sources hand out one `Frame` per `read`. They do not buffer frames for the
//! caller and do not write anything to disk.

#[cfg(feature = "ingest-ffmpeg")]
pub(crate) mod ffmpeg_decode;
pub mod file;
#[cfg(feature = "opencv")]
pub(crate) mod opencv_capture;
mod source_spec;
pub mod synthetic;

#[cfg(feature = "ingest-ffmpeg")]
pub use ffmpeg_decode::FfmpegSource;
pub use file::{is_image_path, ImageSequenceSource};
#[cfg(feature = "opencv")]
pub use opencv_capture::OpencvSource;
pub use source_spec::SourceSpec;
pub use synthetic::{SyntheticConfig, SyntheticSource, STUB_SCHEME};

use crate::error::StartupError;
use crate::frame::Frame;

/// Result of a single `FrameSource::read`.
pub enum ReadOutcome {
    /// A frame was captured.
    Frame(Frame),
    /// The source has no more frames.
    EndOfStream,
    /// The source failed and cannot continue. Not retried.
    Failed(anyhow::Error),
}

impl ReadOutcome {
    /// True when a frame was produced.
    pub fn is_frame(&self) -> bool {
        matches!(self, ReadOutcome::Frame(_))
    }
}

/// A device, file or stream producing frames one at a time.
pub trait FrameSource {
    /// Human-readable label for logs.
    fn describe(&self) -> String;

    /// Block until the next frame is available or the source is finished.
    ///
    /// After `close`, every read returns `EndOfStream`.
    fn read(&mut self) -> ReadOutcome;

    /// Release the underlying resources. Safe to call any number of times.
    fn close(&mut self);
}

/// Open the source described by `spec`.
///
/// Fails with `StartupError::SourceUnavailable` when the target cannot be opened
/// or the backend it needs was not compiled in.
pub fn open_source(spec: &SourceSpec) -> Result<Box<dyn FrameSource>, StartupError> {
    let label = spec.to_string();
    let source: Box<dyn FrameSource> = match spec {
        SourceSpec::Url(url) if url.starts_with(STUB_SCHEME) => {
            let config = SyntheticConfig::from_url(url)
                .map_err(|e| StartupError::source_unavailable(&label, format!("{:#}", e)))?;
            Box::new(SyntheticSource::new(config))
        }
        SourceSpec::Url(url) => open_video(&label, url)?,
        SourceSpec::Device(index) => open_device(&label, *index)?,
        SourceSpec::Path(path) => {
            if !path.exists() {
                return Err(StartupError::source_unavailable(
                    label,
                    "no such file or directory",
                ));
            }
            if path.is_dir() || is_image_path(path) {
                Box::new(
                    ImageSequenceSource::open(path)
                        .map_err(|e| StartupError::source_unavailable(&label, format!("{:#}", e)))?,
                )
            } else {
                open_video(&label, &path.to_string_lossy())?
            }
        }
    };
    log::info!("source: opened {}", source.describe());
    Ok(source)
}

fn open_video(label: &str, target: &str) -> Result<Box<dyn FrameSource>, StartupError> {
    #[cfg(feature = "ingest-ffmpeg")]
    {
        FfmpegSource::open(target)
            .map(|source| Box::new(source) as Box<dyn FrameSource>)
            .map_err(|e| StartupError::source_unavailable(label, format!("{:#}", e)))
    }
    #[cfg(all(feature = "opencv", not(feature = "ingest-ffmpeg")))]
    {
        OpencvSource::open_target(target)
            .map(|source| Box::new(source) as Box<dyn FrameSource>)
            .map_err(|e| StartupError::source_unavailable(label, format!("{:#}", e)))
    }
    #[cfg(not(any(feature = "ingest-ffmpeg", feature = "opencv")))]
    {
        let _ = target;
        Err(StartupError::source_unavailable(
            label,
            "video decoding requires the ingest-ffmpeg or opencv feature",
        ))
    }
}

fn open_device(label: &str, index: u32) -> Result<Box<dyn FrameSource>, StartupError> {
    #[cfg(feature = "opencv")]
    {
        OpencvSource::open_device(index)
            .map(|source| Box::new(source) as Box<dyn FrameSource>)
            .map_err(|e| StartupError::source_unavailable(label, format!("{:#}", e)))
    }
    #[cfg(not(feature = "opencv"))]
    {
        let _ = index;
        Err(StartupError::source_unavailable(
            label,
            "camera capture requires the opencv feature",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_url_opens_synthetic_source() {
        let spec = SourceSpec::parse("stub://bench?frames=2").unwrap();
        let mut source = open_source(&spec).unwrap();
        assert!(source.read().is_frame());
        assert!(source.read().is_frame());
        assert!(matches!(source.read(), ReadOutcome::EndOfStream));
        source.close();
        source.close();
    }

    #[test]
    fn missing_path_is_source_unavailable() {
        let spec = SourceSpec::parse("/definitely/not/here.mp4").unwrap();
        let err = open_source(&spec).err().unwrap();
        assert!(matches!(err, StartupError::SourceUnavailable { .. }));
        assert!(err.to_string().contains("/definitely/not/here.mp4"));
    }

    #[test]
    fn malformed_stub_url_is_source_unavailable() {
        let spec = SourceSpec::parse("stub://cam?frames=lots").unwrap();
        assert!(matches!(
            open_source(&spec),
            Err(StartupError::SourceUnavailable { .. })
        ));
    }

    #[cfg(not(feature = "opencv"))]
    #[test]
    fn device_index_needs_opencv() {
        let err = open_source(&SourceSpec::Device(0)).err().unwrap();
        assert!(err.to_string().contains("opencv"));
    }

    #[cfg(not(any(feature = "ingest-ffmpeg", feature = "opencv")))]
    #[test]
    fn video_file_needs_a_decoder_feature() {
        let dir = tempfile::tempdir().unwrap();
        let clip = dir.path().join("clip.mp4");
        std::fs::write(&clip, b"\x00\x00\x00\x18ftypmp42").unwrap();

        let err = open_source(&SourceSpec::Path(clip)).err().unwrap();
        assert!(matches!(err, StartupError::SourceUnavailable { .. }));
        assert!(err.to_string().contains("ingest-ffmpeg or opencv"));
    }
}
