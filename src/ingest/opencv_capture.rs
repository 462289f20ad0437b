//! OpenCV `VideoCapture` source for camera indices, files and stream URLs.

use anyhow::{anyhow, Context, Result};
use opencv::{
    core::Mat,
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture},
};

use super::{FrameSource, ReadOutcome};
use crate::frame::Frame;

pub struct OpencvSource {
    label: String,
    capture: Option<VideoCapture>,
    frame_count: u64,
}

impl OpencvSource {
    /// Open capture device `/dev/video<index>` (or the platform equivalent).
    pub fn open_device(index: u32) -> Result<Self> {
        let label = format!("device #{}", index);
        for backend in [videoio::CAP_V4L, videoio::CAP_ANY] {
            match VideoCapture::new(index as i32, backend) {
                Ok(capture) if capture.is_opened().unwrap_or(false) => {
                    return Ok(Self::from_capture(label, capture));
                }
                Ok(_) => {}
                Err(err) => {
                    log::debug!("OpencvSource: {} failed with backend {}: {}", label, backend, err);
                }
            }
        }
        Err(anyhow!("could not open capture {}", label))
    }

    /// Open a file path or stream URL.
    pub fn open_target(target: &str) -> Result<Self> {
        let capture = VideoCapture::from_file(target, videoio::CAP_ANY)
            .with_context(|| format!("failed to open '{}' with opencv", target))?;
        if !capture.is_opened().context("query capture state")? {
            return Err(anyhow!("could not open '{}' with opencv", target));
        }
        Ok(Self::from_capture(target.to_string(), capture))
    }

    fn from_capture(label: String, capture: VideoCapture) -> Self {
        log::info!("OpencvSource: opened {}", label);
        Self {
            label,
            capture: Some(capture),
            frame_count: 0,
        }
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(capture) = self.capture.as_mut() else {
            return Ok(None);
        };
        let mut bgr = Mat::default();
        if !capture.read(&mut bgr).context("read from capture")? || bgr.empty() {
            return Ok(None);
        }

        let mut rgb = Mat::default();
        imgproc::cvt_color(&bgr, &mut rgb, imgproc::COLOR_BGR2RGB, 0)
            .context("convert BGR to RGB")?;
        let width = rgb.cols() as u32;
        let height = rgb.rows() as u32;
        let pixels = rgb.data_bytes().context("read frame bytes")?.to_vec();

        self.frame_count += 1;
        Frame::from_rgb(pixels, width, height, self.frame_count).map(Some)
    }
}

impl FrameSource for OpencvSource {
    fn describe(&self) -> String {
        format!("{} (opencv)", self.label)
    }

    fn read(&mut self) -> ReadOutcome {
        match self.next_frame() {
            Ok(Some(frame)) => ReadOutcome::Frame(frame),
            Ok(None) => ReadOutcome::EndOfStream,
            Err(e) => ReadOutcome::Failed(e),
        }
    }

    fn close(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            if let Err(err) = capture.release() {
                log::warn!("OpencvSource: release of {} failed: {}", self.label, err);
            }
            log::debug!(
                "OpencvSource: closed {} after {} frame(s)",
                self.label,
                self.frame_count
            );
        }
    }
}
