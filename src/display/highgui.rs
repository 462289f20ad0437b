use anyhow::{Context, Result};
use opencv::{core::Mat, highgui, imgproc, prelude::*};

use super::{CancelFlag, Renderer, POLL_WAIT_MS, QUIT_KEY};
use crate::frame::AnnotatedFrame;

/// On-screen window backed by OpenCV highgui.
pub struct HighGuiRenderer {
    title: String,
    cancel: CancelFlag,
    window_open: bool,
}

impl HighGuiRenderer {
    pub fn new(title: &str, cancel: CancelFlag) -> Self {
        Self {
            title: title.to_string(),
            cancel,
            window_open: false,
        }
    }

    fn ensure_window(&mut self) -> Result<()> {
        if !self.window_open {
            highgui::named_window(&self.title, highgui::WINDOW_AUTOSIZE)
                .with_context(|| format!("failed to create window '{}'", self.title))?;
            self.window_open = true;
        }
        Ok(())
    }
}

impl Renderer for HighGuiRenderer {
    fn show(&mut self, frame: &AnnotatedFrame) -> Result<()> {
        self.ensure_window()?;
        let flat = Mat::from_slice(frame.image().as_raw()).context("wrap frame pixels")?;
        let rgb = flat
            .reshape(3, frame.height() as i32)
            .context("reshape frame pixels")?
            .try_clone()
            .context("copy frame pixels")?;
        let mut bgr = Mat::default();
        imgproc::cvt_color(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR, 0)
            .context("convert RGB to BGR")?;
        highgui::imshow(&self.title, &bgr).context("show frame")?;
        Ok(())
    }

    fn poll_cancel(&mut self) -> bool {
        if self.cancel.is_cancelled() {
            return true;
        }
        match highgui::wait_key(POLL_WAIT_MS) {
            Ok(key) => key >= 0 && (key & 0xFF) == QUIT_KEY as i32,
            Err(err) => {
                log::warn!("display: key poll failed: {}", err);
                false
            }
        }
    }

    fn close(&mut self) {
        if self.window_open {
            self.window_open = false;
            if let Err(err) = highgui::destroy_all_windows() {
                log::warn!("display: failed to destroy windows: {}", err);
            }
        }
    }
}
