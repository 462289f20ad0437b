use anyhow::Result;
use std::time::{Duration, Instant};

use super::{CancelFlag, Renderer};
use crate::frame::AnnotatedFrame;

const REPORT_INTERVAL: Duration = Duration::from_secs(5);

/// Renderer without a window.
///
/// Logs the overlay of every frame at debug level and a summary line every few
/// seconds. Only the cancel flag can stop it.
pub struct HeadlessRenderer {
    cancel: CancelFlag,
    frames_shown: u64,
    last_report: Instant,
    closed: bool,
}

impl HeadlessRenderer {
    pub fn new(cancel: CancelFlag) -> Self {
        Self {
            cancel,
            frames_shown: 0,
            last_report: Instant::now(),
            closed: false,
        }
    }

    pub fn frames_shown(&self) -> u64 {
        self.frames_shown
    }
}

impl Renderer for HeadlessRenderer {
    fn show(&mut self, frame: &AnnotatedFrame) -> Result<()> {
        self.frames_shown += 1;
        let overlay = frame.overlay_text().unwrap_or("-");
        log::debug!(
            "frame {}: {} detection(s), {}",
            frame.sequence(),
            frame.detections().len(),
            overlay
        );
        if self.last_report.elapsed() >= REPORT_INTERVAL {
            log::info!(
                "display: {} frame(s) shown, last {}x{} {}",
                self.frames_shown,
                frame.width(),
                frame.height(),
                overlay
            );
            self.last_report = Instant::now();
        }
        Ok(())
    }

    fn poll_cancel(&mut self) -> bool {
        self.cancel.is_cancelled()
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            log::debug!("display: headless renderer closed after {} frame(s)", self.frames_shown);
        }
    }
}
