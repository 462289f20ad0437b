//! Frame ownership types.
//!
//! - `Frame`: one captured RGB8 image. Produced by a frame source, owned by the loop
//!   for exactly one cycle, borrowed by the detector.
//! - `AnnotatedFrame`: a new buffer with detection graphics and the fps readout drawn in.
//!
//! Neither type implements `Clone`. A cycle cannot keep a frame alive past its end
//! without the compiler noticing.

use anyhow::{anyhow, Result};
use image::RgbImage;
use std::time::Instant;

use crate::annotate::{self, FPS_COLOR, FPS_ORIGIN, FPS_SCALE};
use crate::detect::Detection;
use crate::fps::fps_label;

// ----------------------------------------------------------------------------
// Frame: one captured image
// ----------------------------------------------------------------------------

#[derive(Debug)]
pub struct Frame {
    image: RgbImage,
    /// Position of this frame in its source, starting at 1.
    sequence: u64,
    /// Monotonic capture instant.
    captured_at: Instant,
}

// Explicitly NOT implementing Clone.

impl Frame {
    pub fn new(image: RgbImage, sequence: u64) -> Self {
        Self {
            image,
            sequence,
            captured_at: Instant::now(),
        }
    }

    /// Build a frame from tightly packed RGB8 pixels.
    pub fn from_rgb(pixels: Vec<u8>, width: u32, height: u32, sequence: u64) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if pixels.len() != expected {
            return Err(anyhow!(
                "expected {} RGB bytes for {}x{}, received {}",
                expected,
                width,
                height,
                pixels.len()
            ));
        }
        let image = RgbImage::from_raw(width, height, pixels)
            .ok_or_else(|| anyhow!("pixel buffer does not match {}x{}", width, height))?;
        Ok(Self::new(image, sequence))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    /// Read-only RGB8 pixels, row-major.
    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }
}

// ----------------------------------------------------------------------------
// AnnotatedFrame: detector output plus overlays
// ----------------------------------------------------------------------------

pub struct AnnotatedFrame {
    image: RgbImage,
    detections: Vec<Detection>,
    sequence: u64,
    overlay: Option<String>,
}

impl AnnotatedFrame {
    /// Copy the frame's pixels and draw every detection onto the copy.
    pub fn from_detections(frame: &Frame, detections: Vec<Detection>) -> Self {
        let mut image = frame.image.clone();
        for detection in &detections {
            annotate::draw_detection(&mut image, detection);
        }
        Self {
            image,
            detections,
            sequence: frame.sequence,
            overlay: None,
        }
    }

    /// Draw the `"FPS: x.y"` readout at the fixed top-left position.
    ///
    /// Called once per cycle; a second call draws over the first.
    pub fn overlay_fps(&mut self, fps: f64) {
        let label = fps_label(fps);
        annotate::draw_text(
            &mut self.image,
            FPS_ORIGIN.0,
            FPS_ORIGIN.1,
            &label,
            FPS_SCALE,
            FPS_COLOR,
        );
        self.overlay = Some(label);
    }

    /// Text of the fps overlay, if one was drawn.
    pub fn overlay_text(&self) -> Option<&str> {
        self.overlay.as_deref()
    }

    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray_frame(width: u32, height: u32) -> Frame {
        Frame::from_rgb(vec![40; (width * height * 3) as usize], width, height, 1).unwrap()
    }

    #[test]
    fn capture_instant_is_taken_at_construction() {
        let before = Instant::now();
        let frame = gray_frame(8, 8);
        let after = Instant::now();
        assert!(frame.captured_at() >= before);
        assert!(frame.captured_at() <= after);
    }

    #[test]
    fn from_rgb_rejects_short_buffers() {
        let err = Frame::from_rgb(vec![0; 10], 4, 4, 1).unwrap_err();
        assert!(err.to_string().contains("expected 48 RGB bytes"));
    }

    #[test]
    fn annotation_does_not_touch_the_input_frame() {
        let frame = gray_frame(64, 48);
        let detection = Detection {
            x: 4.0,
            y: 20.0,
            w: 20.0,
            h: 20.0,
            confidence: 0.9,
            class_id: 0,
            label: "person".to_string(),
        };
        let annotated = AnnotatedFrame::from_detections(&frame, vec![detection]);

        assert!(frame.pixels().iter().all(|p| *p == 40));
        assert_ne!(annotated.image().as_raw(), frame.pixels());
        assert_eq!(annotated.detections().len(), 1);
        assert_eq!(annotated.sequence(), 1);
    }

    #[test]
    fn fps_overlay_is_drawn_top_left() {
        let frame = gray_frame(320, 240);
        let mut annotated = AnnotatedFrame::from_detections(&frame, Vec::new());
        assert!(annotated.overlay_text().is_none());

        annotated.overlay_fps(29.97);

        assert_eq!(annotated.overlay_text(), Some("FPS: 30.0"));
        let green_in_corner = (0..120)
            .flat_map(|x| (0..40).map(move |y| (x, y)))
            .filter(|&(x, y)| *annotated.image().get_pixel(x, y) == FPS_COLOR)
            .count();
        assert!(green_in_corner > 0);
        let green_elsewhere = (0..320)
            .flat_map(|x| (60..240).map(move |y| (x, y)))
            .filter(|&(x, y)| *annotated.image().get_pixel(x, y) == FPS_COLOR)
            .count();
        assert_eq!(green_elsewhere, 0);
    }
}
