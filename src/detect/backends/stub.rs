use anyhow::Result;

use crate::detect::backend::DetectorBackend;
use crate::detect::labels::class_label;
use crate::detect::result::{Detection, InferenceParams};
use crate::frame::Frame;

/// Side of the square block the stub backend scores.
const BLOCK: u32 = 32;
/// Confidence reported for the stub box.
pub const STUB_CONFIDENCE: f32 = 0.5;

/// Stub backend for testing and model-free runs.
///
/// Reports a single "person" box around the brightest 32x32 block of the frame.
/// The result depends only on the pixels, so runs are reproducible.
#[derive(Default)]
pub struct StubBackend {
    frames_seen: u64,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, frame: &Frame, params: &InferenceParams) -> Result<Vec<Detection>> {
        self.frames_seen += 1;

        if frame.width() == 0 || frame.height() == 0 || STUB_CONFIDENCE < params.confidence {
            return Ok(Vec::new());
        }

        let block_w = BLOCK.min(frame.width());
        let block_h = BLOCK.min(frame.height());
        let image = frame.image();

        let mut best = (0u32, 0u32);
        let mut best_sum = 0u64;
        let mut first = true;
        for by in (0..=frame.height() - block_h).step_by(block_h as usize) {
            for bx in (0..=frame.width() - block_w).step_by(block_w as usize) {
                let mut sum = 0u64;
                for y in by..by + block_h {
                    for x in bx..bx + block_w {
                        let [r, g, b] = image.get_pixel(x, y).0;
                        sum += r as u64 + g as u64 + b as u64;
                    }
                }
                if first || sum > best_sum {
                    best = (bx, by);
                    best_sum = sum;
                    first = false;
                }
            }
        }

        Ok(vec![Detection {
            x: best.0 as f32,
            y: best.1 as f32,
            w: block_w as f32,
            h: block_h as f32,
            confidence: STUB_CONFIDENCE,
            class_id: 0,
            label: class_label(0),
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn params(confidence: f32) -> InferenceParams {
        InferenceParams {
            image_size: 640,
            confidence,
        }
    }

    #[test]
    fn stub_backend_finds_brightest_block() {
        let mut image = RgbImage::from_pixel(128, 96, Rgb([10, 10, 10]));
        for y in 64..96 {
            for x in 32..64 {
                image.put_pixel(x, y, Rgb([250, 250, 250]));
            }
        }
        let frame = Frame::new(image, 1);
        let mut backend = StubBackend::new();

        let detections = backend.detect(&frame, &params(0.25)).unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!((detections[0].x, detections[0].y), (32.0, 64.0));
        assert_eq!(detections[0].label, "person");

        let again = backend.detect(&frame, &params(0.25)).unwrap();
        assert_eq!(again, detections);
        assert_eq!(backend.frames_seen(), 2);
    }

    #[test]
    fn stub_backend_respects_threshold() {
        let frame = Frame::new(RgbImage::new(64, 64), 1);
        let mut backend = StubBackend::new();
        assert!(backend.detect(&frame, &params(0.9)).unwrap().is_empty());
    }

    #[test]
    fn stub_backend_handles_frames_smaller_than_a_block() {
        let frame = Frame::new(RgbImage::from_pixel(8, 4, Rgb([1, 2, 3])), 1);
        let mut backend = StubBackend::new();
        let detections = backend.detect(&frame, &params(0.0)).unwrap();
        assert_eq!((detections[0].w, detections[0].h), (8.0, 4.0));
    }
}
