//! YOLOv8 pre- and post-processing that does not depend on an inference runtime.
//!
//! The detection head emits one column per anchor: `cx, cy, w, h` in letterboxed
//! input pixels followed by one score per class. Exports disagree on whether
//! channels or anchors come first, so both layouts are accepted.

use anyhow::{anyhow, Result};
use image::{imageops, Rgb, RgbImage};

use crate::detect::labels::class_label;
use crate::detect::result::Detection;

/// Overlap above which a lower-scoring box of the same class is dropped.
pub const IOU_THRESHOLD: f32 = 0.45;
/// Gray fill for the letterbox border.
pub const PAD_VALUE: u8 = 114;

const BOX_CHANNELS: usize = 4;

/// How a frame was fitted into the square model input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
}

impl Letterbox {
    /// Map an input-space x coordinate back to the frame.
    fn frame_x(&self, x: f32) -> f32 {
        (x - self.pad_x) / self.scale
    }

    fn frame_y(&self, y: f32) -> f32 {
        (y - self.pad_y) / self.scale
    }
}

/// Shape of a detection head output with the batch axis removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutputLayout {
    pub channels: usize,
    pub anchors: usize,
    /// `[channels, anchors]` when true, `[anchors, channels]` otherwise.
    pub channels_first: bool,
}

impl OutputLayout {
    /// Infer the layout from a `[1, a, b]` shape. The anchor axis is the longer one.
    pub fn from_shape(shape: &[usize]) -> Result<Self> {
        let (a, b) = match shape {
            [1, a, b] => (*a, *b),
            [a, b] => (*a, *b),
            _ => return Err(anyhow!("unexpected detection output shape {:?}", shape)),
        };
        let layout = if a <= b {
            Self {
                channels: a,
                anchors: b,
                channels_first: true,
            }
        } else {
            Self {
                channels: b,
                anchors: a,
                channels_first: false,
            }
        };
        if layout.channels <= BOX_CHANNELS {
            return Err(anyhow!(
                "detection output has {} channels, expected box + class scores",
                layout.channels
            ));
        }
        Ok(layout)
    }

    fn value(&self, data: &[f32], channel: usize, anchor: usize) -> f32 {
        if self.channels_first {
            data[channel * self.anchors + anchor]
        } else {
            data[anchor * self.channels + channel]
        }
    }
}

/// Resize `image` to fit a `size` x `size` square, preserving aspect ratio, centred on gray.
pub fn letterbox(image: &RgbImage, size: u32) -> (RgbImage, Letterbox) {
    let (width, height) = image.dimensions();
    let scale = (size as f32 / width.max(1) as f32).min(size as f32 / height.max(1) as f32);
    let new_width = ((width as f32 * scale).round() as u32).clamp(1, size);
    let new_height = ((height as f32 * scale).round() as u32).clamp(1, size);
    let resized = imageops::resize(image, new_width, new_height, imageops::FilterType::Triangle);

    let pad_x = (size - new_width) / 2;
    let pad_y = (size - new_height) / 2;
    let mut canvas = RgbImage::from_pixel(size, size, Rgb([PAD_VALUE; 3]));
    imageops::replace(&mut canvas, &resized, pad_x as i64, pad_y as i64);

    (
        canvas,
        Letterbox {
            scale,
            pad_x: pad_x as f32,
            pad_y: pad_y as f32,
        },
    )
}

/// Decode raw head output into frame-space detections at or above `confidence`.
pub fn decode_predictions(
    data: &[f32],
    layout: OutputLayout,
    confidence: f32,
    letterbox: &Letterbox,
    frame_width: u32,
    frame_height: u32,
) -> Result<Vec<Detection>> {
    let expected = layout.channels * layout.anchors;
    if data.len() < expected {
        return Err(anyhow!(
            "detection output holds {} values, layout needs {}",
            data.len(),
            expected
        ));
    }

    let max_x = frame_width as f32;
    let max_y = frame_height as f32;
    let mut detections = Vec::new();

    for anchor in 0..layout.anchors {
        let mut best_class = 0;
        let mut best_score = f32::NEG_INFINITY;
        for channel in BOX_CHANNELS..layout.channels {
            let score = layout.value(data, channel, anchor);
            if score > best_score {
                best_score = score;
                best_class = channel - BOX_CHANNELS;
            }
        }
        if !best_score.is_finite() || best_score < confidence {
            continue;
        }

        let cx = layout.value(data, 0, anchor);
        let cy = layout.value(data, 1, anchor);
        let w = layout.value(data, 2, anchor);
        let h = layout.value(data, 3, anchor);

        let left = letterbox.frame_x(cx - w / 2.0).clamp(0.0, max_x);
        let top = letterbox.frame_y(cy - h / 2.0).clamp(0.0, max_y);
        let right = letterbox.frame_x(cx + w / 2.0).clamp(0.0, max_x);
        let bottom = letterbox.frame_y(cy + h / 2.0).clamp(0.0, max_y);
        if right <= left || bottom <= top {
            continue;
        }

        detections.push(Detection {
            x: left,
            y: top,
            w: right - left,
            h: bottom - top,
            confidence: best_score,
            class_id: best_class,
            label: class_label(best_class),
        });
    }

    Ok(detections)
}

/// Class-aware greedy non-maximum suppression. Output is sorted by confidence, highest first.
pub fn non_max_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    let mut kept: Vec<Detection> = Vec::with_capacity(detections.len());
    for candidate in detections {
        let suppressed = kept
            .iter()
            .any(|k| k.class_id == candidate.class_id && k.iou(&candidate) > iou_threshold);
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Letterbox {
        Letterbox {
            scale: 1.0,
            pad_x: 0.0,
            pad_y: 0.0,
        }
    }

    #[test]
    fn layout_picks_longer_axis_as_anchors() {
        let layout = OutputLayout::from_shape(&[1, 84, 8400]).unwrap();
        assert_eq!(layout.channels, 84);
        assert_eq!(layout.anchors, 8400);
        assert!(layout.channels_first);

        let layout = OutputLayout::from_shape(&[1, 8400, 84]).unwrap();
        assert_eq!(layout.channels, 84);
        assert!(!layout.channels_first);

        assert!(OutputLayout::from_shape(&[1, 2, 3, 4]).is_err());
        assert!(OutputLayout::from_shape(&[1, 4, 100]).is_err());
    }

    #[test]
    fn letterbox_pads_the_short_side() {
        let image = RgbImage::from_pixel(200, 100, Rgb([10, 20, 30]));
        let (input, lb) = letterbox(&image, 64);
        assert_eq!(input.dimensions(), (64, 64));
        assert!((lb.scale - 0.32).abs() < 1e-6);
        assert_eq!(lb.pad_x, 0.0);
        assert_eq!(lb.pad_y, 16.0);
        assert_eq!(*input.get_pixel(32, 2), Rgb([PAD_VALUE; 3]));
        assert_eq!(*input.get_pixel(32, 32), Rgb([10, 20, 30]));
    }

    #[test]
    fn decode_keeps_best_class_above_threshold() {
        // 2 anchors, 4 box channels + 3 classes, channels first.
        let layout = OutputLayout {
            channels: 7,
            anchors: 2,
            channels_first: true,
        };
        #[rustfmt::skip]
        let data = [
            50.0, 10.0,  // cx
            40.0, 10.0,  // cy
            20.0, 4.0,   // w
            10.0, 4.0,   // h
            0.1, 0.05,   // class 0
            0.2, 0.1,    // class 1
            0.9, 0.15,   // class 2
        ];
        let detections = decode_predictions(&data, layout, 0.25, &identity(), 640, 480).unwrap();
        assert_eq!(detections.len(), 1);
        let d = &detections[0];
        assert_eq!(d.class_id, 2);
        assert_eq!(d.label, "car");
        assert_eq!((d.x, d.y, d.w, d.h), (40.0, 35.0, 20.0, 10.0));
        assert!((d.confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn decode_maps_through_letterbox_and_clamps() {
        let layout = OutputLayout {
            channels: 5,
            anchors: 1,
            channels_first: false,
        };
        let data = [10.0, 26.0, 40.0, 8.0, 0.8];
        let lb = Letterbox {
            scale: 0.5,
            pad_x: 0.0,
            pad_y: 16.0,
        };
        let detections = decode_predictions(&data, layout, 0.5, &lb, 100, 100).unwrap();
        let d = &detections[0];
        assert_eq!(d.x, 0.0);
        assert_eq!(d.y, 12.0);
        assert_eq!(d.w, 60.0);
        assert_eq!(d.h, 16.0);
    }

    #[test]
    fn decode_rejects_short_buffers() {
        let layout = OutputLayout {
            channels: 6,
            anchors: 10,
            channels_first: true,
        };
        assert!(decode_predictions(&[0.0; 12], layout, 0.25, &identity(), 10, 10).is_err());
    }

    #[test]
    fn nms_suppresses_same_class_overlaps_only() {
        let make = |x: f32, confidence: f32, class_id: usize| Detection {
            x,
            y: 0.0,
            w: 10.0,
            h: 10.0,
            confidence,
            class_id,
            label: class_label(class_id),
        };
        let kept = non_max_suppression(
            vec![
                make(1.0, 0.6, 0),
                make(0.0, 0.9, 0),
                make(0.0, 0.7, 1),
                make(30.0, 0.5, 0),
            ],
            IOU_THRESHOLD,
        );
        let summary: Vec<(usize, f32)> = kept.iter().map(|d| (d.class_id, d.confidence)).collect();
        assert_eq!(summary, vec![(0, 0.9), (1, 0.7), (0, 0.5)]);
    }
}
