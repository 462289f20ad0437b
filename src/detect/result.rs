/// One detected object in frame pixel coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    pub w: f32,
    pub h: f32,
    pub confidence: f32,
    pub class_id: usize,
    pub label: String,
}

impl Detection {
    pub fn area(&self) -> f32 {
        self.w.max(0.0) * self.h.max(0.0)
    }

    /// Intersection over union of two boxes. Zero when either box is empty.
    pub fn iou(&self, other: &Detection) -> f32 {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = (self.x + self.w).min(other.x + other.w);
        let bottom = (self.y + self.h).min(other.y + other.h);
        let intersection = (right - left).max(0.0) * (bottom - top).max(0.0);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }
}

/// Per-call inference parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InferenceParams {
    /// Square model input resolution in pixels.
    pub image_size: u32,
    /// Minimum confidence for a detection to be kept, in `[0, 1]`.
    pub confidence: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(x: f32, y: f32, w: f32, h: f32) -> Detection {
        Detection {
            x,
            y,
            w,
            h,
            confidence: 1.0,
            class_id: 0,
            label: "person".to_string(),
        }
    }

    #[test]
    fn iou_of_identical_boxes_is_one() {
        let a = boxed(10.0, 10.0, 20.0, 20.0);
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn iou_of_half_overlap() {
        let a = boxed(0.0, 0.0, 10.0, 10.0);
        let b = boxed(5.0, 0.0, 10.0, 10.0);
        // 50 / (100 + 100 - 50)
        assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn disjoint_and_empty_boxes_have_zero_iou() {
        let a = boxed(0.0, 0.0, 10.0, 10.0);
        assert_eq!(a.iou(&boxed(50.0, 50.0, 5.0, 5.0)), 0.0);
        assert_eq!(boxed(0.0, 0.0, 0.0, 0.0).iou(&boxed(0.0, 0.0, 0.0, 0.0)), 0.0);
    }
}
