mod backend;
mod backends;
pub mod labels;
mod result;
pub mod yolo;

use anyhow::{Context, Result};
use std::path::Path;

use crate::error::StartupError;
use crate::frame::{AnnotatedFrame, Frame};

pub use backend::DetectorBackend;
pub use backends::StubBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use result::{Detection, InferenceParams};

/// Weights prefix that selects the built-in stub backend.
pub const STUB_WEIGHTS_PREFIX: &str = "stub://";

/// A loaded detection model.
///
/// Constructed once at startup and handed to the session by value; there is no
/// process-wide model state.
pub struct Detector {
    backend: Box<dyn DetectorBackend>,
}

impl Detector {
    /// Load weights and warm the backend up.
    ///
    /// `stub://...` selects the stub backend; `.onnx` files need the `backend-tract` feature.
    pub fn load(weights: &Path, image_size: u32) -> Result<Self, StartupError> {
        let weights_str = weights.to_string_lossy();
        let backend: Box<dyn DetectorBackend> = if weights_str.starts_with(STUB_WEIGHTS_PREFIX) {
            Box::new(StubBackend::new())
        } else {
            load_file_backend(weights, image_size)?
        };

        let mut detector = Self::from_backend(backend);
        detector
            .backend
            .warm_up()
            .map_err(|e| StartupError::model_load(weights, format!("warm-up failed: {:#}", e)))?;
        log::info!(
            "detector: loaded {} with {} backend (imgsz={})",
            weights.display(),
            detector.name(),
            image_size
        );
        Ok(detector)
    }

    pub fn from_backend(backend: Box<dyn DetectorBackend>) -> Self {
        Self { backend }
    }

    pub fn name(&self) -> &'static str {
        self.backend.name()
    }

    /// Detect objects in `frame` and draw them onto a copy of it.
    ///
    /// The frame is only borrowed for the call. Detections below
    /// `params.confidence` are dropped even if the backend returned them.
    pub fn infer(&mut self, frame: &Frame, params: &InferenceParams) -> Result<AnnotatedFrame> {
        let mut detections = self
            .backend
            .detect(frame, params)
            .with_context(|| format!("{} backend failed on frame {}", self.name(), frame.sequence()))?;
        detections.retain(|d| d.confidence >= params.confidence);
        log::trace!(
            "frame {}: {} detection(s)",
            frame.sequence(),
            detections.len()
        );
        Ok(AnnotatedFrame::from_detections(frame, detections))
    }
}

fn load_file_backend(
    weights: &Path,
    image_size: u32,
) -> Result<Box<dyn DetectorBackend>, StartupError> {
    if !weights.is_file() {
        return Err(StartupError::model_load(weights, "file not found"));
    }
    let extension = weights
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "onnx" => {
            #[cfg(feature = "backend-tract")]
            {
                let backend = TractBackend::new(weights, image_size)
                    .map_err(|e| StartupError::model_load(weights, format!("{:#}", e)))?;
                Ok(Box::new(backend))
            }
            #[cfg(not(feature = "backend-tract"))]
            {
                let _ = image_size;
                Err(StartupError::model_load(
                    weights,
                    "ONNX weights require the backend-tract feature",
                ))
            }
        }
        "pt" => Err(StartupError::model_load(
            weights,
            "PyTorch checkpoints are not supported; export the model to ONNX",
        )),
        other => Err(StartupError::model_load(
            weights,
            format!("unsupported weights format '{}'", other),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    struct FixedBackend(Vec<Detection>);

    impl DetectorBackend for FixedBackend {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn detect(&mut self, _frame: &Frame, _params: &InferenceParams) -> Result<Vec<Detection>> {
            Ok(self.0.clone())
        }
    }

    fn detection(confidence: f32) -> Detection {
        Detection {
            x: 1.0,
            y: 1.0,
            w: 4.0,
            h: 4.0,
            confidence,
            class_id: 0,
            label: "person".to_string(),
        }
    }

    #[test]
    fn stub_weights_load_without_a_file() {
        let detector = Detector::load(Path::new("stub://yolov8n"), 640).unwrap();
        assert_eq!(detector.name(), "stub");
    }

    #[test]
    fn missing_weights_are_a_model_load_error() {
        let err = Detector::load(Path::new("/nonexistent/yolov8n.onnx"), 640)
            .err()
            .unwrap();
        assert!(matches!(err, StartupError::ModelLoadError { .. }));
    }

    #[test]
    fn unsupported_weights_format_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("yolov8n.pt");
        std::fs::write(&path, b"not a model").unwrap();
        let err = Detector::load(&path, 640).err().unwrap();
        assert!(err.to_string().contains("ONNX"));
    }

    #[test]
    fn infer_filters_below_threshold_and_keeps_frame() {
        let mut detector =
            Detector::from_backend(Box::new(FixedBackend(vec![detection(0.2), detection(0.8)])));
        let frame = Frame::new(RgbImage::new(16, 16), 7);
        let params = InferenceParams {
            image_size: 640,
            confidence: 0.25,
        };

        let annotated = detector.infer(&frame, &params).unwrap();
        assert_eq!(annotated.detections().len(), 1);
        assert_eq!(annotated.sequence(), 7);
        assert!(frame.pixels().iter().all(|p| *p == 0));
    }

    #[test]
    fn zero_detections_is_an_ordinary_result() {
        let mut detector = Detector::from_backend(Box::new(FixedBackend(Vec::new())));
        let frame = Frame::new(RgbImage::new(16, 16), 1);
        let params = InferenceParams {
            image_size: 320,
            confidence: 0.0,
        };
        let annotated = detector.infer(&frame, &params).unwrap();
        assert!(annotated.detections().is_empty());
    }
}
