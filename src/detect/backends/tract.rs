#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{Detection, InferenceParams};
use crate::detect::yolo::{self, OutputLayout, IOU_THRESHOLD};
use crate::frame::Frame;

/// Tract-based backend for YOLOv8 ONNX exports.
///
/// Loads a local model file once and runs it on letterboxed RGB frames.
/// The plan is specialised for a single square input size.
pub struct TractBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    input_size: u32,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for `input_size` x `input_size` input.
    pub fn new<P: AsRef<Path>>(model_path: P, input_size: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let size = input_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, size, size)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self { model, input_size })
    }

    fn build_input(&self, frame: &Frame) -> Result<(Tensor, yolo::Letterbox)> {
        let (input, letterbox) = yolo::letterbox(frame.image(), self.input_size);
        let size = self.input_size as usize;
        let tensor = tract_ndarray::Array4::from_shape_fn((1, 3, size, size), |(_, c, y, x)| {
            input.get_pixel(x as u32, y as u32).0[c] as f32 / 255.0
        });
        Ok((tensor.into_tensor(), letterbox))
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(&mut self, frame: &Frame, params: &InferenceParams) -> Result<Vec<Detection>> {
        if params.image_size != self.input_size {
            return Err(anyhow!(
                "model was prepared for {}x{} input, asked for {}x{}",
                self.input_size,
                self.input_size,
                params.image_size,
                params.image_size
            ));
        }

        let (input, letterbox) = self.build_input(frame)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let layout = OutputLayout::from_shape(output.shape())?;
        let data = output
            .as_slice::<f32>()
            .context("model output tensor was not f32")?;

        let detections = yolo::decode_predictions(
            data,
            layout,
            params.confidence,
            &letterbox,
            frame.width(),
            frame.height(),
        )?;
        Ok(yolo::non_max_suppression(detections, IOU_THRESHOLD))
    }

    fn warm_up(&mut self) -> Result<()> {
        let size = self.input_size;
        let blank = Frame::new(image::RgbImage::new(size, size), 0);
        let params = InferenceParams {
            image_size: size,
            confidence: 1.0,
        };
        self.detect(&blank, &params).map(|_| ())
    }
}
