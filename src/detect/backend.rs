use anyhow::Result;

use crate::detect::result::{Detection, InferenceParams};
use crate::frame::Frame;

/// Detector backend trait.
///
/// Implementations receive the frame by shared reference for the duration of
/// `detect` only. They must not keep the frame or its pixels after returning.
/// An empty result is an ordinary outcome, not an error.
pub trait DetectorBackend {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a frame, returning boxes in frame pixel coordinates.
    fn detect(&mut self, frame: &Frame, params: &InferenceParams) -> Result<Vec<Detection>>;

    /// Optional warm-up hook, run once at load.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
