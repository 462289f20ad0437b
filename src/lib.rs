//! Live object detection on a video stream.
//!
//! Frames are read from a camera, a file or a stream URL, passed through a
//! YOLO-style detector, annotated with boxes and a frame-rate overlay, and shown
//! in a window until the user quits or the stream ends.
//!
//! # Module Structure
//!
//! - `ingest`: frame sources (synthetic, still images, ffmpeg, opencv)
//! - `detect`: the detector handle and its backends (stub, tract)
//! - `display`: renderers and the shared cancellation flag
//! - `session`: the capture, infer, render and poll loop
//! - `config`: layered configuration (defaults, JSON file, env, CLI)
//! - `error`: startup failures and process exit codes
//! - `frame`, `fps`, `annotate`: frame buffers, timing and drawing

pub mod annotate;
pub mod config;
pub mod detect;
pub mod display;
pub mod error;
pub mod fps;
pub mod frame;
pub mod ingest;
pub mod session;

pub use config::{ConfigOverrides, DetectConfig, DisplaySettings};
pub use detect::{Detection, Detector, DetectorBackend, InferenceParams};
pub use display::{open_renderer, CancelFlag, HeadlessRenderer, Renderer};
pub use error::StartupError;
pub use fps::{fps_label, FpsMeter};
pub use frame::{AnnotatedFrame, Frame};
pub use ingest::{open_source, FrameSource, ReadOutcome, SourceSpec};
pub use session::{Session, SessionReport, SessionState, Termination};
