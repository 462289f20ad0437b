//! Fatal startup errors and their process exit codes.
//!
//! Everything that can go wrong before the first cycle is a `StartupError`.
//! Conditions inside the loop (stream end, cancellation) are not errors at all;
//! they are `session::Termination` values.

use std::path::PathBuf;

/// Exit code for a clean run (cancellation or end of stream).
pub const EXIT_OK: u8 = 0;
/// Exit code for a fault raised inside the loop body.
pub const EXIT_LOOP_FAULT: u8 = 1;
/// Exit code for rejected configuration.
pub const EXIT_INVALID_CONFIG: u8 = 2;
/// Exit code when the frame source cannot be opened.
pub const EXIT_SOURCE_UNAVAILABLE: u8 = 3;
/// Exit code when the detection model cannot be loaded.
pub const EXIT_MODEL_LOAD: u8 = 4;

#[derive(Debug)]
pub enum StartupError {
    /// A configuration value is out of range or malformed.
    InvalidConfig(String),
    /// The device, file or stream could not be opened.
    SourceUnavailable { source: String, reason: String },
    /// The model weights could not be read or parsed.
    ModelLoadError { weights: PathBuf, reason: String },
}

impl StartupError {
    pub fn source_unavailable(source: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::SourceUnavailable {
            source: source.into(),
            reason: reason.to_string(),
        }
    }

    pub fn model_load(weights: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::ModelLoadError {
            weights: weights.into(),
            reason: reason.to_string(),
        }
    }

    /// Stable identifier of the failed precondition.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => "invalid_config",
            Self::SourceUnavailable { .. } => "source_unavailable",
            Self::ModelLoadError { .. } => "model_load_error",
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidConfig(_) => EXIT_INVALID_CONFIG,
            Self::SourceUnavailable { .. } => EXIT_SOURCE_UNAVAILABLE,
            Self::ModelLoadError { .. } => EXIT_MODEL_LOAD,
        }
    }
}

impl std::fmt::Display for StartupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidConfig(message) => write!(f, "{}: {}", self.code(), message),
            Self::SourceUnavailable { source, reason } => {
                write!(
                    f,
                    "{}: could not open video source {}: {}",
                    self.code(),
                    source,
                    reason
                )
            }
            Self::ModelLoadError { weights, reason } => {
                write!(
                    f,
                    "{}: could not load model weights {}: {}",
                    self.code(),
                    weights.display(),
                    reason
                )
            }
        }
    }
}

impl std::error::Error for StartupError {}
