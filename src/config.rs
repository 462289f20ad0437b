use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::detect::InferenceParams;
use crate::error::StartupError;
use crate::ingest::SourceSpec;

const DEFAULT_SOURCE: &str = "0";
const DEFAULT_WEIGHTS: &str = "yolov8n.onnx";
const DEFAULT_IMAGE_SIZE: i64 = 640;
const DEFAULT_CONFIDENCE: f32 = 0.25;
pub const DEFAULT_WINDOW_TITLE: &str = "YOLOv8 - press 'q' to quit";

pub const CONFIG_ENV: &str = "LIVE_DETECT_CONFIG";
pub const SOURCE_ENV: &str = "LIVE_DETECT_SOURCE";
pub const WEIGHTS_ENV: &str = "LIVE_DETECT_WEIGHTS";
pub const IMGSZ_ENV: &str = "LIVE_DETECT_IMGSZ";
pub const CONF_ENV: &str = "LIVE_DETECT_CONF";
pub const HEADLESS_ENV: &str = "LIVE_DETECT_HEADLESS";

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DetectConfigFile {
    source: Option<String>,
    weights: Option<PathBuf>,
    imgsz: Option<i64>,
    conf: Option<f32>,
    display: Option<DisplayConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DisplayConfigFile {
    headless: Option<bool>,
    window_title: Option<String>,
}

/// Values given on the command line. `None` leaves the lower layers in charge.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub source: Option<String>,
    pub weights: Option<PathBuf>,
    pub imgsz: Option<i64>,
    pub conf: Option<f32>,
    /// `Some(false)` turns headless off even when a lower layer turned it on.
    pub headless: Option<bool>,
    pub window_title: Option<String>,
}

/// Validated run configuration. Immutable once built.
#[derive(Debug, Clone)]
pub struct DetectConfig {
    pub source: SourceSpec,
    pub weights: PathBuf,
    pub image_size: u32,
    pub confidence: f32,
    pub display: DisplaySettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplaySettings {
    pub headless: bool,
    pub window_title: String,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            headless: false,
            window_title: DEFAULT_WINDOW_TITLE.to_string(),
        }
    }
}

/// Unvalidated settings while the layers are being applied.
#[derive(Debug, Clone)]
struct Settings {
    source: String,
    weights: PathBuf,
    imgsz: i64,
    conf: f32,
    display: DisplaySettings,
}

impl DetectConfig {
    /// Build the configuration from defaults, the optional JSON file, the
    /// environment and `overrides`, in that order, then validate it.
    pub fn load(overrides: &ConfigOverrides) -> Result<Self, StartupError> {
        let config_path = overrides
            .config_path
            .clone()
            .or_else(|| env_value(CONFIG_ENV).map(PathBuf::from));
        let file_cfg = match config_path.as_deref() {
            Some(path) => read_config_file(path)?,
            None => DetectConfigFile::default(),
        };
        let mut settings = Settings::from_file(file_cfg);
        settings.apply_env()?;
        settings.apply_overrides(overrides);
        settings.validate()
    }

    /// Validate explicit values, bypassing files and environment.
    pub fn new(
        source: &str,
        weights: impl Into<PathBuf>,
        imgsz: i64,
        conf: f32,
    ) -> Result<Self, StartupError> {
        Settings {
            source: source.to_string(),
            weights: weights.into(),
            imgsz,
            conf,
            display: DisplaySettings::default(),
        }
        .validate()
    }

    pub fn inference_params(&self) -> InferenceParams {
        InferenceParams {
            image_size: self.image_size,
            confidence: self.confidence,
        }
    }
}

impl Settings {
    fn from_file(file: DetectConfigFile) -> Self {
        let display = file.display.unwrap_or_default();
        Self {
            source: file.source.unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
            weights: file
                .weights
                .unwrap_or_else(|| PathBuf::from(DEFAULT_WEIGHTS)),
            imgsz: file.imgsz.unwrap_or(DEFAULT_IMAGE_SIZE),
            conf: file.conf.unwrap_or(DEFAULT_CONFIDENCE),
            display: DisplaySettings {
                headless: display.headless.unwrap_or(false),
                window_title: display
                    .window_title
                    .unwrap_or_else(|| DEFAULT_WINDOW_TITLE.to_string()),
            },
        }
    }

    fn apply_env(&mut self) -> Result<(), StartupError> {
        if let Some(source) = env_value(SOURCE_ENV) {
            self.source = source;
        }
        if let Some(weights) = env_value(WEIGHTS_ENV) {
            self.weights = PathBuf::from(weights);
        }
        if let Some(imgsz) = env_value(IMGSZ_ENV) {
            self.imgsz = imgsz.trim().parse().map_err(|_| {
                StartupError::InvalidConfig(format!("{} must be an integer", IMGSZ_ENV))
            })?;
        }
        if let Some(conf) = env_value(CONF_ENV) {
            self.conf = conf.trim().parse().map_err(|_| {
                StartupError::InvalidConfig(format!("{} must be a number", CONF_ENV))
            })?;
        }
        if let Some(headless) = env_value(HEADLESS_ENV) {
            self.display.headless = parse_bool(&headless).ok_or_else(|| {
                StartupError::InvalidConfig(format!("{} must be true or false", HEADLESS_ENV))
            })?;
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(source) = &overrides.source {
            self.source = source.clone();
        }
        if let Some(weights) = &overrides.weights {
            self.weights = weights.clone();
        }
        if let Some(imgsz) = overrides.imgsz {
            self.imgsz = imgsz;
        }
        if let Some(conf) = overrides.conf {
            self.conf = conf;
        }
        if let Some(headless) = overrides.headless {
            self.display.headless = headless;
        }
        if let Some(title) = &overrides.window_title {
            self.display.window_title = title.clone();
        }
    }

    fn validate(self) -> Result<DetectConfig, StartupError> {
        let source = SourceSpec::parse(&self.source)
            .map_err(|e| StartupError::InvalidConfig(format!("source: {}", e)))?;

        if self.weights.as_os_str().is_empty() {
            return Err(StartupError::InvalidConfig(
                "weights path must not be empty".to_string(),
            ));
        }
        if self.imgsz <= 0 || self.imgsz > u32::MAX as i64 {
            return Err(StartupError::InvalidConfig(format!(
                "imgsz must be a positive pixel count, got {}",
                self.imgsz
            )));
        }
        if !(0.0..=1.0).contains(&self.conf) {
            return Err(StartupError::InvalidConfig(format!(
                "conf must lie in [0, 1], got {}",
                self.conf
            )));
        }
        if self.display.window_title.trim().is_empty() {
            return Err(StartupError::InvalidConfig(
                "window title must not be empty".to_string(),
            ));
        }

        Ok(DetectConfig {
            source,
            weights: self.weights,
            image_size: self.imgsz as u32,
            confidence: self.conf,
            display: self.display,
        })
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn read_config_file(path: &Path) -> Result<DetectConfigFile, StartupError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        StartupError::InvalidConfig(format!(
            "failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;
    serde_json::from_str(&raw).map_err(|e| {
        StartupError::InvalidConfig(format!("invalid config file {}: {}", path.display(), e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_cli_defaults() {
        let cfg = DetectConfig::new(DEFAULT_SOURCE, DEFAULT_WEIGHTS, DEFAULT_IMAGE_SIZE, DEFAULT_CONFIDENCE)
            .unwrap();
        assert_eq!(cfg.source, SourceSpec::Device(0));
        assert_eq!(cfg.weights, PathBuf::from("yolov8n.onnx"));
        assert_eq!(cfg.image_size, 640);
        assert_eq!(cfg.confidence, 0.25);
        assert_eq!(cfg.display, DisplaySettings::default());
    }

    #[test]
    fn in_range_values_are_accepted() {
        for conf in [0.0, 0.001, 0.25, 0.5, 0.999, 1.0] {
            for imgsz in [1, 32, 320, 640, 1280] {
                let cfg = DetectConfig::new("stub://cam", "stub://model", imgsz, conf).unwrap();
                assert_eq!(cfg.image_size as i64, imgsz);
                assert_eq!(cfg.confidence, conf);
            }
        }
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        for conf in [-0.01, 1.01, f32::NAN, f32::INFINITY] {
            let err = DetectConfig::new("0", "w.onnx", 640, conf).unwrap_err();
            assert!(matches!(err, StartupError::InvalidConfig(_)), "conf {}", conf);
        }
        for imgsz in [0, -640, i64::from(u32::MAX) + 1] {
            let err = DetectConfig::new("0", "w.onnx", imgsz, 0.25).unwrap_err();
            assert!(matches!(err, StartupError::InvalidConfig(_)), "imgsz {}", imgsz);
        }
        assert!(DetectConfig::new("", "w.onnx", 640, 0.25).is_err());
        assert!(DetectConfig::new("0", "", 640, 0.25).is_err());
    }

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert_eq!(parse_bool(" Yes "), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
