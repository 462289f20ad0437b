//! live_detect - run a YOLO detector on a camera, file or stream and show the
//! annotated frames with a frame-rate overlay.
//!
//! Press `q` in the window (or Ctrl-C) to quit.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use live_detect::display::{open_renderer, CancelFlag};
use live_detect::error::{EXIT_LOOP_FAULT, EXIT_OK};
use live_detect::{ConfigOverrides, DetectConfig, Session, Termination};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Camera index (e.g. 0), video file path, or stream URL. [default: 0]
    #[arg(long)]
    source: Option<String>,
    /// Model weights (.onnx, or stub:// for the built-in stub). [default: yolov8n.onnx]
    #[arg(long)]
    weights: Option<PathBuf>,
    /// Inference image size in pixels. [default: 640]
    #[arg(long, allow_negative_numbers = true)]
    imgsz: Option<i64>,
    /// Minimum confidence for a detection, in [0, 1]. [default: 0.25]
    #[arg(long, allow_negative_numbers = true)]
    conf: Option<f32>,
    /// Do not open a window; log progress instead.
    #[arg(long, conflicts_with = "no_headless")]
    headless: bool,
    /// Open a window even if the config file or environment asks for headless.
    #[arg(long)]
    no_headless: bool,
    /// Title of the display window.
    #[arg(long)]
    window_title: Option<String>,
    /// JSON configuration file (also read from LIVE_DETECT_CONFIG).
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Args {
    fn overrides(self) -> ConfigOverrides {
        ConfigOverrides {
            config_path: self.config,
            source: self.source,
            weights: self.weights,
            imgsz: self.imgsz,
            conf: self.conf,
            headless: match (self.headless, self.no_headless) {
                (true, _) => Some(true),
                (false, true) => Some(false),
                (false, false) => None,
            },
            window_title: self.window_title,
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match DetectConfig::load(&args.overrides()) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::from(e.exit_code());
        }
    };
    log::info!(
        "live_detect {}: source={} weights={} imgsz={} conf={}",
        env!("CARGO_PKG_VERSION"),
        config.source,
        config.weights.display(),
        config.image_size,
        config.confidence
    );

    let cancel = CancelFlag::new();
    if let Err(e) = cancel.install_ctrlc_handler() {
        log::warn!("{:#}; Ctrl-C will not stop the loop cleanly", e);
    }
    let renderer = open_renderer(&config.display, cancel);

    let session = match Session::from_config(&config, renderer) {
        Ok(session) => session,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::from(e.exit_code());
        }
    };

    match session.run() {
        Ok(report) => {
            let why = match report.termination {
                Termination::Cancelled => "cancelled",
                Termination::StreamEnded => "end of stream",
                Termination::ReadFailed => "source stopped producing frames",
            };
            log::info!("stopped after {} frame(s): {}", report.cycles, why);
            ExitCode::from(EXIT_OK)
        }
        Err(e) => {
            log::error!("loop_fault: {:#}", e);
            ExitCode::from(EXIT_LOOP_FAULT)
        }
    }
}
