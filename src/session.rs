//! The capture, infer, render and poll loop.
//!
//! A `Session` owns one detector, one frame source and one renderer. It is
//! strictly sequential: each cycle reads a frame, runs inference on it, stamps
//! the frame rate, shows it and then asks the renderer whether to stop.
//!
//! Lifecycle:
//!
//! ```text
//! Init ──► Running ──(cancel)──────────────► Terminated
//!             │
//!             └──(end of stream / read failure)──► Draining ──► Terminated
//! ```
//!
//! The source and renderer are closed exactly once on every path out of the
//! loop, including errors and unwinding panics.

use anyhow::Result;
use std::fmt;
use std::time::{Duration, Instant};

use crate::config::DetectConfig;
use crate::detect::{Detector, InferenceParams};
use crate::display::Renderer;
use crate::error::StartupError;
use crate::fps::FpsMeter;
use crate::ingest::{self, FrameSource, ReadOutcome};

const PROGRESS_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Init,
    Running,
    Draining,
    Terminated,
}

impl SessionState {
    fn can_enter(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Init, Running)
                | (Running, Running)
                | (Running, Draining)
                | (Running, Terminated)
                | (Draining, Terminated)
                | (Init, Terminated)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Init => "init",
            SessionState::Running => "running",
            SessionState::Draining => "draining",
            SessionState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Why the loop stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    /// The renderer reported a quit key or Ctrl-C.
    Cancelled,
    /// The source ran out of frames.
    StreamEnded,
    /// The source failed to produce a frame.
    ReadFailed,
}

#[derive(Clone, Debug)]
pub struct SessionReport {
    /// Frames read, annotated and shown.
    pub cycles: u64,
    pub termination: Termination,
    pub final_state: SessionState,
    /// States entered, in order, starting with `Init`. Repeated `Running`
    /// cycles are recorded once.
    pub states: Vec<SessionState>,
    /// Last sampled frame rate, `None` if no frame was shown.
    pub last_fps: Option<f64>,
    /// Longest time from capture to display over all shown frames.
    pub max_latency: Duration,
}

/// Loop counters carried from `drive` into the report.
#[derive(Default)]
struct Progress {
    cycles: u64,
    last_fps: Option<f64>,
    max_latency: Duration,
}

pub struct Session {
    detector: Detector,
    source: Box<dyn FrameSource>,
    renderer: Box<dyn Renderer>,
    params: InferenceParams,
    state: SessionState,
    states: Vec<SessionState>,
    released: bool,
}

impl Session {
    /// Acquire the detector, then the source.
    ///
    /// On failure nothing is left open: the renderer is closed, a detector that
    /// was already loaded is dropped, and the loop is never entered.
    pub fn start<L, O>(
        load_detector: L,
        open_source: O,
        mut renderer: Box<dyn Renderer>,
        params: InferenceParams,
    ) -> Result<Self, StartupError>
    where
        L: FnOnce() -> Result<Detector, StartupError>,
        O: FnOnce() -> Result<Box<dyn FrameSource>, StartupError>,
    {
        let detector = match load_detector() {
            Ok(detector) => detector,
            Err(e) => {
                renderer.close();
                return Err(e);
            }
        };
        let source = match open_source() {
            Ok(source) => source,
            Err(e) => {
                renderer.close();
                return Err(e);
            }
        };

        Ok(Self {
            detector,
            source,
            renderer,
            params,
            state: SessionState::Init,
            states: vec![SessionState::Init],
            released: false,
        })
    }

    /// Build a session from validated configuration.
    pub fn from_config(
        config: &DetectConfig,
        renderer: Box<dyn Renderer>,
    ) -> Result<Self, StartupError> {
        Self::start(
            || Detector::load(&config.weights, config.image_size),
            || ingest::open_source(&config.source),
            renderer,
            config.inference_params(),
        )
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run until cancelled or the source is exhausted.
    ///
    /// Errors from inference or display end the loop; they are returned after
    /// the source and renderer have been closed.
    pub fn run(mut self) -> Result<SessionReport> {
        let outcome = self.drive();
        self.release();
        let (termination, progress) = outcome?;
        Ok(SessionReport {
            cycles: progress.cycles,
            termination,
            final_state: self.state,
            states: std::mem::take(&mut self.states),
            last_fps: progress.last_fps,
            max_latency: progress.max_latency,
        })
    }

    fn drive(&mut self) -> Result<(Termination, Progress)> {
        log::info!(
            "session: running {} on {}",
            self.detector.name(),
            self.source.describe()
        );
        self.transition(SessionState::Running);
        let mut meter = FpsMeter::new(Instant::now());
        let mut progress = Progress::default();
        let mut last_progress = Instant::now();

        loop {
            let frame = match self.source.read() {
                ReadOutcome::Frame(frame) => frame,
                ReadOutcome::EndOfStream => {
                    self.transition(SessionState::Draining);
                    log::info!("End of stream or cannot read frame.");
                    return Ok((Termination::StreamEnded, progress));
                }
                ReadOutcome::Failed(e) => {
                    self.transition(SessionState::Draining);
                    log::warn!("End of stream or cannot read frame: {:#}", e);
                    return Ok((Termination::ReadFailed, progress));
                }
            };

            let captured_at = frame.captured_at();
            let mut annotated = self.detector.infer(&frame, &self.params)?;
            drop(frame);

            let fps = meter.sample(Instant::now());
            annotated.overlay_fps(fps);
            progress.last_fps = Some(fps);

            self.renderer.show(&annotated)?;
            let latency = captured_at.elapsed();
            log::trace!("frame {}: shown {:?} after capture", annotated.sequence(), latency);
            progress.max_latency = progress.max_latency.max(latency);
            progress.cycles += 1;
            self.transition(SessionState::Running);

            if self.renderer.poll_cancel() {
                log::info!("session: cancelled after {} frame(s)", progress.cycles);
                return Ok((Termination::Cancelled, progress));
            }

            if last_progress.elapsed() >= PROGRESS_INTERVAL {
                log::info!(
                    "session: {} frame(s) processed, {:.1} fps, worst latency {:?}",
                    progress.cycles,
                    fps,
                    progress.max_latency
                );
                last_progress = Instant::now();
            }
        }
    }

    fn transition(&mut self, next: SessionState) {
        debug_assert!(
            self.state.can_enter(next),
            "invalid session transition {} -> {}",
            self.state,
            next
        );
        if self.state != next {
            log::debug!("session: {} -> {}", self.state, next);
            self.states.push(next);
        }
        self.state = next;
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.source.close();
        self.renderer.close();
        if self.state != SessionState::Terminated {
            self.transition(SessionState::Terminated);
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.release();
    }
}
