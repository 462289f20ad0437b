//! Synthetic frame source for `stub://` URLs.
//!
//! Produces a dim moving gradient with one bright square that drifts across the
//! frame, so the stub detector has something to follow. Optionally stops after a
//! fixed number of frames: `stub://name?frames=120`.

use anyhow::{anyhow, Result};

use super::{FrameSource, ReadOutcome};
use crate::frame::Frame;

pub const STUB_SCHEME: &str = "stub://";

const SQUARE: u32 = 48;
const SQUARE_STEP: u32 = 8;

/// Configuration for a synthetic source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyntheticConfig {
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Stop after this many frames; `None` runs until closed.
    pub frame_limit: Option<u64>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            name: "synthetic".to_string(),
            width: 640,
            height: 480,
            frame_limit: None,
        }
    }
}

impl SyntheticConfig {
    /// Parse `stub://<name>[?frames=N]`.
    pub fn from_url(url: &str) -> Result<Self> {
        let rest = url
            .strip_prefix(STUB_SCHEME)
            .ok_or_else(|| anyhow!("synthetic source URL must start with {}", STUB_SCHEME))?;
        let (name, query) = match rest.split_once('?') {
            Some((name, query)) => (name, Some(query)),
            None => (rest, None),
        };

        let mut config = Self::default();
        if !name.is_empty() {
            config.name = name.to_string();
        }
        for pair in query.into_iter().flat_map(|q| q.split('&')) {
            if pair.is_empty() {
                continue;
            }
            match pair.split_once('=') {
                Some(("frames", value)) => {
                    let limit: u64 = value
                        .parse()
                        .map_err(|_| anyhow!("frames must be a non-negative integer, got '{}'", value))?;
                    config.frame_limit = Some(limit);
                }
                _ => return Err(anyhow!("unknown synthetic source option '{}'", pair)),
            }
        }
        Ok(config)
    }
}

/// Synthetic frame source.
pub struct SyntheticSource {
    config: SyntheticConfig,
    frame_count: u64,
    /// Shifts the background every 50 frames.
    scene_state: u8,
    closed: bool,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> Self {
        log::info!("SyntheticSource: connected to {}{}", STUB_SCHEME, config.name);
        Self {
            config,
            frame_count: 0,
            scene_state: 0,
            closed: false,
        }
    }

    pub fn frames_read(&self) -> u64 {
        self.frame_count
    }

    fn generate_synthetic_pixels(&mut self) -> Vec<u8> {
        let width = self.config.width;
        let height = self.config.height;
        if self.frame_count % 50 == 0 {
            self.scene_state = self.scene_state.wrapping_add(1);
        }

        let mut pixels = vec![0u8; (width * height * 3) as usize];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = (((i as u64 / 3 + self.frame_count + self.scene_state as u64) % 128) / 2) as u8;
        }

        let span = width.saturating_sub(SQUARE).max(1) as u64;
        let left = ((self.frame_count * SQUARE_STEP as u64) % span) as u32;
        let top = height.saturating_sub(SQUARE) / 2;
        for y in top..(top + SQUARE).min(height) {
            for x in left..(left + SQUARE).min(width) {
                let idx = ((y * width + x) * 3) as usize;
                pixels[idx..idx + 3].copy_from_slice(&[240, 240, 240]);
            }
        }
        pixels
    }
}

impl FrameSource for SyntheticSource {
    fn describe(&self) -> String {
        format!(
            "{}{} ({}x{}, synthetic)",
            STUB_SCHEME, self.config.name, self.config.width, self.config.height
        )
    }

    fn read(&mut self) -> ReadOutcome {
        if self.closed {
            return ReadOutcome::EndOfStream;
        }
        if let Some(limit) = self.config.frame_limit {
            if self.frame_count >= limit {
                return ReadOutcome::EndOfStream;
            }
        }

        self.frame_count += 1;
        let pixels = self.generate_synthetic_pixels();
        match Frame::from_rgb(pixels, self.config.width, self.config.height, self.frame_count) {
            Ok(frame) => ReadOutcome::Frame(frame),
            Err(e) => ReadOutcome::Failed(e),
        }
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            log::debug!(
                "SyntheticSource: closed {} after {} frame(s)",
                self.config.name,
                self.frame_count
            );
        }
    }
}
