//! Instantaneous frame-rate measurement.

use std::time::Instant;

/// Returned when two samples are not strictly increasing in time.
pub const FPS_SENTINEL: f64 = 0.0;

/// Tracks the time of the previous frame and derives fps from the gap.
#[derive(Clone, Copy, Debug)]
pub struct FpsMeter {
    previous: Instant,
}

impl FpsMeter {
    /// `start` is the baseline for the first sample, so the first reading
    /// includes whatever happened between `start` and the first frame.
    pub fn new(start: Instant) -> Self {
        Self { previous: start }
    }

    /// Returns `1 / (now - previous)` and moves the baseline to `now`.
    ///
    /// A zero or backwards delta yields `FPS_SENTINEL` instead of infinity or NaN.
    pub fn sample(&mut self, now: Instant) -> f64 {
        let delta = now.checked_duration_since(self.previous);
        self.previous = now;
        match delta {
            Some(delta) if !delta.is_zero() => 1.0 / delta.as_secs_f64(),
            _ => FPS_SENTINEL,
        }
    }

    pub fn previous(&self) -> Instant {
        self.previous
    }
}

/// `"FPS: "` followed by the value with one decimal.
pub fn fps_label(fps: f64) -> String {
    format!("FPS: {:.1}", fps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn sample_is_reciprocal_of_gap() {
        let t0 = Instant::now();
        let mut meter = FpsMeter::new(t0);

        let t1 = t0 + Duration::from_millis(40);
        assert_eq!(meter.sample(t1), 1.0 / Duration::from_millis(40).as_secs_f64());

        let t2 = t1 + Duration::from_millis(20);
        assert_eq!(meter.sample(t2), 1.0 / Duration::from_millis(20).as_secs_f64());
        assert_eq!(meter.previous(), t2);
    }

    #[test]
    fn identical_timestamps_yield_sentinel() {
        let t0 = Instant::now();
        let mut meter = FpsMeter::new(t0);
        let fps = meter.sample(t0);
        assert_eq!(fps, FPS_SENTINEL);
        assert!(fps.is_finite());
    }

    #[test]
    fn backwards_timestamps_yield_sentinel_and_rebase() {
        let t0 = Instant::now() + Duration::from_secs(1);
        let mut meter = FpsMeter::new(t0);
        let earlier = t0 - Duration::from_millis(500);

        assert_eq!(meter.sample(earlier), FPS_SENTINEL);
        assert_eq!(meter.previous(), earlier);

        let later = earlier + Duration::from_millis(100);
        assert!((meter.sample(later) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn label_uses_one_decimal() {
        assert_eq!(fps_label(0.0), "FPS: 0.0");
        assert_eq!(fps_label(14.96), "FPS: 15.0");
        assert_eq!(fps_label(123.44), "FPS: 123.4");
    }
}
