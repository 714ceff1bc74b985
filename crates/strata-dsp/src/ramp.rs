//! Fixed-length linear gain ramp.
//!
//! Used wherever a sounding signal must be silenced without an audible
//! step: immediate note stops and voice steals fade over a short, fixed
//! number of samples instead of cutting to zero.

/// A linear ramp from a start value to a target over a fixed sample count.
///
/// Unlike an exponential smoother the ramp reaches its target exactly after
/// `length` samples, so callers can rely on it finishing in bounded time.
///
/// # Example
///
/// ```rust
/// use strata_dsp::LinearRamp;
///
/// let mut ramp = LinearRamp::new(4);
/// ramp.start(1.0, 0.0);
/// let values: Vec<f32> = (0..4).map(|_| ramp.advance()).collect();
/// assert_eq!(values, vec![0.75, 0.5, 0.25, 0.0]);
/// assert!(ramp.is_settled());
/// ```
#[derive(Debug, Clone)]
pub struct LinearRamp {
    /// Current value
    current: f32,
    /// Target value
    target: f32,
    /// Increment per sample (can be positive or negative)
    increment: f32,
    /// Samples remaining until target reached
    samples_remaining: u32,
    /// Ramp length in samples
    length: u32,
}

impl Default for LinearRamp {
    fn default() -> Self {
        Self::new(0)
    }
}

impl LinearRamp {
    /// Create a settled ramp at 1.0 with the given length in samples.
    pub fn new(length: u32) -> Self {
        Self {
            current: 1.0,
            target: 1.0,
            increment: 0.0,
            samples_remaining: 0,
            length,
        }
    }

    /// Length in samples for a duration at a sample rate (at least one sample).
    pub fn length_for(duration_ms: f32, sample_rate: f32) -> u32 {
        let samples = duration_ms.max(0.0) / 1000.0 * sample_rate;
        (samples as u32).max(1)
    }

    /// Change the ramp length for subsequent ramps.
    pub fn set_length(&mut self, length: u32) {
        self.length = length;
    }

    /// Ramp length in samples.
    pub fn length(&self) -> u32 {
        self.length
    }

    /// Begin a ramp from `from` to `to`.
    ///
    /// A zero-length ramp jumps straight to `to`.
    pub fn start(&mut self, from: f32, to: f32) {
        self.current = from;
        self.target = to;
        if self.length == 0 {
            self.current = to;
            self.increment = 0.0;
            self.samples_remaining = 0;
        } else {
            self.increment = (to - from) / self.length as f32;
            self.samples_remaining = self.length;
        }
    }

    /// Set value immediately, cancelling any ramp in progress.
    pub fn set_immediate(&mut self, value: f32) {
        self.current = value;
        self.target = value;
        self.increment = 0.0;
        self.samples_remaining = 0;
    }

    /// Get next ramp value.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        if self.samples_remaining > 0 {
            self.current += self.increment;
            self.samples_remaining -= 1;
            if self.samples_remaining == 0 {
                self.current = self.target; // Snap to exact target
            }
        }
        self.current
    }

    /// Current value without advancing.
    #[inline]
    pub fn get(&self) -> f32 {
        self.current
    }

    /// Whether the ramp has reached its target.
    #[inline]
    pub fn is_settled(&self) -> bool {
        self.samples_remaining == 0
    }

    /// Samples left before the target is reached.
    #[inline]
    pub fn remaining(&self) -> u32 {
        self.samples_remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reaches_target_exactly() {
        let mut ramp = LinearRamp::new(240);
        ramp.start(1.0, 0.0);
        for _ in 0..240 {
            ramp.advance();
        }
        assert_eq!(ramp.get(), 0.0);
        assert!(ramp.is_settled());
    }

    #[test]
    fn constant_rate() {
        let mut ramp = LinearRamp::new(100);
        ramp.start(0.0, 1.0);
        for _ in 0..50 {
            ramp.advance();
        }
        assert!((ramp.get() - 0.5).abs() < 1e-5, "got {}", ramp.get());
    }

    #[test]
    fn monotonic_fade() {
        let mut ramp = LinearRamp::new(64);
        ramp.start(0.8, 0.0);
        let mut prev = ramp.get();
        while !ramp.is_settled() {
            let v = ramp.advance();
            assert!(v <= prev);
            prev = v;
        }
    }

    #[test]
    fn zero_length_jumps() {
        let mut ramp = LinearRamp::new(0);
        ramp.start(1.0, 0.0);
        assert_eq!(ramp.get(), 0.0);
        assert!(ramp.is_settled());
    }

    #[test]
    fn length_for_duration() {
        assert_eq!(LinearRamp::length_for(5.0, 48000.0), 240);
        assert_eq!(LinearRamp::length_for(0.0, 48000.0), 1);
    }
}
