//! ADSR envelope generator for sample voices.
//!
//! Parameters and state are split. [`AdsrParams`] holds the times, sustain
//! level and the per-sample coefficients derived from them; one instance is
//! shared by every voice, so an edit is heard on the next render block.
//! [`AdsrEnvelope`] is the per-voice part: current stage and level.
//!
//! # Segment shape
//!
//! Every segment is an exponential approach toward a target that lies past
//! the segment's end point (an overshoot of [`OVERSHOOT`] × the segment
//! span). The curve crosses the end point after exactly the configured time,
//! independent of the level the segment started from, and the stage changes
//! there. The multiplier depends only on the segment length in samples, so
//! it is computed once when a time or the sample rate changes and never
//! during rendering.

use libm::powf;

/// Overshoot of each segment's exponential target, as a fraction of the
/// distance still to travel when the segment starts.
pub const OVERSHOOT: f32 = 0.2;

/// Release ends, and the voice is freed, once the level falls to this.
pub const ENVELOPE_FLOOR: f32 = 1.0e-4;

/// ADSR envelope states
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EnvelopeState {
    /// Inactive, output is zero.
    #[default]
    Idle,
    /// Rising toward 1.0.
    Attack,
    /// Falling from 1.0 toward the sustain level.
    Decay,
    /// Holding at the sustain level until release.
    Sustain,
    /// Falling to the floor, then idle.
    Release,
}

/// Shared envelope configuration.
///
/// Times are in seconds; the sustain level is in \[0, 1\].
///
/// # Example
///
/// ```rust
/// use strata_sampler::{AdsrEnvelope, AdsrParams, EnvelopeState};
///
/// let mut params = AdsrParams::new(48000.0);
/// params.set_attack_seconds(0.01);
/// params.set_decay_seconds(0.1);
/// params.set_sustain_level(0.7);
/// params.set_release_seconds(0.2);
///
/// let mut env = AdsrEnvelope::new();
/// env.start();
/// let level = env.next_sample(&params);
/// assert_eq!(env.state(), EnvelopeState::Attack);
/// assert!(level > 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct AdsrParams {
    sample_rate: f32,

    attack_seconds: f32,
    decay_seconds: f32,
    sustain_level: f32,
    release_seconds: f32,

    // Per-sample multipliers, derived from the times above
    attack_coeff: f32,
    decay_coeff: f32,
    release_coeff: f32,
}

impl Default for AdsrParams {
    fn default() -> Self {
        Self::new(48000.0)
    }
}

impl AdsrParams {
    /// Create parameters with default times.
    ///
    /// Defaults: attack 5 ms, decay 100 ms, sustain 1.0, release 200 ms.
    pub fn new(sample_rate: f32) -> Self {
        let mut params = Self {
            sample_rate,
            attack_seconds: 0.005,
            decay_seconds: 0.1,
            sustain_level: 1.0,
            release_seconds: 0.2,
            attack_coeff: 0.0,
            decay_coeff: 0.0,
            release_coeff: 0.0,
        };
        params.recalculate_coefficients();
        params
    }

    /// Create parameters with all four values given.
    pub fn with_times(
        sample_rate: f32,
        attack_seconds: f32,
        decay_seconds: f32,
        sustain_level: f32,
        release_seconds: f32,
    ) -> Self {
        let mut params = Self::new(sample_rate);
        params.attack_seconds = attack_seconds.max(0.0);
        params.decay_seconds = decay_seconds.max(0.0);
        params.sustain_level = sustain_level.clamp(0.0, 1.0);
        params.release_seconds = release_seconds.max(0.0);
        params.recalculate_coefficients();
        params
    }

    /// Set sample rate and recompute all coefficients.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recalculate_coefficients();
    }

    /// Set attack time in seconds.
    pub fn set_attack_seconds(&mut self, seconds: f32) {
        self.attack_seconds = seconds.max(0.0);
        self.attack_coeff = self.segment_coeff(self.attack_seconds);
    }

    /// Attack time in seconds.
    pub fn attack_seconds(&self) -> f32 {
        self.attack_seconds
    }

    /// Set decay time in seconds.
    pub fn set_decay_seconds(&mut self, seconds: f32) {
        self.decay_seconds = seconds.max(0.0);
        self.decay_coeff = self.segment_coeff(self.decay_seconds);
    }

    /// Decay time in seconds.
    pub fn decay_seconds(&self) -> f32 {
        self.decay_seconds
    }

    /// Set sustain level (0.0 to 1.0).
    pub fn set_sustain_level(&mut self, level: f32) {
        self.sustain_level = level.clamp(0.0, 1.0);
    }

    /// Sustain level.
    pub fn sustain_level(&self) -> f32 {
        self.sustain_level
    }

    /// Set release time in seconds.
    pub fn set_release_seconds(&mut self, seconds: f32) {
        self.release_seconds = seconds.max(0.0);
        self.release_coeff = self.segment_coeff(self.release_seconds);
    }

    /// Release time in seconds.
    pub fn release_seconds(&self) -> f32 {
        self.release_seconds
    }

    fn recalculate_coefficients(&mut self) {
        self.attack_coeff = self.segment_coeff(self.attack_seconds);
        self.decay_coeff = self.segment_coeff(self.decay_seconds);
        self.release_coeff = self.segment_coeff(self.release_seconds);
    }

    // c^N = k / (1 + k) puts the end point exactly N samples into the segment.
    // Segments of one sample or less jump straight to their target.
    fn segment_coeff(&self, seconds: f32) -> f32 {
        let samples = seconds * self.sample_rate;
        if samples <= 1.0 {
            return 0.0;
        }
        powf(OVERSHOOT / (1.0 + OVERSHOOT), 1.0 / samples)
    }
}

/// Per-voice envelope state.
///
/// Holds only the stage, the level and the current segment target; timing
/// comes from the [`AdsrParams`] passed to every call.
#[derive(Debug, Clone, Default)]
pub struct AdsrEnvelope {
    state: EnvelopeState,
    level: f32,
    target: f32,
}

impl AdsrEnvelope {
    /// Create an idle envelope at level 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter Attack from the current level (note on).
    ///
    /// The level is not reset, so a retrigger on a sounding voice does not
    /// jump. Call [`reset`](Self::reset) first for a fresh start.
    pub fn start(&mut self) {
        self.state = EnvelopeState::Attack;
        self.target = 1.0 + OVERSHOOT * (1.0 - self.level);
    }

    /// Enter Release from whatever stage is active (note off).
    ///
    /// Has no effect on an idle envelope.
    pub fn release(&mut self) {
        if self.state == EnvelopeState::Idle {
            return;
        }
        self.state = EnvelopeState::Release;
        self.target = -OVERSHOOT * self.level;
    }

    /// Force the envelope to idle at level 0.
    pub fn reset(&mut self) {
        self.state = EnvelopeState::Idle;
        self.level = 0.0;
        self.target = 0.0;
    }

    /// Current state.
    pub fn state(&self) -> EnvelopeState {
        self.state
    }

    /// Current level without advancing.
    pub fn level(&self) -> f32 {
        self.level
    }

    /// Whether the envelope is anywhere but Idle.
    pub fn is_active(&self) -> bool {
        self.state != EnvelopeState::Idle
    }

    /// Whether the envelope is in Release.
    pub fn is_releasing(&self) -> bool {
        self.state == EnvelopeState::Release
    }

    /// Advance by one sample and return the new level.
    #[inline]
    pub fn next_sample(&mut self, params: &AdsrParams) -> f32 {
        match self.state {
            EnvelopeState::Idle => {
                self.level = 0.0;
            }

            EnvelopeState::Attack => {
                self.level = self.target + (self.level - self.target) * params.attack_coeff;
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.enter_decay(params);
                }
            }

            EnvelopeState::Decay => {
                self.level = self.target + (self.level - self.target) * params.decay_coeff;
                if self.level <= params.sustain_level {
                    self.level = params.sustain_level;
                    self.state = EnvelopeState::Sustain;
                }
            }

            EnvelopeState::Sustain => {
                self.level = params.sustain_level;
            }

            EnvelopeState::Release => {
                self.level = self.target + (self.level - self.target) * params.release_coeff;
                if self.level <= ENVELOPE_FLOOR {
                    self.level = 0.0;
                    self.state = EnvelopeState::Idle;
                }
            }
        }

        self.level
    }

    fn enter_decay(&mut self, params: &AdsrParams) {
        let sustain = params.sustain_level;
        if self.level <= sustain {
            self.state = EnvelopeState::Sustain;
            self.level = sustain;
        } else {
            self.state = EnvelopeState::Decay;
            self.target = sustain - OVERSHOOT * (self.level - sustain);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 44100.0;

    fn run_until(env: &mut AdsrEnvelope, params: &AdsrParams, state: EnvelopeState) -> usize {
        for n in 1..=(SR as usize * 10) {
            env.next_sample(params);
            if env.state() == state {
                return n;
            }
        }
        panic!("never reached {state:?}");
    }

    #[test]
    fn test_envelope_idle_state() {
        let params = AdsrParams::new(SR);
        let mut env = AdsrEnvelope::new();
        assert_eq!(env.state(), EnvelopeState::Idle);
        for _ in 0..100 {
            assert_eq!(env.next_sample(&params), 0.0);
        }
    }

    #[test]
    fn test_attack_takes_attack_time() {
        let params = AdsrParams::with_times(SR, 0.1, 0.2, 0.5, 0.3);
        let mut env = AdsrEnvelope::new();
        env.start();
        let n = run_until(&mut env, &params, EnvelopeState::Decay);
        let expected = (0.1 * SR) as usize;
        assert!(n.abs_diff(expected) <= 8, "attack took {n} samples, expected {expected}");
        assert_eq!(env.level(), 1.0);
    }

    #[test]
    fn test_decay_takes_decay_time() {
        let params = AdsrParams::with_times(SR, 0.1, 0.2, 0.5, 0.3);
        let mut env = AdsrEnvelope::new();
        env.start();
        run_until(&mut env, &params, EnvelopeState::Decay);
        let n = run_until(&mut env, &params, EnvelopeState::Sustain);
        let expected = (0.2 * SR) as usize;
        assert!(n.abs_diff(expected) <= 8, "decay took {n} samples, expected {expected}");
        assert_eq!(env.level(), 0.5);
    }

    #[test]
    fn test_release_reaches_floor_within_release_time() {
        let params = AdsrParams::with_times(SR, 0.001, 0.001, 0.7, 0.3);
        let mut env = AdsrEnvelope::new();
        env.start();
        run_until(&mut env, &params, EnvelopeState::Sustain);

        env.release();
        assert_eq!(env.state(), EnvelopeState::Release);
        let n = run_until(&mut env, &params, EnvelopeState::Idle);
        assert!(n <= (0.3 * SR) as usize + 16, "release took {n} samples");
        assert_eq!(env.level(), 0.0);
    }

    #[test]
    fn test_release_from_attack() {
        let params = AdsrParams::with_times(SR, 0.5, 0.1, 0.5, 0.05);
        let mut env = AdsrEnvelope::new();
        env.start();
        for _ in 0..1000 {
            env.next_sample(&params);
        }
        let level = env.level();
        assert!(level > 0.0 && level < 1.0);

        env.release();
        let next = env.next_sample(&params);
        assert!(next < level, "release should fall immediately");
    }

    #[test]
    fn test_sustain_holds_and_tracks_param_changes() {
        let mut params = AdsrParams::with_times(SR, 0.001, 0.001, 0.6, 0.1);
        let mut env = AdsrEnvelope::new();
        env.start();
        run_until(&mut env, &params, EnvelopeState::Sustain);
        for _ in 0..SR as usize {
            assert_eq!(env.next_sample(&params), 0.6);
        }
        params.set_sustain_level(0.3);
        assert_eq!(env.next_sample(&params), 0.3);
        assert_eq!(env.state(), EnvelopeState::Sustain);
    }

    #[test]
    fn test_full_sustain_skips_decay() {
        let params = AdsrParams::with_times(SR, 0.01, 0.5, 1.0, 0.1);
        let mut env = AdsrEnvelope::new();
        env.start();
        let n = run_until(&mut env, &params, EnvelopeState::Sustain);
        assert!(n <= (0.01 * SR) as usize + 8);
    }

    #[test]
    fn test_retrigger_preserves_level() {
        let params = AdsrParams::with_times(SR, 0.05, 0.1, 0.5, 0.1);
        let mut env = AdsrEnvelope::new();
        env.start();
        for _ in 0..500 {
            env.next_sample(&params);
        }
        let before = env.level();
        env.start();
        assert_eq!(env.level(), before);
        assert_eq!(env.state(), EnvelopeState::Attack);
    }

    #[test]
    fn test_release_on_idle_is_noop() {
        let mut env = AdsrEnvelope::new();
        env.release();
        assert_eq!(env.state(), EnvelopeState::Idle);
    }

    #[test]
    fn test_output_range() {
        let params = AdsrParams::with_times(SR, 0.005, 0.02, 0.6, 0.05);
        let mut env = AdsrEnvelope::new();
        env.start();
        for _ in 0..2000 {
            let level = env.next_sample(&params);
            assert!((0.0..=1.0).contains(&level), "level out of range: {level}");
        }
        env.release();
        for _ in 0..5000 {
            let level = env.next_sample(&params);
            assert!((0.0..=1.0).contains(&level), "release out of range: {level}");
        }
        assert!(!env.is_active());
    }

    #[test]
    fn test_zero_times_are_one_sample() {
        let params = AdsrParams::with_times(SR, 0.0, 0.0, 0.5, 0.0);
        let mut env = AdsrEnvelope::new();
        env.start();
        env.next_sample(&params);
        assert_eq!(env.state(), EnvelopeState::Decay);
        env.next_sample(&params);
        assert_eq!(env.state(), EnvelopeState::Sustain);
        env.release();
        env.next_sample(&params);
        assert_eq!(env.state(), EnvelopeState::Idle);
    }

    #[test]
    fn test_sample_rate_change_rescales_times() {
        let mut params = AdsrParams::with_times(22050.0, 0.1, 0.1, 0.5, 0.1);
        params.set_sample_rate(SR);
        let mut env = AdsrEnvelope::new();
        env.start();
        let n = run_until(&mut env, &params, EnvelopeState::Decay);
        assert!(n.abs_diff(4410) <= 8, "attack took {n} samples");
    }
}
