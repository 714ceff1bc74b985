//! Resonant low-pass State Variable Filter.
//!
//! Per-voice tone filter for sample playback. The cutoff follows the note
//! frequency and the filter envelope, so it is swept every render sub-block;
//! the Topology-Preserving Transform (TPT) SVF stays stable under that kind
//! of modulation where Direct Form biquads zipper or blow up.
//!
//! # Resonance
//!
//! Resonance is expressed as the SVF damping factor `k` (the reciprocal of
//! Q), which is the "linear resonance" a sampler front panel produces from a
//! dB control: -20 dB maps to `k = 10.0` (heavily damped), +20 dB maps to
//! `k = 0.1` (sharp peak). See [`damping_from_db`].
//!
//! # Reference
//!
//! Zavalishin, "The Art of VA Filter Design", rev. 2.1.2 (2018), Chapter 3.

use core::f32::consts::PI;
use libm::tanf;

use crate::fast_math::fast_tan;
use crate::math::{db_to_linear, flush_denormal};

/// Lowest damping factor accepted (+20 dB resonance).
pub const MIN_DAMPING: f32 = 0.1;
/// Highest damping factor accepted (-20 dB resonance).
pub const MAX_DAMPING: f32 = 10.0;

/// Convert a resonance in dB (\[-20, +20\]) to a linear damping factor
/// (\[10.0, 0.1\]).
///
/// ```rust
/// use strata_dsp::damping_from_db;
///
/// assert!((damping_from_db(-20.0) - 10.0).abs() < 1e-3);
/// assert!((damping_from_db(0.0) - 1.0).abs() < 1e-6);
/// assert!((damping_from_db(20.0) - 0.1).abs() < 1e-4);
/// ```
#[inline]
pub fn damping_from_db(resonance_db: f32) -> f32 {
    db_to_linear(-resonance_db.clamp(-20.0, 20.0))
}

/// Two-pole (12 dB/oct) TPT low-pass filter.
///
/// ## Parameters
///
/// - `cutoff`: Hz, clamped to 20.0 … sr×0.49 (default 1000.0)
/// - `damping`: linear resonance factor, clamped to [`MIN_DAMPING`] …
///   [`MAX_DAMPING`] (default 1.0)
///
/// # Example
///
/// ```rust
/// use strata_dsp::StateVariableFilter;
///
/// let mut svf = StateVariableFilter::new(48000.0);
/// svf.set_cutoff(1000.0);
/// svf.set_damping(0.5);
///
/// let output = svf.process(0.5);
/// ```
#[derive(Debug, Clone)]
pub struct StateVariableFilter {
    // Filter state
    ic1eq: f32,
    ic2eq: f32,

    // Coefficients
    g: f32,
    k: f32,
    a1: f32,

    // Parameters
    sample_rate: f32,
    cutoff: f32,
}

impl Default for StateVariableFilter {
    fn default() -> Self {
        Self::new(48000.0)
    }
}

impl StateVariableFilter {
    /// Create a new filter at the given sample rate.
    pub fn new(sample_rate: f32) -> Self {
        let mut svf = Self {
            ic1eq: 0.0,
            ic2eq: 0.0,
            g: 0.0,
            k: 1.0,
            a1: 0.0,
            sample_rate,
            cutoff: 1000.0,
        };
        svf.update_coefficients();
        svf
    }

    /// Set cutoff frequency in Hz.
    ///
    /// Uses [`fast_tan`] below 10 kHz and [`libm::tanf`] above.
    pub fn set_cutoff(&mut self, freq: f32) {
        self.cutoff = freq.clamp(20.0, self.sample_rate * 0.49);
        self.update_coefficients();
    }

    /// Current cutoff frequency in Hz.
    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    /// Set the damping factor directly (reciprocal of Q).
    pub fn set_damping(&mut self, damping: f32) {
        self.k = damping.clamp(MIN_DAMPING, MAX_DAMPING);
        self.a1 = 1.0 / (1.0 + self.g * (self.g + self.k));
    }

    /// Current damping factor.
    pub fn damping(&self) -> f32 {
        self.k
    }

    /// Set both cutoff and damping, recomputing coefficients once.
    pub fn set_params(&mut self, freq: f32, damping: f32) {
        self.k = damping.clamp(MIN_DAMPING, MAX_DAMPING);
        self.set_cutoff(freq);
    }

    /// Change the sample rate and recompute coefficients.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.cutoff = self.cutoff.clamp(20.0, sample_rate * 0.49);
        self.update_coefficients();
    }

    /// Clear the integrator state.
    pub fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }

    /// Filter one sample, returning the low-pass output.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let v3 = input - self.ic2eq;
        let v1 = (self.g * v3 + self.ic1eq) * self.a1;
        let v2 = self.ic2eq + self.g * v1;

        self.ic1eq = flush_denormal(2.0 * v1 - self.ic1eq);
        self.ic2eq = flush_denormal(2.0 * v2 - self.ic2eq);

        v2
    }

    fn update_coefficients(&mut self) {
        let arg = PI * self.cutoff / self.sample_rate;
        self.g = if self.cutoff < 10_000.0 {
            fast_tan(arg)
        } else {
            tanf(arg)
        };
        self.a1 = 1.0 / (1.0 + self.g * (self.g + self.k));
    }
}
