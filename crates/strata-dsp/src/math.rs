//! Mathematical utility functions for sample playback.
//!
//! All functions are allocation-free and suitable for `no_std`.
//!
//! - [`db_to_linear`] - Decibels to linear gain
//! - [`semitones_to_ratio`] - Pitch offset to playback-rate multiplier
//! - [`lerp`] - Linear interpolation between adjacent sample frames
//! - [`flush_denormal`] - Subnormal guard for filter state

use libm::{expf, exp2f};

/// Convert decibels to linear gain.
///
/// # Example
/// ```rust
/// use strata_dsp::db_to_linear;
///
/// assert!((db_to_linear(0.0) - 1.0).abs() < 0.001);
/// assert!((db_to_linear(-20.0) - 0.1).abs() < 0.001);
/// ```
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    // 10^(dB/20) = e^(dB * ln(10)/20)
    const FACTOR: f32 = core::f32::consts::LN_10 / 20.0;
    expf(db * FACTOR)
}

/// Convert a pitch offset in semitones to a frequency ratio.
///
/// 12 semitones = one octave = ratio 2.0.
///
/// ```rust
/// use strata_dsp::semitones_to_ratio;
///
/// assert!((semitones_to_ratio(12.0) - 2.0).abs() < 1e-5);
/// assert!((semitones_to_ratio(-12.0) - 0.5).abs() < 1e-6);
/// ```
#[inline]
pub fn semitones_to_ratio(semitones: f32) -> f32 {
    exp2f(semitones / 12.0)
}

/// Linear interpolation between `a` and `b` at fraction `t` in \[0, 1\].
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Flush subnormal values to zero.
///
/// Replaces values below 1e-20 with zero, leaving margin before the
/// IEEE 754 subnormal range begins. Use in recursive filter state.
#[allow(clippy::inline_always)]
#[inline(always)]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-20 { 0.0 } else { x }
}
