//! Fast approximations for control-rate coefficient math.
//!
//! Filter coefficients are recomputed once per render sub-block for every
//! sounding voice, so the tangent in the bilinear prewarp is the hot spot.

/// Padé approximant of `tan(x)` for `x` in \[0, π/2).
///
/// `x·(15 − x²) / (15 − 6x²)`. Error stays below 0.1% for `x < 0.66`,
/// which covers cutoffs up to ~10 kHz at 48 kHz. Callers fall back to
/// [`libm::tanf`] above that.
#[inline]
pub fn fast_tan(x: f32) -> f32 {
    let x2 = x * x;
    x * (15.0 - x2) / (15.0 - 6.0 * x2)
}
