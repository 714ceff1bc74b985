//! Property-based tests for strata-dsp primitives.
//!
//! Tests filter stability under modulation, oscillator range, and ramp
//! termination using proptest for randomized input generation.

use proptest::prelude::*;
use strata_dsp::{
    FunctionTable, FunctionTableOscillator, LinearRamp, StateVariableFilter, damping_from_db,
};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// For any cutoff and resonance in the sampler's range, the filter
    /// produces finite output even when the cutoff jumps every 16 samples.
    #[test]
    fn svf_stable_under_cutoff_sweeps(
        cutoffs in prop::collection::vec(20.0f32..20000.0f32, 8),
        resonance_db in -20.0f32..=20.0f32,
        input in prop::array::uniform32(-1.0f32..=1.0f32),
    ) {
        let mut svf = StateVariableFilter::new(48000.0);
        svf.set_damping(damping_from_db(resonance_db));

        for &cutoff in &cutoffs {
            svf.set_cutoff(cutoff);
            for &sample in input.iter().take(16) {
                let out = svf.process(sample);
                prop_assert!(
                    out.is_finite(),
                    "cutoff={} res={}dB produced {}", cutoff, resonance_db, out
                );
            }
        }
    }

    /// Damping derived from any dB value stays inside [0.1, 10].
    #[test]
    fn damping_range(db in -100.0f32..100.0f32) {
        let k = damping_from_db(db);
        prop_assert!((0.099..=10.01).contains(&k), "{} dB -> {}", db, k);
    }

    /// Table oscillators over the built-in shapes stay in [-1, 1] at any rate.
    #[test]
    fn oscillator_bounded(
        freq in 0.0f32..50.0f32,
        rate in 100.0f32..48000.0f32,
        triangle in any::<bool>(),
    ) {
        let table = if triangle {
            FunctionTable::triangle(128)
        } else {
            FunctionTable::sinusoid(128)
        };
        let mut osc = FunctionTableOscillator::new(table, rate, freq);
        for _ in 0..512 {
            let v = osc.next_sample();
            prop_assert!((-1.0..=1.0).contains(&v), "value {}", v);
        }
    }

    /// A ramp always settles on its target after exactly `length` samples.
    #[test]
    fn ramp_settles(length in 0u32..2000, from in -2.0f32..2.0, to in -2.0f32..2.0) {
        let mut ramp = LinearRamp::new(length);
        ramp.start(from, to);
        for _ in 0..length {
            ramp.advance();
        }
        prop_assert!(ramp.is_settled());
        prop_assert_eq!(ramp.get(), to);
    }
}
