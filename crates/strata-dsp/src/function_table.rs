//! Table-lookup oscillator for low-frequency modulation.
//!
//! A [`FunctionTable`] holds one pre-built cycle of a waveform. A
//! [`FunctionTableOscillator`] walks it with a phase accumulator, linearly
//! interpolating between table entries, and produces values in \[-1, 1\] for
//! tables built from the provided shapes.
//!
//! Tables are built once, before rendering starts. Reading them never
//! allocates.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use core::f32::consts::PI;
use libm::{floorf, sinf};

/// Default table length for the built-in shapes.
pub const DEFAULT_TABLE_SIZE: usize = 256;

/// One cycle of a periodic function, sampled at equal phase steps.
///
/// # Example
///
/// ```rust
/// use strata_dsp::FunctionTable;
///
/// let table = FunctionTable::sinusoid(256);
/// assert!((table.interp(0.25) - 1.0).abs() < 1e-3);
/// ```
#[derive(Debug, Clone)]
pub struct FunctionTable {
    samples: Vec<f32>,
}

impl Default for FunctionTable {
    fn default() -> Self {
        Self::sinusoid(DEFAULT_TABLE_SIZE)
    }
}

impl FunctionTable {
    /// Wrap caller-built table contents. An empty table reads as silence.
    pub fn from_samples(mut samples: Vec<f32>) -> Self {
        if samples.is_empty() {
            samples.push(0.0);
        }
        Self { samples }
    }

    /// One cycle of a sine, starting at phase 0.
    pub fn sinusoid(size: usize) -> Self {
        let size = size.max(2);
        let samples = (0..size)
            .map(|i| sinf(2.0 * PI * i as f32 / size as f32))
            .collect();
        Self { samples }
    }

    /// One cycle of a triangle: 0 → 1 → -1 → 0.
    pub fn triangle(size: usize) -> Self {
        let size = size.max(4);
        let samples = (0..size)
            .map(|i| {
                let p = i as f32 / size as f32;
                if p < 0.25 {
                    4.0 * p
                } else if p < 0.75 {
                    2.0 - 4.0 * p
                } else {
                    4.0 * p - 4.0
                }
            })
            .collect();
        Self { samples }
    }

    /// Number of entries in one cycle.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the table has no entries. Always false for constructed tables.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Raw table contents.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Read the table at `phase` (in cycles), wrapping and interpolating.
    #[inline]
    pub fn interp(&self, phase: f32) -> f32 {
        let len = self.samples.len();
        let wrapped = phase - floorf(phase);
        let pos = wrapped * len as f32;
        let index = (pos as usize).min(len - 1);
        let frac = pos - index as f32;
        let next = if index + 1 == len { 0 } else { index + 1 };
        let a = self.samples[index];
        a + (self.samples[next] - a) * frac
    }
}

/// Phase-accumulator oscillator reading a [`FunctionTable`].
///
/// The oscillator advances one table step per call to
/// [`next_sample`](Self::next_sample), so `sample_rate` is the rate at which
/// it is called. A vibrato LFO ticked once per render sub-block is built
/// with `sample_rate / chunk_size`.
///
/// # Example
///
/// ```rust
/// use strata_dsp::{FunctionTable, FunctionTableOscillator};
///
/// // 5 Hz vibrato, evaluated once per 16-sample chunk at 48 kHz
/// let mut lfo = FunctionTableOscillator::new(FunctionTable::sinusoid(256), 48000.0 / 16.0, 5.0);
/// let value = lfo.next_sample();
/// assert!((-1.0..=1.0).contains(&value));
/// ```
#[derive(Debug, Clone)]
pub struct FunctionTableOscillator {
    table: FunctionTable,
    /// Current phase position [0.0, 1.0)
    phase: f32,
    /// Phase increment per call
    phase_delta: f32,
    sample_rate: f32,
    frequency: f32,
}

impl Default for FunctionTableOscillator {
    fn default() -> Self {
        Self::new(FunctionTable::default(), 48000.0, 5.0)
    }
}

impl FunctionTableOscillator {
    /// Create an oscillator over `table` ticked at `sample_rate`.
    pub fn new(table: FunctionTable, sample_rate: f32, frequency: f32) -> Self {
        let mut osc = Self {
            table,
            phase: 0.0,
            phase_delta: 0.0,
            sample_rate: sample_rate.max(1.0),
            frequency: 0.0,
        };
        osc.set_frequency(frequency);
        osc
    }

    /// Replace the waveform table, keeping phase and rate.
    pub fn set_table(&mut self, table: FunctionTable) {
        self.table = table;
    }

    /// Set the oscillation frequency in Hz.
    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency.max(0.0);
        self.phase_delta = self.frequency / self.sample_rate;
    }

    /// Oscillation frequency in Hz.
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Change the call rate, preserving frequency.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate.max(1.0);
        self.set_frequency(self.frequency);
    }

    /// Reset phase to 0.
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    /// Current phase (0.0 - 1.0).
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Read the current value and advance one step.
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let value = self.table.interp(self.phase);
        self.phase += self.phase_delta;
        if self.phase >= 1.0 {
            self.phase -= floorf(self.phase);
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sinusoid_quarter_points() {
        let table = FunctionTable::sinusoid(256);
        assert!(table.interp(0.0).abs() < 1e-6);
        assert!((table.interp(0.25) - 1.0).abs() < 1e-4);
        assert!(table.interp(0.5).abs() < 1e-4);
        assert!((table.interp(0.75) + 1.0).abs() < 1e-4);
    }

    #[test]
    fn interp_wraps_phase() {
        let table = FunctionTable::triangle(64);
        assert!((table.interp(1.25) - table.interp(0.25)).abs() < 1e-6);
        assert!((table.interp(-0.75) - table.interp(0.25)).abs() < 1e-6);
    }

    #[test]
    fn empty_table_reads_silence() {
        let table = FunctionTable::from_samples(Vec::new());
        assert_eq!(table.len(), 1);
        assert_eq!(table.interp(0.3), 0.0);
    }

    #[test]
    fn oscillator_completes_cycle() {
        // 1 Hz at a 100 Hz call rate: 100 calls per cycle
        let mut osc = FunctionTableOscillator::new(FunctionTable::sinusoid(256), 100.0, 1.0);
        for _ in 0..100 {
            osc.next_sample();
        }
        let phase_error = osc.phase().min((osc.phase() - 1.0).abs());
        assert!(phase_error < 1e-3, "phase {}", osc.phase());
    }

    #[test]
    fn oscillator_output_range() {
        for table in [FunctionTable::sinusoid(128), FunctionTable::triangle(128)] {
            let mut osc = FunctionTableOscillator::new(table, 3000.0, 7.0);
            for _ in 0..5000 {
                let v = osc.next_sample();
                assert!((-1.0..=1.0).contains(&v), "out of range: {v}");
            }
        }
    }

    #[test]
    fn sample_rate_change_keeps_frequency() {
        let mut osc = FunctionTableOscillator::new(FunctionTable::default(), 3000.0, 5.0);
        osc.set_sample_rate(6000.0);
        assert_eq!(osc.frequency(), 5.0);
    }
}
