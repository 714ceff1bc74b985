//! Strata DSP - primitives for real-time sample playback
//!
//! This crate provides the signal-processing building blocks used by the
//! strata sampler, designed for real-time audio with zero allocation in the
//! audio path.
//!
//! # Components
//!
//! ## Filters
//!
//! - [`StateVariableFilter`] - TPT low-pass with directly-set damping, stable
//!   under per-block cutoff sweeps
//! - [`damping_from_db`] - Resonance dB → linear damping conversion
//!
//! ## Modulation
//!
//! - [`FunctionTable`] - Pre-built single-cycle lookup table
//! - [`FunctionTableOscillator`] - Phase-accumulator LFO over a table
//!
//! ## Gain Ramps
//!
//! - [`LinearRamp`] - Fixed-length fade, used for declicking hard stops
//!
//! ## Utilities
//!
//! - Math functions: [`db_to_linear`], [`semitones_to_ratio`], [`lerp`],
//!   [`flush_denormal`], [`fast_tan`]
//!
//! # no_std Support
//!
//! Disable the default `std` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! strata-dsp = { version = "0.1", default-features = false }
//! ```
//!
//! # Design Principles
//!
//! - **Real-time safe**: No allocations in audio processing paths
//! - **No dependencies on std**: `libm` for math
//! - **Control-rate friendly**: coefficient updates are cheap enough to run
//!   once per sub-block per voice

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod fast_math;
pub mod function_table;
pub mod math;
pub mod ramp;
pub mod svf;

// Re-export main types at crate root
pub use fast_math::fast_tan;
pub use function_table::{DEFAULT_TABLE_SIZE, FunctionTable, FunctionTableOscillator};
pub use math::{db_to_linear, flush_denormal, lerp, semitones_to_ratio};
pub use ramp::LinearRamp;
pub use svf::{MAX_DAMPING, MIN_DAMPING, StateVariableFilter, damping_from_db};
