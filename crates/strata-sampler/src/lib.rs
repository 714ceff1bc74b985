//! Strata Sampler - polyphonic sample-playback voice engine
//!
//! This crate turns note events into mixed audio from pre-loaded sample
//! zones. It owns the voice pool and everything that runs per voice; sample
//! loading, keymapping and host integration stay outside, behind the
//! [`SampleBank`] trait.
//!
//! # Core Components
//!
//! ## Engine
//!
//! - [`Sampler`] - Fixed voice pool, allocation and stealing, render entry point
//! - [`SamplerHandle`] - Cloneable control-path handle for other threads
//! - [`SamplerVoice`] - One voice: interpolated playback, envelopes, filter
//!
//! ```rust
//! use strata_sampler::{Sampler, SampleZone, ZoneMap};
//!
//! let mut sampler: Sampler = Sampler::new(48000.0).unwrap();
//! let tone: Vec<f32> = (0..48000)
//!     .map(|i| (i as f32 * 440.0 * std::f32::consts::TAU / 48000.0).sin())
//!     .collect();
//! sampler.set_bank(ZoneMap::single(SampleZone::mono(tone, 48000.0, 440.0)));
//!
//! sampler.play_note(69, 100, 440.0);
//! sampler.play_note(73, 100, 554.4);
//!
//! let mut left = vec![0.0f32; 512];
//! let mut right = vec![0.0f32; 512];
//! sampler.render(&mut [&mut left[..], &mut right[..]], 512);
//! assert_eq!(sampler.active_voice_count(), 2);
//!
//! sampler.stop_note(69, false);
//! ```
//!
//! ## Envelopes and Pedal
//!
//! - [`AdsrParams`] / [`AdsrEnvelope`] - Shared timing, per-voice state
//! - [`EnvelopeState`] - Envelope stage tracking
//! - [`SustainPedalLogic`] - Deferred release while the pedal is down
//!
//! ## Sample Data
//!
//! - [`SampleBank`] - Zone lookup by note and velocity
//! - [`SampleZone`] - Sample data with root pitch and loop points
//! - [`ZoneMap`] - Simple in-memory keymap
//!
//! ## Configuration
//!
//! - [`SamplerConfig`] - TOML-serializable settings
//! - [`SamplerParam`] - Identifiers for runtime parameter changes
//! - [`SamplerError`] - Setup and configuration errors
//!
//! # Threading
//!
//! The render thread owns the [`Sampler`]. Control threads hold
//! [`SamplerHandle`]s; their note events queue up and apply at the start of
//! the next render call. Replacing the sample bank while rendering must be
//! bracketed by [`SamplerHandle::stop_all_voices`] and
//! [`SamplerHandle::restart_voices`].

pub mod bank;
pub mod config;
pub mod envelope;
pub mod error;
pub mod params;
pub mod pedal;
pub mod sampler;
pub mod shared;
pub mod voice;

/// Samples per render sub-block. Pitch, vibrato and filter cutoff are
/// recomputed once per sub-block.
pub const CHUNK_SIZE: usize = 16;

/// Default voice pool size.
pub const MAX_POLYPHONY: usize = 64;

// Re-export main types at crate root
pub use bank::{SampleBank, SampleZone, ZoneId, ZoneMap};
pub use config::{EnvelopeConfig, SamplerConfig};
pub use envelope::{AdsrEnvelope, AdsrParams, EnvelopeState};
pub use error::{SamplerError, status_code};
pub use params::{EnvelopeTimes, SamplerParam, SamplerParams};
pub use pedal::{KeyRelease, SustainPedalLogic};
pub use sampler::Sampler;
pub use shared::{COMMAND_QUEUE_CAPACITY, SamplerHandle};
pub use voice::SamplerVoice;

/// Vibrato waveform type, for [`Sampler::set_vibrato_table`].
pub use strata_dsp::FunctionTable;
