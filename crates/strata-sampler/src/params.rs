//! Performance parameters and their lock-free store.
//!
//! Scalar values live in a flat `[AtomicU32; SamplerParam::COUNT]` array as
//! `f32` bit patterns, indexed by [`SamplerParam`]. Any thread may write;
//! the render path reads the whole array once per call into a
//! [`SamplerParams`] snapshot, so a change is heard from the next block.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use strata_dsp::damping_from_db;

use crate::envelope::AdsrParams;

/// Identifier for each scalar sampler parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SamplerParam {
    /// Output gain applied to the voice mix (linear).
    MasterVolume,
    /// Global transpose in semitones.
    PitchOffset,
    /// Vibrato depth in semitones at full LFO swing.
    VibratoDepth,
    /// Vibrato LFO rate in Hz.
    VibratoRate,
    /// Filter cutoff as a multiple of the note frequency.
    CutoffMultiple,
    /// How far the filter envelope pushes the cutoff, as a multiple of the
    /// base cutoff.
    CutoffEnvelopeStrength,
    /// Filter resonance in dB (-20 to +20).
    ResonanceDb,
    /// Length of the declick fade in milliseconds.
    DeclickMs,
    /// Amplitude envelope attack (seconds).
    AmpAttack,
    /// Amplitude envelope decay (seconds).
    AmpDecay,
    /// Amplitude envelope sustain level (0 to 1).
    AmpSustain,
    /// Amplitude envelope release (seconds).
    AmpRelease,
    /// Filter envelope attack (seconds).
    FilterAttack,
    /// Filter envelope decay (seconds).
    FilterDecay,
    /// Filter envelope sustain level (0 to 1).
    FilterSustain,
    /// Filter envelope release (seconds).
    FilterRelease,
}

impl SamplerParam {
    /// Number of scalar parameters.
    pub const COUNT: usize = 16;

    /// Every parameter, in index order.
    pub const ALL: [SamplerParam; Self::COUNT] = [
        SamplerParam::MasterVolume,
        SamplerParam::PitchOffset,
        SamplerParam::VibratoDepth,
        SamplerParam::VibratoRate,
        SamplerParam::CutoffMultiple,
        SamplerParam::CutoffEnvelopeStrength,
        SamplerParam::ResonanceDb,
        SamplerParam::DeclickMs,
        SamplerParam::AmpAttack,
        SamplerParam::AmpDecay,
        SamplerParam::AmpSustain,
        SamplerParam::AmpRelease,
        SamplerParam::FilterAttack,
        SamplerParam::FilterDecay,
        SamplerParam::FilterSustain,
        SamplerParam::FilterRelease,
    ];

    /// Position in [`ALL`](Self::ALL) and in the atomic store.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Config key for this parameter.
    pub fn name(self) -> &'static str {
        match self {
            SamplerParam::MasterVolume => "master_volume",
            SamplerParam::PitchOffset => "pitch_offset",
            SamplerParam::VibratoDepth => "vibrato_depth",
            SamplerParam::VibratoRate => "vibrato_rate",
            SamplerParam::CutoffMultiple => "cutoff_multiple",
            SamplerParam::CutoffEnvelopeStrength => "cutoff_envelope_strength",
            SamplerParam::ResonanceDb => "resonance_db",
            SamplerParam::DeclickMs => "declick_ms",
            SamplerParam::AmpAttack => "amp_envelope.attack",
            SamplerParam::AmpDecay => "amp_envelope.decay",
            SamplerParam::AmpSustain => "amp_envelope.sustain",
            SamplerParam::AmpRelease => "amp_envelope.release",
            SamplerParam::FilterAttack => "filter_envelope.attack",
            SamplerParam::FilterDecay => "filter_envelope.decay",
            SamplerParam::FilterSustain => "filter_envelope.sustain",
            SamplerParam::FilterRelease => "filter_envelope.release",
        }
    }

    /// Value a freshly created sampler starts with.
    pub fn default_value(self) -> f32 {
        match self {
            SamplerParam::MasterVolume | SamplerParam::AmpSustain | SamplerParam::FilterSustain => {
                1.0
            }
            SamplerParam::PitchOffset
            | SamplerParam::VibratoDepth
            | SamplerParam::ResonanceDb => 0.0,
            SamplerParam::VibratoRate | SamplerParam::DeclickMs => 5.0,
            SamplerParam::CutoffMultiple => 4.0,
            SamplerParam::CutoffEnvelopeStrength => 20.0,
            SamplerParam::AmpAttack | SamplerParam::FilterAttack => 0.005,
            SamplerParam::AmpDecay | SamplerParam::FilterDecay => 0.1,
            SamplerParam::AmpRelease | SamplerParam::FilterRelease => 0.2,
        }
    }

    /// Accepted range, inclusive.
    pub fn range(self) -> (f32, f32) {
        match self {
            SamplerParam::MasterVolume => (0.0, 4.0),
            SamplerParam::PitchOffset => (-48.0, 48.0),
            SamplerParam::VibratoDepth => (0.0, 12.0),
            SamplerParam::VibratoRate => (0.0, 50.0),
            SamplerParam::CutoffMultiple => (0.0, 100.0),
            SamplerParam::CutoffEnvelopeStrength => (0.0, 100.0),
            SamplerParam::ResonanceDb => (-20.0, 20.0),
            SamplerParam::DeclickMs => (0.0, 100.0),
            SamplerParam::AmpSustain | SamplerParam::FilterSustain => (0.0, 1.0),
            SamplerParam::AmpAttack
            | SamplerParam::AmpDecay
            | SamplerParam::AmpRelease
            | SamplerParam::FilterAttack
            | SamplerParam::FilterDecay
            | SamplerParam::FilterRelease => (0.0, 60.0),
        }
    }

    /// Clamp a value into [`range`](Self::range). NaN maps to the default.
    pub fn clamp(self, value: f32) -> f32 {
        if value.is_nan() {
            return self.default_value();
        }
        let (min, max) = self.range();
        value.clamp(min, max)
    }
}

/// Lock-free parameter storage shared between the sampler and its handles.
pub(crate) struct ParamStore {
    values: [AtomicU32; SamplerParam::COUNT],
    /// Linear filter damping, converted from `ResonanceDb` when it is set.
    damping: AtomicU32,
    filter_enabled: AtomicBool,
    loop_thru_release: AtomicBool,
}

impl ParamStore {
    pub(crate) fn new() -> Self {
        let store = Self {
            values: core::array::from_fn(|i| {
                AtomicU32::new(SamplerParam::ALL[i].default_value().to_bits())
            }),
            damping: AtomicU32::new(0.0f32.to_bits()),
            filter_enabled: AtomicBool::new(false),
            loop_thru_release: AtomicBool::new(false),
        };
        store.set(
            SamplerParam::ResonanceDb,
            SamplerParam::ResonanceDb.default_value(),
        );
        store
    }

    pub(crate) fn get(&self, param: SamplerParam) -> f32 {
        f32::from_bits(self.values[param.index()].load(Ordering::Acquire))
    }

    pub(crate) fn set(&self, param: SamplerParam, value: f32) {
        let value = param.clamp(value);
        if param == SamplerParam::ResonanceDb {
            self.damping
                .store(damping_from_db(value).to_bits(), Ordering::Release);
        }
        self.values[param.index()].store(value.to_bits(), Ordering::Release);
    }

    pub(crate) fn filter_enabled(&self) -> bool {
        self.filter_enabled.load(Ordering::Acquire)
    }

    pub(crate) fn set_filter_enabled(&self, enabled: bool) {
        self.filter_enabled.store(enabled, Ordering::Release);
    }

    pub(crate) fn loop_thru_release(&self) -> bool {
        self.loop_thru_release.load(Ordering::Acquire)
    }

    pub(crate) fn set_loop_thru_release(&self, enabled: bool) {
        self.loop_thru_release.store(enabled, Ordering::Release);
    }

    pub(crate) fn snapshot(&self) -> SamplerParams {
        SamplerParams {
            master_volume: self.get(SamplerParam::MasterVolume),
            pitch_offset: self.get(SamplerParam::PitchOffset),
            vibrato_depth: self.get(SamplerParam::VibratoDepth),
            vibrato_rate: self.get(SamplerParam::VibratoRate),
            cutoff_multiple: self.get(SamplerParam::CutoffMultiple),
            cutoff_envelope_strength: self.get(SamplerParam::CutoffEnvelopeStrength),
            damping: f32::from_bits(self.damping.load(Ordering::Acquire)),
            declick_ms: self.get(SamplerParam::DeclickMs),
            amp_envelope: EnvelopeTimes {
                attack: self.get(SamplerParam::AmpAttack),
                decay: self.get(SamplerParam::AmpDecay),
                sustain: self.get(SamplerParam::AmpSustain),
                release: self.get(SamplerParam::AmpRelease),
            },
            filter_envelope: EnvelopeTimes {
                attack: self.get(SamplerParam::FilterAttack),
                decay: self.get(SamplerParam::FilterDecay),
                sustain: self.get(SamplerParam::FilterSustain),
                release: self.get(SamplerParam::FilterRelease),
            },
            filter_enabled: self.filter_enabled(),
            loop_thru_release: self.loop_thru_release(),
        }
    }
}

/// ADSR settings as plain values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeTimes {
    /// Attack in seconds.
    pub attack: f32,
    /// Decay in seconds.
    pub decay: f32,
    /// Sustain level, 0 to 1.
    pub sustain: f32,
    /// Release in seconds.
    pub release: f32,
}

impl EnvelopeTimes {
    /// Build envelope parameters at a sample rate.
    pub fn to_params(self, sample_rate: f32) -> AdsrParams {
        AdsrParams::with_times(
            sample_rate,
            self.attack,
            self.decay,
            self.sustain,
            self.release,
        )
    }
}

/// Parameter values as seen by one render call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerParams {
    /// Linear output gain.
    pub master_volume: f32,
    /// Transpose in semitones.
    pub pitch_offset: f32,
    /// Vibrato depth in semitones.
    pub vibrato_depth: f32,
    /// Vibrato rate in Hz.
    pub vibrato_rate: f32,
    /// Cutoff as a multiple of note frequency.
    pub cutoff_multiple: f32,
    /// Filter envelope amount.
    pub cutoff_envelope_strength: f32,
    /// Linear filter damping (10.0 at -20 dB down to 0.1 at +20 dB).
    pub damping: f32,
    /// Declick fade length in milliseconds.
    pub declick_ms: f32,
    /// Amplitude envelope.
    pub amp_envelope: EnvelopeTimes,
    /// Filter envelope.
    pub filter_envelope: EnvelopeTimes,
    /// Whether the per-voice low-pass runs.
    pub filter_enabled: bool,
    /// Whether looping voices keep looping after note-off.
    pub loop_thru_release: bool,
}

impl Default for SamplerParams {
    fn default() -> Self {
        ParamStore::new().snapshot()
    }
}
