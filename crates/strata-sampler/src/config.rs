//! Sampler configuration in TOML form.

use serde::{Deserialize, Serialize};

use crate::error::SamplerError;
use crate::params::{EnvelopeTimes, SamplerParam};

/// ADSR settings for one envelope.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EnvelopeConfig {
    /// Attack time in seconds.
    pub attack: f32,
    /// Decay time in seconds.
    pub decay: f32,
    /// Sustain level (0.0 to 1.0).
    pub sustain: f32,
    /// Release time in seconds.
    pub release: f32,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            attack: SamplerParam::AmpAttack.default_value(),
            decay: SamplerParam::AmpDecay.default_value(),
            sustain: SamplerParam::AmpSustain.default_value(),
            release: SamplerParam::AmpRelease.default_value(),
        }
    }
}

impl From<EnvelopeTimes> for EnvelopeConfig {
    fn from(times: EnvelopeTimes) -> Self {
        Self {
            attack: times.attack,
            decay: times.decay,
            sustain: times.sustain,
            release: times.release,
        }
    }
}

/// Complete set of sampler performance settings.
///
/// Every field is optional in TOML; missing keys take their defaults.
///
/// # TOML Format
///
/// ```toml
/// master_volume = 0.8
/// pitch_offset = 0.0
/// vibrato_depth = 0.2
/// vibrato_rate = 5.5
/// filter_enabled = true
/// cutoff_multiple = 4.0
/// cutoff_envelope_strength = 20.0
/// resonance_db = 6.0
/// loop_thru_release = false
/// declick_ms = 5.0
///
/// [amp_envelope]
/// attack = 0.01
/// decay = 0.1
/// sustain = 0.8
/// release = 0.4
///
/// [filter_envelope]
/// attack = 0.0
/// decay = 0.3
/// sustain = 0.2
/// release = 0.4
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SamplerConfig {
    /// Linear output gain.
    pub master_volume: f32,
    /// Transpose in semitones.
    pub pitch_offset: f32,
    /// Vibrato depth in semitones.
    pub vibrato_depth: f32,
    /// Vibrato rate in Hz.
    pub vibrato_rate: f32,
    /// Whether the per-voice low-pass runs.
    pub filter_enabled: bool,
    /// Cutoff as a multiple of the note frequency.
    pub cutoff_multiple: f32,
    /// How far the filter envelope opens the cutoff.
    pub cutoff_envelope_strength: f32,
    /// Resonance in dB, -20 to +20.
    pub resonance_db: f32,
    /// Keep looping through the release stage.
    pub loop_thru_release: bool,
    /// Declick fade length in milliseconds.
    pub declick_ms: f32,
    /// Amplitude envelope.
    pub amp_envelope: EnvelopeConfig,
    /// Filter envelope.
    pub filter_envelope: EnvelopeConfig,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            master_volume: SamplerParam::MasterVolume.default_value(),
            pitch_offset: SamplerParam::PitchOffset.default_value(),
            vibrato_depth: SamplerParam::VibratoDepth.default_value(),
            vibrato_rate: SamplerParam::VibratoRate.default_value(),
            filter_enabled: false,
            cutoff_multiple: SamplerParam::CutoffMultiple.default_value(),
            cutoff_envelope_strength: SamplerParam::CutoffEnvelopeStrength.default_value(),
            resonance_db: SamplerParam::ResonanceDb.default_value(),
            loop_thru_release: false,
            declick_ms: SamplerParam::DeclickMs.default_value(),
            amp_envelope: EnvelopeConfig::default(),
            filter_envelope: EnvelopeConfig::default(),
        }
    }
}

impl SamplerConfig {
    /// Parse from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`SamplerError::ConfigParse`] on malformed TOML. Values are
    /// not range-checked here; call [`validate`](Self::validate).
    pub fn from_toml_str(toml_str: &str) -> Result<Self, SamplerError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`SamplerError::ConfigSerialize`] if serialization fails.
    pub fn to_toml_string(&self) -> Result<String, SamplerError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Scalar values paired with their parameter ids.
    pub fn param_values(&self) -> [(SamplerParam, f32); SamplerParam::COUNT] {
        [
            (SamplerParam::MasterVolume, self.master_volume),
            (SamplerParam::PitchOffset, self.pitch_offset),
            (SamplerParam::VibratoDepth, self.vibrato_depth),
            (SamplerParam::VibratoRate, self.vibrato_rate),
            (SamplerParam::CutoffMultiple, self.cutoff_multiple),
            (
                SamplerParam::CutoffEnvelopeStrength,
                self.cutoff_envelope_strength,
            ),
            (SamplerParam::ResonanceDb, self.resonance_db),
            (SamplerParam::DeclickMs, self.declick_ms),
            (SamplerParam::AmpAttack, self.amp_envelope.attack),
            (SamplerParam::AmpDecay, self.amp_envelope.decay),
            (SamplerParam::AmpSustain, self.amp_envelope.sustain),
            (SamplerParam::AmpRelease, self.amp_envelope.release),
            (SamplerParam::FilterAttack, self.filter_envelope.attack),
            (SamplerParam::FilterDecay, self.filter_envelope.decay),
            (SamplerParam::FilterSustain, self.filter_envelope.sustain),
            (SamplerParam::FilterRelease, self.filter_envelope.release),
        ]
    }

    /// Check every value against its parameter range.
    ///
    /// # Errors
    ///
    /// Returns [`SamplerError::InvalidParameter`] for the first value that is
    /// not finite or lies outside its range.
    pub fn validate(&self) -> Result<(), SamplerError> {
        for (param, value) in self.param_values() {
            let (min, max) = param.range();
            if !value.is_finite() {
                return Err(SamplerError::InvalidParameter {
                    name: param.name(),
                    value,
                    reason: "must be finite",
                });
            }
            if value < min || value > max {
                return Err(SamplerError::InvalidParameter {
                    name: param.name(),
                    value,
                    reason: range_reason(param),
                });
            }
        }
        Ok(())
    }
}

fn range_reason(param: SamplerParam) -> &'static str {
    match param {
        SamplerParam::MasterVolume => "must be in [0, 4]",
        SamplerParam::PitchOffset => "must be in [-48, 48] semitones",
        SamplerParam::VibratoDepth => "must be in [0, 12] semitones",
        SamplerParam::VibratoRate => "must be in [0, 50] Hz",
        SamplerParam::CutoffMultiple | SamplerParam::CutoffEnvelopeStrength => {
            "must be in [0, 100]"
        }
        SamplerParam::ResonanceDb => "must be in [-20, 20] dB",
        SamplerParam::DeclickMs => "must be in [0, 100] ms",
        SamplerParam::AmpSustain | SamplerParam::FilterSustain => "must be in [0, 1]",
        _ => "must be in [0, 60] seconds",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(SamplerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_minimal_toml() {
        let config = SamplerConfig::from_toml_str("").unwrap();
        assert_eq!(config, SamplerConfig::default());
    }

    #[test]
    fn test_partial_toml() {
        let toml_str = r#"
            master_volume = 0.5
            filter_enabled = true

            [amp_envelope]
            release = 1.5
        "#;
        let config = SamplerConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.master_volume, 0.5);
        assert!(config.filter_enabled);
        assert_eq!(config.amp_envelope.release, 1.5);
        assert_eq!(config.amp_envelope.attack, EnvelopeConfig::default().attack);
        assert_eq!(config.filter_envelope, EnvelopeConfig::default());
    }

    #[test]
    fn test_roundtrip() {
        let config = SamplerConfig {
            vibrato_depth: 0.25,
            resonance_db: -6.0,
            loop_thru_release: true,
            filter_envelope: EnvelopeConfig {
                attack: 0.0,
                decay: 0.3,
                sustain: 0.2,
                release: 0.4,
            },
            ..SamplerConfig::default()
        };
        let text = config.to_toml_string().unwrap();
        assert!(text.contains("[filter_envelope]"));
        let parsed = SamplerConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_invalid_sustain_rejected() {
        let config = SamplerConfig {
            amp_envelope: EnvelopeConfig {
                sustain: 1.5,
                ..EnvelopeConfig::default()
            },
            ..SamplerConfig::default()
        };
        match config.validate() {
            Err(SamplerError::InvalidParameter { name, value, .. }) => {
                assert_eq!(name, "amp_envelope.sustain");
                assert_eq!(value, 1.5);
            }
            other => panic!("expected InvalidParameter, got {other:?}"),
        }
    }

    #[test]
    fn test_non_finite_rejected() {
        let config = SamplerConfig {
            pitch_offset: f32::INFINITY,
            ..SamplerConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.code(), 2);
        assert!(err.to_string().contains("must be finite"));
    }

    #[test]
    fn test_malformed_toml() {
        let err = SamplerConfig::from_toml_str("master_volume = \"loud\"").unwrap_err();
        assert!(matches!(err, SamplerError::ConfigParse(_)));
    }
}
