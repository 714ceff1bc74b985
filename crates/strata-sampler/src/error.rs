//! Error types for sampler setup and configuration.
//!
//! Only the non-real-time paths return errors. Note events and rendering
//! degrade silently instead.

use thiserror::Error;

/// Errors that can occur while initializing or configuring a sampler.
#[derive(Debug, Error)]
pub enum SamplerError {
    /// Sample rate was zero, negative, or not finite
    #[error("invalid sample rate: {0}")]
    InvalidSampleRate(f32),

    /// A configuration value is outside its accepted range
    #[error("invalid parameter '{name}' = {value}: {reason}")]
    InvalidParameter {
        /// Name of the offending parameter.
        name: &'static str,
        /// The rejected value.
        value: f32,
        /// Description of the accepted range.
        reason: &'static str,
    },

    /// Failed to parse TOML
    #[error("failed to parse sampler config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Failed to serialize TOML
    #[error("failed to serialize sampler config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}

impl SamplerError {
    /// Numeric error code for hosts that speak status integers.
    ///
    /// Always nonzero; `0` is reserved for success.
    pub fn code(&self) -> i32 {
        match self {
            SamplerError::InvalidSampleRate(_) => 1,
            SamplerError::InvalidParameter { .. } => 2,
            SamplerError::ConfigParse(_) => 3,
            SamplerError::ConfigSerialize(_) => 4,
        }
    }
}

/// Collapse an init result to a status code (`0` = success).
///
/// ```rust
/// use strata_sampler::{SamplerError, status_code};
///
/// assert_eq!(status_code(&Ok(())), 0);
/// assert_eq!(status_code(&Err(SamplerError::InvalidSampleRate(0.0))), 1);
/// ```
pub fn status_code(result: &Result<(), SamplerError>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => err.code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn codes_are_nonzero_and_distinct() {
        let parse_err = toml::from_str::<toml::Value>("= broken").unwrap_err();
        let errors = [
            SamplerError::InvalidSampleRate(-1.0),
            SamplerError::InvalidParameter {
                name: "master_volume",
                value: -2.0,
                reason: "must be >= 0",
            },
            SamplerError::ConfigParse(parse_err),
        ];
        let codes: Vec<i32> = errors.iter().map(SamplerError::code).collect();
        assert!(codes.iter().all(|&c| c != 0));
        assert_eq!(codes, vec![1, 2, 3]);
    }

    #[test]
    fn invalid_sample_rate_display() {
        let err = SamplerError::InvalidSampleRate(0.0);
        assert_eq!(err.to_string(), "invalid sample rate: 0");
    }

    #[test]
    fn invalid_parameter_display() {
        let err = SamplerError::InvalidParameter {
            name: "amp_envelope.sustain",
            value: 1.5,
            reason: "must be in [0, 1]",
        };
        assert_eq!(
            err.to_string(),
            "invalid parameter 'amp_envelope.sustain' = 1.5: must be in [0, 1]"
        );
    }

    #[test]
    fn parse_error_exposes_source() {
        let parse_err = toml::from_str::<toml::Value>("x = [").unwrap_err();
        let err = SamplerError::from(parse_err);
        assert!(err.source().is_some());
        assert!(err.to_string().starts_with("failed to parse sampler config"));
    }

    #[test]
    fn invalid_sample_rate_source_is_none() {
        assert!(SamplerError::InvalidSampleRate(0.0).source().is_none());
    }
}
