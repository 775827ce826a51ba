//! Radioactive decay weighting.
//!
//! Each accepted coincidence is weighted by `exp(-lambda * t)`, where `t` is
//! the time since the start of the run, so that counts late in a long
//! acquisition are normalised to the source activity at run start.

use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Half-life of fluorine-18 in minutes.
pub const F18_HALF_LIFE_MINUTES: f64 = 109.7;

const MS_PER_MINUTE: f64 = 60_000.0;

/// Exponential decay weight generator.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DecayCorrection {
    lambda_per_ms: f64,
}

impl Default for DecayCorrection {
    fn default() -> Self {
        Self {
            lambda_per_ms: std::f64::consts::LN_2 / (F18_HALF_LIFE_MINUTES * MS_PER_MINUTE),
        }
    }
}

impl DecayCorrection {
    /// Decay constant for an isotope with the given half-life.
    ///
    /// # Errors
    /// Returns [`Error::InvalidHalfLife`] unless the half-life is finite and positive.
    pub fn from_half_life_minutes(minutes: f64) -> Result<Self> {
        if !minutes.is_finite() || minutes <= 0.0 {
            return Err(Error::InvalidHalfLife(minutes));
        }
        Ok(Self {
            lambda_per_ms: std::f64::consts::LN_2 / (minutes * MS_PER_MINUTE),
        })
    }

    /// Decay constant in 1/ms.
    #[must_use]
    pub fn lambda_per_ms(&self) -> f64 {
        self.lambda_per_ms
    }

    /// Weight of a coincidence detected `elapsed_ms` after run start.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn weight(&self, elapsed_ms: u64) -> f32 {
        (-self.lambda_per_ms * elapsed_ms as f64).exp() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_weight_at_run_start() {
        assert_relative_eq!(DecayCorrection::default().weight(0), 1.0);
    }

    #[test]
    fn test_weight_after_half_lives() {
        let decay = DecayCorrection::default();
        let half_life_ms = (F18_HALF_LIFE_MINUTES * MS_PER_MINUTE) as u64;
        assert_relative_eq!(decay.weight(half_life_ms), 0.5, epsilon = 1e-5);
        assert_relative_eq!(decay.weight(2 * half_life_ms), 0.25, epsilon = 1e-5);
    }

    #[test]
    fn test_weight_is_monotonic() {
        let decay = DecayCorrection::default();
        let mut previous = decay.weight(0);
        for t in (1_000..600_000).step_by(50_000) {
            let w = decay.weight(t);
            assert!(w < previous);
            previous = w;
        }
    }

    #[test]
    fn test_custom_half_life() {
        let decay = DecayCorrection::from_half_life_minutes(1.0).unwrap();
        assert_relative_eq!(decay.weight(60_000), 0.5, epsilon = 1e-6);
        assert!(DecayCorrection::from_half_life_minutes(0.0).is_err());
        assert!(DecayCorrection::from_half_life_minutes(-3.0).is_err());
        assert!(DecayCorrection::from_half_life_minutes(f64::INFINITY).is_err());
    }
}
