use std::default::Default;

use crate::error::RtiError;

/// Smallest lookahead a regulating federate is allowed to hold. A request
/// for zero lookahead is stored as this value instead.
pub const DEFAULT_LOOKAHEAD_EPSILON: f64 = 1e-9;

/// Contains Config properties for time management
#[derive(Clone, Debug)]
pub struct TimeConfig {
    /// Value substituted whenever a federate asks for a lookahead of zero.
    /// Must be strictly positive.
    pub zero_lookahead_epsilon: f64,
}

impl TimeConfig {
    /// Applies the zero-lookahead promotion. Negative values are the
    /// caller's to reject.
    pub fn effective_lookahead(&self, lookahead: f64) -> f64 {
        if lookahead == 0.0 {
            self.zero_lookahead_epsilon
        } else {
            lookahead
        }
    }

    /// The lookahead to store for a request, or `InvalidLookahead` when it
    /// is negative, infinite or NaN
    pub fn validate_lookahead(&self, lookahead: f64) -> Result<f64, RtiError> {
        if !lookahead.is_finite() || lookahead < 0.0 {
            return Err(RtiError::InvalidLookahead { lookahead });
        }
        Ok(self.effective_lookahead(lookahead))
    }
}

/// Fails unless `time` is a usable starting time: zero or later, never NaN
pub fn validate_start_time(time: f64) -> Result<(), RtiError> {
    if time.is_nan() || time < 0.0 {
        return Err(RtiError::InvalidFederationTime {
            time,
            reason: "time must not be negative".to_string(),
        });
    }
    Ok(())
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            zero_lookahead_epsilon: DEFAULT_LOOKAHEAD_EPSILON,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_promoted() {
        let config = TimeConfig::default();
        assert!(config.effective_lookahead(0.0) > 0.0);
        assert_eq!(config.effective_lookahead(2.5), 2.5);
    }

    #[test]
    fn epsilon_is_configurable() {
        let config = TimeConfig {
            zero_lookahead_epsilon: 0.5,
        };
        assert_eq!(config.effective_lookahead(0.0), 0.5);
    }

    #[test]
    fn unusable_lookaheads_are_rejected() {
        let config = TimeConfig::default();
        for lookahead in [-1.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                config.validate_lookahead(lookahead),
                Err(RtiError::InvalidLookahead { .. })
            ));
        }
        assert_eq!(config.validate_lookahead(0.0), Ok(DEFAULT_LOOKAHEAD_EPSILON));
        assert_eq!(config.validate_lookahead(3.0), Ok(3.0));
    }

    #[test]
    fn start_time_must_be_a_number() {
        assert!(validate_start_time(0.0).is_ok());
        assert!(validate_start_time(-0.5).is_err());
        assert!(validate_start_time(f64::NAN).is_err());
    }
}
