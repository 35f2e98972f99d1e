//! Search Configuration
//!
//! Caller-supplied scalars controlling one search session. Immutable for
//! the whole session; validated once before any search work begins.
use crate::errors::MctreeError;
use crate::utils::{validate_float_parameter, validate_positive_float_parameter};
use serde::{Deserialize, Serialize};

/// Configuration for a tree search session.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct SearchConfig {
    /// UCB1 exploration constant.
    pub exploration: f64,
    /// Number of expansion iterations to run from the root.
    pub num_expansions: usize,
    /// Penalty subtracted from a subtree's value per split, discouraging
    /// unnecessarily large trees.
    pub sparsity: f64,
    /// RAVE mixing parameter; larger values keep the RAVE bias active for
    /// longer.
    pub k: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            exploration: 1.0,
            num_expansions: 1000,
            sparsity: 0.01,
            k: 1.0,
        }
    }
}

impl SearchConfig {
    /// Validate every scalar. `exploration` and `sparsity` must be finite
    /// and non-negative; `k` must be strictly positive so the mixing
    /// coefficient is defined at zero visits.
    pub fn validate(&self) -> Result<(), MctreeError> {
        validate_positive_float_parameter(self.exploration, "exploration")?;
        validate_positive_float_parameter(self.sparsity, "sparsity")?;
        validate_float_parameter(self.k, f64::MIN_POSITIVE, f64::INFINITY, "k")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(SearchConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_scalars() {
        let mut cfg = SearchConfig::default();
        cfg.exploration = -1.0;
        assert!(cfg.validate().is_err());

        let mut cfg = SearchConfig::default();
        cfg.sparsity = f64::NAN;
        assert!(cfg.validate().is_err());

        let mut cfg = SearchConfig::default();
        cfg.k = 0.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_round_trips_through_json() {
        let cfg = SearchConfig::default();
        let serialized = serde_json::to_string(&cfg).unwrap();
        let restored: SearchConfig = serde_json::from_str(&serialized).unwrap();
        assert_eq!(cfg, restored);
    }
}
