use serde::{Deserialize, Serialize};

use crate::error::{LmnnError, Result};

/// Hyper-parameters of an LMNN objective instance.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LmnnConfig {
    /// Number of target neighbors (and impostor slots) per point.
    pub k: usize,

    /// Weight of the push term; the pull term gets `1 - regularization`.
    pub regularization: f64,

    /// Number of objective calls between impostor refreshes.
    pub range: usize,

    /// Seed for the shuffle permutation. `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl LmnnConfig {
    pub fn new(k: usize, regularization: f64, range: usize) -> Self {
        Self {
            k,
            regularization,
            range,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Check that every field is inside its admissible range.
    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(LmnnError::InvalidConfig("k must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.regularization) {
            return Err(LmnnError::InvalidConfig(format!(
                "regularization must lie in [0, 1], got {}",
                self.regularization
            )));
        }
        if self.range == 0 {
            return Err(LmnnError::InvalidConfig(
                "range must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for LmnnConfig {
    fn default() -> Self {
        Self {
            k: 1,
            regularization: 0.5,
            range: 1,
            seed: None,
        }
    }
}
