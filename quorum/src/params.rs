//! Seal quorum policy.

use serde::{Deserialize, Serialize};

/// Signatures a seal needs: `max(ceil(percent × active / 100), min_signatures)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuorumParams {
    /// Percentage of active guardians, 1–100.
    #[serde(default = "default_percent")]
    pub percent: u8,
    /// Absolute floor on signatures.
    #[serde(default = "default_min_signatures")]
    pub min_signatures: usize,
}

fn default_percent() -> u8 {
    51
}

fn default_min_signatures() -> usize {
    2
}

impl QuorumParams {
    pub fn new(percent: u8, min_signatures: usize) -> Self {
        Self {
            percent,
            min_signatures,
        }
    }

    /// Signatures required when `active` guardians are registered.
    pub fn required_signatures(&self, active: usize) -> usize {
        let scaled = (usize::from(self.percent) * active).div_ceil(100);
        scaled.max(self.min_signatures)
    }
}

impl Default for QuorumParams {
    fn default() -> Self {
        Self {
            percent: default_percent(),
            min_signatures: default_min_signatures(),
        }
    }
}
