//! Forensic guard configuration.

use serde::{Deserialize, Serialize};

/// Backups required before funds may leave the reserve.
pub const MIN_BACKUPS: usize = 3;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForensicParams {
    /// Failed transactions that trigger automatic approvals.
    #[serde(default = "default_block_detection_threshold")]
    pub block_detection_threshold: u64,

    /// Seconds after a deactivation before the switch may activate again.
    #[serde(default = "default_reactivation_cooldown_secs")]
    pub reactivation_cooldown_secs: u64,

    /// Reserve level reported by `is_above_minimum`.
    #[serde(default)]
    pub minimum_reserve: u64,
}

fn default_block_detection_threshold() -> u64 {
    5
}

fn default_reactivation_cooldown_secs() -> u64 {
    24 * 60 * 60
}

impl Default for ForensicParams {
    fn default() -> Self {
        Self {
            block_detection_threshold: default_block_detection_threshold(),
            reactivation_cooldown_secs: default_reactivation_cooldown_secs(),
            minimum_reserve: 0,
        }
    }
}
