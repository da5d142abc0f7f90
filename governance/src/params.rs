//! Governable parameters of the proposal engine.

use crate::error::GovernanceError;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceParams {
    /// Length of the voting window `[start, end)`.
    #[serde(default = "default_voting_period_secs")]
    pub voting_period_secs: u64,

    /// Percentage of the total stake supply that must vote.
    #[serde(default = "default_quorum_percent")]
    pub quorum_percent: u8,

    /// Minimum gap between two proposals from the same principal.
    #[serde(default = "default_proposal_cooldown_secs")]
    pub proposal_cooldown_secs: u64,

    /// Proposals accepted per rolling window, across all principals.
    #[serde(default = "default_rate_limit_max")]
    pub rate_limit_max: u32,

    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,
}

const DAY: u64 = 24 * 60 * 60;

fn default_voting_period_secs() -> u64 {
    7 * DAY
}

fn default_quorum_percent() -> u8 {
    10
}

fn default_proposal_cooldown_secs() -> u64 {
    3 * DAY
}

fn default_rate_limit_max() -> u32 {
    10
}

fn default_rate_limit_window_secs() -> u64 {
    DAY
}

impl Default for GovernanceParams {
    fn default() -> Self {
        Self {
            voting_period_secs: default_voting_period_secs(),
            quorum_percent: default_quorum_percent(),
            proposal_cooldown_secs: default_proposal_cooldown_secs(),
            rate_limit_max: default_rate_limit_max(),
            rate_limit_window_secs: default_rate_limit_window_secs(),
        }
    }
}

impl GovernanceParams {
    pub fn validate(&self) -> Result<(), GovernanceError> {
        if self.voting_period_secs == 0 {
            return Err(invalid("voting_period_secs", "must be greater than zero"));
        }
        if self.quorum_percent == 0 || self.quorum_percent > 100 {
            return Err(invalid("quorum_percent", "must be within 1..=100"));
        }
        if self.rate_limit_max == 0 {
            return Err(invalid("rate_limit_max", "must be greater than zero"));
        }
        if self.rate_limit_window_secs == 0 {
            return Err(invalid("rate_limit_window_secs", "must be greater than zero"));
        }
        Ok(())
    }
}

fn invalid(name: &'static str, reason: &str) -> GovernanceError {
    GovernanceError::InvalidParam {
        name,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        GovernanceParams::default().validate().unwrap();
    }

    #[test]
    fn rejects_out_of_range_quorum() {
        let params = GovernanceParams {
            quorum_percent: 101,
            ..GovernanceParams::default()
        };
        assert!(matches!(
            params.validate(),
            Err(GovernanceError::InvalidParam { name: "quorum_percent", .. })
        ));
    }
}
