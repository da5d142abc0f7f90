//! Per-principal stake record.

use citadel_types::{PrincipalId, Timestamp};
use serde::{Deserialize, Serialize};

/// A registered principal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    /// Stake balance in raw units.
    pub stake: u128,
    /// Integer multiplier bonus applied on top of stake when voting.
    pub contribution_score: u32,
    pub registered_at: Timestamp,
}

impl Principal {
    /// `stake × (1 + contribution_score)`, `None` on overflow.
    pub fn vote_weight(&self) -> Option<u128> {
        let multiplier = 1u128 + u128::from(self.contribution_score);
        self.stake.checked_mul(multiplier)
    }
}
