//! Forensic switch state.

use citadel_types::{PrincipalId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForensicState {
    /// Failed transactions reported since the last deactivation.
    pub failed_transactions: u64,
    /// Manual and automatic approvals.
    pub approvals: BTreeSet<PrincipalId>,
    /// The subset of `approvals` granted by the failure threshold.
    pub auto_approvals: BTreeSet<PrincipalId>,
    pub active: bool,
    pub last_activated_at: Option<Timestamp>,
    pub last_deactivated_at: Option<Timestamp>,
}

impl ForensicState {
    /// Seconds left before reactivation is allowed, zero when clear.
    pub fn cooldown_remaining(&self, cooldown_secs: u64, now: Timestamp) -> u64 {
        match self.last_deactivated_at {
            Some(at) => at.plus(cooldown_secs).as_secs().saturating_sub(now.as_secs()),
            None => 0,
        }
    }

    /// Back to a clean INACTIVE state.
    pub fn reset(&mut self, now: Timestamp) {
        self.active = false;
        self.failed_transactions = 0;
        self.approvals.clear();
        self.auto_approvals.clear();
        self.last_deactivated_at = Some(now);
    }
}

/// A principal eligible to receive redirected funds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupPrincipal {
    pub principal: PrincipalId,
    pub active: bool,
    pub registered_at: Timestamp,
    /// Total received through redirections and emergency withdrawals.
    pub received: u128,
}
