//! Proposal rate limiting.
//!
//! Two gates, both checked before a proposal is created:
//! - a per-principal cooldown since that principal's last proposal;
//! - a global rolling window (sliding log): creation is refused when
//!   `max` proposals already exist at times `t` with `now − window < t ≤ now`.

use crate::error::GovernanceError;
use citadel_types::{PrincipalId, Timestamp};
use std::collections::{BTreeMap, HashMap};

#[derive(Clone, Debug)]
pub struct RateLimiter {
    cooldown_secs: u64,
    max_per_window: u32,
    window_secs: u64,
    last_by_principal: HashMap<PrincipalId, Timestamp>,
    /// Proposals created at each second. Never pruned: the window can be
    /// widened later and must still see every earlier creation.
    created: BTreeMap<u64, u32>,
}

impl RateLimiter {
    pub fn new(cooldown_secs: u64, max_per_window: u32, window_secs: u64) -> Self {
        Self {
            cooldown_secs,
            max_per_window,
            window_secs,
            last_by_principal: HashMap::new(),
            created: BTreeMap::new(),
        }
    }

    /// Whether `principal` may create a proposal at `now`.
    pub fn check(&self, principal: &PrincipalId, now: Timestamp) -> Result<(), GovernanceError> {
        if let Some(last) = self.last_by_principal.get(principal) {
            let ready_at = last.plus(self.cooldown_secs);
            if now < ready_at {
                return Err(GovernanceError::CooldownActive {
                    remaining_secs: ready_at.as_secs() - now.as_secs(),
                });
            }
        }
        if self.in_window(now) >= self.max_per_window as usize {
            return Err(GovernanceError::RateLimited {
                max: self.max_per_window,
                window_secs: self.window_secs,
            });
        }
        Ok(())
    }

    /// Record a successful creation. Call only after [`RateLimiter::check`].
    pub fn record(&mut self, principal: &PrincipalId, now: Timestamp) {
        self.last_by_principal.insert(principal.clone(), now);
        *self.created.entry(now.as_secs()).or_insert(0) += 1;
    }

    /// Proposals counted against the window ending at `now`.
    pub fn in_window(&self, now: Timestamp) -> usize {
        let now = now.as_secs();
        let from = now.saturating_add(1).saturating_sub(self.window_secs);
        self.created
            .range(from..=now)
            .map(|(_, n)| *n as usize)
            .sum()
    }

    pub fn last_proposal(&self, principal: &PrincipalId) -> Option<Timestamp> {
        self.last_by_principal.get(principal).copied()
    }

    pub fn set_cooldown(&mut self, secs: u64) {
        self.cooldown_secs = secs;
    }

    pub fn set_limit(&mut self, max_per_window: u32, window_secs: u64) {
        self.max_per_window = max_per_window;
        self.window_secs = window_secs;
    }
}
