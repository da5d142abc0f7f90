//! The stake ledger: owner-administered principal table.

use crate::error::StakeError;
use crate::principal::Principal;
use citadel_types::{Clock, EventBus, EventKind, PrincipalId, Timestamp};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
struct LedgerState {
    principals: HashMap<PrincipalId, Principal>,
    /// Always equals the sum of every principal's stake.
    total_stake: u128,
}

/// Principal balances and contribution scores.
pub struct StakeLedger {
    owner: PrincipalId,
    state: RwLock<LedgerState>,
    clock: Arc<dyn Clock>,
    events: Arc<EventBus>,
}

impl StakeLedger {
    pub fn new(owner: PrincipalId, clock: Arc<dyn Clock>, events: Arc<EventBus>) -> Self {
        Self {
            owner,
            state: RwLock::new(LedgerState::default()),
            clock,
            events,
        }
    }

    pub fn owner(&self) -> &PrincipalId {
        &self.owner
    }

    /// Register a principal with an initial stake and contribution score.
    pub fn register_principal(
        &self,
        caller: &PrincipalId,
        id: PrincipalId,
        stake: u128,
        contribution_score: u32,
    ) -> Result<(), StakeError> {
        let now = self.clock.now();
        let entities = vec![id.to_string()];
        let result = self.apply_register(caller, id, stake, contribution_score, now);
        self.events
            .record(EventKind::PrincipalRegistered, caller, entities, &result, now);
        result
    }

    /// Replace a principal's stake balance.
    pub fn set_stake(
        &self,
        caller: &PrincipalId,
        id: &PrincipalId,
        stake: u128,
    ) -> Result<(), StakeError> {
        let now = self.clock.now();
        let result = self.apply_update(caller, id, |p| p.stake = stake);
        self.events
            .record(EventKind::StakeUpdated, caller, vec![id.to_string()], &result, now);
        result
    }

    /// Replace a principal's contribution score.
    pub fn set_contribution_score(
        &self,
        caller: &PrincipalId,
        id: &PrincipalId,
        score: u32,
    ) -> Result<(), StakeError> {
        let now = self.clock.now();
        let result = self.apply_update(caller, id, |p| p.contribution_score = score);
        self.events
            .record(EventKind::StakeUpdated, caller, vec![id.to_string()], &result, now);
        result
    }

    pub fn principal(&self, id: &PrincipalId) -> Option<Principal> {
        self.state.read().principals.get(id).cloned()
    }

    /// Stake of `id`; unregistered principals hold nothing.
    pub fn stake_of(&self, id: &PrincipalId) -> u128 {
        self.state
            .read()
            .principals
            .get(id)
            .map(|p| p.stake)
            .unwrap_or(0)
    }

    pub fn contribution_of(&self, id: &PrincipalId) -> u32 {
        self.state
            .read()
            .principals
            .get(id)
            .map(|p| p.contribution_score)
            .unwrap_or(0)
    }

    pub fn total_stake(&self) -> u128 {
        self.state.read().total_stake
    }

    /// Voting weight `stake × (1 + contribution_score)`.
    pub fn vote_weight(&self, id: &PrincipalId) -> Result<u128, StakeError> {
        let state = self.state.read();
        let principal = state
            .principals
            .get(id)
            .ok_or_else(|| StakeError::PrincipalNotFound(id.to_string()))?;
        principal.vote_weight().ok_or(StakeError::Overflow)
    }

    pub fn principal_count(&self) -> usize {
        self.state.read().principals.len()
    }

    fn apply_register(
        &self,
        caller: &PrincipalId,
        id: PrincipalId,
        stake: u128,
        contribution_score: u32,
        now: Timestamp,
    ) -> Result<(), StakeError> {
        if *caller != self.owner {
            return Err(StakeError::NotOwner("register principals"));
        }
        if !id.is_valid() {
            return Err(StakeError::InvalidPrincipal(id.to_string()));
        }
        let mut state = self.state.write();
        if state.principals.contains_key(&id) {
            return Err(StakeError::AlreadyRegistered(id.to_string()));
        }
        let total = state
            .total_stake
            .checked_add(stake)
            .ok_or(StakeError::Overflow)?;
        tracing::debug!(principal = %id, stake, contribution_score, "principal registered");
        state.principals.insert(
            id.clone(),
            Principal {
                id,
                stake,
                contribution_score,
                registered_at: now,
            },
        );
        state.total_stake = total;
        Ok(())
    }

    /// Apply `f` to a copy of the record, then commit it together with the
    /// adjusted total; nothing is written if the new total overflows.
    fn apply_update(
        &self,
        caller: &PrincipalId,
        id: &PrincipalId,
        f: impl FnOnce(&mut Principal),
    ) -> Result<(), StakeError> {
        if *caller != self.owner {
            return Err(StakeError::NotOwner("update stakes"));
        }
        let mut state = self.state.write();
        let current = state
            .principals
            .get(id)
            .cloned()
            .ok_or_else(|| StakeError::PrincipalNotFound(id.to_string()))?;
        let mut updated = current.clone();
        f(&mut updated);
        let total = (state.total_stake - current.stake)
            .checked_add(updated.stake)
            .ok_or(StakeError::Overflow)?;
        state.principals.insert(id.clone(), updated);
        state.total_stake = total;
        Ok(())
    }
}
