//! The guardian registry.

use crate::error::RegistryError;
use crate::params::QuorumParams;
use citadel_types::{Clock, EventBus, EventKind, PrincipalId, Timestamp};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// A guardian record. Removal is logical: the record stays with
/// `active = false` and can be re-activated later.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guardian {
    pub principal: PrincipalId,
    pub active: bool,
    pub added_at: Timestamp,
    pub removed_at: Option<Timestamp>,
}

struct RegistryState {
    guardians: BTreeMap<PrincipalId, Guardian>,
    active: BTreeSet<PrincipalId>,
    required_approvals: usize,
    quorum: QuorumParams,
}

impl RegistryState {
    /// The lowest active count the registry may ever reach.
    fn floor(&self) -> usize {
        self.required_approvals.max(self.quorum.min_signatures)
    }
}

/// The authorized-guardian set and the thresholds derived from it.
pub struct GuardianRegistry {
    owner: PrincipalId,
    state: RwLock<RegistryState>,
    clock: Arc<dyn Clock>,
    events: Arc<EventBus>,
}

impl GuardianRegistry {
    /// Create a registry with an initial guardian set.
    ///
    /// Fails if the set has duplicates or invalid ids, or if the thresholds
    /// cannot be met by the initial set.
    pub fn new(
        owner: PrincipalId,
        guardians: Vec<PrincipalId>,
        required_approvals: usize,
        quorum: QuorumParams,
        clock: Arc<dyn Clock>,
        events: Arc<EventBus>,
    ) -> Result<Self, RegistryError> {
        let now = clock.now();
        let mut records = BTreeMap::new();
        let mut active = BTreeSet::new();
        for principal in guardians {
            if !principal.is_valid() {
                return Err(RegistryError::InvalidPrincipal(principal.to_string()));
            }
            if !active.insert(principal.clone()) {
                return Err(RegistryError::DuplicateGuardian(principal.to_string()));
            }
            records.insert(
                principal.clone(),
                Guardian {
                    principal,
                    active: true,
                    added_at: now,
                    removed_at: None,
                },
            );
        }
        validate_required_approvals(required_approvals, active.len())?;
        validate_quorum(&quorum, active.len())?;

        Ok(Self {
            owner,
            state: RwLock::new(RegistryState {
                guardians: records,
                active,
                required_approvals,
                quorum,
            }),
            clock,
            events,
        })
    }

    pub fn owner(&self) -> &PrincipalId {
        &self.owner
    }

    /// Add (or re-activate) a guardian.
    pub fn add_guardian(
        &self,
        caller: &PrincipalId,
        principal: &PrincipalId,
    ) -> Result<(), RegistryError> {
        let now = self.clock.now();
        let result = self.apply_add(caller, principal, now);
        self.events.record(
            EventKind::GuardianAdded,
            caller,
            vec![principal.to_string()],
            &result,
            now,
        );
        result
    }

    /// Deactivate a guardian, refusing if the active set would fall below
    /// `max(required_approvals, min_signatures)`.
    pub fn remove_guardian(
        &self,
        caller: &PrincipalId,
        principal: &PrincipalId,
    ) -> Result<(), RegistryError> {
        let now = self.clock.now();
        let result = self.apply_remove(caller, principal, now);
        self.events.record(
            EventKind::GuardianRemoved,
            caller,
            vec![principal.to_string()],
            &result,
            now,
        );
        result
    }

    /// Approvals the forensic switch needs to activate.
    pub fn set_required_approvals(
        &self,
        caller: &PrincipalId,
        required: usize,
    ) -> Result<(), RegistryError> {
        let now = self.clock.now();
        let result = (|| -> Result<(), RegistryError> {
            self.ensure_owner(caller, "set required approvals")?;
            let mut state = self.state.write();
            validate_required_approvals(required, state.active.len())?;
            state.required_approvals = required;
            tracing::info!(required, "required approvals updated");
            Ok(())
        })();
        self.events.record(
            EventKind::QuorumUpdated,
            caller,
            vec![format!("required_approvals={required}")],
            &result,
            now,
        );
        result
    }

    /// Replace the seal quorum policy.
    pub fn set_quorum_requirements(
        &self,
        caller: &PrincipalId,
        percent: u8,
        min_signatures: usize,
    ) -> Result<(), RegistryError> {
        let now = self.clock.now();
        let params = QuorumParams::new(percent, min_signatures);
        let result = (|| -> Result<(), RegistryError> {
            self.ensure_owner(caller, "set quorum requirements")?;
            let mut state = self.state.write();
            validate_quorum(&params, state.active.len())?;
            state.quorum = params;
            tracing::info!(percent, min_signatures, "quorum requirements updated");
            Ok(())
        })();
        self.events.record(
            EventKind::QuorumUpdated,
            caller,
            vec![format!("quorum={percent}%/min{min_signatures}")],
            &result,
            now,
        );
        result
    }

    pub fn is_guardian(&self, principal: &PrincipalId) -> bool {
        self.state.read().active.contains(principal)
    }

    pub fn guardian(&self, principal: &PrincipalId) -> Option<Guardian> {
        self.state.read().guardians.get(principal).cloned()
    }

    pub fn active_count(&self) -> usize {
        self.state.read().active.len()
    }

    /// Active guardians in a stable (sorted) order.
    pub fn active_guardians(&self) -> Vec<PrincipalId> {
        self.state.read().active.iter().cloned().collect()
    }

    pub fn required_approvals(&self) -> usize {
        self.state.read().required_approvals
    }

    pub fn quorum_requirements(&self) -> QuorumParams {
        self.state.read().quorum
    }

    /// `max(ceil(percent × active / 100), min_signatures)` right now.
    pub fn required_signatures(&self) -> usize {
        let state = self.state.read();
        state.quorum.required_signatures(state.active.len())
    }

    fn ensure_owner(&self, caller: &PrincipalId, action: &'static str) -> Result<(), RegistryError> {
        if *caller != self.owner {
            return Err(RegistryError::NotOwner(action));
        }
        Ok(())
    }

    fn apply_add(
        &self,
        caller: &PrincipalId,
        principal: &PrincipalId,
        now: Timestamp,
    ) -> Result<(), RegistryError> {
        self.ensure_owner(caller, "add guardians")?;
        if !principal.is_valid() {
            return Err(RegistryError::InvalidPrincipal(principal.to_string()));
        }
        let mut state = self.state.write();
        if state.active.contains(principal) {
            return Err(RegistryError::AlreadyActive(principal.to_string()));
        }
        let record = state
            .guardians
            .entry(principal.clone())
            .or_insert_with(|| Guardian {
                principal: principal.clone(),
                active: false,
                added_at: now,
                removed_at: None,
            });
        record.active = true;
        record.added_at = now;
        record.removed_at = None;
        state.active.insert(principal.clone());
        tracing::info!(guardian = %principal, active = state.active.len(), "guardian added");
        Ok(())
    }

    fn apply_remove(
        &self,
        caller: &PrincipalId,
        principal: &PrincipalId,
        now: Timestamp,
    ) -> Result<(), RegistryError> {
        self.ensure_owner(caller, "remove guardians")?;
        let mut state = self.state.write();
        if !state.active.contains(principal) {
            return Err(RegistryError::NotActive(principal.to_string()));
        }
        let remaining = state.active.len() - 1;
        let floor = state.floor();
        if remaining < floor {
            return Err(RegistryError::BelowFloor { remaining, floor });
        }
        state.active.remove(principal);
        if let Some(record) = state.guardians.get_mut(principal) {
            record.active = false;
            record.removed_at = Some(now);
        }
        tracing::info!(guardian = %principal, active = remaining, "guardian removed");
        Ok(())
    }
}

fn validate_required_approvals(requested: usize, active: usize) -> Result<(), RegistryError> {
    if requested == 0 || requested > active {
        return Err(RegistryError::InvalidRequiredApprovals { requested, active });
    }
    Ok(())
}

fn validate_quorum(params: &QuorumParams, active: usize) -> Result<(), RegistryError> {
    if params.percent == 0 || params.percent > 100 {
        return Err(RegistryError::InvalidQuorumPercent(params.percent));
    }
    if params.min_signatures == 0 || params.min_signatures > active {
        return Err(RegistryError::InvalidMinSignatures {
            requested: params.min_signatures,
            active,
        });
    }
    Ok(())
}
