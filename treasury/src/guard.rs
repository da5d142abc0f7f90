//! The forensic guard.

use crate::distribution::split_evenly;
use crate::error::ForensicError;
use crate::params::{ForensicParams, MIN_BACKUPS};
use crate::state::{BackupPrincipal, ForensicState};
use citadel_quorum::GuardianRegistry;
use citadel_types::{Clock, EventBus, EventKind, PrincipalId, Timestamp};
use citadel_veto::EmergencyVeto;
use parking_lot::RwLock;
use std::sync::Arc;

struct TreasuryState {
    forensic: ForensicState,
    params: ForensicParams,
    protected_balance: u128,
    /// Registration order; removal is logical.
    backups: Vec<BackupPrincipal>,
}

impl TreasuryState {
    fn active_backups(&self) -> Vec<PrincipalId> {
        self.backups
            .iter()
            .filter(|b| b.active)
            .map(|b| b.principal.clone())
            .collect()
    }

    fn backup_mut(&mut self, principal: &PrincipalId) -> Option<&mut BackupPrincipal> {
        self.backups
            .iter_mut()
            .find(|b| b.active && b.principal == *principal)
    }
}

/// Failure detection, forensic switch and reserve protection.
pub struct ForensicGuard {
    owner: PrincipalId,
    registry: Arc<GuardianRegistry>,
    veto: Arc<EmergencyVeto>,
    state: RwLock<TreasuryState>,
    clock: Arc<dyn Clock>,
    events: Arc<EventBus>,
}

impl ForensicGuard {
    pub fn new(
        owner: PrincipalId,
        params: ForensicParams,
        registry: Arc<GuardianRegistry>,
        veto: Arc<EmergencyVeto>,
        clock: Arc<dyn Clock>,
        events: Arc<EventBus>,
    ) -> Result<Self, ForensicError> {
        if params.block_detection_threshold == 0 {
            return Err(ForensicError::ZeroThreshold);
        }
        Ok(Self {
            owner,
            registry,
            veto,
            state: RwLock::new(TreasuryState {
                forensic: ForensicState::default(),
                params,
                protected_balance: 0,
                backups: Vec::new(),
            }),
            clock,
            events,
        })
    }

    // ── Forensic switch ─────────────────────────────────────────────────

    /// Count a failed transaction. Reaching the detection threshold grants
    /// one approval per active guardian and activates the switch when the
    /// approval count and cooldown allow.
    ///
    /// Returns whether this call activated the switch.
    pub fn report_failed_transaction(&self, caller: &PrincipalId) -> Result<bool, ForensicError> {
        let now = self.clock.now();
        let result = self.apply_report(caller, now);
        let kind = activation_kind(&result, EventKind::FailedTransactionReported);
        self.events.record(kind, caller, vec![], &result, now);
        result
    }

    /// Grant the caller's approval. Returns whether this call activated the switch.
    pub fn approve_forensic_switch(&self, caller: &PrincipalId) -> Result<bool, ForensicError> {
        let now = self.clock.now();
        let result = self.apply_approve(caller, now);
        let kind = activation_kind(&result, EventKind::ForensicApprovalGranted);
        self.events
            .record(kind, caller, vec![caller.to_string()], &result, now);
        result
    }

    /// Activate using approvals gathered while the cooldown was running.
    pub fn activate_forensic_switch(&self, caller: &PrincipalId) -> Result<(), ForensicError> {
        let now = self.clock.now();
        let result = (|| -> Result<(), ForensicError> {
            self.veto.ensure_operations_allowed()?;
            self.ensure_guardian(caller)?;
            let mut state = self.state.write();
            self.check_activation(&state, now)?;
            self.activate(&mut state, now);
            Ok(())
        })();
        self.events
            .record(EventKind::ForensicSwitchActivated, caller, vec![], &result, now);
        result
    }

    /// Owner-only: return to INACTIVE, clearing approvals and the failure count.
    pub fn deactivate_forensic_switch(&self, caller: &PrincipalId) -> Result<(), ForensicError> {
        let now = self.clock.now();
        let result = (|| -> Result<(), ForensicError> {
            self.veto.ensure_operations_allowed()?;
            self.ensure_owner(caller, "deactivate the forensic switch")?;
            let mut state = self.state.write();
            if !state.forensic.active {
                return Err(ForensicError::NotActive);
            }
            state.forensic.reset(now);
            tracing::info!(owner = %caller, "forensic switch deactivated");
            Ok(())
        })();
        self.events
            .record(EventKind::ForensicSwitchDeactivated, caller, vec![], &result, now);
        result
    }

    /// Pure predicate: inactive, enough approvals, cooldown elapsed.
    pub fn can_activate_forensic_switch(&self) -> bool {
        let now = self.clock.now();
        let state = self.state.read();
        self.check_activation(&state, now).is_ok()
    }

    // ── Reserve ─────────────────────────────────────────────────────────

    /// Owner-only: add funds to the protected reserve.
    pub fn deposit(&self, caller: &PrincipalId, amount: u128) -> Result<(), ForensicError> {
        let now = self.clock.now();
        let result = (|| -> Result<(), ForensicError> {
            self.veto.ensure_operations_allowed()?;
            self.ensure_owner(caller, "deposit into the reserve")?;
            if amount == 0 {
                return Err(ForensicError::ZeroAmount);
            }
            let mut state = self.state.write();
            state.protected_balance = state
                .protected_balance
                .checked_add(amount)
                .ok_or(ForensicError::Overflow)?;
            Ok(())
        })();
        self.events.record(
            EventKind::ReserveDeposited,
            caller,
            vec![amount.to_string()],
            &result,
            now,
        );
        result
    }

    /// Move the entire protected balance to the backups (even split).
    ///
    /// Returns the amount credited to each backup.
    pub fn redirect_resources(
        &self,
        caller: &PrincipalId,
    ) -> Result<Vec<(PrincipalId, u128)>, ForensicError> {
        let now = self.clock.now();
        let result = self.apply_redirect(caller);
        let entities = match &result {
            Ok(split) => split.iter().map(|(p, _)| p.to_string()).collect(),
            Err(_) => vec![],
        };
        self.events
            .record(EventKind::ResourceRedirected, caller, entities, &result, now);
        result
    }

    /// Send `amount` from the reserve to one registered backup.
    pub fn emergency_withdraw(
        &self,
        caller: &PrincipalId,
        to: &PrincipalId,
        amount: u128,
    ) -> Result<(), ForensicError> {
        let now = self.clock.now();
        let result = self.apply_withdraw(caller, to, amount);
        self.events.record(
            EventKind::EmergencyWithdrawal,
            caller,
            vec![to.to_string()],
            &result,
            now,
        );
        result
    }

    // ── Configuration ───────────────────────────────────────────────────

    pub fn set_block_detection_threshold(
        &self,
        caller: &PrincipalId,
        threshold: u64,
    ) -> Result<(), ForensicError> {
        self.configure(caller, "block_detection_threshold", |params| {
            if threshold == 0 {
                return Err(ForensicError::ZeroThreshold);
            }
            params.block_detection_threshold = threshold;
            Ok(())
        })
    }

    pub fn set_reactivation_cooldown(
        &self,
        caller: &PrincipalId,
        secs: u64,
    ) -> Result<(), ForensicError> {
        self.configure(caller, "reactivation_cooldown_secs", |params| {
            params.reactivation_cooldown_secs = secs;
            Ok(())
        })
    }

    pub fn set_minimum_reserve(
        &self,
        caller: &PrincipalId,
        minimum: u64,
    ) -> Result<(), ForensicError> {
        self.configure(caller, "minimum_reserve", |params| {
            params.minimum_reserve = minimum;
            Ok(())
        })
    }

    /// Owner-only: register (or re-activate) a backup principal.
    pub fn add_backup(&self, caller: &PrincipalId, principal: &PrincipalId) -> Result<(), ForensicError> {
        let now = self.clock.now();
        let result = (|| -> Result<(), ForensicError> {
            self.veto.ensure_operations_allowed()?;
            self.ensure_owner(caller, "register backups")?;
            if !principal.is_valid() {
                return Err(ForensicError::InvalidPrincipal(principal.to_string()));
            }
            let mut state = self.state.write();
            match state.backups.iter().position(|b| b.principal == *principal) {
                Some(i) if state.backups[i].active => {
                    return Err(ForensicError::BackupAlreadyRegistered(principal.to_string()))
                }
                Some(i) => state.backups[i].active = true,
                None => state.backups.push(BackupPrincipal {
                    principal: principal.clone(),
                    active: true,
                    registered_at: now,
                    received: 0,
                }),
            }
            tracing::info!(backup = %principal, "backup principal registered");
            Ok(())
        })();
        self.events.record(
            EventKind::BackupRegistered,
            caller,
            vec![principal.to_string()],
            &result,
            now,
        );
        result
    }

    /// Owner-only: retire a backup. Once three backups exist the list may
    /// not shrink below three.
    pub fn remove_backup(
        &self,
        caller: &PrincipalId,
        principal: &PrincipalId,
    ) -> Result<(), ForensicError> {
        let now = self.clock.now();
        let result = (|| -> Result<(), ForensicError> {
            self.veto.ensure_operations_allowed()?;
            self.ensure_owner(caller, "remove backups")?;
            let mut state = self.state.write();
            let have = state.active_backups().len();
            let backup = state
                .backup_mut(principal)
                .ok_or_else(|| ForensicError::NotBackup(principal.to_string()))?;
            if have >= MIN_BACKUPS && have - 1 < MIN_BACKUPS {
                return Err(ForensicError::InsufficientBackups {
                    have: have - 1,
                    need: MIN_BACKUPS,
                });
            }
            backup.active = false;
            tracing::info!(backup = %principal, "backup principal removed");
            Ok(())
        })();
        self.events.record(
            EventKind::BackupRemoved,
            caller,
            vec![principal.to_string()],
            &result,
            now,
        );
        result
    }

    // ── Reads ───────────────────────────────────────────────────────────

    pub fn is_active(&self) -> bool {
        self.state.read().forensic.active
    }

    pub fn forensic_state(&self) -> ForensicState {
        self.state.read().forensic.clone()
    }

    pub fn params(&self) -> ForensicParams {
        self.state.read().params.clone()
    }

    pub fn protected_balance(&self) -> u128 {
        self.state.read().protected_balance
    }

    /// Whether the reserve is at or above the configured minimum.
    pub fn is_above_minimum(&self) -> bool {
        let state = self.state.read();
        state.protected_balance >= u128::from(state.params.minimum_reserve)
    }

    pub fn failed_transactions(&self) -> u64 {
        self.state.read().forensic.failed_transactions
    }

    /// Approvals held by currently active guardians.
    pub fn approval_count(&self) -> usize {
        self.effective_approvals(&self.state.read())
    }

    pub fn backups(&self) -> Vec<PrincipalId> {
        self.state.read().active_backups()
    }

    pub fn received_by(&self, backup: &PrincipalId) -> u128 {
        self.state
            .read()
            .backups
            .iter()
            .find(|b| b.principal == *backup)
            .map(|b| b.received)
            .unwrap_or(0)
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn ensure_guardian(&self, caller: &PrincipalId) -> Result<(), ForensicError> {
        if !self.registry.is_guardian(caller) {
            return Err(ForensicError::NotGuardian(caller.to_string()));
        }
        Ok(())
    }

    fn ensure_owner(&self, caller: &PrincipalId, action: &'static str) -> Result<(), ForensicError> {
        if *caller != self.owner {
            return Err(ForensicError::NotOwner(action));
        }
        Ok(())
    }

    fn effective_approvals(&self, state: &TreasuryState) -> usize {
        state
            .forensic
            .approvals
            .iter()
            .filter(|p| self.registry.is_guardian(p))
            .count()
    }

    fn check_activation(&self, state: &TreasuryState, now: Timestamp) -> Result<(), ForensicError> {
        if state.forensic.active {
            return Err(ForensicError::AlreadyActive);
        }
        let have = self.effective_approvals(state);
        let need = self.registry.required_approvals();
        if have < need {
            return Err(ForensicError::InsufficientApprovals { have, need });
        }
        let remaining_secs = state
            .forensic
            .cooldown_remaining(state.params.reactivation_cooldown_secs, now);
        if remaining_secs > 0 {
            return Err(ForensicError::CooldownActive { remaining_secs });
        }
        Ok(())
    }

    fn activate(&self, state: &mut TreasuryState, now: Timestamp) {
        state.forensic.active = true;
        state.forensic.last_activated_at = Some(now);
        tracing::warn!(
            approvals = state.forensic.approvals.len(),
            auto_approvals = state.forensic.auto_approvals.len(),
            failed_transactions = state.forensic.failed_transactions,
            "forensic switch activated"
        );
    }

    /// Activate if the predicate holds; otherwise leave the switch alone.
    fn try_activate(&self, state: &mut TreasuryState, now: Timestamp) -> bool {
        match self.check_activation(state, now) {
            Ok(()) => {
                self.activate(state, now);
                true
            }
            Err(reason) => {
                tracing::debug!(%reason, "forensic switch not activated");
                false
            }
        }
    }

    fn apply_report(&self, caller: &PrincipalId, now: Timestamp) -> Result<bool, ForensicError> {
        self.veto.ensure_operations_allowed()?;
        self.ensure_guardian(caller)?;
        let mut state = self.state.write();
        let count = state
            .forensic
            .failed_transactions
            .checked_add(1)
            .ok_or(ForensicError::Overflow)?;
        state.forensic.failed_transactions = count;
        tracing::info!(reporter = %caller, count, "failed transaction reported");

        if state.forensic.active || count < state.params.block_detection_threshold {
            return Ok(false);
        }
        for guardian in self.registry.active_guardians() {
            if state.forensic.approvals.insert(guardian.clone()) {
                tracing::warn!(
                    guardian = %guardian,
                    count,
                    "forensic approval auto-granted by failure threshold"
                );
                state.forensic.auto_approvals.insert(guardian);
            }
        }
        Ok(self.try_activate(&mut state, now))
    }

    fn apply_approve(&self, caller: &PrincipalId, now: Timestamp) -> Result<bool, ForensicError> {
        self.veto.ensure_operations_allowed()?;
        self.ensure_guardian(caller)?;
        let mut state = self.state.write();
        if state.forensic.active {
            return Err(ForensicError::AlreadyActive);
        }
        if !state.forensic.approvals.insert(caller.clone()) {
            return Err(ForensicError::AlreadyApproved(caller.to_string()));
        }
        tracing::info!(guardian = %caller, "forensic approval granted");
        Ok(self.try_activate(&mut state, now))
    }

    fn apply_redirect(
        &self,
        caller: &PrincipalId,
    ) -> Result<Vec<(PrincipalId, u128)>, ForensicError> {
        self.veto.ensure_operations_allowed()?;
        self.ensure_guardian(caller)?;
        let mut state = self.state.write();
        if !state.forensic.active {
            return Err(ForensicError::NotActive);
        }
        let backups = state.active_backups();
        if backups.len() < MIN_BACKUPS {
            return Err(ForensicError::InsufficientBackups {
                have: backups.len(),
                need: MIN_BACKUPS,
            });
        }
        let total = state.protected_balance;
        if total == 0 {
            return Err(ForensicError::EmptyReserve);
        }

        let split = split_evenly(total, &backups);
        // Validate every credit before touching any balance.
        let mut credited = Vec::with_capacity(split.len());
        for (principal, amount) in &split {
            let current = state
                .backups
                .iter()
                .find(|b| b.active && b.principal == *principal)
                .map(|b| b.received)
                .unwrap_or(0);
            credited.push(current.checked_add(*amount).ok_or(ForensicError::Overflow)?);
        }
        for ((principal, _), new_total) in split.iter().zip(credited) {
            if let Some(backup) = state.backup_mut(principal) {
                backup.received = new_total;
            }
        }
        state.protected_balance = 0;
        tracing::warn!(total, backups = split.len(), redirected_by = %caller, "reserve redirected to backups");
        Ok(split)
    }

    fn apply_withdraw(
        &self,
        caller: &PrincipalId,
        to: &PrincipalId,
        amount: u128,
    ) -> Result<(), ForensicError> {
        self.veto.ensure_operations_allowed()?;
        self.ensure_guardian(caller)?;
        if amount == 0 {
            return Err(ForensicError::ZeroAmount);
        }
        let mut state = self.state.write();
        if !state.forensic.active {
            return Err(ForensicError::NotActive);
        }
        let have = state.active_backups().len();
        if have < MIN_BACKUPS {
            return Err(ForensicError::InsufficientBackups {
                have,
                need: MIN_BACKUPS,
            });
        }
        let available = state.protected_balance;
        if amount > available {
            return Err(ForensicError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        let backup = state
            .backup_mut(to)
            .ok_or_else(|| ForensicError::NotBackup(to.to_string()))?;
        backup.received = backup
            .received
            .checked_add(amount)
            .ok_or(ForensicError::Overflow)?;
        state.protected_balance = available - amount;
        tracing::warn!(to = %to, amount, guardian = %caller, "emergency withdrawal");
        Ok(())
    }

    fn configure(
        &self,
        caller: &PrincipalId,
        field: &'static str,
        update: impl FnOnce(&mut ForensicParams) -> Result<(), ForensicError>,
    ) -> Result<(), ForensicError> {
        let now = self.clock.now();
        let result = (|| -> Result<(), ForensicError> {
            self.veto.ensure_operations_allowed()?;
            self.ensure_owner(caller, "configure the forensic guard")?;
            let mut state = self.state.write();
            let mut params = state.params.clone();
            update(&mut params)?;
            state.params = params;
            tracing::info!(field, "forensic guard configuration updated");
            Ok(())
        })();
        self.events
            .record(EventKind::ConfigUpdated, caller, vec![field.to_string()], &result, now);
        result
    }
}

/// Operations that may flip the switch report as an activation when they do.
fn activation_kind(result: &Result<bool, ForensicError>, otherwise: EventKind) -> EventKind {
    match result {
        Ok(true) => EventKind::ForensicSwitchActivated,
        _ => otherwise,
    }
}
