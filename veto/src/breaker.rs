//! The veto breaker.

use crate::error::VetoError;
use citadel_quorum::GuardianRegistry;
use citadel_types::{Clock, EventBus, EventKind, PrincipalId, Timestamp};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// How serious the initiating guardian judged the incident.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// Snapshot of the breaker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VetoState {
    pub operations_allowed: bool,
    pub severity: Option<Severity>,
    pub reason: Option<String>,
    /// Guardian that tripped the breaker, or the owner that last reset it.
    pub source: Option<PrincipalId>,
    pub changed_at: Option<Timestamp>,
}

impl Default for VetoState {
    fn default() -> Self {
        Self {
            operations_allowed: true,
            severity: None,
            reason: None,
            source: None,
            changed_at: None,
        }
    }
}

pub struct EmergencyVeto {
    owner: PrincipalId,
    registry: Arc<GuardianRegistry>,
    state: RwLock<VetoState>,
    clock: Arc<dyn Clock>,
    events: Arc<EventBus>,
}

impl EmergencyVeto {
    pub fn new(
        owner: PrincipalId,
        registry: Arc<GuardianRegistry>,
        clock: Arc<dyn Clock>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            owner,
            registry,
            state: RwLock::new(VetoState::default()),
            clock,
            events,
        }
    }

    /// Halt all guarded operations.
    pub fn initiate_veto(
        &self,
        caller: &PrincipalId,
        severity: Severity,
        reason: &str,
    ) -> Result<(), VetoError> {
        let now = self.clock.now();
        let result = self.apply_initiate(caller, severity, reason, now);
        self.events.record(
            EventKind::VetoInvoked,
            caller,
            vec![severity.to_string()],
            &result,
            now,
        );
        result
    }

    /// Owner-only reset, regardless of which guardian tripped the breaker.
    pub fn emergency_override(&self, caller: &PrincipalId, reason: &str) -> Result<(), VetoError> {
        let now = self.clock.now();
        let result = self.apply_override(caller, reason, now);
        self.events
            .record(EventKind::VetoOverridden, caller, vec![], &result, now);
        result
    }

    pub fn operations_allowed(&self) -> bool {
        self.state.read().operations_allowed
    }

    /// Gate for guarded operations; call before any other validation.
    pub fn ensure_operations_allowed(&self) -> Result<(), VetoError> {
        let state = self.state.read();
        if state.operations_allowed {
            return Ok(());
        }
        Err(VetoError::OperationsHalted {
            reason: state.reason.clone().unwrap_or_default(),
        })
    }

    pub fn state(&self) -> VetoState {
        self.state.read().clone()
    }

    fn apply_initiate(
        &self,
        caller: &PrincipalId,
        severity: Severity,
        reason: &str,
        now: Timestamp,
    ) -> Result<(), VetoError> {
        if !self.registry.is_guardian(caller) {
            return Err(VetoError::NotGuardian(caller.to_string()));
        }
        if reason.trim().is_empty() {
            return Err(VetoError::MissingReason);
        }
        let mut state = self.state.write();
        if !state.operations_allowed {
            return Err(VetoError::AlreadyVetoed);
        }
        *state = VetoState {
            operations_allowed: false,
            severity: Some(severity),
            reason: Some(reason.to_string()),
            source: Some(caller.clone()),
            changed_at: Some(now),
        };
        tracing::warn!(guardian = %caller, %severity, reason, "emergency veto invoked");
        Ok(())
    }

    fn apply_override(
        &self,
        caller: &PrincipalId,
        reason: &str,
        now: Timestamp,
    ) -> Result<(), VetoError> {
        if *caller != self.owner {
            return Err(VetoError::NotOwner);
        }
        if reason.trim().is_empty() {
            return Err(VetoError::MissingReason);
        }
        let mut state = self.state.write();
        if state.operations_allowed {
            return Err(VetoError::NotVetoed);
        }
        let vetoed_by = state.source.clone();
        *state = VetoState {
            operations_allowed: true,
            severity: None,
            reason: Some(reason.to_string()),
            source: Some(caller.clone()),
            changed_at: Some(now),
        };
        tracing::warn!(owner = %caller, vetoed_by = ?vetoed_by, reason, "emergency veto overridden");
        Ok(())
    }
}
