//! Structured events emitted by every mutating operation.
//!
//! Each call produces exactly one [`ProtocolEvent`], whether it committed or
//! was rejected, so dashboards and adapters see a complete audit stream.

use crate::error::{Classify, ErrorKind};
use crate::principal::PrincipalId;
use crate::time::Timestamp;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Which operation produced an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    // Stake ledger
    PrincipalRegistered,
    StakeUpdated,
    // Guardian registry
    GuardianAdded,
    GuardianRemoved,
    QuorumUpdated,
    // Seal ledger
    SealCreated,
    SealSigned,
    SealExecuted,
    // Forensic guard
    FailedTransactionReported,
    ForensicApprovalGranted,
    ForensicSwitchActivated,
    ForensicSwitchDeactivated,
    ResourceRedirected,
    EmergencyWithdrawal,
    ReserveDeposited,
    BackupRegistered,
    BackupRemoved,
    ConfigUpdated,
    // Anchor ledger
    MilestoneCreated,
    MilestoneSealed,
    AnchorCreated,
    AnchorLinked,
    SealerUpdated,
    CovenantUpdated,
    // Governance
    ProposalCreated,
    VoteCast,
    ProposalExecuted,
    ProposalCancelled,
    // Veto
    VetoInvoked,
    VetoOverridden,
}

impl EventKind {
    pub const ALL: [EventKind; 30] = [
        Self::PrincipalRegistered,
        Self::StakeUpdated,
        Self::GuardianAdded,
        Self::GuardianRemoved,
        Self::QuorumUpdated,
        Self::SealCreated,
        Self::SealSigned,
        Self::SealExecuted,
        Self::FailedTransactionReported,
        Self::ForensicApprovalGranted,
        Self::ForensicSwitchActivated,
        Self::ForensicSwitchDeactivated,
        Self::ResourceRedirected,
        Self::EmergencyWithdrawal,
        Self::ReserveDeposited,
        Self::BackupRegistered,
        Self::BackupRemoved,
        Self::ConfigUpdated,
        Self::MilestoneCreated,
        Self::MilestoneSealed,
        Self::AnchorCreated,
        Self::AnchorLinked,
        Self::SealerUpdated,
        Self::CovenantUpdated,
        Self::ProposalCreated,
        Self::VoteCast,
        Self::ProposalExecuted,
        Self::ProposalCancelled,
        Self::VetoInvoked,
        Self::VetoOverridden,
    ];

    /// Operation name as relayed to external consumers.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PrincipalRegistered => "PrincipalRegistered",
            Self::StakeUpdated => "StakeUpdated",
            Self::GuardianAdded => "GuardianAdded",
            Self::GuardianRemoved => "GuardianRemoved",
            Self::QuorumUpdated => "QuorumUpdated",
            Self::SealCreated => "SealCreated",
            Self::SealSigned => "SealSigned",
            Self::SealExecuted => "SealExecuted",
            Self::FailedTransactionReported => "FailedTransactionReported",
            Self::ForensicApprovalGranted => "ForensicApprovalGranted",
            Self::ForensicSwitchActivated => "ForensicSwitchActivated",
            Self::ForensicSwitchDeactivated => "ForensicSwitchDeactivated",
            Self::ResourceRedirected => "ResourceRedirected",
            Self::EmergencyWithdrawal => "EmergencyWithdrawal",
            Self::ReserveDeposited => "ReserveDeposited",
            Self::BackupRegistered => "BackupRegistered",
            Self::BackupRemoved => "BackupRemoved",
            Self::ConfigUpdated => "ConfigUpdated",
            Self::MilestoneCreated => "MilestoneCreated",
            Self::MilestoneSealed => "MilestoneSealed",
            Self::AnchorCreated => "AnchorCreated",
            Self::AnchorLinked => "AnchorLinked",
            Self::SealerUpdated => "SealerUpdated",
            Self::CovenantUpdated => "CovenantUpdated",
            Self::ProposalCreated => "ProposalCreated",
            Self::VoteCast => "VoteCast",
            Self::ProposalExecuted => "ProposalExecuted",
            Self::ProposalCancelled => "ProposalCancelled",
            Self::VetoInvoked => "VetoInvoked",
            Self::VetoOverridden => "VetoOverridden",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether the operation committed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Committed,
    Rejected { kind: ErrorKind, reason: String },
}

impl Outcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed)
    }
}

/// One structured notification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolEvent {
    pub kind: EventKind,
    /// Affected entity ids (hex hashes or principal ids).
    pub entities: Vec<String>,
    pub actor: PrincipalId,
    pub outcome: Outcome,
    pub timestamp: Timestamp,
}

type Listener = Arc<dyn Fn(&ProtocolEvent) + Send + Sync>;

/// Synchronous fan-out event bus.
///
/// Listeners are invoked inline on the emitting thread after the emitting
/// component has released its lock; keep handlers fast.
pub struct EventBus {
    listeners: RwLock<Vec<Listener>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, listener: impl Fn(&ProtocolEvent) + Send + Sync + 'static) {
        self.listeners.write().push(Arc::new(listener));
    }

    pub fn emit(&self, event: &ProtocolEvent) {
        match &event.outcome {
            Outcome::Committed => tracing::info!(
                op = event.kind.name(),
                actor = %event.actor,
                entities = ?event.entities,
                "operation committed"
            ),
            Outcome::Rejected { kind, reason } => tracing::warn!(
                op = event.kind.name(),
                actor = %event.actor,
                entities = ?event.entities,
                error_kind = %kind,
                reason = %reason,
                "operation rejected"
            ),
        }
        let listeners: Vec<Listener> = self.listeners.read().clone();
        for listener in &listeners {
            listener(event);
        }
    }

    /// Emit the event describing the result of one operation.
    pub fn record<T, E>(
        &self,
        kind: EventKind,
        actor: &PrincipalId,
        entities: Vec<String>,
        result: &Result<T, E>,
        timestamp: Timestamp,
    ) where
        E: Classify + fmt::Display,
    {
        let outcome = match result {
            Ok(_) => Outcome::Committed,
            Err(e) => Outcome::Rejected {
                kind: e.kind(),
                reason: e.to_string(),
            },
        };
        self.emit(&ProtocolEvent {
            kind,
            entities,
            actor: actor.clone(),
            outcome,
            timestamp,
        });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashSet;

    #[test]
    fn all_kinds_have_distinct_names() {
        let names: HashSet<&str> = EventKind::ALL.iter().map(|k| k.name()).collect();
        assert_eq!(names.len(), EventKind::ALL.len());
    }

    #[derive(Debug)]
    struct Denied;

    impl fmt::Display for Denied {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("denied")
        }
    }

    impl Classify for Denied {
        fn kind(&self) -> ErrorKind {
            ErrorKind::Authorization
        }
    }

    #[test]
    fn record_fans_out_to_all_listeners() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for _ in 0..2 {
            let seen = seen.clone();
            bus.subscribe(move |e| seen.lock().push(e.clone()));
        }

        let ok: Result<(), Denied> = Ok(());
        bus.record(
            EventKind::GuardianAdded,
            &PrincipalId::new("owner"),
            vec!["g1".into()],
            &ok,
            Timestamp::new(7),
        );

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].kind, EventKind::GuardianAdded);
        assert!(seen[0].outcome.is_committed());
        assert_eq!(seen[0].timestamp, Timestamp::new(7));
    }

    #[test]
    fn rejected_outcome_carries_kind_and_reason() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        bus.subscribe(move |e| sink.lock().push(e.outcome.clone()));

        let err: Result<(), Denied> = Err(Denied);
        bus.record(
            EventKind::SealSigned,
            &PrincipalId::new("mallory"),
            vec![],
            &err,
            Timestamp::EPOCH,
        );

        assert_eq!(
            seen.lock()[0],
            Outcome::Rejected {
                kind: ErrorKind::Authorization,
                reason: "denied".into()
            }
        );
    }

    #[test]
    fn listener_may_subscribe_during_emit() {
        let bus = Arc::new(EventBus::new());
        let inner = bus.clone();
        bus.subscribe(move |_| inner.subscribe(|_| {}));
        let ok: Result<(), Denied> = Ok(());
        bus.record(
            EventKind::VoteCast,
            &PrincipalId::new("a"),
            vec![],
            &ok,
            Timestamp::EPOCH,
        );
        assert_eq!(bus.listeners.read().len(), 2);
    }
}
