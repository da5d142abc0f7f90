//! The quorum seal ledger.

use crate::error::SealError;
use crate::registry::GuardianRegistry;
use citadel_types::{Clock, EntityHash, EventBus, EventKind, PrincipalId, Timestamp};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// A recorded, multiply-signed authorization for an action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seal {
    pub id: EntityHash,
    pub action_hash: EntityHash,
    pub metadata: String,
    pub creator: PrincipalId,
    /// Signers in signing order; the creator is always first.
    pub signers: Vec<PrincipalId>,
    /// Signatures the quorum policy demanded when the seal was created.
    /// Informational only: execution re-evaluates the policy.
    pub quorum_snapshot: usize,
    pub executed: bool,
    pub created_at: Timestamp,
    pub executed_at: Option<Timestamp>,
}

impl Seal {
    pub fn signer_count(&self) -> usize {
        self.signers.len()
    }

    pub fn has_signed(&self, principal: &PrincipalId) -> bool {
        self.signers.contains(principal)
    }
}

/// Seals keyed by `seal_id(action_hash, metadata)`.
pub struct SealLedger {
    registry: Arc<GuardianRegistry>,
    seals: RwLock<HashMap<EntityHash, Seal>>,
    clock: Arc<dyn Clock>,
    events: Arc<EventBus>,
}

impl SealLedger {
    pub fn new(registry: Arc<GuardianRegistry>, clock: Arc<dyn Clock>, events: Arc<EventBus>) -> Self {
        Self {
            registry,
            seals: RwLock::new(HashMap::new()),
            clock,
            events,
        }
    }

    /// Open a seal for `action_hash`, signed by its creator.
    pub fn create_seal(
        &self,
        caller: &PrincipalId,
        action_hash: EntityHash,
        metadata: impl Into<String>,
    ) -> Result<EntityHash, SealError> {
        let now = self.clock.now();
        let metadata = metadata.into();
        let id = citadel_crypto::seal_id(&action_hash, &metadata);
        let result = self.apply_create(caller, id, action_hash, metadata, now);
        self.events
            .record(EventKind::SealCreated, caller, vec![id.to_hex()], &result, now);
        result
    }

    /// Add the caller's signature.
    pub fn sign_seal(&self, caller: &PrincipalId, id: &EntityHash) -> Result<(), SealError> {
        let now = self.clock.now();
        let result = self.apply_sign(caller, id);
        self.events
            .record(EventKind::SealSigned, caller, vec![id.to_hex()], &result, now);
        result
    }

    /// Execute a seal that has reached quorum. A seal executes at most once.
    pub fn execute_seal(&self, caller: &PrincipalId, id: &EntityHash) -> Result<(), SealError> {
        let now = self.clock.now();
        let result = self.apply_execute(caller, id, now);
        self.events
            .record(EventKind::SealExecuted, caller, vec![id.to_hex()], &result, now);
        result
    }

    /// Whether the seal currently has enough signatures.
    pub fn has_quorum(&self, id: &EntityHash) -> Result<bool, SealError> {
        let seals = self.seals.read();
        let seal = seals
            .get(id)
            .ok_or_else(|| SealError::SealNotFound(id.to_hex()))?;
        Ok(seal.signer_count() >= self.registry.required_signatures())
    }

    /// True iff the seal exists and has been executed.
    pub fn verify_seal(&self, id: &EntityHash) -> bool {
        self.seals.read().get(id).is_some_and(|s| s.executed)
    }

    pub fn seal(&self, id: &EntityHash) -> Option<Seal> {
        self.seals.read().get(id).cloned()
    }

    pub fn seal_count(&self) -> usize {
        self.seals.read().len()
    }

    /// Serialize every seal for persistence.
    pub fn snapshot(&self) -> Result<Vec<u8>, SealError> {
        let seals = self.seals.read();
        let mut all: Vec<&Seal> = seals.values().collect();
        all.sort_by_key(|s| s.id);
        bincode::serialize(&all).map_err(|e| SealError::Snapshot(e.to_string()))
    }

    /// Rebuild a ledger from [`SealLedger::snapshot`] output.
    pub fn restore(
        registry: Arc<GuardianRegistry>,
        clock: Arc<dyn Clock>,
        events: Arc<EventBus>,
        bytes: &[u8],
    ) -> Result<Self, SealError> {
        let all: Vec<Seal> =
            bincode::deserialize(bytes).map_err(|e| SealError::Snapshot(e.to_string()))?;
        let mut seals = HashMap::with_capacity(all.len());
        for seal in all {
            if citadel_crypto::seal_id(&seal.action_hash, &seal.metadata) != seal.id {
                return Err(SealError::Snapshot(format!("seal {} has a foreign id", seal.id)));
            }
            seals.insert(seal.id, seal);
        }
        Ok(Self {
            registry,
            seals: RwLock::new(seals),
            clock,
            events,
        })
    }

    fn ensure_guardian(&self, caller: &PrincipalId) -> Result<(), SealError> {
        if !self.registry.is_guardian(caller) {
            return Err(SealError::NotGuardian(caller.to_string()));
        }
        Ok(())
    }

    fn apply_create(
        &self,
        caller: &PrincipalId,
        id: EntityHash,
        action_hash: EntityHash,
        metadata: String,
        now: Timestamp,
    ) -> Result<EntityHash, SealError> {
        self.ensure_guardian(caller)?;
        if action_hash.is_zero() {
            return Err(SealError::ZeroActionHash);
        }
        let mut seals = self.seals.write();
        if seals.contains_key(&id) {
            return Err(SealError::DuplicateSeal(id.to_hex()));
        }
        let quorum_snapshot = self.registry.required_signatures();
        seals.insert(
            id,
            Seal {
                id,
                action_hash,
                metadata,
                creator: caller.clone(),
                signers: vec![caller.clone()],
                quorum_snapshot,
                executed: false,
                created_at: now,
                executed_at: None,
            },
        );
        tracing::info!(seal = %id, creator = %caller, quorum_snapshot, "seal created");
        Ok(id)
    }

    fn apply_sign(&self, caller: &PrincipalId, id: &EntityHash) -> Result<(), SealError> {
        self.ensure_guardian(caller)?;
        let mut seals = self.seals.write();
        let seal = seals
            .get_mut(id)
            .ok_or_else(|| SealError::SealNotFound(id.to_hex()))?;
        if seal.executed {
            return Err(SealError::AlreadyExecuted(id.to_hex()));
        }
        if seal.has_signed(caller) {
            return Err(SealError::AlreadySigned {
                seal: id.to_hex(),
                signer: caller.to_string(),
            });
        }
        seal.signers.push(caller.clone());
        tracing::debug!(seal = %id, signer = %caller, signatures = seal.signer_count(), "seal signed");
        Ok(())
    }

    fn apply_execute(
        &self,
        caller: &PrincipalId,
        id: &EntityHash,
        now: Timestamp,
    ) -> Result<(), SealError> {
        self.ensure_guardian(caller)?;
        let mut seals = self.seals.write();
        let seal = seals
            .get_mut(id)
            .ok_or_else(|| SealError::SealNotFound(id.to_hex()))?;
        if seal.executed {
            return Err(SealError::AlreadyExecuted(id.to_hex()));
        }
        let need = self.registry.required_signatures();
        let have = seal.signer_count();
        if have < need {
            return Err(SealError::QuorumNotReached { have, need });
        }
        seal.executed = true;
        seal.executed_at = Some(now);
        tracing::info!(seal = %id, signatures = have, required = need, "seal executed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::QuorumParams;
    use citadel_nullables::{EventRecorder, NullClock};
    use citadel_types::{Classify, ErrorKind};

    fn pid(s: &str) -> PrincipalId {
        PrincipalId::new(s)
    }

    fn action(n: u8) -> EntityHash {
        EntityHash::new([n; 32])
    }

    struct Fixture {
        registry: Arc<GuardianRegistry>,
        ledger: SealLedger,
        recorder: EventRecorder,
    }

    fn fixture(guardians: &[&str], percent: u8, min_signatures: usize) -> Fixture {
        let bus = Arc::new(EventBus::new());
        let clock: Arc<dyn Clock> = Arc::new(NullClock::new(1_000));
        let registry = Arc::new(
            GuardianRegistry::new(
                pid("owner"),
                guardians.iter().map(|g| pid(g)).collect(),
                1,
                QuorumParams::new(percent, min_signatures),
                clock.clone(),
                bus.clone(),
            )
            .unwrap(),
        );
        let recorder = EventRecorder::attach(&bus);
        let ledger = SealLedger::new(registry.clone(), clock, bus);
        Fixture {
            registry,
            ledger,
            recorder,
        }
    }

    #[test]
    fn three_guardians_majority_seal_executes_once() {
        let f = fixture(&["g1", "g2", "g3"], 51, 2);
        let id = f.ledger.create_seal(&pid("g1"), action(1), "rotate keys").unwrap();
        assert_eq!(f.ledger.seal(&id).unwrap().signer_count(), 1);
        assert!(!f.ledger.has_quorum(&id).unwrap());

        f.ledger.sign_seal(&pid("g2"), &id).unwrap();
        assert!(f.ledger.has_quorum(&id).unwrap());

        f.ledger.execute_seal(&pid("g3"), &id).unwrap();
        assert!(f.ledger.verify_seal(&id));
        assert!(matches!(
            f.ledger.execute_seal(&pid("g1"), &id),
            Err(SealError::AlreadyExecuted(_))
        ));
    }

    #[test]
    fn creator_is_auto_signed() {
        let f = fixture(&["g1", "g2"], 51, 1);
        let id = f.ledger.create_seal(&pid("g1"), action(2), "").unwrap();
        let err = f.ledger.sign_seal(&pid("g1"), &id).unwrap_err();
        assert!(matches!(err, SealError::AlreadySigned { .. }));
        assert_eq!(err.kind(), ErrorKind::StateConflict);
    }

    #[test]
    fn non_guardians_cannot_touch_seals() {
        let f = fixture(&["g1", "g2"], 51, 1);
        let err = f
            .ledger
            .create_seal(&pid("mallory"), action(3), "")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
        let id = f.ledger.create_seal(&pid("g1"), action(3), "").unwrap();
        assert!(f.ledger.sign_seal(&pid("mallory"), &id).is_err());
        assert!(f.ledger.execute_seal(&pid("mallory"), &id).is_err());
    }

    #[test]
    fn zero_action_hash_rejected() {
        let f = fixture(&["g1"], 51, 1);
        let err = f
            .ledger
            .create_seal(&pid("g1"), EntityHash::ZERO, "")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(f.ledger.seal_count(), 0);
    }

    #[test]
    fn recreating_same_seal_is_rejected_without_change() {
        let f = fixture(&["g1", "g2"], 51, 2);
        let id = f.ledger.create_seal(&pid("g1"), action(4), "m").unwrap();
        let err = f.ledger.create_seal(&pid("g2"), action(4), "m").unwrap_err();
        assert!(matches!(err, SealError::DuplicateSeal(_)));
        let seal = f.ledger.seal(&id).unwrap();
        assert_eq!(seal.signers, vec![pid("g1")]);
        assert_eq!(seal.creator, pid("g1"));
    }

    #[test]
    fn execution_without_quorum_rejected() {
        let f = fixture(&["g1", "g2", "g3"], 100, 1);
        let id = f.ledger.create_seal(&pid("g1"), action(5), "").unwrap();
        f.ledger.sign_seal(&pid("g2"), &id).unwrap();
        assert!(matches!(
            f.ledger.execute_seal(&pid("g1"), &id),
            Err(SealError::QuorumNotReached { have: 2, need: 3 })
        ));
        assert!(!f.ledger.verify_seal(&id));
    }

    #[test]
    fn quorum_is_evaluated_at_execution_time() {
        let f = fixture(&["g1", "g2", "g3"], 51, 1);
        let id = f.ledger.create_seal(&pid("g1"), action(6), "").unwrap();
        f.ledger.sign_seal(&pid("g2"), &id).unwrap();
        assert_eq!(f.ledger.seal(&id).unwrap().quorum_snapshot, 2);

        // Growing the guardian set raises the bar after signing.
        for g in ["g4", "g5", "g6"] {
            f.registry.add_guardian(&pid("owner"), &pid(g)).unwrap();
        }
        assert!(!f.ledger.has_quorum(&id).unwrap());
        assert!(f.ledger.execute_seal(&pid("g1"), &id).is_err());

        // ceil(0.51 * 6) = 4
        f.ledger.sign_seal(&pid("g4"), &id).unwrap();
        f.ledger.sign_seal(&pid("g5"), &id).unwrap();
        f.ledger.execute_seal(&pid("g1"), &id).unwrap();
    }

    #[test]
    fn executed_seal_is_frozen() {
        let f = fixture(&["g1", "g2"], 50, 1);
        let id = f.ledger.create_seal(&pid("g1"), action(7), "").unwrap();
        f.ledger.execute_seal(&pid("g1"), &id).unwrap();
        assert!(matches!(
            f.ledger.sign_seal(&pid("g2"), &id),
            Err(SealError::AlreadyExecuted(_))
        ));
        assert_eq!(f.ledger.seal(&id).unwrap().signer_count(), 1);
    }

    #[test]
    fn verify_unknown_seal_is_false() {
        let f = fixture(&["g1"], 51, 1);
        assert!(!f.ledger.verify_seal(&action(9)));
        assert!(matches!(
            f.ledger.has_quorum(&action(9)),
            Err(SealError::SealNotFound(_))
        ));
    }

    #[test]
    fn each_call_emits_one_event() {
        let f = fixture(&["g1", "g2"], 51, 2);
        let id = f.ledger.create_seal(&pid("g1"), action(8), "").unwrap();
        let _ = f.ledger.execute_seal(&pid("g1"), &id);
        f.ledger.sign_seal(&pid("g2"), &id).unwrap();
        f.ledger.execute_seal(&pid("g1"), &id).unwrap();

        let kinds: Vec<EventKind> = f.recorder.events().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::SealCreated,
                EventKind::SealExecuted,
                EventKind::SealSigned,
                EventKind::SealExecuted
            ]
        );
        assert!(!f.recorder.events()[1].outcome.is_committed());
        assert_eq!(f.recorder.events()[3].entities, vec![id.to_hex()]);
    }

    #[test]
    fn snapshot_restores_seals() {
        let f = fixture(&["g1", "g2"], 50, 1);
        let id = f.ledger.create_seal(&pid("g1"), action(10), "meta").unwrap();
        f.ledger.execute_seal(&pid("g1"), &id).unwrap();
        let bytes = f.ledger.snapshot().unwrap();

        let restored = SealLedger::restore(
            f.registry.clone(),
            Arc::new(NullClock::new(0)),
            Arc::new(EventBus::new()),
            &bytes,
        )
        .unwrap();
        assert!(restored.verify_seal(&id));
        assert_eq!(restored.seal(&id), f.ledger.seal(&id));
    }
}
