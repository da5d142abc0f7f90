//! The anchor ledger.

use crate::covenant::Covenant;
use crate::error::AnchorError;
use crate::milestone::{Anchor, Milestone};
use citadel_quorum::SealLedger;
use citadel_types::{Clock, EntityHash, EventBus, EventKind, PrincipalId, Timestamp};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

#[derive(Default)]
struct AnchorState {
    milestones: HashMap<EntityHash, Milestone>,
    anchors: HashMap<EntityHash, Anchor>,
    covenant: Covenant,
    sealers: BTreeSet<PrincipalId>,
}

impl AnchorState {
    fn milestone(&self, id: &EntityHash) -> Result<&Milestone, AnchorError> {
        self.milestones
            .get(id)
            .ok_or_else(|| AnchorError::MilestoneNotFound(id.to_hex()))
    }

    fn unsealed_milestone_mut(&mut self, id: &EntityHash) -> Result<&mut Milestone, AnchorError> {
        let milestone = self
            .milestones
            .get_mut(id)
            .ok_or_else(|| AnchorError::MilestoneNotFound(id.to_hex()))?;
        if milestone.sealed {
            return Err(AnchorError::AlreadySealed(id.to_hex()));
        }
        Ok(milestone)
    }
}

/// On-disk form of the ledger, sorted by id for stable output.
#[derive(Serialize, Deserialize)]
struct AnchorSnapshot {
    milestones: Vec<Milestone>,
    anchors: Vec<Anchor>,
    covenant: Covenant,
    sealers: Vec<PrincipalId>,
}

/// Append-only milestone/anchor ledger.
pub struct AnchorLedger {
    owner: PrincipalId,
    seals: Option<Arc<SealLedger>>,
    state: RwLock<AnchorState>,
    clock: Arc<dyn Clock>,
    events: Arc<EventBus>,
}

impl AnchorLedger {
    pub fn new(
        owner: PrincipalId,
        sealers: Vec<PrincipalId>,
        clock: Arc<dyn Clock>,
        events: Arc<EventBus>,
    ) -> Result<Self, AnchorError> {
        if let Some(bad) = sealers.iter().find(|s| !s.is_valid()) {
            return Err(AnchorError::InvalidPrincipal(bad.to_string()));
        }
        Ok(Self {
            owner,
            seals: None,
            state: RwLock::new(AnchorState {
                sealers: sealers.into_iter().collect(),
                ..AnchorState::default()
            }),
            clock,
            events,
        })
    }

    /// Enable [`AnchorLedger::seal_milestone_with_quorum`].
    pub fn with_seal_ledger(mut self, seals: Arc<SealLedger>) -> Self {
        self.seals = Some(seals);
        self
    }

    pub fn owner(&self) -> &PrincipalId {
        &self.owner
    }

    /// Record a new, unsealed milestone. Open to any principal.
    pub fn create_milestone(
        &self,
        caller: &PrincipalId,
        description: &str,
        action_hash: EntityHash,
        covenant_ref: &str,
    ) -> Result<EntityHash, AnchorError> {
        let now = self.clock.now();
        let id = citadel_crypto::milestone_id(description, &action_hash, covenant_ref);
        let result = (|| -> Result<EntityHash, AnchorError> {
            if description.trim().is_empty() {
                return Err(AnchorError::EmptyDescription);
            }
            if action_hash.is_zero() {
                return Err(AnchorError::ZeroActionHash);
            }
            let mut state = self.state.write();
            if state.milestones.contains_key(&id) {
                return Err(AnchorError::DuplicateMilestone(id.to_hex()));
            }
            state.milestones.insert(
                id,
                Milestone {
                    id,
                    description: description.to_string(),
                    action_hash,
                    covenant_ref: covenant_ref.to_string(),
                    initiator: caller.clone(),
                    created_at: now,
                    anchors: Vec::new(),
                    sealed: false,
                    sealing_anchor: None,
                    quorum_seal: None,
                    sealed_at: None,
                },
            );
            tracing::info!(milestone = %id, initiator = %caller, "milestone created");
            Ok(id)
        })();
        self.events
            .record(EventKind::MilestoneCreated, caller, vec![id.to_hex()], &result, now);
        result
    }

    /// Create a permanent anchor under an unsealed milestone and link it there.
    pub fn create_anchor(
        &self,
        caller: &PrincipalId,
        milestone: &EntityHash,
        kind: &str,
        content_hash: EntityHash,
    ) -> Result<(), AnchorError> {
        let now = self.clock.now();
        let result = (|| -> Result<(), AnchorError> {
            if kind.trim().is_empty() {
                return Err(AnchorError::EmptyAnchorType);
            }
            if content_hash.is_zero() {
                return Err(AnchorError::ZeroContentHash);
            }
            let mut state = self.state.write();
            if state.anchors.contains_key(&content_hash) {
                return Err(AnchorError::DuplicateAnchor(content_hash.to_hex()));
            }
            state.unsealed_milestone_mut(milestone)?.anchors.push(content_hash);
            state.anchors.insert(
                content_hash,
                Anchor {
                    content_hash,
                    milestone: *milestone,
                    kind: kind.to_string(),
                    creator: caller.clone(),
                    created_at: now,
                },
            );
            tracing::info!(anchor = %content_hash, milestone = %milestone, kind, "anchor created");
            Ok(())
        })();
        self.events.record(
            EventKind::AnchorCreated,
            caller,
            vec![content_hash.to_hex(), milestone.to_hex()],
            &result,
            now,
        );
        result
    }

    /// Link an existing anchor to another unsealed milestone.
    pub fn link_anchor(
        &self,
        caller: &PrincipalId,
        milestone: &EntityHash,
        anchor: &EntityHash,
    ) -> Result<(), AnchorError> {
        let now = self.clock.now();
        let result = (|| -> Result<(), AnchorError> {
            let mut state = self.state.write();
            if !state.anchors.contains_key(anchor) {
                return Err(AnchorError::AnchorNotFound(anchor.to_hex()));
            }
            let target = state.unsealed_milestone_mut(milestone)?;
            if target.has_anchor(anchor) {
                return Err(AnchorError::AlreadyLinked {
                    anchor: anchor.to_hex(),
                    milestone: milestone.to_hex(),
                });
            }
            target.anchors.push(*anchor);
            tracing::debug!(anchor = %anchor, milestone = %milestone, "anchor linked");
            Ok(())
        })();
        self.events.record(
            EventKind::AnchorLinked,
            caller,
            vec![anchor.to_hex(), milestone.to_hex()],
            &result,
            now,
        );
        result
    }

    /// Seal a milestone, freezing its linked anchors. Sealers only.
    ///
    /// A sealing anchor that is not yet linked is linked as part of sealing.
    pub fn seal_milestone(
        &self,
        caller: &PrincipalId,
        milestone: &EntityHash,
        anchor: &EntityHash,
    ) -> Result<(), AnchorError> {
        let now = self.clock.now();
        let result = self.apply_seal(caller, milestone, anchor, None, now);
        self.events.record(
            EventKind::MilestoneSealed,
            caller,
            vec![milestone.to_hex(), anchor.to_hex()],
            &result,
            now,
        );
        result
    }

    /// Seal a milestone backed by an executed quorum seal over the
    /// milestone's action hash.
    pub fn seal_milestone_with_quorum(
        &self,
        caller: &PrincipalId,
        milestone: &EntityHash,
        anchor: &EntityHash,
        seal: &EntityHash,
    ) -> Result<(), AnchorError> {
        let now = self.clock.now();
        let result = self.apply_seal(caller, milestone, anchor, Some(seal), now);
        self.events.record(
            EventKind::MilestoneSealed,
            caller,
            vec![milestone.to_hex(), anchor.to_hex(), seal.to_hex()],
            &result,
            now,
        );
        result
    }

    /// True once the anchor has been created, forever.
    pub fn verify_anchor(&self, content_hash: &EntityHash) -> bool {
        self.state.read().anchors.contains_key(content_hash)
    }

    /// Owner-only: point the covenant at a new document.
    pub fn update_covenant(
        &self,
        caller: &PrincipalId,
        uri: &str,
        root_hash: EntityHash,
    ) -> Result<u64, AnchorError> {
        let now = self.clock.now();
        let result = (|| -> Result<u64, AnchorError> {
            self.ensure_owner(caller, "update the covenant")?;
            if uri.trim().is_empty() {
                return Err(AnchorError::EmptyCovenantUri);
            }
            if root_hash.is_zero() {
                return Err(AnchorError::ZeroRootHash);
            }
            let mut state = self.state.write();
            let version = state.covenant.version + 1;
            state.covenant = Covenant {
                uri: uri.to_string(),
                root_hash,
                version,
                updated_at: Some(now),
            };
            tracing::info!(uri, root = %root_hash, version, "covenant updated");
            Ok(version)
        })();
        self.events.record(
            EventKind::CovenantUpdated,
            caller,
            vec![root_hash.to_hex()],
            &result,
            now,
        );
        result
    }

    pub fn authorize_sealer(
        &self,
        caller: &PrincipalId,
        sealer: &PrincipalId,
    ) -> Result<(), AnchorError> {
        let now = self.clock.now();
        let result = (|| -> Result<(), AnchorError> {
            self.ensure_owner(caller, "authorize sealers")?;
            if !sealer.is_valid() {
                return Err(AnchorError::InvalidPrincipal(sealer.to_string()));
            }
            if !self.state.write().sealers.insert(sealer.clone()) {
                return Err(AnchorError::SealerAlreadyAuthorized(sealer.to_string()));
            }
            tracing::info!(sealer = %sealer, "sealer authorized");
            Ok(())
        })();
        self.events.record(
            EventKind::SealerUpdated,
            caller,
            vec![sealer.to_string()],
            &result,
            now,
        );
        result
    }

    pub fn revoke_sealer(&self, caller: &PrincipalId, sealer: &PrincipalId) -> Result<(), AnchorError> {
        let now = self.clock.now();
        let result = (|| -> Result<(), AnchorError> {
            self.ensure_owner(caller, "revoke sealers")?;
            if !self.state.write().sealers.remove(sealer) {
                return Err(AnchorError::UnknownSealer(sealer.to_string()));
            }
            tracing::info!(sealer = %sealer, "sealer revoked");
            Ok(())
        })();
        self.events.record(
            EventKind::SealerUpdated,
            caller,
            vec![sealer.to_string()],
            &result,
            now,
        );
        result
    }

    // ── Reads ───────────────────────────────────────────────────────────

    pub fn milestone(&self, id: &EntityHash) -> Option<Milestone> {
        self.state.read().milestones.get(id).cloned()
    }

    pub fn anchor(&self, content_hash: &EntityHash) -> Option<Anchor> {
        self.state.read().anchors.get(content_hash).cloned()
    }

    /// Anchors linked to a milestone, in link order.
    pub fn anchors_of(&self, milestone: &EntityHash) -> Vec<EntityHash> {
        self.state
            .read()
            .milestones
            .get(milestone)
            .map(|m| m.anchors.clone())
            .unwrap_or_default()
    }

    pub fn covenant(&self) -> Covenant {
        self.state.read().covenant.clone()
    }

    pub fn is_sealer(&self, principal: &PrincipalId) -> bool {
        self.state.read().sealers.contains(principal)
    }

    pub fn milestone_count(&self) -> usize {
        self.state.read().milestones.len()
    }

    pub fn anchor_count(&self) -> usize {
        self.state.read().anchors.len()
    }

    // ── Persistence ─────────────────────────────────────────────────────

    /// Serialize the whole ledger.
    pub fn snapshot(&self) -> Result<Vec<u8>, AnchorError> {
        let state = self.state.read();
        let mut milestones: Vec<Milestone> = state.milestones.values().cloned().collect();
        milestones.sort_by_key(|m| m.id);
        let mut anchors: Vec<Anchor> = state.anchors.values().cloned().collect();
        anchors.sort_by_key(|a| a.content_hash);
        let snapshot = AnchorSnapshot {
            milestones,
            anchors,
            covenant: state.covenant.clone(),
            sealers: state.sealers.iter().cloned().collect(),
        };
        bincode::serialize(&snapshot).map_err(|e| AnchorError::Snapshot(e.to_string()))
    }

    /// Rebuild a ledger from [`AnchorLedger::snapshot`] output. Attach a seal
    /// ledger afterwards with [`AnchorLedger::with_seal_ledger`].
    pub fn restore(
        owner: PrincipalId,
        clock: Arc<dyn Clock>,
        events: Arc<EventBus>,
        bytes: &[u8],
    ) -> Result<Self, AnchorError> {
        let snapshot: AnchorSnapshot =
            bincode::deserialize(bytes).map_err(|e| AnchorError::Snapshot(e.to_string()))?;

        let mut milestones = HashMap::with_capacity(snapshot.milestones.len());
        for m in snapshot.milestones {
            let expected = citadel_crypto::milestone_id(&m.description, &m.action_hash, &m.covenant_ref);
            if expected != m.id {
                return Err(AnchorError::Snapshot(format!("milestone {} has a foreign id", m.id)));
            }
            milestones.insert(m.id, m);
        }
        let mut anchors = HashMap::with_capacity(snapshot.anchors.len());
        for a in snapshot.anchors {
            if !milestones.contains_key(&a.milestone) {
                return Err(AnchorError::Snapshot(format!(
                    "anchor {} references unknown milestone {}",
                    a.content_hash, a.milestone
                )));
            }
            anchors.insert(a.content_hash, a);
        }
        for m in milestones.values() {
            if let Some(missing) = m.anchors.iter().find(|a| !anchors.contains_key(a)) {
                return Err(AnchorError::Snapshot(format!(
                    "milestone {} links unknown anchor {}",
                    m.id, missing
                )));
            }
            if let Some(sealing) = &m.sealing_anchor {
                if !m.has_anchor(sealing) {
                    return Err(AnchorError::Snapshot(format!(
                        "milestone {} sealed with unlinked anchor {}",
                        m.id, sealing
                    )));
                }
            }
        }

        Ok(Self {
            owner,
            seals: None,
            state: RwLock::new(AnchorState {
                milestones,
                anchors,
                covenant: snapshot.covenant,
                sealers: snapshot.sealers.into_iter().collect(),
            }),
            clock,
            events,
        })
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn ensure_owner(&self, caller: &PrincipalId, action: &'static str) -> Result<(), AnchorError> {
        if *caller != self.owner {
            return Err(AnchorError::NotOwner(action));
        }
        Ok(())
    }

    fn apply_seal(
        &self,
        caller: &PrincipalId,
        milestone: &EntityHash,
        anchor: &EntityHash,
        seal: Option<&EntityHash>,
        now: Timestamp,
    ) -> Result<(), AnchorError> {
        let mut state = self.state.write();
        if !state.sealers.contains(caller) {
            return Err(AnchorError::NotSealer(caller.to_string()));
        }
        let action_hash = state.milestone(milestone)?.action_hash;
        if !state.anchors.contains_key(anchor) {
            return Err(AnchorError::AnchorNotFound(anchor.to_hex()));
        }
        if state.milestone(milestone)?.sealed {
            return Err(AnchorError::AlreadySealed(milestone.to_hex()));
        }
        if let Some(seal_id) = seal {
            self.check_quorum_seal(seal_id, milestone, &action_hash)?;
        }

        let target = state.unsealed_milestone_mut(milestone)?;
        if !target.has_anchor(anchor) {
            target.anchors.push(*anchor);
        }
        target.sealed = true;
        target.sealing_anchor = Some(*anchor);
        target.quorum_seal = seal.copied();
        target.sealed_at = Some(now);
        tracing::info!(
            milestone = %milestone,
            anchor = %anchor,
            anchors = target.anchors.len(),
            quorum = seal.is_some(),
            "milestone sealed"
        );
        Ok(())
    }

    fn check_quorum_seal(
        &self,
        seal_id: &EntityHash,
        milestone: &EntityHash,
        action_hash: &EntityHash,
    ) -> Result<(), AnchorError> {
        let seals = self
            .seals
            .as_ref()
            .ok_or(AnchorError::QuorumSealingUnavailable)?;
        let seal = seals
            .seal(seal_id)
            .filter(|s| s.executed)
            .ok_or_else(|| AnchorError::SealNotExecuted(seal_id.to_hex()))?;
        if seal.action_hash != *action_hash {
            return Err(AnchorError::SealActionMismatch {
                seal: seal_id.to_hex(),
                milestone: milestone.to_hex(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use citadel_nullables::{EventRecorder, NullClock};
    use citadel_quorum::{GuardianRegistry, QuorumParams};
    use citadel_types::{Classify, ErrorKind, Outcome};

    fn pid(s: &str) -> PrincipalId {
        PrincipalId::new(s)
    }

    fn h(byte: u8) -> EntityHash {
        EntityHash::new([byte; 32])
    }

    fn ledger() -> (AnchorLedger, EventRecorder) {
        let bus = Arc::new(EventBus::new());
        let recorder = EventRecorder::attach(&bus);
        let ledger = AnchorLedger::new(
            pid("owner"),
            vec![pid("sealer")],
            Arc::new(NullClock::new(500)),
            bus,
        )
        .unwrap();
        (ledger, recorder)
    }

    #[test]
    fn milestone_ids_are_stable_and_unique() {
        let (ledger, _) = ledger();
        let id = ledger
            .create_milestone(&pid("alice"), "launch", h(1), "cov-1")
            .unwrap();
        assert_eq!(id, citadel_crypto::milestone_id("launch", &h(1), "cov-1"));
        let err = ledger
            .create_milestone(&pid("bob"), "launch", h(1), "cov-1")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StateConflict);
        assert_eq!(ledger.milestone_count(), 1);
        assert_eq!(ledger.milestone(&id).unwrap().initiator, pid("alice"));
    }

    #[test]
    fn milestone_requires_description_and_action() {
        let (ledger, recorder) = ledger();
        assert!(matches!(
            ledger.create_milestone(&pid("a"), "  ", h(1), ""),
            Err(AnchorError::EmptyDescription)
        ));
        assert!(matches!(
            ledger.create_milestone(&pid("a"), "x", EntityHash::ZERO, ""),
            Err(AnchorError::ZeroActionHash)
        ));
        assert_eq!(recorder.len(), 2);
        assert!(!recorder.last().unwrap().outcome.is_committed());
    }

    #[test]
    fn anchors_are_unique_and_linked_to_their_milestone() {
        let (ledger, _) = ledger();
        let m = ledger.create_milestone(&pid("a"), "m", h(1), "").unwrap();
        ledger.create_anchor(&pid("a"), &m, "document", h(10)).unwrap();
        assert_eq!(ledger.anchors_of(&m), vec![h(10)]);
        assert!(ledger.anchor(&h(10)).unwrap().is_permanent());

        let other = ledger.create_milestone(&pid("a"), "other", h(2), "").unwrap();
        assert!(matches!(
            ledger.create_anchor(&pid("b"), &other, "document", h(10)),
            Err(AnchorError::DuplicateAnchor(_))
        ));
        assert!(matches!(
            ledger.create_anchor(&pid("b"), &other, "", h(11)),
            Err(AnchorError::EmptyAnchorType)
        ));
        assert!(matches!(
            ledger.create_anchor(&pid("b"), &h(99), "document", h(11)),
            Err(AnchorError::MilestoneNotFound(_))
        ));
        assert_eq!(ledger.anchor_count(), 1);
    }

    #[test]
    fn link_rejects_duplicates_and_unknowns() {
        let (ledger, _) = ledger();
        let m1 = ledger.create_milestone(&pid("a"), "m1", h(1), "").unwrap();
        let m2 = ledger.create_milestone(&pid("a"), "m2", h(2), "").unwrap();
        ledger.create_anchor(&pid("a"), &m1, "audit", h(10)).unwrap();

        ledger.link_anchor(&pid("a"), &m2, &h(10)).unwrap();
        assert!(matches!(
            ledger.link_anchor(&pid("a"), &m2, &h(10)),
            Err(AnchorError::AlreadyLinked { .. })
        ));
        assert!(matches!(
            ledger.link_anchor(&pid("a"), &m2, &h(11)),
            Err(AnchorError::AnchorNotFound(_))
        ));
        assert_eq!(ledger.anchor(&h(10)).unwrap().milestone, m1);
    }

    #[test]
    fn sealed_milestone_is_frozen() {
        let (ledger, recorder) = ledger();
        let m = ledger.create_milestone(&pid("a"), "m", h(1), "").unwrap();
        ledger.create_anchor(&pid("a"), &m, "doc", h(10)).unwrap();
        let scratch = ledger.create_milestone(&pid("a"), "scratch", h(2), "").unwrap();
        ledger.create_anchor(&pid("a"), &scratch, "doc", h(11)).unwrap();

        ledger.seal_milestone(&pid("sealer"), &m, &h(10)).unwrap();
        let sealed = ledger.milestone(&m).unwrap();
        assert!(sealed.sealed);
        assert_eq!(sealed.sealing_anchor, Some(h(10)));

        let err = ledger.link_anchor(&pid("a"), &m, &h(11)).unwrap_err();
        assert!(matches!(err, AnchorError::AlreadySealed(_)));
        assert!(err.to_string().contains("already sealed"));
        assert!(matches!(
            ledger.create_anchor(&pid("a"), &m, "doc", h(12)),
            Err(AnchorError::AlreadySealed(_))
        ));
        assert!(matches!(
            ledger.seal_milestone(&pid("sealer"), &m, &h(10)),
            Err(AnchorError::AlreadySealed(_))
        ));
        assert_eq!(ledger.anchors_of(&m), vec![h(10)]);
        assert!(matches!(
            recorder.last().unwrap().outcome,
            Outcome::Rejected { kind: ErrorKind::StateConflict, .. }
        ));
    }

    #[test]
    fn only_sealers_seal() {
        let (ledger, _) = ledger();
        let m = ledger.create_milestone(&pid("a"), "m", h(1), "").unwrap();
        ledger.create_anchor(&pid("a"), &m, "doc", h(10)).unwrap();
        let err = ledger.seal_milestone(&pid("a"), &m, &h(10)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);

        ledger.authorize_sealer(&pid("owner"), &pid("a")).unwrap();
        ledger.seal_milestone(&pid("a"), &m, &h(10)).unwrap();

        ledger.revoke_sealer(&pid("owner"), &pid("a")).unwrap();
        assert!(!ledger.is_sealer(&pid("a")));
        assert!(matches!(
            ledger.revoke_sealer(&pid("owner"), &pid("a")),
            Err(AnchorError::UnknownSealer(_))
        ));
        assert!(matches!(
            ledger.authorize_sealer(&pid("a"), &pid("b")),
            Err(AnchorError::NotOwner(_))
        ));
    }

    #[test]
    fn sealing_with_foreign_anchor_links_it() {
        let (ledger, _) = ledger();
        let m1 = ledger.create_milestone(&pid("a"), "m1", h(1), "").unwrap();
        let m2 = ledger.create_milestone(&pid("a"), "m2", h(2), "").unwrap();
        ledger.create_anchor(&pid("a"), &m1, "doc", h(10)).unwrap();
        ledger.seal_milestone(&pid("sealer"), &m2, &h(10)).unwrap();
        assert_eq!(ledger.anchors_of(&m2), vec![h(10)]);
        // The anchor's own milestone stays open.
        ledger.create_anchor(&pid("a"), &m1, "doc", h(11)).unwrap();
    }

    #[test]
    fn covenant_versions_increase() {
        let (ledger, _) = ledger();
        assert!(!ledger.covenant().is_published());
        assert_eq!(ledger.update_covenant(&pid("owner"), "ipfs://a", h(5)).unwrap(), 1);
        assert_eq!(ledger.update_covenant(&pid("owner"), "ipfs://b", h(6)).unwrap(), 2);
        let covenant = ledger.covenant();
        assert_eq!(covenant.uri, "ipfs://b");
        assert_eq!(covenant.root_hash, h(6));
        assert_eq!(covenant.updated_at, Some(Timestamp::new(500)));

        assert!(matches!(
            ledger.update_covenant(&pid("a"), "ipfs://c", h(7)),
            Err(AnchorError::NotOwner(_))
        ));
        assert!(matches!(
            ledger.update_covenant(&pid("owner"), "", h(7)),
            Err(AnchorError::EmptyCovenantUri)
        ));
        assert_eq!(ledger.covenant().version, 2);
    }

    #[test]
    fn quorum_sealing_requires_matching_executed_seal() {
        let bus = Arc::new(EventBus::new());
        let clock: Arc<dyn Clock> = Arc::new(NullClock::new(0));
        let registry = Arc::new(
            GuardianRegistry::new(
                pid("owner"),
                vec![pid("g1"), pid("g2")],
                1,
                QuorumParams::new(51, 2),
                clock.clone(),
                bus.clone(),
            )
            .unwrap(),
        );
        let seals = Arc::new(SealLedger::new(registry, clock.clone(), bus.clone()));
        let ledger = AnchorLedger::new(pid("owner"), vec![pid("sealer")], clock, bus)
            .unwrap()
            .with_seal_ledger(seals.clone());

        let m = ledger.create_milestone(&pid("a"), "m", h(1), "").unwrap();
        ledger.create_anchor(&pid("a"), &m, "doc", h(10)).unwrap();

        let wrong = seals.create_seal(&pid("g1"), h(2), "other").unwrap();
        seals.sign_seal(&pid("g2"), &wrong).unwrap();
        seals.execute_seal(&pid("g1"), &wrong).unwrap();

        let right = seals.create_seal(&pid("g1"), h(1), "milestone m").unwrap();
        assert!(matches!(
            ledger.seal_milestone_with_quorum(&pid("sealer"), &m, &h(10), &right),
            Err(AnchorError::SealNotExecuted(_))
        ));
        assert!(matches!(
            ledger.seal_milestone_with_quorum(&pid("sealer"), &m, &h(10), &wrong),
            Err(AnchorError::SealActionMismatch { .. })
        ));

        seals.sign_seal(&pid("g2"), &right).unwrap();
        seals.execute_seal(&pid("g2"), &right).unwrap();
        ledger
            .seal_milestone_with_quorum(&pid("sealer"), &m, &h(10), &right)
            .unwrap();
        assert_eq!(ledger.milestone(&m).unwrap().quorum_seal, Some(right));
    }

    #[test]
    fn quorum_sealing_unavailable_without_seal_ledger() {
        let (ledger, _) = ledger();
        let m = ledger.create_milestone(&pid("a"), "m", h(1), "").unwrap();
        ledger.create_anchor(&pid("a"), &m, "doc", h(10)).unwrap();
        assert!(matches!(
            ledger.seal_milestone_with_quorum(&pid("sealer"), &m, &h(10), &h(3)),
            Err(AnchorError::QuorumSealingUnavailable)
        ));
        assert!(!ledger.milestone(&m).unwrap().sealed);
    }

    #[test]
    fn snapshot_restores_everything() {
        let (ledger, _) = ledger();
        let m = ledger.create_milestone(&pid("a"), "m", h(1), "cov").unwrap();
        ledger.create_anchor(&pid("a"), &m, "doc", h(10)).unwrap();
        ledger.seal_milestone(&pid("sealer"), &m, &h(10)).unwrap();
        ledger.update_covenant(&pid("owner"), "ipfs://root", h(4)).unwrap();

        let bytes = ledger.snapshot().unwrap();
        let restored = AnchorLedger::restore(
            pid("owner"),
            Arc::new(NullClock::new(0)),
            Arc::new(EventBus::new()),
            &bytes,
        )
        .unwrap();
        assert_eq!(restored.milestone(&m), ledger.milestone(&m));
        assert!(restored.verify_anchor(&h(10)));
        assert_eq!(restored.covenant(), ledger.covenant());
        assert!(restored.is_sealer(&pid("sealer")));
        assert!(AnchorLedger::restore(
            pid("owner"),
            Arc::new(NullClock::new(0)),
            Arc::new(EventBus::new()),
            b"garbage",
        )
        .is_err());
    }

    fn restore_edited(
        ledger: &AnchorLedger,
        edit: impl FnOnce(&mut AnchorSnapshot),
    ) -> Result<AnchorLedger, AnchorError> {
        let mut snapshot: AnchorSnapshot =
            bincode::deserialize(&ledger.snapshot().unwrap()).unwrap();
        edit(&mut snapshot);
        AnchorLedger::restore(
            pid("owner"),
            Arc::new(NullClock::new(0)),
            Arc::new(EventBus::new()),
            &bincode::serialize(&snapshot).unwrap(),
        )
    }

    #[test]
    fn restore_rejects_dangling_anchor_links() {
        let (ledger, _) = ledger();
        let m = ledger.create_milestone(&pid("a"), "m", h(1), "cov").unwrap();
        ledger.create_anchor(&pid("a"), &m, "doc", h(10)).unwrap();
        ledger.seal_milestone(&pid("sealer"), &m, &h(10)).unwrap();

        let err = restore_edited(&ledger, |s| s.milestones[0].anchors.push(h(99)))
            .err()
            .unwrap();
        assert!(matches!(err, AnchorError::Snapshot(_)));

        let err = restore_edited(&ledger, |s| s.milestones[0].sealing_anchor = Some(h(99)))
            .err()
            .unwrap();
        assert!(matches!(err, AnchorError::Snapshot(_)));

        let err = restore_edited(&ledger, |s| s.anchors.clear()).err().unwrap();
        assert!(matches!(err, AnchorError::Snapshot(_)));
    }
}
