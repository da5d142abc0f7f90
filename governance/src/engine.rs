//! The proposal engine: creation, weighted voting, execution.

use crate::error::GovernanceError;
use crate::params::GovernanceParams;
use crate::proposal::{Proposal, ProposalStatus, Vote};
use crate::rate_limit::RateLimiter;
use citadel_stake::StakeLedger;
use citadel_types::{Clock, EntityHash, EventBus, EventKind, PrincipalId, Timestamp};
use citadel_veto::EmergencyVeto;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

struct EngineState {
    proposals: HashMap<EntityHash, Proposal>,
    params: GovernanceParams,
    limiter: RateLimiter,
}

impl EngineState {
    fn proposal_mut(&mut self, id: &EntityHash) -> Result<&mut Proposal, GovernanceError> {
        self.proposals
            .get_mut(id)
            .ok_or_else(|| GovernanceError::ProposalNotFound(id.to_hex()))
    }
}

pub struct ProposalEngine {
    owner: PrincipalId,
    stake: Arc<StakeLedger>,
    veto: Arc<EmergencyVeto>,
    state: RwLock<EngineState>,
    clock: Arc<dyn Clock>,
    events: Arc<EventBus>,
}

impl ProposalEngine {
    pub fn new(
        owner: PrincipalId,
        params: GovernanceParams,
        stake: Arc<StakeLedger>,
        veto: Arc<EmergencyVeto>,
        clock: Arc<dyn Clock>,
        events: Arc<EventBus>,
    ) -> Result<Self, GovernanceError> {
        params.validate()?;
        let limiter = RateLimiter::new(
            params.proposal_cooldown_secs,
            params.rate_limit_max,
            params.rate_limit_window_secs,
        );
        Ok(Self {
            owner,
            stake,
            veto,
            state: RwLock::new(EngineState {
                proposals: HashMap::new(),
                params,
                limiter,
            }),
            clock,
            events,
        })
    }

    pub fn owner(&self) -> &PrincipalId {
        &self.owner
    }

    /// Open a proposal whose voting window starts now.
    pub fn create_proposal(
        &self,
        caller: &PrincipalId,
        doc_ref: &str,
        title: &str,
    ) -> Result<EntityHash, GovernanceError> {
        let now = self.clock.now();
        let id = citadel_crypto::proposal_id(caller, doc_ref, title);
        let result = self.apply_create(caller, id, doc_ref, title, now);
        self.events
            .record(EventKind::ProposalCreated, caller, vec![id.to_hex()], &result, now);
        result
    }

    /// Cast a weighted vote. Returns the weight applied.
    pub fn vote(
        &self,
        caller: &PrincipalId,
        id: &EntityHash,
        support: bool,
    ) -> Result<u128, GovernanceError> {
        let now = self.clock.now();
        let result = self.apply_vote(caller, id, support, now);
        self.events
            .record(EventKind::VoteCast, caller, vec![id.to_hex()], &result, now);
        result
    }

    /// Execute a passed proposal once its window has closed.
    pub fn execute_proposal(&self, caller: &PrincipalId, id: &EntityHash) -> Result<(), GovernanceError> {
        let now = self.clock.now();
        let result = self.apply_execute(id, now);
        self.events
            .record(EventKind::ProposalExecuted, caller, vec![id.to_hex()], &result, now);
        result
    }

    /// Owner-only: stop voting and execution of a proposal.
    pub fn cancel_proposal(&self, caller: &PrincipalId, id: &EntityHash) -> Result<(), GovernanceError> {
        let now = self.clock.now();
        let result = (|| -> Result<(), GovernanceError> {
            self.veto.ensure_operations_allowed()?;
            self.ensure_owner(caller, "cancel proposals")?;
            let mut state = self.state.write();
            let proposal = state.proposal_mut(id)?;
            if proposal.executed {
                return Err(GovernanceError::AlreadyExecuted);
            }
            if proposal.cancelled {
                return Err(GovernanceError::Cancelled);
            }
            proposal.cancelled = true;
            tracing::info!(proposal = %id, "proposal cancelled");
            Ok(())
        })();
        self.events
            .record(EventKind::ProposalCancelled, caller, vec![id.to_hex()], &result, now);
        result
    }

    // ── Parameters (owner-only) ─────────────────────────────────────────

    /// Applies to proposals created afterwards.
    pub fn set_voting_period(&self, caller: &PrincipalId, secs: u64) -> Result<(), GovernanceError> {
        self.configure(caller, "voting_period_secs", |params| {
            params.voting_period_secs = secs;
        })
    }

    pub fn set_quorum_percent(&self, caller: &PrincipalId, percent: u8) -> Result<(), GovernanceError> {
        self.configure(caller, "quorum_percent", |params| {
            params.quorum_percent = percent;
        })
    }

    pub fn set_proposal_cooldown(&self, caller: &PrincipalId, secs: u64) -> Result<(), GovernanceError> {
        self.configure(caller, "proposal_cooldown_secs", |params| {
            params.proposal_cooldown_secs = secs;
        })
    }

    pub fn set_rate_limit(
        &self,
        caller: &PrincipalId,
        max_per_window: u32,
        window_secs: u64,
    ) -> Result<(), GovernanceError> {
        self.configure(caller, "rate_limit", |params| {
            params.rate_limit_max = max_per_window;
            params.rate_limit_window_secs = window_secs;
        })
    }

    // ── Reads ───────────────────────────────────────────────────────────

    pub fn proposal(&self, id: &EntityHash) -> Option<Proposal> {
        self.state.read().proposals.get(id).cloned()
    }

    pub fn proposal_count(&self) -> usize {
        self.state.read().proposals.len()
    }

    /// Quorum against the stake supply as it stands now.
    pub fn has_quorum(&self, id: &EntityHash) -> Result<bool, GovernanceError> {
        let state = self.state.read();
        let proposal = lookup(&state, id)?;
        Ok(proposal.has_quorum(state.params.quorum_percent, self.stake.total_stake()))
    }

    pub fn is_passed(&self, id: &EntityHash) -> Result<bool, GovernanceError> {
        let state = self.state.read();
        Ok(lookup(&state, id)?.is_passed())
    }

    pub fn status(&self, id: &EntityHash) -> Result<ProposalStatus, GovernanceError> {
        let now = self.clock.now();
        let state = self.state.read();
        let proposal = lookup(&state, id)?;
        Ok(proposal.status(now, state.params.quorum_percent, self.stake.total_stake()))
    }

    pub fn vote_of(&self, id: &EntityHash, voter: &PrincipalId) -> Option<Vote> {
        self.state
            .read()
            .proposals
            .get(id)
            .and_then(|p| p.votes.get(voter).cloned())
    }

    pub fn params(&self) -> GovernanceParams {
        self.state.read().params.clone()
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn ensure_owner(&self, caller: &PrincipalId, action: &'static str) -> Result<(), GovernanceError> {
        if *caller != self.owner {
            return Err(GovernanceError::NotOwner(action));
        }
        Ok(())
    }

    fn apply_create(
        &self,
        caller: &PrincipalId,
        id: EntityHash,
        doc_ref: &str,
        title: &str,
        now: Timestamp,
    ) -> Result<EntityHash, GovernanceError> {
        self.veto.ensure_operations_allowed()?;
        if doc_ref.trim().is_empty() {
            return Err(GovernanceError::EmptyDocRef);
        }
        if title.trim().is_empty() {
            return Err(GovernanceError::EmptyTitle);
        }
        if self.stake.stake_of(caller) == 0 {
            return Err(GovernanceError::NoStake(caller.to_string()));
        }

        let mut state = self.state.write();
        state.limiter.check(caller, now)?;
        if state.proposals.contains_key(&id) {
            return Err(GovernanceError::DuplicateProposal(id.to_hex()));
        }
        let end = now.plus(state.params.voting_period_secs);
        state.proposals.insert(
            id,
            Proposal {
                id,
                proposer: caller.clone(),
                doc_ref: doc_ref.to_string(),
                title: title.to_string(),
                votes_for: 0,
                votes_against: 0,
                votes: BTreeMap::new(),
                start: now,
                end,
                executed: false,
                cancelled: false,
            },
        );
        state.limiter.record(caller, now);
        tracing::info!(proposal = %id, proposer = %caller, title, end = %end, "proposal created");
        Ok(id)
    }

    fn apply_vote(
        &self,
        caller: &PrincipalId,
        id: &EntityHash,
        support: bool,
        now: Timestamp,
    ) -> Result<u128, GovernanceError> {
        self.veto.ensure_operations_allowed()?;
        let mut state = self.state.write();
        let proposal = state.proposal_mut(id)?;
        if proposal.cancelled {
            return Err(GovernanceError::Cancelled);
        }
        if !proposal.is_voting_open(now) {
            return Err(GovernanceError::VotingClosed);
        }
        if proposal.votes.contains_key(caller) {
            return Err(GovernanceError::AlreadyVoted(caller.to_string()));
        }
        let weight = self
            .stake
            .vote_weight(caller)
            .map_err(|_| GovernanceError::NoStake(caller.to_string()))?;
        if weight == 0 {
            return Err(GovernanceError::NoStake(caller.to_string()));
        }

        let tally = if support {
            &mut proposal.votes_for
        } else {
            &mut proposal.votes_against
        };
        *tally = tally.checked_add(weight).ok_or(GovernanceError::Overflow)?;
        proposal.votes.insert(
            caller.clone(),
            Vote {
                support,
                weight,
                cast_at: now,
            },
        );
        tracing::debug!(proposal = %id, voter = %caller, support, weight, "vote cast");
        Ok(weight)
    }

    fn apply_execute(&self, id: &EntityHash, now: Timestamp) -> Result<(), GovernanceError> {
        self.veto.ensure_operations_allowed()?;
        let total_stake = self.stake.total_stake();
        let mut state = self.state.write();
        let quorum_percent = state.params.quorum_percent;
        let proposal = state.proposal_mut(id)?;
        if proposal.cancelled {
            return Err(GovernanceError::Cancelled);
        }
        if proposal.executed {
            return Err(GovernanceError::AlreadyExecuted);
        }
        if now < proposal.end {
            return Err(GovernanceError::VotingOpen);
        }
        if !proposal.has_quorum(quorum_percent, total_stake) {
            return Err(GovernanceError::QuorumNotMet {
                have: proposal.total_votes(),
                need: Proposal::quorum_target(quorum_percent, total_stake),
            });
        }
        if !proposal.is_passed() {
            return Err(GovernanceError::NotPassed);
        }
        proposal.executed = true;
        tracing::info!(
            proposal = %id,
            votes_for = proposal.votes_for,
            votes_against = proposal.votes_against,
            "proposal executed"
        );
        Ok(())
    }

    fn configure(
        &self,
        caller: &PrincipalId,
        field: &'static str,
        update: impl FnOnce(&mut GovernanceParams),
    ) -> Result<(), GovernanceError> {
        let now = self.clock.now();
        let result = (|| -> Result<(), GovernanceError> {
            self.veto.ensure_operations_allowed()?;
            self.ensure_owner(caller, "change governance parameters")?;
            let mut state = self.state.write();
            let mut params = state.params.clone();
            update(&mut params);
            params.validate()?;
            state
                .limiter
                .set_limit(params.rate_limit_max, params.rate_limit_window_secs);
            state.limiter.set_cooldown(params.proposal_cooldown_secs);
            state.params = params;
            tracing::info!(field, "governance parameters updated");
            Ok(())
        })();
        self.events
            .record(EventKind::ConfigUpdated, caller, vec![field.to_string()], &result, now);
        result
    }
}

fn lookup<'a>(state: &'a EngineState, id: &EntityHash) -> Result<&'a Proposal, GovernanceError> {
    state
        .proposals
        .get(id)
        .ok_or_else(|| GovernanceError::ProposalNotFound(id.to_hex()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use citadel_nullables::{EventRecorder, NullClock};
    use citadel_quorum::{GuardianRegistry, QuorumParams};
    use citadel_types::{Classify, ErrorKind};
    use citadel_veto::Severity;

    const DAY: u64 = 24 * 60 * 60;

    fn pid(s: &str) -> PrincipalId {
        PrincipalId::new(s)
    }

    struct Fixture {
        clock: Arc<NullClock>,
        stake: Arc<StakeLedger>,
        veto: Arc<EmergencyVeto>,
        engine: ProposalEngine,
        recorder: EventRecorder,
    }

    /// alice: 600 stake, bob: 300 stake (score 1), carol: 100 stake.
    fn fixture(params: GovernanceParams) -> Fixture {
        let bus = Arc::new(EventBus::new());
        let clock = Arc::new(NullClock::new(1_000_000));
        let dyn_clock: Arc<dyn Clock> = clock.clone();
        let owner = pid("owner");

        let stake = Arc::new(StakeLedger::new(owner.clone(), dyn_clock.clone(), bus.clone()));
        stake.register_principal(&owner, pid("alice"), 600, 0).unwrap();
        stake.register_principal(&owner, pid("bob"), 300, 1).unwrap();
        stake.register_principal(&owner, pid("carol"), 100, 0).unwrap();

        let registry = Arc::new(
            GuardianRegistry::new(
                owner.clone(),
                vec![pid("g1")],
                1,
                QuorumParams::new(51, 1),
                dyn_clock.clone(),
                bus.clone(),
            )
            .unwrap(),
        );
        let veto = Arc::new(EmergencyVeto::new(
            owner.clone(),
            registry,
            dyn_clock.clone(),
            bus.clone(),
        ));
        let engine =
            ProposalEngine::new(owner, params, stake.clone(), veto.clone(), dyn_clock, bus.clone())
                .unwrap();
        let recorder = EventRecorder::attach(&bus);
        Fixture {
            clock,
            stake,
            veto,
            engine,
            recorder,
        }
    }

    fn params() -> GovernanceParams {
        GovernanceParams {
            voting_period_secs: 7 * DAY,
            quorum_percent: 40,
            proposal_cooldown_secs: 3 * DAY,
            rate_limit_max: 3,
            rate_limit_window_secs: DAY,
        }
    }

    #[test]
    fn weighted_vote_passes_and_executes() {
        let f = fixture(params());
        let id = f.engine.create_proposal(&pid("carol"), "ipfs://doc", "raise cap").unwrap();
        assert_eq!(f.engine.status(&id).unwrap(), ProposalStatus::Active);

        // bob: 300 × (1 + 1) = 600
        assert_eq!(f.engine.vote(&pid("bob"), &id, true).unwrap(), 600);
        assert_eq!(f.engine.vote(&pid("carol"), &id, false).unwrap(), 100);
        assert!(f.engine.has_quorum(&id).unwrap());
        assert!(f.engine.is_passed(&id).unwrap());

        f.clock.advance(7 * DAY);
        assert_eq!(f.engine.status(&id).unwrap(), ProposalStatus::Passed);
        f.engine.execute_proposal(&pid("anyone"), &id).unwrap();
        assert_eq!(f.engine.status(&id).unwrap(), ProposalStatus::Executed);
        assert!(matches!(
            f.engine.execute_proposal(&pid("anyone"), &id),
            Err(GovernanceError::AlreadyExecuted)
        ));
    }

    #[test]
    fn execute_before_close_always_rejects() {
        let f = fixture(params());
        let id = f.engine.create_proposal(&pid("alice"), "doc", "t").unwrap();
        f.engine.vote(&pid("alice"), &id, true).unwrap();
        f.engine.vote(&pid("bob"), &id, true).unwrap();
        f.clock.advance(7 * DAY - 1);
        let err = f.engine.execute_proposal(&pid("alice"), &id).unwrap_err();
        assert!(matches!(err, GovernanceError::VotingOpen));
        assert!(!f.engine.proposal(&id).unwrap().executed);
    }

    #[test]
    fn one_vote_per_principal_inside_window() {
        let f = fixture(params());
        let id = f.engine.create_proposal(&pid("alice"), "doc", "t").unwrap();
        f.engine.vote(&pid("alice"), &id, true).unwrap();
        let err = f.engine.vote(&pid("alice"), &id, false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StateConflict);
        assert_eq!(f.engine.proposal(&id).unwrap().votes_against, 0);

        assert!(matches!(
            f.engine.vote(&pid("stranger"), &id, true),
            Err(GovernanceError::NoStake(_))
        ));

        f.clock.advance(7 * DAY);
        assert!(matches!(
            f.engine.vote(&pid("bob"), &id, true),
            Err(GovernanceError::VotingClosed)
        ));
    }

    #[test]
    fn quorum_tracks_current_stake_supply() {
        let f = fixture(params());
        let id = f.engine.create_proposal(&pid("alice"), "doc", "t").unwrap();
        // carol's 100 against a 1000 supply at 40%.
        f.engine.vote(&pid("carol"), &id, true).unwrap();
        assert!(!f.engine.has_quorum(&id).unwrap());

        f.stake.set_stake(&pid("owner"), &pid("alice"), 0).unwrap();
        f.stake.set_stake(&pid("owner"), &pid("bob"), 0).unwrap();
        assert!(f.engine.has_quorum(&id).unwrap());

        f.stake.set_stake(&pid("owner"), &pid("bob"), 300).unwrap();
        f.clock.advance(7 * DAY);
        assert_eq!(f.engine.status(&id).unwrap(), ProposalStatus::Failed);
        assert!(matches!(
            f.engine.execute_proposal(&pid("alice"), &id),
            Err(GovernanceError::QuorumNotMet { have: 100, need: 160 })
        ));
    }

    #[test]
    fn tie_does_not_pass() {
        let f = fixture(params());
        let id = f.engine.create_proposal(&pid("alice"), "doc", "t").unwrap();
        f.engine.vote(&pid("alice"), &id, true).unwrap();
        f.engine.vote(&pid("bob"), &id, false).unwrap();
        f.clock.advance(7 * DAY);
        assert!(matches!(
            f.engine.execute_proposal(&pid("alice"), &id),
            Err(GovernanceError::NotPassed)
        ));
    }

    #[test]
    fn proposal_cooldown_boundary() {
        let f = fixture(params());
        f.engine.create_proposal(&pid("alice"), "doc", "first").unwrap();
        f.clock.advance(3 * DAY - 1);
        assert!(matches!(
            f.engine.create_proposal(&pid("alice"), "doc", "second"),
            Err(GovernanceError::CooldownActive { remaining_secs: 1 })
        ));
        f.clock.advance(2);
        f.engine.create_proposal(&pid("alice"), "doc", "second").unwrap();
        assert_eq!(f.engine.proposal_count(), 2);
    }

    #[test]
    fn rate_limit_applies_across_principals() {
        let f = fixture(GovernanceParams {
            rate_limit_max: 2,
            ..params()
        });
        f.engine.create_proposal(&pid("alice"), "doc", "a").unwrap();
        f.engine.create_proposal(&pid("bob"), "doc", "b").unwrap();
        let err = f.engine.create_proposal(&pid("carol"), "doc", "c").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resource);
        assert_eq!(f.recorder.of_kind(EventKind::ProposalCreated).len(), 3);

        f.clock.advance(DAY);
        f.engine.create_proposal(&pid("carol"), "doc", "c").unwrap();
    }

    #[test]
    fn widening_the_window_keeps_earlier_proposals_counted() {
        let f = fixture(GovernanceParams {
            rate_limit_max: 2,
            rate_limit_window_secs: 60,
            proposal_cooldown_secs: 0,
            ..params()
        });
        f.engine.create_proposal(&pid("alice"), "doc", "a").unwrap();
        f.clock.advance(30);
        f.engine.create_proposal(&pid("bob"), "doc", "b").unwrap();
        f.clock.advance(70);
        f.engine.create_proposal(&pid("carol"), "doc", "c").unwrap();

        f.engine.set_rate_limit(&pid("owner"), 2, 1_000).unwrap();
        f.clock.advance(1);
        assert!(matches!(
            f.engine.create_proposal(&pid("alice"), "doc", "d"),
            Err(GovernanceError::RateLimited { max: 2, window_secs: 1_000 })
        ));
    }

    #[test]
    fn creation_requires_stake_and_fields() {
        let f = fixture(params());
        assert!(matches!(
            f.engine.create_proposal(&pid("stranger"), "doc", "t"),
            Err(GovernanceError::NoStake(_))
        ));
        assert!(matches!(
            f.engine.create_proposal(&pid("alice"), "", "t"),
            Err(GovernanceError::EmptyDocRef)
        ));
        assert!(matches!(
            f.engine.create_proposal(&pid("alice"), "doc", " "),
            Err(GovernanceError::EmptyTitle)
        ));
        // Rejections do not consume the cooldown.
        f.engine.create_proposal(&pid("alice"), "doc", "t").unwrap();
    }

    #[test]
    fn cancel_blocks_voting_and_execution() {
        let f = fixture(params());
        let id = f.engine.create_proposal(&pid("alice"), "doc", "t").unwrap();
        f.engine.vote(&pid("alice"), &id, true).unwrap();
        assert!(matches!(
            f.engine.cancel_proposal(&pid("alice"), &id),
            Err(GovernanceError::NotOwner(_))
        ));
        f.engine.cancel_proposal(&pid("owner"), &id).unwrap();
        assert_eq!(f.engine.status(&id).unwrap(), ProposalStatus::Cancelled);
        assert!(matches!(
            f.engine.vote(&pid("bob"), &id, true),
            Err(GovernanceError::Cancelled)
        ));
        f.clock.advance(7 * DAY);
        assert!(matches!(
            f.engine.execute_proposal(&pid("alice"), &id),
            Err(GovernanceError::Cancelled)
        ));
    }

    #[test]
    fn parameter_setters_are_owner_only_and_validated() {
        let f = fixture(params());
        assert!(matches!(
            f.engine.set_quorum_percent(&pid("alice"), 20),
            Err(GovernanceError::NotOwner(_))
        ));
        assert!(matches!(
            f.engine.set_quorum_percent(&pid("owner"), 0),
            Err(GovernanceError::InvalidParam { .. })
        ));
        f.engine.set_voting_period(&pid("owner"), DAY).unwrap();
        f.engine.set_proposal_cooldown(&pid("owner"), 0).unwrap();
        f.engine.set_rate_limit(&pid("owner"), 1, 60).unwrap();

        let id = f.engine.create_proposal(&pid("alice"), "doc", "short").unwrap();
        assert_eq!(f.engine.proposal(&id).unwrap().end.as_secs(), 1_000_000 + DAY);
        assert!(matches!(
            f.engine.create_proposal(&pid("alice"), "doc", "again"),
            Err(GovernanceError::RateLimited { max: 1, window_secs: 60 })
        ));
        f.clock.advance(60);
        f.engine.create_proposal(&pid("alice"), "doc", "again").unwrap();
    }

    #[test]
    fn veto_halts_governance_first() {
        let f = fixture(params());
        let id = f.engine.create_proposal(&pid("alice"), "doc", "t").unwrap();
        f.veto
            .initiate_veto(&pid("g1"), Severity::High, "governance attack")
            .unwrap();
        assert!(matches!(
            f.engine.vote(&pid("alice"), &id, true),
            Err(GovernanceError::Veto(_))
        ));
        assert!(matches!(
            f.engine.create_proposal(&pid("stranger"), "", ""),
            Err(GovernanceError::Veto(_))
        ));
        // Reads keep working.
        assert_eq!(f.engine.status(&id).unwrap(), ProposalStatus::Active);
    }
}
