//! Wires every protocol component together from a [`ProtocolConfig`].
//!
//! Dependencies are injected one way at construction: the veto, seal ledger
//! and forensic guard hold read handles to the guardian registry, the
//! governance engine holds the stake ledger and the veto, and the anchor
//! ledger holds the seal ledger. Nothing holds a handle back.

use std::sync::Arc;

use citadel_anchor::AnchorLedger;
use citadel_governance::ProposalEngine;
use citadel_quorum::{GuardianRegistry, SealLedger};
use citadel_stake::StakeLedger;
use citadel_treasury::ForensicGuard;
use citadel_types::{Clock, EventBus, EventKind, ProtocolEvent};
use citadel_utils::EventStats;
use citadel_veto::EmergencyVeto;
use serde::Serialize;

use crate::config::ProtocolConfig;
use crate::error::NodeError;

/// A running protocol instance.
pub struct Protocol {
    config: ProtocolConfig,
    events: Arc<EventBus>,
    stats: Arc<EventStats>,
    stake: Arc<StakeLedger>,
    registry: Arc<GuardianRegistry>,
    seals: Arc<SealLedger>,
    veto: Arc<EmergencyVeto>,
    treasury: Arc<ForensicGuard>,
    anchors: Arc<AnchorLedger>,
    governance: Arc<ProposalEngine>,
}

/// Point-in-time summary of the protocol, for operators.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProtocolStatus {
    pub operations_allowed: bool,
    pub active_guardians: usize,
    pub required_approvals: usize,
    pub required_signatures: usize,
    pub forensic_active: bool,
    pub failed_transactions: u64,
    pub protected_balance: u128,
    pub backups: usize,
    pub seals: usize,
    pub milestones: usize,
    pub anchors: usize,
    pub proposals: usize,
    pub principals: usize,
    pub total_stake: u128,
}

impl Protocol {
    /// Build every component and apply the genesis entries from `config`.
    pub fn from_config(config: ProtocolConfig, clock: Arc<dyn Clock>) -> Result<Self, NodeError> {
        config.validate()?;
        let owner = config.owner.clone();

        let events = Arc::new(EventBus::new());
        let stats = Arc::new(EventStats::new(&EventKind::ALL));
        {
            let stats = stats.clone();
            events.subscribe(move |e: &ProtocolEvent| stats.observe(e));
        }

        let stake = Arc::new(StakeLedger::new(owner.clone(), clock.clone(), events.clone()));
        let registry = Arc::new(GuardianRegistry::new(
            owner.clone(),
            config.guardians.clone(),
            config.required_approvals,
            config.quorum,
            clock.clone(),
            events.clone(),
        )?);
        let seals = Arc::new(SealLedger::new(registry.clone(), clock.clone(), events.clone()));
        let veto = Arc::new(EmergencyVeto::new(
            owner.clone(),
            registry.clone(),
            clock.clone(),
            events.clone(),
        ));
        let treasury = Arc::new(ForensicGuard::new(
            owner.clone(),
            config.forensic.clone(),
            registry.clone(),
            veto.clone(),
            clock.clone(),
            events.clone(),
        )?);
        let anchors = Arc::new(
            AnchorLedger::new(owner.clone(), config.sealers.clone(), clock.clone(), events.clone())?
                .with_seal_ledger(seals.clone()),
        );
        let governance = Arc::new(ProposalEngine::new(
            owner.clone(),
            config.governance.clone(),
            stake.clone(),
            veto.clone(),
            clock,
            events.clone(),
        )?);

        for p in &config.principals {
            stake.register_principal(&owner, p.id.clone(), u128::from(p.stake), p.contribution_score)?;
        }
        for backup in &config.backups {
            treasury.add_backup(&owner, backup)?;
        }

        tracing::info!(
            owner = %owner,
            guardians = registry.active_count(),
            required_approvals = registry.required_approvals(),
            principals = stake.principal_count(),
            backups = treasury.backups().len(),
            "protocol initialised"
        );

        Ok(Self {
            config,
            events,
            stats,
            stake,
            registry,
            seals,
            veto,
            treasury,
            anchors,
            governance,
        })
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// Subscribe dashboards and adapters here.
    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn stats(&self) -> &EventStats {
        &self.stats
    }

    pub fn stake(&self) -> &Arc<StakeLedger> {
        &self.stake
    }

    pub fn registry(&self) -> &Arc<GuardianRegistry> {
        &self.registry
    }

    pub fn seals(&self) -> &Arc<SealLedger> {
        &self.seals
    }

    pub fn veto(&self) -> &Arc<EmergencyVeto> {
        &self.veto
    }

    pub fn treasury(&self) -> &Arc<ForensicGuard> {
        &self.treasury
    }

    pub fn anchors(&self) -> &Arc<AnchorLedger> {
        &self.anchors
    }

    pub fn governance(&self) -> &Arc<ProposalEngine> {
        &self.governance
    }

    pub fn status(&self) -> ProtocolStatus {
        ProtocolStatus {
            operations_allowed: self.veto.operations_allowed(),
            active_guardians: self.registry.active_count(),
            required_approvals: self.registry.required_approvals(),
            required_signatures: self.registry.required_signatures(),
            forensic_active: self.treasury.is_active(),
            failed_transactions: self.treasury.failed_transactions(),
            protected_balance: self.treasury.protected_balance(),
            backups: self.treasury.backups().len(),
            seals: self.seals.seal_count(),
            milestones: self.anchors.milestone_count(),
            anchors: self.anchors.anchor_count(),
            proposals: self.governance.proposal_count(),
            principals: self.stake.principal_count(),
            total_stake: self.stake.total_stake(),
        }
    }
}
