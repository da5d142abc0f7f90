//! Governance proposals and their lifecycle.

use citadel_types::{EntityHash, PrincipalId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Derived lifecycle status of a proposal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalStatus {
    /// Inside the voting window.
    Active,
    /// Window closed with quorum and a majority for.
    Passed,
    /// Window closed without quorum or majority.
    Failed,
    Executed,
    Cancelled,
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Active => "active",
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Executed => "executed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// A recorded vote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub support: bool,
    /// `stake × (1 + contribution_score)` when the vote was cast.
    pub weight: u128,
    pub cast_at: Timestamp,
}

/// A governance proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    /// `proposal_id(proposer, doc_ref, title)`.
    pub id: EntityHash,
    pub proposer: PrincipalId,
    /// Reference to the proposal document (URI or content hash).
    pub doc_ref: String,
    pub title: String,
    pub votes_for: u128,
    pub votes_against: u128,
    pub votes: BTreeMap<PrincipalId, Vote>,
    pub start: Timestamp,
    /// Exclusive end of the voting window.
    pub end: Timestamp,
    pub executed: bool,
    pub cancelled: bool,
}

impl Proposal {
    pub fn is_voting_open(&self, now: Timestamp) -> bool {
        now >= self.start && now < self.end
    }

    pub fn total_votes(&self) -> u128 {
        self.votes_for.saturating_add(self.votes_against)
    }

    /// Majority for; ties fail.
    pub fn is_passed(&self) -> bool {
        self.votes_for > self.votes_against
    }

    /// `(for + against) · 100 ≥ quorum_percent · total_stake`.
    pub fn has_quorum(&self, quorum_percent: u8, total_stake: u128) -> bool {
        self.total_votes().saturating_mul(100)
            >= total_stake.saturating_mul(u128::from(quorum_percent))
    }

    /// Weighted votes needed for quorum, rounded up.
    pub fn quorum_target(quorum_percent: u8, total_stake: u128) -> u128 {
        total_stake
            .saturating_mul(u128::from(quorum_percent))
            .div_ceil(100)
    }

    pub fn status(&self, now: Timestamp, quorum_percent: u8, total_stake: u128) -> ProposalStatus {
        if self.cancelled {
            ProposalStatus::Cancelled
        } else if self.executed {
            ProposalStatus::Executed
        } else if now < self.end {
            ProposalStatus::Active
        } else if self.has_quorum(quorum_percent, total_stake) && self.is_passed() {
            ProposalStatus::Passed
        } else {
            ProposalStatus::Failed
        }
    }
}
