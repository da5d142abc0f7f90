//! Milestone and anchor records.

use citadel_types::{EntityHash, PrincipalId, Timestamp};
use serde::{Deserialize, Serialize};

/// A governance checkpoint, sealable once sufficiently anchored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    /// `milestone_id(description, action_hash, covenant_ref)`.
    pub id: EntityHash,
    pub description: String,
    pub action_hash: EntityHash,
    pub covenant_ref: String,
    pub initiator: PrincipalId,
    pub created_at: Timestamp,
    /// Linked anchors in link order.
    pub anchors: Vec<EntityHash>,
    pub sealed: bool,
    /// The anchor named when the milestone was sealed.
    pub sealing_anchor: Option<EntityHash>,
    /// The executed quorum seal backing the sealing, if any.
    pub quorum_seal: Option<EntityHash>,
    pub sealed_at: Option<Timestamp>,
}

impl Milestone {
    pub fn has_anchor(&self, anchor: &EntityHash) -> bool {
        self.anchors.contains(anchor)
    }
}

/// An immutable content-hash record bound to a milestone.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    /// Global identity of the anchor.
    pub content_hash: EntityHash,
    /// The milestone the anchor was created under.
    pub milestone: EntityHash,
    /// Free-form type tag (e.g. "document", "audit").
    pub kind: String,
    pub creator: PrincipalId,
    pub created_at: Timestamp,
}

impl Anchor {
    /// Anchors are never revoked.
    pub fn is_permanent(&self) -> bool {
        true
    }
}
