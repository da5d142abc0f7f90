//! Stable ids derived from canonical input fields.
//!
//! Every field is length-prefixed (u64 LE) and each id family carries its
//! own domain tag, so `("ab", "c")` and `("a", "bc")` never collide and a
//! seal id can never equal a milestone id for the same bytes.

use crate::hash::blake2b_256_multi;
use citadel_types::{EntityHash, PrincipalId};

const SEAL_DOMAIN: &[u8] = b"citadel/seal/v1";
const MILESTONE_DOMAIN: &[u8] = b"citadel/milestone/v1";
const PROPOSAL_DOMAIN: &[u8] = b"citadel/proposal/v1";

fn derive(domain: &[u8], fields: &[&[u8]]) -> EntityHash {
    let lens: Vec<[u8; 8]> = fields
        .iter()
        .map(|f| (f.len() as u64).to_le_bytes())
        .collect();
    let mut parts: Vec<&[u8]> = Vec::with_capacity(1 + fields.len() * 2);
    parts.push(domain);
    for (len, field) in lens.iter().zip(fields) {
        parts.push(len);
        parts.push(field);
    }
    EntityHash::new(blake2b_256_multi(&parts))
}

/// Id of a seal authorizing `action_hash` with the given metadata.
pub fn seal_id(action_hash: &EntityHash, metadata: &str) -> EntityHash {
    derive(SEAL_DOMAIN, &[action_hash.as_bytes(), metadata.as_bytes()])
}

/// Id of a milestone.
pub fn milestone_id(description: &str, action_hash: &EntityHash, covenant_ref: &str) -> EntityHash {
    derive(
        MILESTONE_DOMAIN,
        &[
            description.as_bytes(),
            action_hash.as_bytes(),
            covenant_ref.as_bytes(),
        ],
    )
}

/// Id of a governance proposal.
pub fn proposal_id(proposer: &PrincipalId, doc_ref: &str, title: &str) -> EntityHash {
    derive(
        PROPOSAL_DOMAIN,
        &[proposer.as_str().as_bytes(), doc_ref.as_bytes(), title.as_bytes()],
    )
}
