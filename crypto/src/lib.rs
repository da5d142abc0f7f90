//! Cryptographic primitives for the Citadel protocol.
//!
//! - **Blake2b-256** for hashing action payloads and documents
//! - Canonical, domain-separated ids for seals, milestones and proposals

pub mod canonical;
pub mod hash;

pub use canonical::{milestone_id, proposal_id, seal_id};
pub use hash::{blake2b_256, blake2b_256_multi, hash_content};
