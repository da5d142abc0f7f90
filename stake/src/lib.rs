//! Principal & stake ledger.
//!
//! Tracks each principal's stake balance and contribution score. The
//! governance engine weights votes as `stake × (1 + contribution_score)` and
//! measures quorum against the ledger's total stake.

pub mod error;
pub mod ledger;
pub mod principal;

pub use error::StakeError;
pub use ledger::StakeLedger;
pub use principal::Principal;
