//! Governance for the Citadel protocol.
//!
//! Lifecycle: Active → {Passed | Failed} → (if Passed) Executed, or
//! Active → Cancelled by the owner at any point before execution.
//! The status is derived from the stored record and the current time.
//!
//! Key principle: vote weight = stake × (1 + contribution score), and quorum
//! is a percentage of the total stake supply at the moment it is evaluated.
//! Proposal creation passes a per-principal cooldown and a global rolling
//! rate limit first.

pub mod engine;
pub mod error;
pub mod params;
pub mod proposal;
pub mod rate_limit;

pub use engine::ProposalEngine;
pub use error::GovernanceError;
pub use params::GovernanceParams;
pub use proposal::{Proposal, ProposalStatus, Vote};
pub use rate_limit::RateLimiter;
