//! Guardian quorum for the Citadel protocol.
//!
//! - [`GuardianRegistry`]: the authorized-guardian set, approval threshold and
//!   seal quorum policy, guarded by one invariant check: the active count
//!   never drops below `max(required_approvals, min_signatures)`.
//! - [`SealLedger`]: multiply-signed authorizations for sensitive actions.
//!   A seal executes once, and only when its signer count meets the quorum
//!   computed from the registry at execution time.

pub mod error;
pub mod params;
pub mod registry;
pub mod seal;

pub use error::{RegistryError, SealError};
pub use params::QuorumParams;
pub use registry::{Guardian, GuardianRegistry};
pub use seal::{Seal, SealLedger};
