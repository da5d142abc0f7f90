//! The anchor ledger: an append-only graph of governance milestones and the
//! content-hash anchors bound to them.
//!
//! Anchors are permanent. A milestone collects anchors until an authorized
//! sealer seals it, optionally backed by an executed quorum seal, after which
//! its linked set is frozen. The covenant is the root-of-trust document
//! pointer and is versioned independently of milestones.

pub mod covenant;
pub mod error;
pub mod ledger;
pub mod milestone;

pub use covenant::Covenant;
pub use error::AnchorError;
pub use ledger::AnchorLedger;
pub use milestone::{Anchor, Milestone};
