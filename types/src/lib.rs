//! Fundamental types for the Citadel protocol.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! principal ids, entity hashes, timestamps and the clock seam, the error taxonomy,
//! and the structured event stream every mutating operation reports into.

pub mod error;
pub mod event;
pub mod hash;
pub mod principal;
pub mod time;

pub use error::{Classify, ErrorKind};
pub use event::{EventBus, EventKind, Outcome, ProtocolEvent};
pub use hash::EntityHash;
pub use principal::PrincipalId;
pub use time::{Clock, SystemClock, Timestamp};
