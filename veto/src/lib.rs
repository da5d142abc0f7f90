//! Emergency veto.
//!
//! A binary breaker consulted first by every mutating forensic-guard and
//! governance operation. Any active guardian may trip it; only the owner may
//! reset it.

pub mod breaker;
pub mod error;

pub use breaker::{EmergencyVeto, Severity, VetoState};
pub use error::VetoError;
