//! The error taxonomy shared by every component.
//!
//! Each crate keeps its own `thiserror` enum with specific reasons; those
//! enums classify themselves into one of four kinds so callers can decide
//! how to recover (fix the input, use another identity, retry later, or
//! top up funds).

use serde::{Deserialize, Serialize};
use std::fmt;

/// The class of a rejected operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Malformed, missing or zero input. Rejected before any mutation.
    Validation,
    /// The caller lacks the role the operation requires.
    Authorization,
    /// Duplicate signature, already executed/sealed, cooldown, rate limit,
    /// voting window, quorum not reached, veto in force.
    StateConflict,
    /// Insufficient balance for a withdrawal or redirection.
    Resource,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Authorization => "authorization",
            Self::StateConflict => "state_conflict",
            Self::Resource => "resource",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Implemented by every component error enum.
pub trait Classify {
    fn kind(&self) -> ErrorKind;
}
