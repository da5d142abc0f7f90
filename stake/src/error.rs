//! Stake-ledger errors.

use citadel_types::{Classify, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StakeError {
    #[error("only the ledger owner may {0}")]
    NotOwner(&'static str),

    #[error("invalid principal id {0:?}")]
    InvalidPrincipal(String),

    #[error("principal {0} is already registered")]
    AlreadyRegistered(String),

    #[error("principal {0} not found")]
    PrincipalNotFound(String),

    #[error("arithmetic overflow in stake computation")]
    Overflow,
}

impl Classify for StakeError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::NotOwner(_) => ErrorKind::Authorization,
            Self::AlreadyRegistered(_) => ErrorKind::StateConflict,
            Self::InvalidPrincipal(_) | Self::PrincipalNotFound(_) | Self::Overflow => {
                ErrorKind::Validation
            }
        }
    }
}
