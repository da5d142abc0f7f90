use citadel_types::{Classify, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("only the registry owner may {0}")]
    NotOwner(&'static str),

    #[error("invalid principal id {0:?}")]
    InvalidPrincipal(String),

    #[error("guardian {0} listed more than once")]
    DuplicateGuardian(String),

    #[error("{0} is already an active guardian")]
    AlreadyActive(String),

    #[error("{0} is not an active guardian")]
    NotActive(String),

    #[error("removal would leave {remaining} active guardians, below the floor of {floor}")]
    BelowFloor { remaining: usize, floor: usize },

    #[error("required approvals must be between 1 and {active}, got {requested}")]
    InvalidRequiredApprovals { requested: usize, active: usize },

    #[error("quorum percent must be between 1 and 100, got {0}")]
    InvalidQuorumPercent(u8),

    #[error("minimum signatures must be between 1 and {active}, got {requested}")]
    InvalidMinSignatures { requested: usize, active: usize },
}

impl Classify for RegistryError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::NotOwner(_) => ErrorKind::Authorization,
            Self::AlreadyActive(_) | Self::NotActive(_) | Self::BelowFloor { .. } => {
                ErrorKind::StateConflict
            }
            Self::InvalidPrincipal(_)
            | Self::DuplicateGuardian(_)
            | Self::InvalidRequiredApprovals { .. }
            | Self::InvalidQuorumPercent(_)
            | Self::InvalidMinSignatures { .. } => ErrorKind::Validation,
        }
    }
}

#[derive(Debug, Error)]
pub enum SealError {
    #[error("{0} is not an active guardian")]
    NotGuardian(String),

    #[error("action hash must be non-zero")]
    ZeroActionHash,

    #[error("seal {0} already exists")]
    DuplicateSeal(String),

    #[error("seal {0} not found")]
    SealNotFound(String),

    #[error("{signer} has already signed seal {seal}")]
    AlreadySigned { seal: String, signer: String },

    #[error("seal {0} has already been executed")]
    AlreadyExecuted(String),

    #[error("quorum not reached: {have} signatures, {need} required")]
    QuorumNotReached { have: usize, need: usize },

    #[error("seal ledger snapshot is corrupted: {0}")]
    Snapshot(String),
}

impl Classify for SealError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::NotGuardian(_) => ErrorKind::Authorization,
            Self::ZeroActionHash | Self::SealNotFound(_) | Self::Snapshot(_) => {
                ErrorKind::Validation
            }
            Self::DuplicateSeal(_)
            | Self::AlreadySigned { .. }
            | Self::AlreadyExecuted(_)
            | Self::QuorumNotReached { .. } => ErrorKind::StateConflict,
        }
    }
}
