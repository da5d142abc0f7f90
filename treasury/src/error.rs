use citadel_types::{Classify, ErrorKind};
use citadel_veto::VetoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ForensicError {
    #[error(transparent)]
    Veto(#[from] VetoError),

    #[error("{0} is not an active guardian")]
    NotGuardian(String),

    #[error("only the treasury owner may {0}")]
    NotOwner(&'static str),

    #[error("invalid principal id {0:?}")]
    InvalidPrincipal(String),

    #[error("amount must be non-zero")]
    ZeroAmount,

    #[error("block detection threshold must be greater than zero")]
    ZeroThreshold,

    #[error("{0} has already approved the forensic switch")]
    AlreadyApproved(String),

    #[error("forensic switch is already active")]
    AlreadyActive,

    #[error("forensic switch is not active")]
    NotActive,

    #[error("insufficient approvals: {have} < {need}")]
    InsufficientApprovals { have: usize, need: usize },

    #[error("reactivation cooldown has {remaining_secs}s remaining")]
    CooldownActive { remaining_secs: u64 },

    #[error("{0} is already a registered backup")]
    BackupAlreadyRegistered(String),

    #[error("{0} is not a registered backup")]
    NotBackup(String),

    #[error("at least {need} backup principals are required, {have} registered")]
    InsufficientBackups { have: usize, need: usize },

    #[error("insufficient protected balance: need {needed}, have {available}")]
    InsufficientBalance { needed: u128, available: u128 },

    #[error("protected reserve is empty")]
    EmptyReserve,

    #[error("arithmetic overflow in treasury accounting")]
    Overflow,
}

impl Classify for ForensicError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Veto(e) => e.kind(),
            Self::NotGuardian(_) | Self::NotOwner(_) => ErrorKind::Authorization,
            Self::InvalidPrincipal(_)
            | Self::ZeroAmount
            | Self::ZeroThreshold
            | Self::NotBackup(_)
            | Self::InsufficientBackups { .. }
            | Self::Overflow => ErrorKind::Validation,
            Self::AlreadyApproved(_)
            | Self::AlreadyActive
            | Self::NotActive
            | Self::InsufficientApprovals { .. }
            | Self::CooldownActive { .. }
            | Self::BackupAlreadyRegistered(_) => ErrorKind::StateConflict,
            Self::InsufficientBalance { .. } | Self::EmptyReserve => ErrorKind::Resource,
        }
    }
}
