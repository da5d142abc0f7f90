use citadel_types::{Classify, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VetoError {
    #[error("operations halted by emergency veto: {reason}")]
    OperationsHalted { reason: String },

    #[error("{0} is not an active guardian")]
    NotGuardian(String),

    #[error("only the owner may override a veto")]
    NotOwner,

    #[error("a veto reason is required")]
    MissingReason,

    #[error("a veto is already in force")]
    AlreadyVetoed,

    #[error("no veto is in force")]
    NotVetoed,
}

impl Classify for VetoError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::NotGuardian(_) | Self::NotOwner => ErrorKind::Authorization,
            Self::MissingReason => ErrorKind::Validation,
            Self::OperationsHalted { .. } | Self::AlreadyVetoed | Self::NotVetoed => {
                ErrorKind::StateConflict
            }
        }
    }
}
