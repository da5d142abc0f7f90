use citadel_types::{Classify, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("stake ledger: {0}")]
    Stake(#[from] citadel_stake::StakeError),

    #[error("guardian registry: {0}")]
    Registry(#[from] citadel_quorum::RegistryError),

    #[error("seal ledger: {0}")]
    Seal(#[from] citadel_quorum::SealError),

    #[error("emergency veto: {0}")]
    Veto(#[from] citadel_veto::VetoError),

    #[error("forensic guard: {0}")]
    Forensic(#[from] citadel_treasury::ForensicError),

    #[error("anchor ledger: {0}")]
    Anchor(#[from] citadel_anchor::AnchorError),

    #[error("governance: {0}")]
    Governance(#[from] citadel_governance::GovernanceError),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Classify for NodeError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Stake(e) => e.kind(),
            Self::Registry(e) => e.kind(),
            Self::Seal(e) => e.kind(),
            Self::Veto(e) => e.kind(),
            Self::Forensic(e) => e.kind(),
            Self::Anchor(e) => e.kind(),
            Self::Governance(e) => e.kind(),
            Self::Config(_) => ErrorKind::Validation,
            Self::Io(_) => ErrorKind::Resource,
        }
    }
}
