use citadel_types::{Classify, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnchorError {
    #[error("only the ledger owner may {0}")]
    NotOwner(&'static str),

    #[error("{0} is not an authorized sealer")]
    NotSealer(String),

    #[error("invalid principal id {0:?}")]
    InvalidPrincipal(String),

    #[error("milestone description is required")]
    EmptyDescription,

    #[error("action hash is required")]
    ZeroActionHash,

    #[error("anchor type is required")]
    EmptyAnchorType,

    #[error("content hash is required")]
    ZeroContentHash,

    #[error("covenant uri is required")]
    EmptyCovenantUri,

    #[error("covenant root hash is required")]
    ZeroRootHash,

    #[error("milestone {0} already exists")]
    DuplicateMilestone(String),

    #[error("anchor {0} already exists")]
    DuplicateAnchor(String),

    #[error("milestone {0} not found")]
    MilestoneNotFound(String),

    #[error("anchor {0} not found")]
    AnchorNotFound(String),

    #[error("milestone {0} is already sealed")]
    AlreadySealed(String),

    #[error("anchor {anchor} is already linked to milestone {milestone}")]
    AlreadyLinked { anchor: String, milestone: String },

    #[error("{0} is already an authorized sealer")]
    SealerAlreadyAuthorized(String),

    #[error("{0} is not a registered sealer")]
    UnknownSealer(String),

    #[error("quorum sealing requires a seal ledger")]
    QuorumSealingUnavailable,

    #[error("seal {0} has not been executed")]
    SealNotExecuted(String),

    #[error("seal {seal} authorizes a different action than milestone {milestone}")]
    SealActionMismatch { seal: String, milestone: String },

    #[error("anchor snapshot: {0}")]
    Snapshot(String),
}

impl Classify for AnchorError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::NotOwner(_) | Self::NotSealer(_) => ErrorKind::Authorization,
            Self::InvalidPrincipal(_)
            | Self::EmptyDescription
            | Self::ZeroActionHash
            | Self::EmptyAnchorType
            | Self::ZeroContentHash
            | Self::EmptyCovenantUri
            | Self::ZeroRootHash
            | Self::MilestoneNotFound(_)
            | Self::AnchorNotFound(_)
            | Self::UnknownSealer(_)
            | Self::QuorumSealingUnavailable
            | Self::SealActionMismatch { .. }
            | Self::Snapshot(_) => ErrorKind::Validation,
            Self::DuplicateMilestone(_)
            | Self::DuplicateAnchor(_)
            | Self::AlreadySealed(_)
            | Self::AlreadyLinked { .. }
            | Self::SealerAlreadyAuthorized(_)
            | Self::SealNotExecuted(_) => ErrorKind::StateConflict,
        }
    }
}
