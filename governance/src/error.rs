use citadel_types::{Classify, ErrorKind};
use citadel_veto::VetoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GovernanceError {
    #[error(transparent)]
    Veto(#[from] VetoError),

    #[error("only the governance owner may {0}")]
    NotOwner(&'static str),

    #[error("proposal {0} not found")]
    ProposalNotFound(String),

    #[error("proposal {0} already exists")]
    DuplicateProposal(String),

    #[error("document reference is required")]
    EmptyDocRef,

    #[error("proposal title is required")]
    EmptyTitle,

    #[error("principal {0} holds no stake")]
    NoStake(String),

    #[error("principal {0} has already voted on this proposal")]
    AlreadyVoted(String),

    #[error("voting window is not open")]
    VotingClosed,

    #[error("voting window has not closed yet")]
    VotingOpen,

    #[error("quorum not met: {have} weighted votes, need {need}")]
    QuorumNotMet { have: u128, need: u128 },

    #[error("proposal did not pass")]
    NotPassed,

    #[error("proposal has already been executed")]
    AlreadyExecuted,

    #[error("proposal has been cancelled")]
    Cancelled,

    #[error("proposal cooldown has {remaining_secs}s remaining")]
    CooldownActive { remaining_secs: u64 },

    #[error("rate limit reached: {max} proposals per {window_secs}s")]
    RateLimited { max: u32, window_secs: u64 },

    #[error("invalid governance parameter {name}: {reason}")]
    InvalidParam { name: &'static str, reason: String },

    #[error("arithmetic overflow in vote tally")]
    Overflow,
}

impl Classify for GovernanceError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Veto(e) => e.kind(),
            Self::NotOwner(_) => ErrorKind::Authorization,
            Self::ProposalNotFound(_)
            | Self::EmptyDocRef
            | Self::EmptyTitle
            | Self::NoStake(_)
            | Self::InvalidParam { .. }
            | Self::Overflow => ErrorKind::Validation,
            Self::DuplicateProposal(_)
            | Self::AlreadyVoted(_)
            | Self::VotingClosed
            | Self::VotingOpen
            | Self::QuorumNotMet { .. }
            | Self::NotPassed
            | Self::AlreadyExecuted
            | Self::Cancelled
            | Self::CooldownActive { .. } => ErrorKind::StateConflict,
            Self::RateLimited { .. } => ErrorKind::Resource,
        }
    }
}
