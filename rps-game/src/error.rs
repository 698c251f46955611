use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, GameError>;

/// Rejections of an arena operation. Every variant leaves the arena untouched.
#[derive(Error, Debug)]
pub enum GameError {
    #[error("Core error: {0}")]
    Core(#[from] rps_core::CoreError),

    #[error("Invalid target: cannot challenge yourself")]
    InvalidTarget,

    #[error("No such challenge")]
    NoSuchChallenge,

    #[error("Not challenged: no accepted pairing for this player")]
    NotChallenged,

    #[error("Player is already paired in match {0}")]
    AlreadyPaired(Uuid),

    #[error("Insufficient stake: need at least {need}, got {got}")]
    InsufficientStake { need: u64, got: u64 },

    #[error("Match is full")]
    AlreadyFull,

    #[error("Player already committed to this match")]
    AlreadyCommitted,

    #[error("Invalid move code: {0}")]
    InvalidMove(u8),

    #[error("Revealed move does not match the commitment")]
    CommitmentMismatch,

    #[error("Move already revealed")]
    AlreadyRevealed,

    #[error("Too early: {0}")]
    TooEarly(String),

    #[error("Match already resolved")]
    AlreadyResolved,

    #[error("Unknown match: {0}")]
    UnknownMatch(Uuid),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GameError {
    pub fn too_early(msg: impl Into<String>) -> Self {
        Self::TooEarly(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
