//! Escrowed Rock-Paper-Scissors for 2 players
//!
//! Players pair up through challenges, commit to a hidden move with a stake,
//! reveal once both commitments are in, and the escrowed pot is released to
//! the winner (or back to both players on a draw).

pub mod arena;
pub mod commitment;
pub mod error;
pub mod escrow;
pub mod events;
pub mod game;
pub mod moves;
pub mod pairing;
pub mod player;
pub mod resolver;
pub mod service;
pub mod treasury;

pub use arena::Arena;
pub use commitment::{commit_hash, verify, Commitment, CommitmentScheme, IdentityBoundCommitment};
pub use error::{GameError, Result};
pub use escrow::{Escrow, Hold, Transfer};
pub use events::{ArenaEvent, MatchResolved};
pub use game::{Award, Match, SettleReason, Stage};
pub use moves::{Move, UNSET_MOVE};
pub use pairing::{Pairing, PairingLedger};
pub use player::PlayerSlot;
pub use resolver::{resolve, Outcome};
pub use service::ArenaService;
pub use treasury::{Balances, Treasury};

use rps_core::ArenaConfig;

/// Create a new arena with the default commitment scheme
pub fn create_arena(config: ArenaConfig) -> Result<Arena> {
    Arena::new(config)
}
