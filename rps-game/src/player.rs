use crate::commitment::Commitment;
use crate::moves::Move;
use rps_core::{Amount, Identity};
use serde::{Deserialize, Serialize};

/// One committed player in a match, indexed by commit order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSlot {
    identity: Identity,
    commitment: Commitment,
    revealed: Option<Move>,
    stake: Amount,
}

impl PlayerSlot {
    pub fn new(identity: Identity, commitment: Commitment, stake: Amount) -> Self {
        Self {
            identity,
            commitment,
            revealed: None,
            stake,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn commitment(&self) -> &Commitment {
        &self.commitment
    }

    pub fn revealed_move(&self) -> Option<Move> {
        self.revealed
    }

    pub fn stake(&self) -> Amount {
        self.stake
    }

    pub fn has_revealed(&self) -> bool {
        self.revealed.is_some()
    }

    pub(crate) fn set_revealed(&mut self, mv: Move) {
        self.revealed = Some(mv);
    }
}
