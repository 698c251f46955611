use crate::escrow::Transfer;
use crate::game::{SettleReason, Stage};
use crate::moves::Move;
use crate::pairing::Pairing;
use chrono::{DateTime, Utc};
use rps_core::{Amount, Identity, MatchId};
use serde::{Deserialize, Serialize};

/// Final record of a settled match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResolved {
    pub match_id: MatchId,
    pub challenger: Identity,
    pub acceptor: Identity,
    /// `None` is a draw or a refund.
    pub winner: Option<Identity>,
    pub pot: Amount,
    pub reason: SettleReason,
    /// Commit order, with whatever was revealed.
    pub moves: Vec<(Identity, Option<Move>)>,
    pub transfers: Vec<Transfer>,
    pub settled_at: DateTime<Utc>,
}

impl MatchResolved {
    pub fn is_draw(&self) -> bool {
        self.winner.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArenaEvent {
    Challenged {
        challenger: Identity,
        target: Identity,
    },
    ChallengeAccepted(Pairing),
    ChallengeRejected {
        challenger: Identity,
        target: Identity,
    },
    Committed {
        match_id: MatchId,
        identity: Identity,
        stage: Stage,
    },
    Revealed {
        match_id: MatchId,
        identity: Identity,
        mv: Move,
        stage: Stage,
    },
    MatchResolved(MatchResolved),
}
