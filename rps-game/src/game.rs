use crate::commitment::{Commitment, CommitmentScheme};
use crate::moves::Move;
use crate::pairing::Pairing;
use crate::player::PlayerSlot;
use crate::resolver::{resolve, Outcome};
use crate::{GameError, Result};
use chrono::{DateTime, Utc};
use rps_core::config::span_offset;
use rps_core::{Amount, ArenaConfig, Identity, MatchId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Match progress. Derived from how many slots are committed and revealed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Stage {
    AwaitingFirstCommit = 0,
    AwaitingSecondCommit = 1,
    BothCommitted = 2,
    OneRevealed = 3,
    /// Both moves are out; the match can be settled.
    Resolved = 4,
}

impl Stage {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::AwaitingFirstCommit => "awaiting commits (0/2)",
            Stage::AwaitingSecondCommit => "awaiting commits (1/2)",
            Stage::BothCommitted => "both committed",
            Stage::OneRevealed => "one revealed",
            Stage::Resolved => "both revealed",
        };
        write!(f, "{} [{}]", label, self.as_u8())
    }
}

/// How escrow is released.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Award {
    /// Every stake goes back to whoever put it in.
    Refund,
    /// The whole pot goes to one player.
    Winner(Identity),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettleReason {
    Revealed,
    RevealTimeout,
    CommitTimeout,
}

impl fmt::Display for SettleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SettleReason::Revealed => "revealed",
            SettleReason::RevealTimeout => "reveal-timeout",
            SettleReason::CommitTimeout => "commit-timeout",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub award: Award,
    pub reason: SettleReason,
}

/// A single match between the two members of a pairing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pairing: Pairing,
    fixed_bet: Amount,
    reveal_span: std::time::Duration,
    slots: Vec<PlayerSlot>,
    opened_at: DateTime<Utc>,
    commit_deadline: Option<DateTime<Utc>>,
    reveal_deadline: Option<DateTime<Utc>>,
}

impl Match {
    pub fn open(pairing: Pairing, config: &ArenaConfig, now: DateTime<Utc>) -> Result<Self> {
        let commit_deadline = Self::commit_deadline_for(config, now)?;
        Ok(Self::with_commit_deadline(pairing, config, now, commit_deadline))
    }

    /// When a match opened at `opened_at` stops accepting commitments, if ever.
    pub fn commit_deadline_for(
        config: &ArenaConfig,
        opened_at: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>> {
        match config.commit_offset()? {
            Some(offset) => Ok(Some(
                opened_at
                    .checked_add_signed(offset)
                    .ok_or_else(|| GameError::internal("commit deadline out of range"))?,
            )),
            None => Ok(None),
        }
    }

    pub fn with_commit_deadline(
        pairing: Pairing,
        config: &ArenaConfig,
        now: DateTime<Utc>,
        commit_deadline: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            pairing,
            fixed_bet: config.fixed_bet,
            reveal_span: config.reveal_span,
            slots: Vec::with_capacity(2),
            opened_at: now,
            commit_deadline,
            reveal_deadline: None,
        }
    }

    pub fn id(&self) -> MatchId {
        self.pairing.match_id
    }

    pub fn pairing(&self) -> &Pairing {
        &self.pairing
    }

    pub fn fixed_bet(&self) -> Amount {
        self.fixed_bet
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    pub fn commit_deadline(&self) -> Option<DateTime<Utc>> {
        self.commit_deadline
    }

    pub fn reveal_deadline(&self) -> Option<DateTime<Utc>> {
        self.reveal_deadline
    }

    pub fn slots(&self) -> &[PlayerSlot] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Option<&PlayerSlot> {
        self.slots.get(index)
    }

    pub fn slot_of(&self, identity: &Identity) -> Option<&PlayerSlot> {
        self.slots.iter().find(|s| s.identity() == identity)
    }

    pub fn stage(&self) -> Stage {
        let revealed = self.slots.iter().filter(|s| s.has_revealed()).count();
        match (self.slots.len(), revealed) {
            (0, _) => Stage::AwaitingFirstCommit,
            (1, _) => Stage::AwaitingSecondCommit,
            (_, 0) => Stage::BothCommitted,
            (_, 1) => Stage::OneRevealed,
            _ => Stage::Resolved,
        }
    }

    /// Check a commit without applying it.
    pub fn validate_commit(&self, identity: &Identity, stake: Amount) -> Result<()> {
        if !self.pairing.includes(identity) {
            return Err(GameError::NotChallenged);
        }

        if self.slots.len() >= 2 {
            return Err(GameError::AlreadyFull);
        }

        if self.slot_of(identity).is_some() {
            return Err(GameError::AlreadyCommitted);
        }

        if stake < self.fixed_bet {
            return Err(GameError::InsufficientStake {
                need: self.fixed_bet.to_units(),
                got: stake.to_units(),
            });
        }

        Ok(())
    }

    /// Record a commitment in the next free slot. The caller escrows the stake.
    pub fn commit(
        &mut self,
        identity: &Identity,
        commitment: Commitment,
        stake: Amount,
        now: DateTime<Utc>,
    ) -> Result<Stage> {
        self.validate_commit(identity, stake)?;

        let reveal_deadline = if self.slots.len() == 1 {
            let offset = span_offset(self.reveal_span)?;
            let deadline = now
                .checked_add_signed(offset)
                .ok_or_else(|| GameError::internal("reveal deadline out of range"))?;
            Some(deadline)
        } else {
            None
        };

        self.slots
            .push(PlayerSlot::new(identity.clone(), commitment, stake));
        if reveal_deadline.is_some() {
            self.reveal_deadline = reveal_deadline;
        }

        let stage = self.stage();
        tracing::info!(
            "{} committed to match {} with stake {} ({})",
            identity,
            self.id(),
            stake,
            stage
        );
        if let Some(deadline) = self.reveal_deadline.filter(|_| stage == Stage::BothCommitted) {
            tracing::info!("Match {} reveal phase ends at {}", self.id(), deadline);
        }

        Ok(stage)
    }

    /// Check a disclosed move against the caller's stored commitment.
    pub fn reveal<S: CommitmentScheme>(
        &mut self,
        identity: &Identity,
        code: u8,
        secret: &[u8],
    ) -> Result<Stage> {
        if !self.pairing.includes(identity) {
            return Err(GameError::NotChallenged);
        }

        let stage = self.stage();
        if stage < Stage::BothCommitted {
            return Err(GameError::too_early("both players must commit before revealing"));
        }

        let match_id = self.id();
        let slot = self
            .slots
            .iter_mut()
            .find(|s| s.identity() == identity)
            .ok_or(GameError::NotChallenged)?;

        if slot.has_revealed() {
            return Err(GameError::AlreadyRevealed);
        }

        let mv = Move::from_code(code)?;

        if !S::verify(slot.commitment(), identity, code, secret) {
            tracing::warn!("{} revealed a move that does not match their commitment", identity);
            return Err(GameError::CommitmentMismatch);
        }

        slot.set_revealed(mv);
        let stage = self.stage();
        tracing::info!("{} revealed in match {} ({})", identity, match_id, stage);

        Ok(stage)
    }

    /// Decide how the escrow is released, or say why it cannot be yet.
    pub fn settle(&self, now: DateTime<Utc>) -> Result<Verdict> {
        match self.stage() {
            Stage::Resolved => {
                let (a, b) = (&self.slots[0], &self.slots[1]);
                let (mv_a, mv_b) = match (a.revealed_move(), b.revealed_move()) {
                    (Some(mv_a), Some(mv_b)) => (mv_a, mv_b),
                    _ => return Err(GameError::internal("resolved match is missing a move")),
                };

                let award = match resolve(mv_a, mv_b) {
                    Outcome::Draw => Award::Refund,
                    Outcome::AWins => Award::Winner(a.identity().clone()),
                    Outcome::BWins => Award::Winner(b.identity().clone()),
                };

                Ok(Verdict {
                    award,
                    reason: SettleReason::Revealed,
                })
            }
            Stage::BothCommitted | Stage::OneRevealed => {
                let deadline = self
                    .reveal_deadline
                    .ok_or_else(|| GameError::internal("reveal deadline not set"))?;
                if now <= deadline {
                    return Err(GameError::too_early(format!(
                        "waiting for reveals until {}",
                        deadline
                    )));
                }

                // Whoever did not reveal forfeits; nobody revealing is a refund
                let award = match self.slots.iter().find(|s| s.has_revealed()) {
                    Some(revealer) => Award::Winner(revealer.identity().clone()),
                    None => Award::Refund,
                };

                Ok(Verdict {
                    award,
                    reason: SettleReason::RevealTimeout,
                })
            }
            Stage::AwaitingFirstCommit | Stage::AwaitingSecondCommit => {
                match self.commit_deadline {
                    Some(deadline) if now > deadline => Ok(Verdict {
                        award: Award::Refund,
                        reason: SettleReason::CommitTimeout,
                    }),
                    Some(deadline) => Err(GameError::too_early(format!(
                        "waiting for commitments until {}",
                        deadline
                    ))),
                    None => Err(GameError::too_early("waiting for both commitments")),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commitment::{commit_hash, IdentityBoundCommitment};
    use chrono::Duration;

    fn id(name: &str) -> Identity {
        Identity::new(name).unwrap()
    }

    fn config() -> ArenaConfig {
        ArenaConfig::new(Amount::from_units(1), std::time::Duration::from_secs(5))
    }

    fn open_match(now: DateTime<Utc>) -> Match {
        let pairing = Pairing {
            match_id: rps_core::new_match_id(),
            challenger: id("alice"),
            acceptor: id("bob"),
        };
        Match::open(pairing, &config(), now).unwrap()
    }

    fn stake(units: u64) -> Amount {
        Amount::from_units(units)
    }

    #[test]
    fn test_stage_follows_commits_and_reveals() {
        let now = Utc::now();
        let mut game = open_match(now);
        let (alice, bob) = (id("alice"), id("bob"));
        assert_eq!(game.stage(), Stage::AwaitingFirstCommit);

        let stage = game
            .commit(&bob, commit_hash(&bob, Move::Paper, None), stake(2), now)
            .unwrap();
        assert_eq!(stage, Stage::AwaitingSecondCommit);
        assert_eq!(game.reveal_deadline(), None);

        let stage = game
            .commit(&alice, commit_hash(&alice, Move::Rock, None), stake(2), now)
            .unwrap();
        assert_eq!(stage, Stage::BothCommitted);
        assert_eq!(game.reveal_deadline(), Some(now + Duration::seconds(5)));

        // Slot order is commit order, not challenge order
        assert_eq!(game.slot(0).unwrap().identity(), &bob);
        assert_eq!(game.slot(1).unwrap().identity(), &alice);

        let stage = game
            .reveal::<IdentityBoundCommitment>(&alice, Move::Rock.code(), &[])
            .unwrap();
        assert_eq!(stage, Stage::OneRevealed);
        let stage = game
            .reveal::<IdentityBoundCommitment>(&bob, Move::Paper.code(), &[])
            .unwrap();
        assert_eq!(stage, Stage::Resolved);

        let verdict = game.settle(now).unwrap();
        assert_eq!(verdict.award, Award::Winner(bob));
        assert_eq!(verdict.reason, SettleReason::Revealed);
    }

    #[test]
    fn test_commit_rules() {
        let now = Utc::now();
        let mut game = open_match(now);
        let (alice, bob, carol) = (id("alice"), id("bob"), id("carol"));
        let hash = commit_hash(&alice, Move::Rock, None);

        assert!(matches!(
            game.commit(&carol, hash, stake(2), now),
            Err(GameError::NotChallenged)
        ));
        assert!(matches!(
            game.commit(&alice, hash, stake(0), now),
            Err(GameError::InsufficientStake { need: 1, got: 0 })
        ));

        game.commit(&alice, hash, stake(1), now).unwrap();
        assert!(matches!(
            game.commit(&alice, hash, stake(1), now),
            Err(GameError::AlreadyCommitted)
        ));

        game.commit(&bob, commit_hash(&bob, Move::Rock, None), stake(3), now)
            .unwrap();
        assert!(matches!(
            game.commit(&alice, hash, stake(1), now),
            Err(GameError::AlreadyFull)
        ));
        assert_eq!(game.slots().len(), 2);
    }

    #[test]
    fn test_reveal_rules() {
        let now = Utc::now();
        let mut game = open_match(now);
        let (alice, bob) = (id("alice"), id("bob"));

        game.commit(&alice, commit_hash(&alice, Move::Paper, None), stake(2), now)
            .unwrap();
        assert!(matches!(
            game.reveal::<IdentityBoundCommitment>(&alice, Move::Paper.code(), &[]),
            Err(GameError::TooEarly(_))
        ));

        game.commit(&bob, commit_hash(&bob, Move::Paper, None), stake(2), now)
            .unwrap();

        assert!(matches!(
            game.reveal::<IdentityBoundCommitment>(&alice, 7, &[]),
            Err(GameError::InvalidMove(7))
        ));
        assert!(matches!(
            game.reveal::<IdentityBoundCommitment>(&alice, 0, &[]),
            Err(GameError::InvalidMove(0))
        ));
        assert!(matches!(
            game.reveal::<IdentityBoundCommitment>(&alice, Move::Rock.code(), &[]),
            Err(GameError::CommitmentMismatch)
        ));
        assert_eq!(game.stage(), Stage::BothCommitted);

        game.reveal::<IdentityBoundCommitment>(&alice, Move::Paper.code(), &[])
            .unwrap();
        assert!(matches!(
            game.reveal::<IdentityBoundCommitment>(&alice, Move::Paper.code(), &[]),
            Err(GameError::AlreadyRevealed)
        ));
        assert_eq!(game.stage(), Stage::OneRevealed);
    }

    #[test]
    fn test_copied_commitment_cannot_be_revealed() {
        let now = Utc::now();
        let mut game = open_match(now);
        let (alice, bob) = (id("alice"), id("bob"));

        let alice_hash = commit_hash(&alice, Move::Scissors, None);
        game.commit(&alice, alice_hash, stake(1), now).unwrap();
        // Bob replays Alice's published hash
        game.commit(&bob, alice_hash, stake(1), now).unwrap();

        for mv in Move::ALL {
            assert!(matches!(
                game.reveal::<IdentityBoundCommitment>(&bob, mv.code(), &[]),
                Err(GameError::CommitmentMismatch)
            ));
        }
    }

    #[test]
    fn test_settle_timeouts() {
        let now = Utc::now();
        let mut game = open_match(now);
        let (alice, bob) = (id("alice"), id("bob"));

        assert!(matches!(game.settle(now), Err(GameError::TooEarly(_))));

        game.commit(&alice, commit_hash(&alice, Move::Rock, None), stake(1), now)
            .unwrap();
        game.commit(&bob, commit_hash(&bob, Move::Paper, None), stake(1), now)
            .unwrap();

        let deadline = game.reveal_deadline().unwrap();
        assert!(matches!(game.settle(deadline), Err(GameError::TooEarly(_))));

        let late = deadline + Duration::seconds(1);
        let verdict = game.settle(late).unwrap();
        assert_eq!(verdict.award, Award::Refund);
        assert_eq!(verdict.reason, SettleReason::RevealTimeout);

        // Alice reveals a losing move; Bob never shows up and forfeits anyway
        game.reveal::<IdentityBoundCommitment>(&alice, Move::Rock.code(), &[])
            .unwrap();
        let verdict = game.settle(late).unwrap();
        assert_eq!(verdict.award, Award::Winner(alice));
        assert_eq!(verdict.reason, SettleReason::RevealTimeout);
    }

    #[test]
    fn test_commit_deadline_refunds_lone_commit() {
        let now = Utc::now();
        let pairing = Pairing {
            match_id: rps_core::new_match_id(),
            challenger: id("alice"),
            acceptor: id("bob"),
        };
        let config = config().with_commit_span(std::time::Duration::from_secs(60));
        let mut game = Match::open(pairing, &config, now).unwrap();
        let alice = id("alice");

        game.commit(&alice, commit_hash(&alice, Move::Rock, None), stake(1), now)
            .unwrap();
        assert!(matches!(
            game.settle(now + Duration::seconds(60)),
            Err(GameError::TooEarly(_))
        ));

        let verdict = game.settle(now + Duration::seconds(61)).unwrap();
        assert_eq!(verdict.award, Award::Refund);
        assert_eq!(verdict.reason, SettleReason::CommitTimeout);
    }
}
