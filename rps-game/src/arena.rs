use crate::commitment::{Commitment, CommitmentScheme, IdentityBoundCommitment};
use crate::escrow::Escrow;
use crate::events::{ArenaEvent, MatchResolved};
use crate::game::{Award, Match, Stage};
use crate::pairing::{Pairing, PairingLedger};
use crate::player::PlayerSlot;
use crate::treasury::Treasury;
use crate::{GameError, Result};
use chrono::{DateTime, Utc};
use rps_core::{Amount, ArenaConfig, Identity, MatchId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::marker::PhantomData;

/// One deployed instance: configuration plus the pairing, match and escrow ledgers.
///
/// Every operation either fails without touching state or applies fully, with
/// the exception of treasury failures during payout (see [`crate::ArenaService`],
/// which rolls those back).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Arena<S = IdentityBoundCommitment> {
    config: ArenaConfig,
    pairings: PairingLedger,
    matches: HashMap<MatchId, Match>,
    escrow: Escrow,
    /// Most recent settlement per identity; older ones live in storage only.
    last_resolved: HashMap<Identity, MatchResolved>,
    #[serde(skip)]
    events: Vec<ArenaEvent>,
    #[serde(skip)]
    scheme: PhantomData<S>,
}

impl Arena<IdentityBoundCommitment> {
    pub fn new(config: ArenaConfig) -> Result<Self> {
        Self::with_scheme(config)
    }
}

impl<S: CommitmentScheme> Arena<S> {
    pub fn with_scheme(config: ArenaConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            pairings: PairingLedger::new(),
            matches: HashMap::new(),
            escrow: Escrow::new(),
            last_resolved: HashMap::new(),
            events: Vec::new(),
            scheme: PhantomData,
        })
    }

    pub fn from_snapshot(snapshot: &str) -> Result<Self> {
        let arena: Self = serde_json::from_str(snapshot)?;
        arena.config.validate()?;
        Ok(arena)
    }

    pub fn to_snapshot(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    pub fn challenge(&mut self, caller: &Identity, target: &Identity) -> Result<()> {
        self.pairings.challenge(caller, target)?;
        self.events.push(ArenaEvent::Challenged {
            challenger: caller.clone(),
            target: target.clone(),
        });
        Ok(())
    }

    /// Accept the pending challenge from `challenger` and open a fresh match.
    pub fn accept_challenge(
        &mut self,
        caller: &Identity,
        challenger: &Identity,
        now: DateTime<Utc>,
    ) -> Result<Pairing> {
        let commit_deadline = Match::commit_deadline_for(&self.config, now)?;

        let pairing = self.pairings.accept(caller, challenger)?;
        let game = Match::with_commit_deadline(pairing.clone(), &self.config, now, commit_deadline);
        self.matches.insert(pairing.match_id, game);

        self.events
            .push(ArenaEvent::ChallengeAccepted(pairing.clone()));
        Ok(pairing)
    }

    /// Drop the challenge aimed at `caller`. Returns who had sent it.
    pub fn reject_challenge(&mut self, caller: &Identity) -> Result<Identity> {
        let challenger = self.pairings.reject(caller)?;
        self.events.push(ArenaEvent::ChallengeRejected {
            challenger: challenger.clone(),
            target: caller.clone(),
        });
        Ok(challenger)
    }

    /// Commit to a hidden move. `stake` arrives with the call and goes straight to escrow.
    pub fn commit(
        &mut self,
        caller: &Identity,
        commitment: Commitment,
        stake: Amount,
        now: DateTime<Utc>,
    ) -> Result<Stage> {
        let match_id = self
            .pairings
            .match_of(caller)
            .ok_or(GameError::NotChallenged)?;
        let game = self
            .matches
            .get_mut(&match_id)
            .ok_or(GameError::UnknownMatch(match_id))?;

        game.validate_commit(caller, stake)?;
        self.escrow.total(match_id)?.checked_add(stake)?;
        let stage = game.commit(caller, commitment, stake, now)?;
        self.escrow.hold(match_id, caller, stake)?;

        self.events.push(ArenaEvent::Committed {
            match_id,
            identity: caller.clone(),
            stage,
        });
        Ok(stage)
    }

    /// Disclose the committed move. `secret` is whatever was mixed in at commit time.
    pub fn reveal(&mut self, caller: &Identity, code: u8, secret: &[u8]) -> Result<Stage> {
        let match_id = self.active_match_of(caller, GameError::NotChallenged)?;
        let game = self
            .matches
            .get_mut(&match_id)
            .ok_or(GameError::UnknownMatch(match_id))?;

        let stage = game.reveal::<S>(caller, code, secret)?;
        let mv = game
            .slot_of(caller)
            .and_then(PlayerSlot::revealed_move)
            .ok_or_else(|| GameError::internal("reveal did not record a move"))?;

        self.events.push(ArenaEvent::Revealed {
            match_id,
            identity: caller.clone(),
            mv,
            stage,
        });
        Ok(stage)
    }

    /// Settle the caller's match: both moves revealed, or a deadline passed.
    pub fn declare_winner(
        &mut self,
        caller: &Identity,
        now: DateTime<Utc>,
        treasury: &mut dyn Treasury,
    ) -> Result<MatchResolved> {
        let match_id =
            self.active_match_of(caller, GameError::too_early("no active match to settle"))?;
        self.settle(match_id, now, treasury)
    }

    fn settle(
        &mut self,
        match_id: MatchId,
        now: DateTime<Utc>,
        treasury: &mut dyn Treasury,
    ) -> Result<MatchResolved> {
        let game = self
            .matches
            .get(&match_id)
            .ok_or(GameError::UnknownMatch(match_id))?;
        let verdict = game.settle(now)?;
        let transfers = self.escrow.plan_payout(match_id, &verdict.award)?;
        let pot = self.escrow.total(match_id)?;

        // Tear the match down before any funds move
        let game = self
            .matches
            .remove(&match_id)
            .ok_or(GameError::UnknownMatch(match_id))?;
        self.pairings.release(game.pairing());

        let winner = match &verdict.award {
            Award::Winner(winner) => Some(winner.clone()),
            Award::Refund => None,
        };
        let resolution = MatchResolved {
            match_id,
            challenger: game.pairing().challenger.clone(),
            acceptor: game.pairing().acceptor.clone(),
            winner,
            pot,
            reason: verdict.reason,
            moves: game
                .slots()
                .iter()
                .map(|slot| (slot.identity().clone(), slot.revealed_move()))
                .collect(),
            transfers,
            settled_at: now,
        };
        for identity in [&resolution.challenger, &resolution.acceptor] {
            self.last_resolved
                .insert(identity.clone(), resolution.clone());
        }

        self.escrow.payout(match_id, &verdict.award, treasury)?;

        match &resolution.winner {
            Some(winner) => tracing::info!(
                "Match {} settled ({}): {} wins {}",
                match_id,
                resolution.reason,
                winner,
                pot
            ),
            None => tracing::info!(
                "Match {} settled ({}): stakes returned",
                match_id,
                resolution.reason
            ),
        }

        self.events
            .push(ArenaEvent::MatchResolved(resolution.clone()));
        Ok(resolution)
    }

    /// Active match for `identity`; settled players get `AlreadyResolved`.
    fn active_match_of(&self, identity: &Identity, otherwise: GameError) -> Result<MatchId> {
        if let Some(match_id) = self.pairings.match_of(identity) {
            return Ok(match_id);
        }
        if self.last_resolved.contains_key(identity) {
            return Err(GameError::AlreadyResolved);
        }
        Err(otherwise)
    }

    pub fn stage_of(&self, match_id: MatchId) -> Option<Stage> {
        self.matches.get(&match_id).map(Match::stage)
    }

    pub fn challenger_of(&self, identity: &Identity) -> Option<&Identity> {
        self.pairings.challenger_of(identity)
    }

    pub fn target_of(&self, identity: &Identity) -> Option<&Identity> {
        self.pairings.target_of(identity)
    }

    pub fn slot_of(&self, match_id: MatchId, index: usize) -> Option<&PlayerSlot> {
        self.matches.get(&match_id).and_then(|m| m.slot(index))
    }

    pub fn pairing_of(&self, identity: &Identity) -> Option<MatchId> {
        self.pairings.match_of(identity)
    }

    pub fn match_of(&self, match_id: MatchId) -> Option<&Match> {
        self.matches.get(&match_id)
    }

    pub fn matches(&self) -> impl Iterator<Item = &Match> {
        self.matches.values()
    }

    /// Only found while it is still the latest match of one of its players.
    pub fn resolution_of(&self, match_id: MatchId) -> Option<&MatchResolved> {
        self.last_resolved
            .values()
            .find(|resolution| resolution.match_id == match_id)
    }

    pub fn last_resolution_of(&self, identity: &Identity) -> Option<&MatchResolved> {
        self.last_resolved.get(identity)
    }

    pub fn escrowed(&self, match_id: MatchId) -> Result<Amount> {
        self.escrow.total(match_id)
    }

    /// Events produced since the last drain, oldest first.
    pub fn drain_events(&mut self) -> Vec<ArenaEvent> {
        std::mem::take(&mut self.events)
    }
}
