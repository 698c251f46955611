use crate::{GameError, Result};
use rps_core::{new_match_id, Identity, MatchId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Token handed out when a challenge is accepted. Fixes who may commit to the
/// match, not which slot they end up in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pairing {
    pub match_id: MatchId,
    pub challenger: Identity,
    pub acceptor: Identity,
}

impl Pairing {
    pub fn includes(&self, identity: &Identity) -> bool {
        self.challenger == *identity || self.acceptor == *identity
    }

    pub fn opponent_of(&self, identity: &Identity) -> Option<&Identity> {
        if self.challenger == *identity {
            Some(&self.acceptor)
        } else if self.acceptor == *identity {
            Some(&self.challenger)
        } else {
            None
        }
    }
}

/// Challenge / accept / reject relationships between identities.
///
/// `outgoing` and `incoming` mirror each other: `outgoing[c] == t` exactly when
/// `incoming[t] == c`. Each identity has at most one pending challenge out and
/// one in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PairingLedger {
    /// challenger -> target.
    outgoing: HashMap<Identity, Identity>,
    /// target -> challenger.
    incoming: HashMap<Identity, Identity>,
    /// Both members of a live pairing map to its match.
    active: HashMap<Identity, MatchId>,
}

impl PairingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any earlier pending challenge from `challenger`, and any
    /// earlier challenge anyone else had pending against `target`.
    pub fn challenge(&mut self, challenger: &Identity, target: &Identity) -> Result<()> {
        if challenger == target {
            return Err(GameError::InvalidTarget);
        }
        self.ensure_free(challenger)?;
        self.ensure_free(target)?;

        self.withdraw(challenger);
        if let Some(displaced) = self.clear_incoming(target) {
            tracing::info!("{}'s challenge to {} was displaced", displaced, target);
        }

        self.outgoing.insert(challenger.clone(), target.clone());
        self.incoming.insert(target.clone(), challenger.clone());

        tracing::info!("{} challenged {}", challenger, target);
        Ok(())
    }

    /// Consume the challenge from `challenger` to `acceptor` and open a pairing.
    pub fn accept(&mut self, acceptor: &Identity, challenger: &Identity) -> Result<Pairing> {
        if self.outgoing.get(challenger) != Some(acceptor) {
            return Err(GameError::NoSuchChallenge);
        }
        self.ensure_free(challenger)?;
        self.ensure_free(acceptor)?;

        // Nothing pending survives for either member once paired
        for identity in [challenger, acceptor] {
            self.withdraw(identity);
            self.clear_incoming(identity);
        }

        let pairing = Pairing {
            match_id: new_match_id(),
            challenger: challenger.clone(),
            acceptor: acceptor.clone(),
        };
        self.active.insert(challenger.clone(), pairing.match_id);
        self.active.insert(acceptor.clone(), pairing.match_id);

        tracing::info!(
            "{} accepted challenge from {} (match {})",
            acceptor,
            challenger,
            pairing.match_id
        );
        Ok(pairing)
    }

    /// Delete the challenge targeting `target`. Returns the challenger.
    pub fn reject(&mut self, target: &Identity) -> Result<Identity> {
        let challenger = self
            .clear_incoming(target)
            .ok_or(GameError::NoSuchChallenge)?;

        tracing::info!("{} rejected challenge from {}", target, challenger);
        Ok(challenger)
    }

    /// Release both members of a finished pairing.
    pub fn release(&mut self, pairing: &Pairing) {
        for identity in [&pairing.challenger, &pairing.acceptor] {
            if self.active.get(identity) == Some(&pairing.match_id) {
                self.active.remove(identity);
            }
        }
    }

    pub fn challenger_of(&self, target: &Identity) -> Option<&Identity> {
        self.incoming.get(target)
    }

    pub fn target_of(&self, challenger: &Identity) -> Option<&Identity> {
        self.outgoing.get(challenger)
    }

    pub fn match_of(&self, identity: &Identity) -> Option<MatchId> {
        self.active.get(identity).copied()
    }

    /// Drop the challenge `challenger` has pending, if any.
    fn withdraw(&mut self, challenger: &Identity) {
        if let Some(target) = self.outgoing.remove(challenger) {
            self.incoming.remove(&target);
        }
    }

    /// Drop the challenge pending against `target`, if any. Returns its challenger.
    fn clear_incoming(&mut self, target: &Identity) -> Option<Identity> {
        let challenger = self.incoming.remove(target)?;
        self.outgoing.remove(&challenger);
        Some(challenger)
    }

    fn ensure_free(&self, identity: &Identity) -> Result<()> {
        match self.active.get(identity) {
            Some(match_id) => Err(GameError::AlreadyPaired(*match_id)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> Identity {
        Identity::new(name).unwrap()
    }

    #[test]
    fn test_cannot_challenge_self() {
        let mut ledger = PairingLedger::new();
        let result = ledger.challenge(&id("alice"), &id("alice"));
        assert!(matches!(result, Err(GameError::InvalidTarget)));
    }

    #[test]
    fn test_challenge_and_accept() {
        let mut ledger = PairingLedger::new();
        let (alice, bob) = (id("alice"), id("bob"));

        ledger.challenge(&alice, &bob).unwrap();
        assert_eq!(ledger.challenger_of(&bob), Some(&alice));
        assert_eq!(ledger.target_of(&alice), Some(&bob));

        let pairing = ledger.accept(&bob, &alice).unwrap();
        assert_eq!(pairing.challenger, alice);
        assert_eq!(pairing.acceptor, bob);
        assert_eq!(ledger.match_of(&alice), Some(pairing.match_id));
        assert_eq!(ledger.match_of(&bob), Some(pairing.match_id));
        assert_eq!(ledger.challenger_of(&bob), None);
        assert_eq!(pairing.opponent_of(&alice), Some(&bob));
    }

    #[test]
    fn test_accept_requires_matching_challenge() {
        let mut ledger = PairingLedger::new();
        let (alice, bob, carol) = (id("alice"), id("bob"), id("carol"));

        assert!(matches!(
            ledger.accept(&bob, &alice),
            Err(GameError::NoSuchChallenge)
        ));

        ledger.challenge(&alice, &bob).unwrap();
        assert!(matches!(
            ledger.accept(&carol, &alice),
            Err(GameError::NoSuchChallenge)
        ));
    }

    #[test]
    fn test_rechallenge_replaces_pending_target() {
        let mut ledger = PairingLedger::new();
        let (alice, bob, carol) = (id("alice"), id("bob"), id("carol"));

        ledger.challenge(&alice, &bob).unwrap();
        ledger.challenge(&alice, &carol).unwrap();

        assert_eq!(ledger.target_of(&alice), Some(&carol));
        assert_eq!(ledger.challenger_of(&bob), None);
        assert!(matches!(
            ledger.accept(&bob, &alice),
            Err(GameError::NoSuchChallenge)
        ));
        assert!(ledger.accept(&carol, &alice).is_ok());
    }

    #[test]
    fn test_reject_deletes_challenge() {
        let mut ledger = PairingLedger::new();
        let (alice, bob) = (id("alice"), id("bob"));

        assert!(matches!(ledger.reject(&bob), Err(GameError::NoSuchChallenge)));

        ledger.challenge(&alice, &bob).unwrap();
        assert_eq!(ledger.reject(&bob).unwrap(), alice);
        assert_eq!(ledger.challenger_of(&bob), None);
        assert_eq!(ledger.target_of(&alice), None);
        assert!(matches!(
            ledger.accept(&bob, &alice),
            Err(GameError::NoSuchChallenge)
        ));
    }

    #[test]
    fn test_new_challenger_displaces_earlier_one() {
        let mut ledger = PairingLedger::new();
        let (alice, bob, carol, dave) = (id("alice"), id("bob"), id("carol"), id("dave"));

        ledger.challenge(&alice, &bob).unwrap();
        ledger.challenge(&carol, &bob).unwrap();
        assert_eq!(ledger.challenger_of(&bob), Some(&carol));
        assert_eq!(ledger.target_of(&alice), None);

        // Carol moves on: nothing is left pending against Bob
        ledger.challenge(&carol, &dave).unwrap();
        assert_eq!(ledger.challenger_of(&bob), None);
        assert!(matches!(ledger.reject(&bob), Err(GameError::NoSuchChallenge)));
        assert!(matches!(
            ledger.accept(&bob, &alice),
            Err(GameError::NoSuchChallenge)
        ));
        assert_eq!(ledger.challenger_of(&dave), Some(&carol));
    }

    #[test]
    fn test_reject_leaves_no_stale_challenge() {
        let mut ledger = PairingLedger::new();
        let (alice, bob, carol) = (id("alice"), id("bob"), id("carol"));

        ledger.challenge(&alice, &bob).unwrap();
        ledger.challenge(&carol, &bob).unwrap();

        assert_eq!(ledger.reject(&bob).unwrap(), carol);
        assert!(matches!(ledger.reject(&bob), Err(GameError::NoSuchChallenge)));
        assert_eq!(ledger.target_of(&alice), None);
        assert_eq!(ledger.target_of(&carol), None);
        assert!(matches!(
            ledger.accept(&bob, &alice),
            Err(GameError::NoSuchChallenge)
        ));
    }

    #[test]
    fn test_accept_clears_challenges_aimed_at_the_pair() {
        let mut ledger = PairingLedger::new();
        let (alice, bob, carol) = (id("alice"), id("bob"), id("carol"));

        ledger.challenge(&carol, &alice).unwrap();
        ledger.challenge(&alice, &bob).unwrap();
        ledger.accept(&bob, &alice).unwrap();

        assert_eq!(ledger.challenger_of(&alice), None);
        assert_eq!(ledger.target_of(&carol), None);
    }

    #[test]
    fn test_paired_players_are_busy_until_released() {
        let mut ledger = PairingLedger::new();
        let (alice, bob, carol) = (id("alice"), id("bob"), id("carol"));

        ledger.challenge(&alice, &bob).unwrap();
        let pairing = ledger.accept(&bob, &alice).unwrap();

        assert!(matches!(
            ledger.challenge(&carol, &alice),
            Err(GameError::AlreadyPaired(_))
        ));
        assert!(matches!(
            ledger.challenge(&bob, &carol),
            Err(GameError::AlreadyPaired(_))
        ));

        ledger.release(&pairing);
        assert_eq!(ledger.match_of(&alice), None);
        assert!(ledger.challenge(&bob, &alice).is_ok());
    }
}
