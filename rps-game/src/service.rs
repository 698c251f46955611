use crate::arena::Arena;
use crate::commitment::Commitment;
use crate::events::{ArenaEvent, MatchResolved};
use crate::game::Stage;
use crate::pairing::Pairing;
use crate::player::PlayerSlot;
use crate::treasury::Balances;
use crate::Result;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rps_core::{Amount, ArenaConfig, Clock, Identity, MatchId};
use std::sync::Arc;
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
struct Ledgers {
    arena: Arena,
    balances: Balances,
}

/// Serialized, all-or-nothing access to an arena and the balances it pays into.
///
/// Each operation runs against a copy of the ledgers that replaces the live copy
/// only on success. Events are broadcast after the new state is in place.
pub struct ArenaService {
    state: Mutex<Ledgers>,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<ArenaEvent>,
}

impl ArenaService {
    pub fn new(arena: Arena, balances: Balances, clock: Arc<dyn Clock>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Mutex::new(Ledgers { arena, balances }),
            clock,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ArenaEvent> {
        self.events.subscribe()
    }

    fn execute<T>(&self, op: impl FnOnce(&mut Ledgers, DateTime<Utc>) -> Result<T>) -> Result<T> {
        let mut live = self.state.lock();
        let mut scratch = live.clone();
        let now = self.clock.now();

        let output = match op(&mut scratch, now) {
            Ok(output) => output,
            Err(e) => {
                tracing::debug!("Arena operation rejected: {}", e);
                return Err(e);
            }
        };

        let events = scratch.arena.drain_events();
        *live = scratch;
        drop(live);

        for event in events {
            // No subscribers is fine
            let _ = self.events.send(event);
        }

        Ok(output)
    }

    pub fn deposit(&self, identity: &Identity, amount: Amount) -> Result<Amount> {
        self.execute(|ledgers, _| ledgers.balances.credit(identity, amount))
    }

    pub fn challenge(&self, caller: &Identity, target: &Identity) -> Result<()> {
        self.execute(|ledgers, _| ledgers.arena.challenge(caller, target))
    }

    pub fn accept_challenge(&self, caller: &Identity, challenger: &Identity) -> Result<Pairing> {
        self.execute(|ledgers, now| ledgers.arena.accept_challenge(caller, challenger, now))
    }

    pub fn reject_challenge(&self, caller: &Identity) -> Result<Identity> {
        self.execute(|ledgers, _| ledgers.arena.reject_challenge(caller))
    }

    /// Move `stake` out of the caller's balance and into the match escrow.
    pub fn commit(&self, caller: &Identity, commitment: Commitment, stake: Amount) -> Result<Stage> {
        self.execute(|ledgers, now| {
            ledgers.balances.debit(caller, stake)?;
            ledgers.arena.commit(caller, commitment, stake, now)
        })
    }

    pub fn reveal(&self, caller: &Identity, code: u8, secret: &[u8]) -> Result<Stage> {
        self.execute(|ledgers, _| ledgers.arena.reveal(caller, code, secret))
    }

    pub fn declare_winner(&self, caller: &Identity) -> Result<MatchResolved> {
        self.execute(|ledgers, now| {
            let Ledgers { arena, balances } = ledgers;
            arena.declare_winner(caller, now, balances)
        })
    }

    pub fn config(&self) -> ArenaConfig {
        self.state.lock().arena.config().clone()
    }

    pub fn stage_of(&self, match_id: MatchId) -> Option<Stage> {
        self.state.lock().arena.stage_of(match_id)
    }

    pub fn challenger_of(&self, identity: &Identity) -> Option<Identity> {
        self.state.lock().arena.challenger_of(identity).cloned()
    }

    pub fn slot_of(&self, match_id: MatchId, index: usize) -> Option<PlayerSlot> {
        self.state.lock().arena.slot_of(match_id, index).cloned()
    }

    pub fn pairing_of(&self, identity: &Identity) -> Option<MatchId> {
        self.state.lock().arena.pairing_of(identity)
    }

    pub fn balance(&self, identity: &Identity) -> Amount {
        self.state.lock().balances.balance(identity)
    }

    /// Copy of the current ledgers, for persistence.
    pub fn snapshot(&self) -> (Arena, Balances) {
        let ledgers = self.state.lock();
        (ledgers.arena.clone(), ledgers.balances.clone())
    }
}
