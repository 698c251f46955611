pub mod account;
pub mod arena;
pub mod pairing;
pub mod play;

pub use account::{fund, show_balance};
pub use arena::{init_arena, show_history, show_status};
pub use pairing::{accept, challenge, reject};
pub use play::{commit, print_hash, reveal, settle};

use rps_core::storage::{ArenaLock, ArenaStore, ArenaUpdate, RevealNote, SettlementRecord};
use rps_core::{Identity, MatchId, Storage, SystemClock};
use rps_game::{Arena, ArenaService, Balances, MatchResolved};
use std::sync::Arc;

/// One CLI invocation against a stored arena: load, run operations, persist.
///
/// The arena stays locked from `open` until `save`; dropping the session
/// instead discards every change.
pub(crate) struct Session<'a> {
    lock: ArenaLock<'a>,
    loaded: Balances,
    service: ArenaService,
}

impl<'a> Session<'a> {
    pub async fn open(storage: &'a Storage, name: &str) -> anyhow::Result<Self> {
        let lock = ArenaStore::new(storage).lock_arena(name).await?;
        let arena = Arena::from_snapshot(&lock.record().state)?;
        let loaded = Balances::from_accounts(lock.accounts()?);

        tracing::debug!("Loaded arena '{}'", name);

        Ok(Self {
            service: ArenaService::new(arena, loaded.clone(), Arc::new(SystemClock)),
            lock,
            loaded,
        })
    }

    pub fn service(&self) -> &ArenaService {
        &self.service
    }

    /// The reveal note stored for `identity` in `match_id`, if any.
    pub fn note(&self, match_id: MatchId, identity: &Identity) -> anyhow::Result<Option<RevealNote>> {
        Ok(self.lock.note(match_id, identity)?)
    }

    /// Write arena state and the balances this session changed, plus
    /// whatever `update` already carries, then release the arena.
    pub fn save(self, mut update: ArenaUpdate) -> anyhow::Result<ArenaService> {
        let (arena, balances) = self.service.snapshot();
        update.state = arena.to_snapshot()?;
        update.balances = balances.changed_since(&self.loaded);

        self.lock.commit(&update)?;
        Ok(self.service)
    }
}

pub(crate) fn parse_identity(raw: &str) -> anyhow::Result<Identity> {
    Ok(Identity::new(raw)?)
}

pub(crate) fn settlement_record(resolution: &MatchResolved) -> SettlementRecord {
    SettlementRecord {
        match_id: resolution.match_id,
        player_a: resolution.challenger.clone(),
        player_b: resolution.acceptor.clone(),
        winner: resolution.winner.clone(),
        pot: resolution.pot,
        reason: resolution.reason.to_string(),
        settled_at: resolution.settled_at,
    }
}

pub(crate) fn short_id(id: &uuid::Uuid) -> String {
    id.to_string()[..8].to_string()
}
