pub mod account_store;
pub mod arena_store;
pub mod note_store;

pub use account_store::AccountStore;
pub use arena_store::{ArenaLock, ArenaRecord, ArenaStore, ArenaUpdate, SettlementRecord};
pub use note_store::{NoteStore, RevealNote};

use crate::error::{CoreError, Result};
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;
use tokio::sync::Mutex;

/// How long a writer waits on another process holding the database.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Storage {
    conn: Mutex<Connection>,
}

impl Storage {
    pub async fn new(db_path: &Path) -> Result<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CoreError::internal(format!("Failed to create directory: {}", e)))?;
        }

        let conn = Connection::open(db_path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let storage = Self {
            conn: Mutex::new(conn),
        };

        storage.init_schema().await?;
        Ok(storage)
    }

    pub async fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let storage = Self {
            conn: Mutex::new(conn),
        };

        storage.init_schema().await?;
        Ok(storage)
    }

    async fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().await;

        // One row per arena; state is the serialized ledgers
        conn.execute(
            "CREATE TABLE IF NOT EXISTS arenas (
                name TEXT PRIMARY KEY,
                config TEXT NOT NULL,
                state TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;

        // Spendable balances outside escrow
        conn.execute(
            "CREATE TABLE IF NOT EXISTS accounts (
                identity TEXT PRIMARY KEY,
                balance INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;

        // Settled matches
        conn.execute(
            "CREATE TABLE IF NOT EXISTS settlements (
                match_id TEXT PRIMARY KEY,
                arena TEXT NOT NULL,
                player_a TEXT NOT NULL,
                player_b TEXT NOT NULL,
                winner TEXT,
                pot INTEGER NOT NULL,
                reason TEXT NOT NULL,
                settled_at INTEGER NOT NULL,
                FOREIGN KEY (arena) REFERENCES arenas(name)
            )",
            [],
        )?;

        // Local reveal notes (move + secret kept by the committing player)
        conn.execute(
            "CREATE TABLE IF NOT EXISTS notes (
                match_id TEXT NOT NULL,
                identity TEXT NOT NULL,
                choice INTEGER NOT NULL,
                secret BLOB NOT NULL,
                created_at INTEGER NOT NULL,
                PRIMARY KEY (match_id, identity)
            )",
            [],
        )?;

        Ok(())
    }

    pub async fn get_connection(&self) -> tokio::sync::MutexGuard<'_, Connection> {
        self.conn.lock().await
    }
}

pub(crate) fn units_to_sql(amount: crate::types::Amount) -> Result<i64> {
    i64::try_from(amount.to_units()).map_err(|_| CoreError::AmountOverflow)
}

pub(crate) fn units_from_sql(idx: usize, raw: i64) -> rusqlite::Result<crate::types::Amount> {
    u64::try_from(raw)
        .map(crate::types::Amount::from_units)
        .map_err(|_| rusqlite::Error::IntegralValueOutOfRange(idx, raw))
}

pub(crate) fn identity_from_sql(idx: usize, raw: String) -> rusqlite::Result<crate::types::Identity> {
    crate::types::Identity::new(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub(crate) fn timestamp_from_sql(idx: usize, raw: i64) -> rusqlite::Result<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::from_timestamp(raw, 0).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, raw))
}
