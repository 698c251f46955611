use super::{identity_from_sql, units_from_sql, units_to_sql};
use crate::error::Result;
use crate::storage::Storage;
use crate::types::{Amount, Identity};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

pub struct AccountStore<'a> {
    storage: &'a Storage,
}

impl<'a> AccountStore<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Unknown identities hold nothing.
    pub async fn balance(&self, identity: &Identity) -> Result<Amount> {
        let conn = self.storage.get_connection().await;
        read_balance(&conn, identity)
    }

    /// Add funds from outside the arena.
    pub async fn deposit(&self, identity: &Identity, amount: Amount) -> Result<Amount> {
        let mut conn = self.storage.get_connection().await;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let updated = read_balance(&tx, identity)?.checked_add(amount)?;
        write_balance(&tx, identity, updated, Utc::now().timestamp())?;
        tx.commit()?;

        tracing::info!("Deposited {} to {} (balance {})", amount, identity, updated);
        Ok(updated)
    }

    pub async fn list_accounts(&self) -> Result<Vec<(Identity, Amount)>> {
        let conn = self.storage.get_connection().await;
        read_accounts(&conn)
    }
}

pub(crate) fn read_balance(conn: &Connection, identity: &Identity) -> Result<Amount> {
    let raw: Option<i64> = conn
        .query_row(
            "SELECT balance FROM accounts WHERE identity = ?1",
            params![identity.as_str()],
            |row| row.get(0),
        )
        .optional()?;

    match raw {
        Some(raw) => Ok(units_from_sql(0, raw)?),
        None => Ok(Amount::ZERO),
    }
}

pub(crate) fn write_balance(conn: &Connection, identity: &Identity, balance: Amount, now: i64) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO accounts (identity, balance, updated_at)
         VALUES (?1, ?2, ?3)",
        params![identity.as_str(), units_to_sql(balance)?, now],
    )?;
    Ok(())
}

pub(crate) fn read_accounts(conn: &Connection) -> Result<Vec<(Identity, Amount)>> {
    let mut stmt = conn.prepare("SELECT identity, balance FROM accounts ORDER BY identity ASC")?;

    let iter = stmt.query_map([], |row| {
        Ok((
            identity_from_sql(0, row.get(0)?)?,
            units_from_sql(1, row.get(1)?)?,
        ))
    })?;

    let mut accounts = Vec::new();
    for account in iter {
        accounts.push(account?);
    }

    Ok(accounts)
}
