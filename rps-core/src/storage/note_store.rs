use super::{identity_from_sql, timestamp_from_sql};
use crate::error::Result;
use crate::storage::Storage;
use crate::types::{Identity, MatchId};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

/// What a player needs to reveal later: the move code and the secret used at commit time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealNote {
    pub match_id: MatchId,
    pub identity: Identity,
    pub choice: u8,
    pub secret: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

pub struct NoteStore<'a> {
    storage: &'a Storage,
}

impl<'a> NoteStore<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub async fn save_note(&self, note: &RevealNote) -> Result<()> {
        let conn = self.storage.get_connection().await;
        write_note(&conn, note)
    }

    pub async fn load_note(&self, match_id: MatchId, identity: &Identity) -> Result<Option<RevealNote>> {
        let conn = self.storage.get_connection().await;
        read_note(&conn, match_id, identity)
    }

    pub async fn delete_notes(&self, match_id: MatchId) -> Result<()> {
        let conn = self.storage.get_connection().await;
        clear_notes(&conn, match_id)
    }
}

pub(crate) fn write_note(conn: &Connection, note: &RevealNote) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO notes (match_id, identity, choice, secret, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            note.match_id.to_string(),
            note.identity.as_str(),
            note.choice,
            note.secret,
            note.created_at.timestamp(),
        ],
    )?;
    Ok(())
}

pub(crate) fn read_note(conn: &Connection, match_id: MatchId, identity: &Identity) -> Result<Option<RevealNote>> {
    let note = conn
        .query_row(
            "SELECT identity, choice, secret, created_at
             FROM notes WHERE match_id = ?1 AND identity = ?2",
            params![match_id.to_string(), identity.as_str()],
            |row| {
                Ok(RevealNote {
                    match_id,
                    identity: identity_from_sql(0, row.get(0)?)?,
                    choice: row.get(1)?,
                    secret: row.get(2)?,
                    created_at: timestamp_from_sql(3, row.get(3)?)?,
                })
            },
        )
        .optional()?;

    Ok(note)
}

pub(crate) fn clear_notes(conn: &Connection, match_id: MatchId) -> Result<()> {
    conn.execute(
        "DELETE FROM notes WHERE match_id = ?1",
        params![match_id.to_string()],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_note_roundtrip_and_delete() {
        let storage = Storage::in_memory().await.unwrap();
        let store = NoteStore::new(&storage);
        let dave = Identity::new("dave").unwrap();
        let match_id = crate::types::new_match_id();

        let note = RevealNote {
            match_id,
            identity: dave.clone(),
            choice: 2,
            secret: vec![7u8; 32],
            created_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        };
        store.save_note(&note).await.unwrap();

        assert_eq!(store.load_note(match_id, &dave).await.unwrap(), Some(note));

        store.delete_notes(match_id).await.unwrap();
        assert_eq!(store.load_note(match_id, &dave).await.unwrap(), None);
    }
}
