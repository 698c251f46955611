//! rps-core - shared primitives for escrowed Rock-Paper-Scissors
//!
//! Identities, stake amounts, arena configuration, the clock used for
//! deadlines and the SQLite persistence shared by the game and the CLI.

pub mod clock;
pub mod config;
pub mod error;
pub mod storage;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ArenaConfig;
pub use error::{CoreError, Result};
pub use storage::Storage;
pub use types::{new_match_id, Amount, Identity, MatchId};

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_storage_creation() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("nested").join("rps.db");
        let _storage = Storage::new(&db_path).await.unwrap();

        assert!(db_path.exists());
    }
}
