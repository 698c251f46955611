use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_ARENA: &str = "default";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    pub data_dir: PathBuf,
    pub arena: String,
    pub verbose: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("rps"),
            arena: DEFAULT_ARENA.to_string(),
            verbose: false,
        }
    }
}

impl CliConfig {
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("rps.db")
    }

    pub fn log_filter(&self) -> String {
        let level = if self.verbose { "debug" } else { "info" };
        format!("rps={0},rps_game={0},rps_core={0}", level)
    }
}
