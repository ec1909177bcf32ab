//! Score reporting.
//!
//! Wins are reported fire-and-forget: the match conclusion is already
//! broadcast before the report runs, and a failed report never rolls it back.
//! The trait seam lets production swap in a remote scoreboard service while
//! tests and the default build use the in-memory implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

/// Errors from score reporting.
#[derive(Debug, thiserror::Error)]
pub enum ScoreError {
    /// The scoreboard backend could not be reached.
    #[error("scoreboard unavailable: {0}")]
    Unavailable(String),
}

/// Records wins per player name.
#[async_trait]
pub trait ScoreReporter: Send + Sync {
    /// Record a win for `name` and return the player's new total.
    async fn record_win(&self, name: &str) -> Result<u64, ScoreError>;
}

/// In-memory scoreboard keyed by display name.
#[derive(Debug, Default)]
pub struct MemoryScoreboard {
    wins: Mutex<HashMap<String, u64>>,
}

impl MemoryScoreboard {
    /// Create an empty scoreboard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current win total for a player. Zero if never seen.
    pub async fn wins(&self, name: &str) -> u64 {
        self.wins.lock().await.get(name).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ScoreReporter for MemoryScoreboard {
    async fn record_win(&self, name: &str) -> Result<u64, ScoreError> {
        let mut wins = self.wins.lock().await;
        let total = wins.entry(name.to_string()).or_insert(0);
        *total += 1;
        Ok(*total)
    }
}
