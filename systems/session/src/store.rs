//! Persistence collaborators consulted by the session.

use thiserror::Error;
use tile_merge_core::{GameStatistics, SessionSnapshot};

/// Failures reported by persistence collaborators.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing medium could not be read or written.
    #[error("storage i/o failed: {0}")]
    Io(#[from] std::io::Error),
    /// Stored data exists but cannot be decoded.
    #[error("stored data is corrupt: {0}")]
    Corrupt(String),
    /// The store refused the request.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Stores the serialized form of the game in progress.
pub trait GameStore {
    /// Replaces the stored game with the provided snapshot.
    fn save(&mut self, snapshot: &SessionSnapshot) -> Result<(), StoreError>;

    /// Returns the stored game, if one exists.
    fn load(&mut self) -> Result<Option<SessionSnapshot>, StoreError>;

    /// Forgets the stored game.
    fn clear(&mut self) -> Result<(), StoreError>;
}

/// Stores results that outlive individual games.
pub trait ScoreStore {
    /// Records the highest score seen so far.
    fn save_best_score(&mut self, best_score: u64) -> Result<(), StoreError>;

    /// Returns the highest recorded score, zero when none exists.
    fn load_best_score(&mut self) -> Result<u64, StoreError>;

    /// Replaces the aggregate statistics.
    fn save_statistics(&mut self, statistics: &GameStatistics) -> Result<(), StoreError>;

    /// Returns the aggregate statistics, zeroed when none exist.
    fn load_statistics(&mut self) -> Result<GameStatistics, StoreError>;

    /// Zeroes the aggregate statistics.
    fn reset_statistics(&mut self) -> Result<(), StoreError>;
}

/// Volatile store keeping everything in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    game: Option<SessionSnapshot>,
    best_score: u64,
    statistics: GameStatistics,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds a saved game.
    #[must_use]
    pub fn with_game(snapshot: SessionSnapshot) -> Self {
        Self {
            game: Some(snapshot),
            ..Self::default()
        }
    }

    /// Game currently held by the store.
    #[must_use]
    pub fn saved_game(&self) -> Option<&SessionSnapshot> {
        self.game.as_ref()
    }

    /// Best score currently held by the store.
    #[must_use]
    pub const fn best_score(&self) -> u64 {
        self.best_score
    }

    /// Statistics currently held by the store.
    #[must_use]
    pub const fn statistics(&self) -> GameStatistics {
        self.statistics
    }
}

impl GameStore for MemoryStore {
    fn save(&mut self, snapshot: &SessionSnapshot) -> Result<(), StoreError> {
        self.game = Some(snapshot.clone());
        Ok(())
    }

    fn load(&mut self) -> Result<Option<SessionSnapshot>, StoreError> {
        Ok(self.game.clone())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.game = None;
        Ok(())
    }
}

impl ScoreStore for MemoryStore {
    fn save_best_score(&mut self, best_score: u64) -> Result<(), StoreError> {
        self.best_score = best_score;
        Ok(())
    }

    fn load_best_score(&mut self) -> Result<u64, StoreError> {
        Ok(self.best_score)
    }

    fn save_statistics(&mut self, statistics: &GameStatistics) -> Result<(), StoreError> {
        self.statistics = *statistics;
        Ok(())
    }

    fn load_statistics(&mut self) -> Result<GameStatistics, StoreError> {
        Ok(self.statistics)
    }

    fn reset_statistics(&mut self) -> Result<(), StoreError> {
        self.statistics = GameStatistics::default();
        Ok(())
    }
}
