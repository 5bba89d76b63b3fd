//! JSON files backing the session stores.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Serialize};
use tile_merge_core::{GameStatistics, SessionSnapshot};
use tile_merge_session::{GameStore, ScoreStore, StoreError};

const GAME_FILE: &str = "game.json";
const BEST_SCORE_FILE: &str = "best_score.json";
const STATISTICS_FILE: &str = "statistics.json";

/// Store writing one JSON document per concern into a directory.
#[derive(Clone, Debug)]
pub(crate) struct JsonFileStore {
    directory: PathBuf,
}

impl JsonFileStore {
    /// Creates a store rooted at `directory`, which is created on first write.
    pub(crate) fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    fn path(&self, file: &str) -> PathBuf {
        self.directory.join(file)
    }

    fn read<T: DeserializeOwned>(&self, file: &str) -> Result<Option<T>, StoreError> {
        let path = self.path(file);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(error.into()),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|error| StoreError::Corrupt(format!("{}: {error}", path.display())))
    }

    fn write<T: Serialize>(&self, file: &str, value: &T) -> Result<(), StoreError> {
        fs::create_dir_all(&self.directory)?;
        let json = serde_json::to_vec_pretty(value)
            .map_err(|error| StoreError::Corrupt(error.to_string()))?;
        fs::write(self.path(file), json)?;
        Ok(())
    }

    fn remove(&self, file: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path(file)) {
            Err(error) if error.kind() != io::ErrorKind::NotFound => Err(error.into()),
            _ => Ok(()),
        }
    }

    /// Directory holding the JSON documents.
    pub(crate) fn directory(&self) -> &Path {
        &self.directory
    }
}

impl GameStore for JsonFileStore {
    fn save(&mut self, snapshot: &SessionSnapshot) -> Result<(), StoreError> {
        self.write(GAME_FILE, snapshot)
    }

    fn load(&mut self) -> Result<Option<SessionSnapshot>, StoreError> {
        self.read(GAME_FILE)
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.remove(GAME_FILE)
    }
}

impl ScoreStore for JsonFileStore {
    fn save_best_score(&mut self, best_score: u64) -> Result<(), StoreError> {
        self.write(BEST_SCORE_FILE, &best_score)
    }

    fn load_best_score(&mut self) -> Result<u64, StoreError> {
        Ok(self.read(BEST_SCORE_FILE)?.unwrap_or_default())
    }

    fn save_statistics(&mut self, statistics: &GameStatistics) -> Result<(), StoreError> {
        self.write(STATISTICS_FILE, statistics)
    }

    fn load_statistics(&mut self) -> Result<GameStatistics, StoreError> {
        Ok(self.read(STATISTICS_FILE)?.unwrap_or_default())
    }

    fn reset_statistics(&mut self) -> Result<(), StoreError> {
        self.remove(STATISTICS_FILE)
    }
}
