//! Conversion between the live world and its serialized session form.

use std::collections::HashSet;

use thiserror::Error;
use tile_merge_core::{positions, ConfigError, GameConfig, Position, SessionSnapshot};

use crate::{history::History, Grid, World};

/// Reasons a persisted session may be rejected on load.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum SnapshotError {
    /// The configuration paired with the snapshot is itself invalid.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    /// The grid does not have one row per configured row.
    #[error("expected {expected} grid rows, found {found}")]
    RowCount {
        /// Rows required by the configuration.
        expected: usize,
        /// Rows present in the snapshot.
        found: usize,
    },
    /// A grid row does not have one cell per configured column.
    #[error("row {row} has {found} cells, expected {expected}")]
    RowLength {
        /// Index of the offending row.
        row: usize,
        /// Cells required by the configuration.
        expected: usize,
        /// Cells present in the row.
        found: usize,
    },
    /// A tile records a position different from the cell storing it.
    #[error("tile stored at {cell} records position {recorded}")]
    MisplacedTile {
        /// Cell that stores the tile.
        cell: Position,
        /// Position recorded inside the tile.
        recorded: Position,
    },
    /// Two tiles share the same identifier.
    #[error("tile identifier {id} appears more than once")]
    DuplicateTileId {
        /// The repeated identifier.
        id: u64,
    },
}

pub(crate) fn capture(world: &World) -> SessionSnapshot {
    SessionSnapshot {
        grid: world.grid.to_rows(),
        score: world.score,
        best_score: world.best_score,
        is_game_over: world.is_game_over,
        is_won: world.is_won,
        can_undo: !world.history.is_empty(),
        keep_playing: world.keep_playing,
    }
}

pub(crate) fn restore(
    config: GameConfig,
    snapshot: SessionSnapshot,
    best_score: u64,
) -> Result<World, SnapshotError> {
    config.validate()?;

    let side = usize::try_from(config.size).unwrap_or(0);
    if snapshot.grid.len() != side {
        return Err(SnapshotError::RowCount {
            expected: side,
            found: snapshot.grid.len(),
        });
    }
    if let Some((row, cells)) = snapshot
        .grid
        .iter()
        .enumerate()
        .find(|(_, cells)| cells.len() != side)
    {
        return Err(SnapshotError::RowLength {
            row,
            expected: side,
            found: cells.len(),
        });
    }

    let mut grid = Grid::new(config.size);
    let mut seen = HashSet::new();
    let mut highest_id = 0;
    let cells = snapshot.grid.into_iter().flatten();
    for (cell, entry) in positions(config.size).zip(cells) {
        let Some(tile) = entry else {
            continue;
        };
        if tile.position() != cell {
            return Err(SnapshotError::MisplacedTile {
                cell,
                recorded: tile.position(),
            });
        }
        if !seen.insert(tile.id()) {
            return Err(SnapshotError::DuplicateTileId { id: tile.id().get() });
        }
        highest_id = highest_id.max(tile.id().get());
        let _ = grid.insert(tile);
    }

    let history = History::new(config.history_capacity);
    Ok(World {
        grid,
        score: snapshot.score,
        best_score: snapshot.best_score.max(best_score).max(snapshot.score),
        is_game_over: snapshot.is_game_over,
        is_won: snapshot.is_won,
        keep_playing: snapshot.is_won && snapshot.keep_playing,
        history,
        next_tile_id: highest_id.saturating_add(1),
        config,
    })
}
