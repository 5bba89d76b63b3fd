#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the tile-merge engine.
//!
//! This crate defines the message surface that connects the session
//! orchestrator, the authoritative world, and pure systems. The orchestrator
//! submits [`Command`] values describing desired mutations, the world executes
//! those commands via its `apply` entry point, and then broadcasts [`Event`]
//! values for systems to react to deterministically. Systems consume event
//! streams, query immutable [`GridView`] snapshots, and respond exclusively
//! with new command batches.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Side length of the grid used when no configuration overrides it.
pub const DEFAULT_GRID_SIZE: u32 = 4;
/// Probability that a spawned tile carries the value two.
pub const DEFAULT_TWO_PROBABILITY: f64 = 0.9;
/// Number of undo snapshots retained when no configuration overrides it.
pub const DEFAULT_HISTORY_CAPACITY: usize = 20;
/// Upper bound accepted for the configured undo history depth.
pub const MAX_HISTORY_CAPACITY: usize = 256;
/// Number of tiles placed on the grid when a new game starts.
pub const DEFAULT_START_TILES: u32 = 2;

const MIN_GRID_SIZE: u32 = 2;
const MAX_GRID_SIZE: u32 = 16;

/// Cardinal directions in which the player may slide the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    /// Movement toward decreasing row indices.
    Up,
    /// Movement toward increasing row indices.
    Down,
    /// Movement toward decreasing column indices.
    Left,
    /// Movement toward increasing column indices.
    Right,
}

impl Direction {
    /// Every direction in a fixed order.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Unit `(row, column)` delta travelled by tiles sliding in this direction.
    #[must_use]
    pub const fn vector(self) -> (i32, i32) {
        match self {
            Self::Up => (-1, 0),
            Self::Down => (1, 0),
            Self::Left => (0, -1),
            Self::Right => (0, 1),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        };
        f.write_str(label)
    }
}

impl FromStr for Direction {
    type Err = ParseDirectionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "up" | "u" => Ok(Self::Up),
            "down" | "d" => Ok(Self::Down),
            "left" | "l" => Ok(Self::Left),
            "right" | "r" => Ok(Self::Right),
            _ => Err(ParseDirectionError(value.to_owned())),
        }
    }
}

/// Error returned when text cannot be interpreted as a [`Direction`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown direction `{0}`")]
pub struct ParseDirectionError(String);

/// Location of a single grid cell expressed as row and column coordinates.
///
/// The derived ordering is row-major, which is the enumeration order used by
/// every grid query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    row: u32,
    col: u32,
}

impl Position {
    /// Creates a new grid position.
    #[must_use]
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn col(&self) -> u32 {
        self.col
    }

    /// Returns the neighbouring position in `direction`, or `None` when the
    /// step would leave a grid with the provided side length.
    #[must_use]
    pub fn step(self, direction: Direction, size: u32) -> Option<Position> {
        let (row_delta, col_delta) = direction.vector();
        let row = self.row.checked_add_signed(row_delta)?;
        let col = self.col.checked_add_signed(col_delta)?;
        if row < size && col < size {
            Some(Position::new(row, col))
        } else {
            None
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Unique identifier assigned to a tile by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileId(u64);

impl TileId {
    /// Creates a new tile identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Face value of a tile. Always a power of two of at least two.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct TileValue(u32);

impl TileValue {
    /// The common spawn value.
    pub const TWO: TileValue = TileValue(2);
    /// The rare spawn value.
    pub const FOUR: TileValue = TileValue(4);
    /// Default winning threshold.
    pub const WINNING: TileValue = TileValue(2048);

    /// Validates `value`, returning `None` unless it is a power of two of at least two.
    #[must_use]
    pub const fn new(value: u32) -> Option<Self> {
        if value >= 2 && value.is_power_of_two() {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Retrieves the numeric face value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Value produced by merging two tiles of this value, if representable.
    #[must_use]
    pub fn doubled(self) -> Option<Self> {
        self.0.checked_mul(2).map(Self)
    }
}

impl TryFrom<u32> for TileValue {
    type Error = InvalidTileValue;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(InvalidTileValue(value))
    }
}

impl From<TileValue> for u32 {
    fn from(value: TileValue) -> Self {
        value.0
    }
}

impl fmt::Display for TileValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned when a raw number is not a legal tile value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("tile value {0} is not a power of two of at least 2")]
pub struct InvalidTileValue(u32);

/// A single numbered piece occupying one grid cell.
///
/// The value never changes after creation: merging produces a new tile and the
/// two sources are removed. Only the position is updated when the tile slides.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tile {
    id: TileId,
    value: TileValue,
    position: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    merged_from: Option<Box<[Tile; 2]>>,
    #[serde(default)]
    is_new: bool,
}

impl Tile {
    /// Creates a freshly spawned tile.
    #[must_use]
    pub fn spawned(id: TileId, value: TileValue, position: Position) -> Self {
        Self {
            id,
            value,
            position,
            merged_from: None,
            is_new: true,
        }
    }

    /// Merges `traveler` into `blocker`, producing a tile of double value at the
    /// blocker's position.
    ///
    /// Hands both sources back when the values differ or the doubled value is
    /// not representable.
    pub fn merged(id: TileId, traveler: Tile, blocker: Tile) -> Result<Self, (Tile, Tile)> {
        if traveler.value != blocker.value {
            return Err((traveler, blocker));
        }
        let Some(value) = blocker.value.doubled() else {
            return Err((traveler, blocker));
        };
        let position = blocker.position;
        Ok(Self {
            id,
            value,
            position,
            merged_from: Some(Box::new([traveler, blocker])),
            is_new: true,
        })
    }

    /// Identifier assigned to the tile.
    #[must_use]
    pub const fn id(&self) -> TileId {
        self.id
    }

    /// Face value of the tile.
    #[must_use]
    pub const fn value(&self) -> TileValue {
        self.value
    }

    /// Cell the tile occupies.
    #[must_use]
    pub const fn position(&self) -> Position {
        self.position
    }

    /// Source tiles consumed to produce this tile during the current turn.
    #[must_use]
    pub fn merged_from(&self) -> Option<&[Tile; 2]> {
        self.merged_from.as_deref()
    }

    /// Whether the tile appeared during the current turn.
    #[must_use]
    pub const fn is_new(&self) -> bool {
        self.is_new
    }

    /// Returns the same tile relocated to `position`.
    #[must_use]
    pub fn relocated(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    /// Returns the tile with its per-turn bookkeeping cleared.
    #[must_use]
    pub fn settled(mut self) -> Self {
        self.merged_from = None;
        self.is_new = false;
        self
    }
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Clears the grid, score and history to begin a fresh game.
    ResetGame {
        /// High-water mark carried into the new game.
        best_score: u64,
    },
    /// Slides every tile in the provided direction, merging equal neighbours.
    Move {
        /// Direction the player chose.
        direction: Direction,
    },
    /// Places a new tile into an empty cell.
    SpawnTile {
        /// Empty cell that receives the tile.
        position: Position,
        /// Value assigned to the tile.
        value: TileValue,
    },
    /// Marks the session as over because no move remains.
    DeclareGameOver,
    /// Restores the most recent history snapshot.
    Undo,
    /// Lets the player keep sliding tiles after reaching the winning value.
    ContinueAfterWin,
    /// Reassigns the values of all occupied cells in row-major order.
    ArrangeTiles {
        /// Replacement values, one per occupied cell.
        values: Vec<TileValue>,
    },
    /// Removes the tile occupying the provided cell.
    RemoveTile {
        /// Cell whose tile is discarded.
        position: Position,
    },
}

/// Reasons a move may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MoveRejection {
    /// No tile could slide or merge in the requested direction.
    NoTileMoved,
    /// The session is over, or won and awaiting a decision to continue.
    Terminated,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Confirms that a fresh game replaced the previous one.
    GameReset,
    /// Confirms that a tile slid between two cells without merging.
    TileMoved {
        /// Identifier of the tile that moved.
        tile: TileId,
        /// Cell the tile occupied before moving.
        from: Position,
        /// Cell the tile occupies after moving.
        to: Position,
    },
    /// Confirms that two tiles combined into a new tile.
    TilesMerged {
        /// Tile produced by the merge, carrying both sources.
        merged: Tile,
    },
    /// Reports a score change caused by merges.
    ScoreChanged {
        /// Score after the change.
        score: u64,
        /// Points gained by the change.
        delta: u64,
    },
    /// Announces the first appearance of the winning value during the session.
    GameWon {
        /// Value of the tile that triggered the win.
        value: TileValue,
    },
    /// Confirms that a move changed the grid.
    MoveApplied {
        /// Direction of the applied move.
        direction: Direction,
    },
    /// Reports that a move left the world untouched.
    MoveRejected {
        /// Direction of the rejected move.
        direction: Direction,
        /// Specific reason the move was rejected.
        reason: MoveRejection,
    },
    /// Confirms that a tile was placed into an empty cell.
    TileSpawned {
        /// The newly created tile.
        tile: Tile,
    },
    /// Reports that a spawn request targeted an occupied or missing cell.
    SpawnRejected {
        /// Cell named in the rejected request.
        position: Position,
    },
    /// Announces that no move remains.
    GameOver,
    /// Confirms that the most recent snapshot was restored.
    UndoApplied,
    /// Reports that no snapshot was available to restore.
    UndoRejected,
    /// Confirms that play may continue past the winning value.
    WinAcknowledged,
    /// Confirms that tile values were reassigned.
    TilesArranged,
    /// Reports that an arrangement did not match the occupied cells.
    ArrangementRejected,
    /// Confirms that a tile was removed from the grid.
    TileRemoved {
        /// The tile that was discarded.
        tile: Tile,
    },
    /// Reports that a removal request targeted an empty or missing cell.
    RemovalRejected {
        /// Cell named in the rejected request.
        position: Position,
    },
}

/// Read-only view into the dense tile grid.
#[derive(Clone, Copy, Debug)]
pub struct GridView<'a> {
    cells: &'a [Option<Tile>],
    size: u32,
}

impl<'a> GridView<'a> {
    /// Captures a new grid view backed by the provided row-major cell slice.
    #[must_use]
    pub fn new(cells: &'a [Option<Tile>], size: u32) -> Self {
        Self { cells, size }
    }

    /// Side length of the grid.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Returns the tile occupying the provided cell, if any.
    #[must_use]
    pub fn tile(&self, position: Position) -> Option<&'a Tile> {
        self.index(position)
            .and_then(|index| self.cells.get(index))
            .and_then(Option::as_ref)
    }

    /// Reports whether the cell lies within the grid and holds no tile.
    #[must_use]
    pub fn is_empty(&self, position: Position) -> bool {
        self.index(position)
            .and_then(|index| self.cells.get(index))
            .map_or(false, Option::is_none)
    }

    /// Every empty cell in row-major order.
    #[must_use]
    pub fn available_cells(&self) -> Vec<Position> {
        positions(self.size)
            .filter(|position| self.is_empty(*position))
            .collect()
    }

    /// Iterator over all tiles in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = &'a Tile> + 'a {
        self.cells.iter().filter_map(Option::as_ref)
    }

    /// Largest value present on the grid.
    #[must_use]
    pub fn highest_value(&self) -> Option<TileValue> {
        self.tiles().map(Tile::value).max()
    }

    /// Sum of all tile values on the grid.
    #[must_use]
    pub fn total_value(&self) -> u64 {
        self.tiles().map(|tile| u64::from(tile.value().get())).sum()
    }

    fn index(&self, position: Position) -> Option<usize> {
        if position.row() < self.size && position.col() < self.size {
            let row = usize::try_from(position.row()).ok()?;
            let col = usize::try_from(position.col()).ok()?;
            let width = usize::try_from(self.size).ok()?;
            Some(row * width + col)
        } else {
            None
        }
    }
}

/// Enumerates every cell of a grid with the provided side length in row-major order.
pub fn positions(size: u32) -> impl Iterator<Item = Position> {
    (0..size).flat_map(move |row| (0..size).map(move |col| Position::new(row, col)))
}

/// Serialized session state exchanged with the game-state store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Row-major matrix of cells, each empty or holding a tile.
    pub grid: Vec<Vec<Option<Tile>>>,
    /// Score accumulated during the session.
    pub score: u64,
    /// Highest score observed across sessions.
    pub best_score: u64,
    /// Whether the session ended because no move remains.
    pub is_game_over: bool,
    /// Whether the winning value appeared during the session.
    pub is_won: bool,
    /// Whether an undo snapshot was available when the state was captured.
    pub can_undo: bool,
    /// Whether the player chose to continue after winning.
    #[serde(default)]
    pub keep_playing: bool,
}

/// Aggregate results across finished games.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStatistics {
    /// Number of games that reached a terminal state.
    pub games_played: u64,
    /// Number of finished games in which the winning value appeared.
    pub games_won: u64,
    /// Largest tile value ever observed at the end of a game.
    pub highest_tile: u32,
    /// Sum of final scores across finished games.
    pub total_score: u64,
}

impl GameStatistics {
    /// Folds the outcome of one finished game into the aggregate.
    pub fn record_game(&mut self, score: u64, highest_tile: Option<TileValue>, won: bool) {
        self.games_played = self.games_played.saturating_add(1);
        if won {
            self.games_won = self.games_won.saturating_add(1);
        }
        self.total_score = self.total_score.saturating_add(score);
        if let Some(value) = highest_tile {
            self.highest_tile = self.highest_tile.max(value.get());
        }
    }
}

/// Tunable parameters of a game session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GameConfig {
    /// Side length of the square grid.
    pub size: u32,
    /// Tile value whose first appearance wins the game.
    pub winning_value: TileValue,
    /// Probability that a spawned tile is a two rather than a four.
    pub two_probability: f64,
    /// Number of undo snapshots retained; zero disables undo.
    pub history_capacity: usize,
    /// Number of tiles spawned when a game starts.
    pub start_tiles: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_GRID_SIZE,
            winning_value: TileValue::WINNING,
            two_probability: DEFAULT_TWO_PROBABILITY,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            start_tiles: DEFAULT_START_TILES,
        }
    }
}

impl GameConfig {
    /// Number of cells on the configured grid.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        let size = usize::try_from(self.size).unwrap_or(0);
        size * size
    }

    /// Checks every field against its supported range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_GRID_SIZE..=MAX_GRID_SIZE).contains(&self.size) {
            return Err(ConfigError::GridSize {
                size: self.size,
                min: MIN_GRID_SIZE,
                max: MAX_GRID_SIZE,
            });
        }
        if self.winning_value < TileValue::FOUR {
            return Err(ConfigError::WinningValue {
                value: self.winning_value.get(),
            });
        }
        if !self.two_probability.is_finite() || !(0.0..=1.0).contains(&self.two_probability) {
            return Err(ConfigError::TwoProbability {
                probability: self.two_probability,
            });
        }
        if self.history_capacity > MAX_HISTORY_CAPACITY {
            return Err(ConfigError::HistoryCapacity {
                capacity: self.history_capacity,
                max: MAX_HISTORY_CAPACITY,
            });
        }
        let start_tiles = usize::try_from(self.start_tiles).unwrap_or(usize::MAX);
        if start_tiles > self.cell_count() {
            return Err(ConfigError::StartTiles {
                start_tiles: self.start_tiles,
                size: self.size,
            });
        }
        Ok(())
    }
}

/// Reasons a [`GameConfig`] may be rejected.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// The grid side length is unsupported.
    #[error("grid size {size} is outside the supported range {min}..={max}")]
    GridSize {
        /// Requested side length.
        size: u32,
        /// Smallest supported side length.
        min: u32,
        /// Largest supported side length.
        max: u32,
    },
    /// The winning threshold could never be reached by a merge.
    #[error("winning value {value} must be at least 4")]
    WinningValue {
        /// Requested threshold.
        value: u32,
    },
    /// The spawn probability is not a probability.
    #[error("probability {probability} of spawning a two must lie within 0.0..=1.0")]
    TwoProbability {
        /// Requested probability.
        probability: f64,
    },
    /// The history depth exceeds the supported maximum.
    #[error("history capacity {capacity} exceeds the maximum of {max}")]
    HistoryCapacity {
        /// Requested depth.
        capacity: usize,
        /// Largest supported depth.
        max: usize,
    },
    /// More start tiles were requested than the grid holds.
    #[error("{start_tiles} start tiles do not fit on a {size}x{size} grid")]
    StartTiles {
        /// Requested start tile count.
        start_tiles: u32,
        /// Configured side length.
        size: u32,
    },
}
