#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Consumable player actions layered on top of the canonical engine.
//!
//! The system never touches the world directly. A request turns a powerup into
//! the command that realises it, and the charge is only spent once the world
//! reports that the command took effect.

use std::{fmt, str::FromStr};

use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tile_merge_core::{Command, Event, GridView, Tile, TileValue};

/// Number of lowest-valued tiles the remove powerup chooses between.
const REMOVAL_CANDIDATES: usize = 3;

/// Rule set selected for a session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    /// No undo and no powerups.
    Classic,
    /// Undo plus a modest powerup allotment.
    #[default]
    Standard,
    /// Undo plus a generous powerup allotment.
    Plus,
}

impl GameMode {
    /// Powerup charges granted at the start of every game in this mode.
    #[must_use]
    pub const fn allotment(self) -> Inventory {
        match self {
            Self::Classic => Inventory::new(0, 0, 0),
            Self::Standard => Inventory::new(3, 2, 5),
            Self::Plus => Inventory::new(5, 4, 10),
        }
    }

    /// Whether the mode permits undoing moves at all.
    #[must_use]
    pub const fn allows_undo(self) -> bool {
        !matches!(self, Self::Classic)
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Classic => "classic",
            Self::Standard => "standard",
            Self::Plus => "plus",
        };
        f.write_str(label)
    }
}

impl FromStr for GameMode {
    type Err = ParseGameModeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "classic" => Ok(Self::Classic),
            "standard" => Ok(Self::Standard),
            "plus" => Ok(Self::Plus),
            _ => Err(ParseGameModeError(value.to_owned())),
        }
    }
}

/// Error returned when text does not name a [`GameMode`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown game mode `{0}`, expected classic, standard or plus")]
pub struct ParseGameModeError(String);

/// Kinds of consumable player actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Powerup {
    /// Permutes tile values among the occupied cells.
    Shuffle,
    /// Discards one of the lowest-valued tiles.
    Remove,
    /// Reverts the latest move without touching the regular undo budget.
    Undo,
}

/// Remaining charges for each powerup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    shuffle: u32,
    remove: u32,
    undo: u32,
}

impl Inventory {
    /// Creates an inventory holding the provided charges.
    #[must_use]
    pub const fn new(shuffle: u32, remove: u32, undo: u32) -> Self {
        Self {
            shuffle,
            remove,
            undo,
        }
    }

    /// Charges left for the provided powerup.
    #[must_use]
    pub const fn charges(&self, powerup: Powerup) -> u32 {
        match powerup {
            Powerup::Shuffle => self.shuffle,
            Powerup::Remove => self.remove,
            Powerup::Undo => self.undo,
        }
    }

    fn slot(&mut self, powerup: Powerup) -> &mut u32 {
        match powerup {
            Powerup::Shuffle => &mut self.shuffle,
            Powerup::Remove => &mut self.remove,
            Powerup::Undo => &mut self.undo,
        }
    }
}

/// Powerup system tracking the inventory for the active game mode.
#[derive(Debug)]
pub struct Powerups<R = ChaCha8Rng> {
    mode: GameMode,
    inventory: Inventory,
    pending: Option<Powerup>,
    rng: R,
}

impl Powerups<ChaCha8Rng> {
    /// Creates the system for the provided mode with a seeded random source.
    #[must_use]
    pub fn new(mode: GameMode, rng_seed: u64) -> Self {
        Self::with_rng(mode, ChaCha8Rng::seed_from_u64(rng_seed))
    }
}

impl<R: Rng> Powerups<R> {
    /// Creates the system drawing from the provided random source.
    #[must_use]
    pub fn with_rng(mode: GameMode, rng: R) -> Self {
        Self {
            mode,
            inventory: mode.allotment(),
            pending: None,
            rng,
        }
    }

    /// Active game mode.
    #[must_use]
    pub const fn mode(&self) -> GameMode {
        self.mode
    }

    /// Charges currently available.
    #[must_use]
    pub const fn inventory(&self) -> Inventory {
        self.inventory
    }

    /// Restores the full allotment for a new game.
    pub fn reset(&mut self) {
        self.inventory = self.mode.allotment();
        self.pending = None;
    }

    /// Builds the command that realises `powerup` against the current grid.
    ///
    /// Returns `None` when the mode forbids powerups, no charge is left or the
    /// grid has no tile to act on. No charge is spent until [`Self::handle`]
    /// observes the matching world event.
    pub fn request(&mut self, powerup: Powerup, grid: GridView<'_>) -> Option<Command> {
        if matches!(self.mode, GameMode::Classic) || self.inventory.charges(powerup) == 0 {
            return None;
        }
        let command = match powerup {
            Powerup::Shuffle => self.shuffle(grid)?,
            Powerup::Remove => self.remove(grid)?,
            Powerup::Undo => Command::Undo,
        };
        self.pending = Some(powerup);
        Some(command)
    }

    /// Spends the pending charge if the world confirmed the requested action.
    ///
    /// Returns whether a charge was spent.
    pub fn handle(&mut self, events: &[Event]) -> bool {
        let Some(powerup) = self.pending.take() else {
            return false;
        };
        let confirmed = events.iter().any(|event| {
            matches!(
                (powerup, event),
                (Powerup::Shuffle, Event::TilesArranged)
                    | (Powerup::Remove, Event::TileRemoved { .. })
                    | (Powerup::Undo, Event::UndoApplied)
            )
        });
        if confirmed {
            let slot = self.inventory.slot(powerup);
            *slot = slot.saturating_sub(1);
        }
        confirmed
    }

    fn shuffle(&mut self, grid: GridView<'_>) -> Option<Command> {
        let mut values: Vec<TileValue> = grid.tiles().map(Tile::value).collect();
        if values.is_empty() {
            return None;
        }
        values.shuffle(&mut self.rng);
        Some(Command::ArrangeTiles { values })
    }

    fn remove(&mut self, grid: GridView<'_>) -> Option<Command> {
        let mut tiles: Vec<&Tile> = grid.tiles().collect();
        if tiles.is_empty() {
            return None;
        }
        tiles.sort_by_key(|tile| tile.value());
        let candidates = tiles.len().min(REMOVAL_CANDIDATES);
        let chosen = tiles.get(self.rng.gen_range(0..candidates))?;
        Some(Command::RemoveTile {
            position: chosen.position(),
        })
    }
}
