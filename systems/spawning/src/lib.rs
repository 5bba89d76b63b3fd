#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic spawning system responsible for emitting tile spawn commands.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tile_merge_core::{Command, Event, GridView, TileValue, DEFAULT_TWO_PROBABILITY};

/// Configuration parameters required to construct the spawning system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    two_probability: f64,
    rng_seed: u64,
}

impl Config {
    /// Creates a new configuration using the provided value odds and seed.
    #[must_use]
    pub const fn new(two_probability: f64, rng_seed: u64) -> Self {
        Self {
            two_probability,
            rng_seed,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_TWO_PROBABILITY, 0)
    }
}

/// Pure system that places one tile after every applied move.
///
/// The random source is injected so tests can drive it with a fixed sequence.
#[derive(Debug)]
pub struct Spawning<R = ChaCha8Rng> {
    two_probability: f64,
    rng: R,
}

impl Spawning<ChaCha8Rng> {
    /// Creates a new spawning system seeded from the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self::with_rng(config.two_probability, ChaCha8Rng::seed_from_u64(config.rng_seed))
    }
}

impl<R: Rng> Spawning<R> {
    /// Creates a spawning system drawing from the provided random source.
    #[must_use]
    pub fn with_rng(two_probability: f64, rng: R) -> Self {
        Self {
            two_probability: two_probability.clamp(0.0, 1.0),
            rng,
        }
    }

    /// Consumes world events and emits a spawn command once a move was applied.
    pub fn handle(&mut self, events: &[Event], grid: GridView<'_>, out: &mut Vec<Command>) {
        let move_applied = events
            .iter()
            .any(|event| matches!(event, Event::MoveApplied { .. }));
        if !move_applied {
            return;
        }
        if let Some(command) = self.spawn(grid) {
            out.push(command);
        }
    }

    /// Picks a uniformly random empty cell and a value for one new tile.
    ///
    /// Returns `None` when the grid has no empty cell.
    pub fn spawn(&mut self, grid: GridView<'_>) -> Option<Command> {
        let available = grid.available_cells();
        if available.is_empty() {
            return None;
        }
        let position = available[self.rng.gen_range(0..available.len())];
        let value = self.next_value();
        Some(Command::SpawnTile { position, value })
    }

    /// Emits spawn commands for up to `count` distinct empty cells.
    pub fn spawn_many(&mut self, count: u32, grid: GridView<'_>, out: &mut Vec<Command>) {
        let mut available = grid.available_cells();
        for _ in 0..count {
            if available.is_empty() {
                return;
            }
            let index = self.rng.gen_range(0..available.len());
            let position = available.swap_remove(index);
            let value = self.next_value();
            out.push(Command::SpawnTile { position, value });
        }
    }

    fn next_value(&mut self) -> TileValue {
        if self.rng.gen_bool(self.two_probability) {
            TileValue::TWO
        } else {
            TileValue::FOUR
        }
    }
}
