#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Session orchestrator that sequences world commands, systems and persistence.
//!
//! The session owns the [`World`] and every system. Each public operation
//! submits commands, lets systems react to the resulting events, persists the
//! outcome and finally broadcasts a [`StateChange`] to subscribers. Persistence
//! failures are logged and swallowed so they never undo an applied transition.

mod store;

use std::sync::mpsc::{self, Receiver, Sender};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tile_merge_core::{
    Command, ConfigError, Direction, Event, GameConfig, GameStatistics, SessionSnapshot,
};
use tile_merge_system_powerups::{GameMode, Inventory, Powerup, Powerups};
use tile_merge_system_spawning::{self as spawning, Spawning};
use tile_merge_system_terminal::{moves_available, Terminal};
use tile_merge_world::{self as world, query, World};
use tracing::{debug, info, warn};

pub use store::{GameStore, MemoryStore, ScoreStore, StoreError};
pub use tile_merge_world::SnapshotError;

/// ChaCha stream reserved for powerup draws so they never perturb spawns.
const POWERUP_STREAM: u64 = 1;

/// Everything required to construct a session.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Grid and rule parameters.
    pub game: GameConfig,
    /// Rule set controlling undo and powerups.
    pub mode: GameMode,
    /// Seed for every random draw made during the session.
    pub seed: u64,
}

/// Notification broadcast after every state transition.
#[derive(Clone, Debug, PartialEq)]
pub struct StateChange {
    /// State after the transition.
    pub snapshot: SessionSnapshot,
    /// World events produced by the transition, in order.
    pub events: Vec<Event>,
}

/// Explicitly constructed game session backed by injected stores.
#[derive(Debug)]
pub struct Session<G, S> {
    config: SessionConfig,
    world: World,
    spawning: Spawning,
    terminal: Terminal,
    powerups: Powerups,
    game_store: G,
    score_store: S,
    subscribers: Vec<Sender<StateChange>>,
    /// Whether the current game has already been counted in the statistics.
    statistics_recorded: bool,
}

impl<G: GameStore, S: ScoreStore> Session<G, S> {
    /// Creates a session with an empty grid.
    ///
    /// Call [`Session::new_game`] or [`Session::load_game`] before playing.
    pub fn new(config: SessionConfig, game_store: G, score_store: S) -> Result<Self, ConfigError> {
        let world = World::new(world_config(&config), 0)?;
        let spawning = Spawning::new(spawning::Config::new(
            config.game.two_probability,
            config.seed,
        ));
        let mut powerup_rng = ChaCha8Rng::seed_from_u64(config.seed);
        powerup_rng.set_stream(POWERUP_STREAM);
        let powerups = Powerups::with_rng(config.mode, powerup_rng);

        Ok(Self {
            config,
            world,
            spawning,
            terminal: Terminal::new(),
            powerups,
            game_store,
            score_store,
            subscribers: Vec::new(),
            statistics_recorded: false,
        })
    }

    /// Opens a channel that receives every subsequent state change.
    pub fn subscribe(&mut self) -> Receiver<StateChange> {
        let (sender, receiver) = mpsc::channel();
        self.subscribers.push(sender);
        receiver
    }

    /// Discards the current game and starts a fresh one.
    pub fn new_game(&mut self) {
        let best_score = self.load_best_score();
        let mut events = Vec::new();
        world::apply(
            &mut self.world,
            Command::ResetGame { best_score },
            &mut events,
        );
        self.powerups.reset();
        self.statistics_recorded = false;

        let mut commands = Vec::new();
        self.spawning.spawn_many(
            self.config.game.start_tiles,
            query::grid_view(&self.world),
            &mut commands,
        );
        self.apply_all(commands, &mut events);
        self.detect_game_over(&mut events);

        info!(
            mode = %self.config.mode,
            size = self.config.game.size,
            best_score = query::best_score(&self.world),
            "started new game"
        );
        self.save_game();
        self.notify(events);
    }

    /// Resumes the stored game.
    ///
    /// Returns `false` and starts a fresh game when nothing usable is stored.
    pub fn load_game(&mut self) -> bool {
        let best_score = self.load_best_score();
        match self.game_store.load() {
            Ok(Some(snapshot)) => {
                match World::restore(world_config(&self.config), snapshot, best_score) {
                    Ok(restored) => {
                        let events = self.resume(restored);
                        info!(score = query::score(&self.world), "resumed saved game");
                        self.notify(events);
                        return true;
                    }
                    Err(error) => warn!(%error, "discarding invalid saved game"),
                }
            }
            Ok(None) => debug!("no saved game"),
            Err(error) => warn!(%error, "failed to load saved game"),
        }
        self.new_game();
        false
    }

    /// Replaces the current game with `snapshot` and persists it.
    ///
    /// An invalid snapshot leaves both the session and the game store untouched.
    pub fn import_game(&mut self, snapshot: SessionSnapshot) -> Result<(), SnapshotError> {
        let best_score = self.load_best_score();
        let restored = World::restore(world_config(&self.config), snapshot, best_score)?;
        let events = self.resume(restored);
        info!(score = query::score(&self.world), "imported game");
        self.save_game();
        self.notify(events);
        Ok(())
    }

    /// Persists the current game and best score.
    ///
    /// A finished game is removed from the game store instead of saved.
    pub fn save_game(&mut self) {
        let snapshot = query::snapshot(&self.world);
        let outcome = if snapshot.is_game_over {
            self.game_store.clear()
        } else {
            self.game_store.save(&snapshot)
        };
        if let Err(error) = outcome {
            warn!(%error, "failed to persist game");
        }
        if let Err(error) = self.score_store.save_best_score(snapshot.best_score) {
            warn!(%error, "failed to persist best score");
        }
    }

    /// Slides the grid in `direction`.
    ///
    /// Returns `false` without spawning, persisting or notifying when nothing
    /// moved or the game is terminated.
    pub fn move_tiles(&mut self, direction: Direction) -> bool {
        let mut events = Vec::new();
        world::apply(&mut self.world, Command::Move { direction }, &mut events);
        if !events
            .iter()
            .any(|event| matches!(event, Event::MoveApplied { .. }))
        {
            debug!(%direction, "move rejected");
            return false;
        }

        let mut commands = Vec::new();
        self.spawning
            .handle(&events, query::grid_view(&self.world), &mut commands);
        self.apply_all(commands, &mut events);

        if let Some(value) = events.iter().find_map(|event| match event {
            Event::GameWon { value } => Some(*value),
            _ => None,
        }) {
            info!(%value, score = query::score(&self.world), "winning tile reached");
        }
        self.detect_game_over(&mut events);

        debug!(%direction, score = query::score(&self.world), "move applied");
        self.save_game();
        self.notify(events);
        true
    }

    /// Restores the state before the latest grid change.
    ///
    /// Always refused in modes that forbid undo.
    pub fn undo(&mut self) -> bool {
        if !self.config.mode.allows_undo() {
            debug!(mode = %self.config.mode, "undo not allowed");
            return false;
        }
        let mut events = Vec::new();
        world::apply(&mut self.world, Command::Undo, &mut events);
        if !events.contains(&Event::UndoApplied) {
            debug!("nothing to undo");
            return false;
        }
        debug!(score = query::score(&self.world), "undo applied");
        self.save_game();
        self.notify(events);
        true
    }

    /// Lets play continue after the winning tile appeared.
    ///
    /// Returns whether the session was waiting for this decision.
    pub fn continue_after_win(&mut self) -> bool {
        let mut events = Vec::new();
        world::apply(&mut self.world, Command::ContinueAfterWin, &mut events);
        if !events.contains(&Event::WinAcknowledged) {
            return false;
        }
        info!("continuing after win");
        self.save_game();
        self.notify(events);
        true
    }

    /// Spends one charge of `powerup`.
    ///
    /// Returns `false` when the mode, inventory or grid rule it out; no charge
    /// is spent in that case.
    pub fn use_powerup(&mut self, powerup: Powerup) -> bool {
        let Some(command) = self
            .powerups
            .request(powerup, query::grid_view(&self.world))
        else {
            debug!(?powerup, "powerup unavailable");
            return false;
        };
        let mut events = Vec::new();
        world::apply(&mut self.world, command, &mut events);
        if !self.powerups.handle(&events) {
            debug!(?powerup, "powerup had no effect");
            return false;
        }
        self.detect_game_over(&mut events);

        info!(
            ?powerup,
            remaining = self.powerups.inventory().charges(powerup),
            "powerup used"
        );
        self.save_game();
        self.notify(events);
        true
    }

    /// Serializable view of the current game.
    #[must_use]
    pub fn state(&self) -> SessionSnapshot {
        query::snapshot(&self.world)
    }

    /// Authoritative world backing the session.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Configuration the session was created with.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Powerup charges left in the current game.
    #[must_use]
    pub const fn inventory(&self) -> Inventory {
        self.powerups.inventory()
    }

    /// Aggregate results across finished games, zeroed when unavailable.
    pub fn statistics(&mut self) -> GameStatistics {
        self.score_store.load_statistics().unwrap_or_else(|error| {
            warn!(%error, "failed to load statistics");
            GameStatistics::default()
        })
    }

    /// Zeroes the aggregate statistics.
    pub fn reset_statistics(&mut self) {
        if let Err(error) = self.score_store.reset_statistics() {
            warn!(%error, "failed to reset statistics");
        }
    }

    /// Game store backing the session.
    #[must_use]
    pub const fn game_store(&self) -> &G {
        &self.game_store
    }

    /// Score store backing the session.
    #[must_use]
    pub const fn score_store(&self) -> &S {
        &self.score_store
    }

    /// Adopts a restored world, declaring it over when no move is left.
    fn resume(&mut self, restored: World) -> Vec<Event> {
        self.world = restored;
        self.powerups.reset();
        self.statistics_recorded = query::is_game_over(&self.world);
        let mut events = Vec::new();
        if !query::is_game_over(&self.world) && !moves_available(query::grid_view(&self.world)) {
            self.apply_all(vec![Command::DeclareGameOver], &mut events);
            self.record_statistics();
        }
        events
    }

    fn apply_all(&mut self, commands: Vec<Command>, events: &mut Vec<Event>) {
        for command in commands {
            world::apply(&mut self.world, command, events);
        }
    }

    fn detect_game_over(&mut self, events: &mut Vec<Event>) {
        let mut commands = Vec::new();
        self.terminal
            .handle(events, query::grid_view(&self.world), &mut commands);
        if commands.is_empty() {
            return;
        }
        let before = events.len();
        self.apply_all(commands, events);
        if events.get(before..).unwrap_or_default().contains(&Event::GameOver) {
            self.record_statistics();
        }
    }

    /// Counts the current game once, however often it is declared over.
    fn record_statistics(&mut self) {
        let score = query::score(&self.world);
        if self.statistics_recorded {
            debug!(score, "game over again, statistics already recorded");
            return;
        }
        self.statistics_recorded = true;
        info!(score, "game over");

        let mut statistics = match self.score_store.load_statistics() {
            Ok(statistics) => statistics,
            Err(error) => {
                warn!(%error, "failed to load statistics, skipping update");
                return;
            }
        };
        statistics.record_game(
            score,
            query::grid_view(&self.world).highest_value(),
            query::is_won(&self.world),
        );
        if let Err(error) = self.score_store.save_statistics(&statistics) {
            warn!(%error, "failed to persist statistics");
        }
    }

    fn load_best_score(&mut self) -> u64 {
        let current = query::best_score(&self.world);
        match self.score_store.load_best_score() {
            Ok(stored) => stored.max(current),
            Err(error) => {
                warn!(%error, "failed to load best score");
                current
            }
        }
    }

    fn notify(&mut self, events: Vec<Event>) {
        let change = StateChange {
            snapshot: query::snapshot(&self.world),
            events,
        };
        self.subscribers
            .retain(|subscriber| subscriber.send(change.clone()).is_ok());
    }
}

/// Classic mode keeps no history at all so `can_undo` stays false.
fn world_config(config: &SessionConfig) -> GameConfig {
    let mut game = config.game.clone();
    if !config.mode.allows_undo() {
        game.history_capacity = 0;
    }
    game
}
