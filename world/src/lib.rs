#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative game state for the tile-merge engine.

mod grid;
mod history;
pub mod movement;
mod snapshot;

use tile_merge_core::{
    Command, ConfigError, Direction, Event, GameConfig, MoveRejection, Position, SessionSnapshot,
    Tile, TileId, TileValue,
};

use crate::history::{History, Snapshot};

pub use grid::Grid;
pub use snapshot::SnapshotError;

/// Represents the authoritative state of one game session.
#[derive(Debug)]
pub struct World {
    config: GameConfig,
    grid: Grid,
    score: u64,
    best_score: u64,
    is_game_over: bool,
    is_won: bool,
    keep_playing: bool,
    history: History,
    next_tile_id: u64,
}

impl World {
    /// Creates an empty world for a fresh session.
    ///
    /// `best_score` seeds the high-water mark carried across sessions.
    pub fn new(config: GameConfig, best_score: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            grid: Grid::new(config.size),
            score: 0,
            best_score,
            is_game_over: false,
            is_won: false,
            keep_playing: false,
            history: History::new(config.history_capacity),
            next_tile_id: 1,
            config,
        })
    }

    /// Rebuilds a world from a persisted session, validating its shape first.
    ///
    /// Undo history is not persisted, so the restored world starts without any.
    pub fn restore(
        config: GameConfig,
        snapshot: SessionSnapshot,
        best_score: u64,
    ) -> Result<Self, SnapshotError> {
        snapshot::restore(config, snapshot, best_score)
    }

    fn reset(&mut self, best_score: u64) {
        self.grid = Grid::new(self.config.size);
        self.score = 0;
        self.best_score = self.best_score.max(best_score);
        self.is_game_over = false;
        self.is_won = false;
        self.keep_playing = false;
        self.history = History::new(self.config.history_capacity);
    }

    fn allocate_tile_id(&mut self) -> TileId {
        let id = TileId::new(self.next_tile_id);
        self.next_tile_id = self.next_tile_id.saturating_add(1);
        id
    }

    fn is_terminated(&self) -> bool {
        self.is_game_over || (self.is_won && !self.keep_playing)
    }

    fn add_points(&mut self, points: u64, out_events: &mut Vec<Event>) {
        if points == 0 {
            return;
        }
        self.score = self.score.saturating_add(points);
        self.best_score = self.best_score.max(self.score);
        out_events.push(Event::ScoreChanged {
            score: self.score,
            delta: points,
        });
    }

    fn apply_move(&mut self, direction: Direction, out_events: &mut Vec<Event>) {
        if self.is_terminated() {
            out_events.push(Event::MoveRejected {
                direction,
                reason: MoveRejection::Terminated,
            });
            return;
        }

        let snapshot = Snapshot::capture(&self.grid, self.score);
        let mut next_tile_id = self.next_tile_id;
        let outcome = movement::slide(&mut self.grid, direction, || {
            let id = TileId::new(next_tile_id);
            next_tile_id = next_tile_id.saturating_add(1);
            id
        });
        self.next_tile_id = next_tile_id;

        if !outcome.moved {
            let (grid, _) = snapshot.into_parts();
            self.grid = grid;
            out_events.push(Event::MoveRejected {
                direction,
                reason: MoveRejection::NoTileMoved,
            });
            return;
        }
        self.history.push(snapshot);

        for relocation in &outcome.relocations {
            out_events.push(Event::TileMoved {
                tile: relocation.tile,
                from: relocation.from,
                to: relocation.to,
            });
        }

        let points = outcome.points();
        let winning_value = self.config.winning_value;
        let mut winner: Option<TileValue> = None;
        for merged in outcome.merged {
            if merged.value() >= winning_value && winner.is_none() {
                winner = Some(merged.value());
            }
            out_events.push(Event::TilesMerged { merged });
        }
        self.add_points(points, out_events);

        if let Some(value) = winner {
            if !self.is_won {
                self.is_won = true;
                out_events.push(Event::GameWon { value });
            }
        }

        out_events.push(Event::MoveApplied { direction });
    }

    fn apply_spawn(&mut self, position: Position, value: TileValue, out_events: &mut Vec<Event>) {
        let vacant = self.grid.view().is_empty(position);
        if !vacant {
            out_events.push(Event::SpawnRejected { position });
            return;
        }
        let tile = Tile::spawned(self.allocate_tile_id(), value, position);
        let _ = self.grid.insert(tile.clone());
        out_events.push(Event::TileSpawned { tile });
    }

    fn apply_undo(&mut self, out_events: &mut Vec<Event>) {
        let Some(snapshot) = self.history.pop() else {
            out_events.push(Event::UndoRejected);
            return;
        };
        let (grid, score) = snapshot.into_parts();
        self.grid = grid;
        self.score = score;
        self.is_game_over = false;
        out_events.push(Event::UndoApplied);
    }

    fn apply_arrangement(&mut self, values: Vec<TileValue>, out_events: &mut Vec<Event>) {
        let occupied = self.grid.occupied_positions();
        if occupied.is_empty() || occupied.len() != values.len() {
            out_events.push(Event::ArrangementRejected);
            return;
        }

        self.history.push(Snapshot::capture(&self.grid, self.score));
        for (position, value) in occupied.into_iter().zip(values) {
            let tile = Tile::spawned(self.allocate_tile_id(), value, position).settled();
            let _ = self.grid.set(position, Some(tile));
        }
        self.is_game_over = false;
        out_events.push(Event::TilesArranged);
    }

    fn apply_removal(&mut self, position: Position, out_events: &mut Vec<Event>) {
        if self.grid.get(position).is_none() {
            out_events.push(Event::RemovalRejected { position });
            return;
        }

        self.history.push(Snapshot::capture(&self.grid, self.score));
        if let Some(tile) = self.grid.remove(position) {
            self.is_game_over = false;
            out_events.push(Event::TileRemoved { tile });
        }
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ResetGame { best_score } => {
            world.reset(best_score);
            out_events.push(Event::GameReset);
        }
        Command::Move { direction } => world.apply_move(direction, out_events),
        Command::SpawnTile { position, value } => world.apply_spawn(position, value, out_events),
        Command::DeclareGameOver => {
            if !world.is_game_over {
                world.is_game_over = true;
                out_events.push(Event::GameOver);
            }
        }
        Command::Undo => world.apply_undo(out_events),
        Command::ContinueAfterWin => {
            if world.is_won && !world.keep_playing {
                world.keep_playing = true;
                out_events.push(Event::WinAcknowledged);
            }
        }
        Command::ArrangeTiles { values } => world.apply_arrangement(values, out_events),
        Command::RemoveTile { position } => world.apply_removal(position, out_events),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use tile_merge_core::{GameConfig, GridView, SessionSnapshot};

    use super::{Grid, World};

    /// Provides read-only access to the live grid.
    #[must_use]
    pub fn grid(world: &World) -> &Grid {
        &world.grid
    }

    /// Exposes a read-only view of the grid for systems.
    #[must_use]
    pub fn grid_view(world: &World) -> GridView<'_> {
        world.grid.view()
    }

    /// Configuration the world was created with.
    #[must_use]
    pub fn config(world: &World) -> &GameConfig {
        &world.config
    }

    /// Score accumulated during the session.
    #[must_use]
    pub fn score(world: &World) -> u64 {
        world.score
    }

    /// Highest score observed, including scores from earlier sessions.
    #[must_use]
    pub fn best_score(world: &World) -> u64 {
        world.best_score
    }

    /// Whether no move remains.
    #[must_use]
    pub fn is_game_over(world: &World) -> bool {
        world.is_game_over
    }

    /// Whether the winning value has appeared during the session.
    #[must_use]
    pub fn is_won(world: &World) -> bool {
        world.is_won
    }

    /// Whether the player chose to continue after winning.
    #[must_use]
    pub fn keep_playing(world: &World) -> bool {
        world.keep_playing
    }

    /// Whether moves are currently refused.
    #[must_use]
    pub fn is_terminated(world: &World) -> bool {
        world.is_terminated()
    }

    /// Whether an undo snapshot is available.
    #[must_use]
    pub fn can_undo(world: &World) -> bool {
        !world.history.is_empty()
    }

    /// Number of undo snapshots currently retained.
    #[must_use]
    pub fn history_len(world: &World) -> usize {
        world.history.len()
    }

    /// Captures the serializable form of the session.
    #[must_use]
    pub fn snapshot(world: &World) -> SessionSnapshot {
        super::snapshot::capture(world)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world_with(size: u32, tiles: &[(u32, u32, u32)]) -> World {
        let config = GameConfig {
            size,
            ..GameConfig::default()
        };
        let mut world = World::new(config, 0).expect("valid config");
        let mut events = Vec::new();
        for (row, col, value) in tiles {
            apply(
                &mut world,
                Command::SpawnTile {
                    position: Position::new(*row, *col),
                    value: TileValue::new(*value).expect("valid value"),
                },
                &mut events,
            );
        }
        world
    }

    #[test]
    fn move_updates_score_and_history() {
        let mut world = world_with(4, &[(0, 0, 2), (0, 1, 2), (0, 2, 4), (0, 3, 4)]);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::Move {
                direction: Direction::Left,
            },
            &mut events,
        );

        assert_eq!(query::score(&world), 12);
        assert_eq!(query::best_score(&world), 12);
        assert!(query::can_undo(&world));
        assert!(events.contains(&Event::ScoreChanged {
            score: 12,
            delta: 12
        }));
        assert_eq!(
            events.last(),
            Some(&Event::MoveApplied {
                direction: Direction::Left
            })
        );
    }

    #[test]
    fn rejected_move_leaves_state_untouched() {
        let mut world = world_with(4, &[(0, 0, 2), (1, 0, 4)]);
        let before = query::grid(&world).clone();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::Move {
                direction: Direction::Left,
            },
            &mut events,
        );

        assert_eq!(query::grid(&world), &before);
        assert!(!query::can_undo(&world));
        assert_eq!(
            events,
            vec![Event::MoveRejected {
                direction: Direction::Left,
                reason: MoveRejection::NoTileMoved,
            }]
        );
    }

    #[test]
    fn spawn_into_occupied_cell_is_rejected() {
        let mut world = world_with(2, &[(0, 0, 2)]);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SpawnTile {
                position: Position::new(0, 0),
                value: TileValue::FOUR,
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![Event::SpawnRejected {
                position: Position::new(0, 0)
            }]
        );
    }

    #[test]
    fn undo_restores_grid_and_score() {
        let mut world = world_with(4, &[(0, 0, 2), (0, 1, 2)]);
        let before = query::grid(&world).clone();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::Move {
                direction: Direction::Right,
            },
            &mut events,
        );
        apply(&mut world, Command::Undo, &mut events);

        assert_eq!(query::grid(&world), &before);
        assert_eq!(query::score(&world), 0);
        assert_eq!(query::best_score(&world), 4);
        assert!(!query::can_undo(&world));

        events.clear();
        apply(&mut world, Command::Undo, &mut events);
        assert_eq!(events, vec![Event::UndoRejected]);
    }

    #[test]
    fn undo_clears_game_over() {
        let mut world = world_with(2, &[(0, 0, 2), (0, 1, 2)]);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::Move {
                direction: Direction::Left,
            },
            &mut events,
        );
        apply(&mut world, Command::DeclareGameOver, &mut events);
        assert!(query::is_game_over(&world));

        apply(&mut world, Command::Undo, &mut events);
        assert!(!query::is_game_over(&world));
    }

    #[test]
    fn win_requires_acknowledgement_before_more_moves() {
        let mut world = world_with(4, &[(0, 0, 1024), (0, 1, 1024), (2, 2, 2)]);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::Move {
                direction: Direction::Left,
            },
            &mut events,
        );
        assert!(events.contains(&Event::GameWon {
            value: TileValue::WINNING
        }));
        assert!(query::is_terminated(&world));

        events.clear();
        apply(
            &mut world,
            Command::Move {
                direction: Direction::Up,
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![Event::MoveRejected {
                direction: Direction::Up,
                reason: MoveRejection::Terminated,
            }]
        );

        apply(&mut world, Command::ContinueAfterWin, &mut events);
        assert!(!query::is_terminated(&world));
        assert!(query::is_won(&world));
    }

    #[test]
    fn arrangement_must_cover_every_occupied_cell() {
        let mut world = world_with(2, &[(0, 0, 2), (1, 1, 8)]);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::ArrangeTiles {
                values: vec![TileValue::TWO],
            },
            &mut events,
        );
        assert_eq!(events, vec![Event::ArrangementRejected]);

        events.clear();
        apply(
            &mut world,
            Command::ArrangeTiles {
                values: vec![TileValue::new(8).expect("valid"), TileValue::TWO],
            },
            &mut events,
        );
        assert_eq!(events, vec![Event::TilesArranged]);
        let grid = query::grid(&world);
        assert_eq!(
            grid.get(Position::new(0, 0)).map(Tile::value),
            TileValue::new(8)
        );
        assert_eq!(
            grid.get(Position::new(1, 1)).map(Tile::value),
            Some(TileValue::TWO)
        );
        assert!(query::can_undo(&world));
    }

    #[test]
    fn reset_clears_session_but_keeps_best_score() {
        let mut world = world_with(4, &[(0, 0, 2), (0, 1, 2)]);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::Move {
                direction: Direction::Left,
            },
            &mut events,
        );
        apply(&mut world, Command::DeclareGameOver, &mut events);

        events.clear();
        apply(&mut world, Command::ResetGame { best_score: 2 }, &mut events);

        assert_eq!(events, vec![Event::GameReset]);
        assert!(query::grid(&world).tiles().next().is_none());
        assert_eq!(query::score(&world), 0);
        assert_eq!(query::best_score(&world), 4);
        assert!(!query::is_game_over(&world));
        assert!(!query::can_undo(&world));
    }

    #[test]
    fn removal_discards_tile_and_is_undoable() {
        let mut world = world_with(2, &[(0, 0, 2)]);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::RemoveTile {
                position: Position::new(0, 0),
            },
            &mut events,
        );
        assert!(query::grid(&world).tiles().next().is_none());

        apply(&mut world, Command::Undo, &mut events);
        assert!(query::grid(&world).get(Position::new(0, 0)).is_some());

        events.clear();
        apply(
            &mut world,
            Command::RemoveTile {
                position: Position::new(1, 1),
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![Event::RemovalRejected {
                position: Position::new(1, 1)
            }]
        );
    }

    #[test]
    fn snapshot_round_trip_preserves_state() {
        let mut world = world_with(4, &[(0, 0, 2), (0, 1, 2), (3, 3, 8)]);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::Move {
                direction: Direction::Left,
            },
            &mut events,
        );

        let snapshot = query::snapshot(&world);
        assert!(snapshot.can_undo);
        let restored =
            World::restore(query::config(&world).clone(), snapshot, 0).expect("valid snapshot");

        assert_eq!(query::grid(&restored), query::grid(&world));
        assert_eq!(query::score(&restored), query::score(&world));
        assert!(!query::can_undo(&restored));
    }

    #[test]
    fn restore_rejects_misplaced_tiles() {
        let world = world_with(2, &[(0, 0, 2)]);
        let mut snapshot = query::snapshot(&world);
        let tile = snapshot.grid[0][0].take();
        snapshot.grid[1][1] = tile;

        let config = query::config(&world).clone();
        let error = World::restore(config, snapshot, 0).expect_err("misplaced tile");
        assert_eq!(
            error,
            SnapshotError::MisplacedTile {
                cell: Position::new(1, 1),
                recorded: Position::new(0, 0),
            }
        );
    }

    #[test]
    fn restore_rejects_wrong_dimensions() {
        let world = world_with(2, &[]);
        let snapshot = query::snapshot(&world);
        let error = World::restore(GameConfig::default(), snapshot, 0).expect_err("size mismatch");
        assert_eq!(
            error,
            SnapshotError::RowCount {
                expected: 4,
                found: 2
            }
        );
    }

    #[test]
    fn restored_world_allocates_fresh_identifiers() {
        let world = world_with(2, &[(0, 0, 2), (1, 1, 4)]);
        let snapshot = query::snapshot(&world);
        let config = query::config(&world).clone();
        let mut restored = World::restore(config, snapshot, 0).expect("valid snapshot");

        let mut events = Vec::new();
        apply(
            &mut restored,
            Command::SpawnTile {
                position: Position::new(0, 1),
                value: TileValue::TWO,
            },
            &mut events,
        );
        let ids: Vec<TileId> = query::grid(&restored).tiles().map(Tile::id).collect();
        let mut unique = ids.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(ids.len(), unique.len());
    }
}
