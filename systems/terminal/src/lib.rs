#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Detects boards on which no move can change anything.

use tile_merge_core::{positions, Command, Direction, Event, GridView};

/// Reports whether any move would change the grid.
///
/// A move exists when a cell is empty or two orthogonal neighbours hold equal
/// values. Only right and down neighbours are inspected since equality is
/// symmetric.
#[must_use]
pub fn moves_available(grid: GridView<'_>) -> bool {
    let size = grid.size();
    positions(size).any(|position| {
        let Some(tile) = grid.tile(position) else {
            return true;
        };
        [Direction::Right, Direction::Down].into_iter().any(|direction| {
            position
                .step(direction, size)
                .and_then(|neighbour| grid.tile(neighbour))
                .is_some_and(|other| other.value() == tile.value())
        })
    })
}

/// Pure system that declares the game over once the board is stuck.
#[derive(Debug, Default)]
pub struct Terminal;

impl Terminal {
    /// Creates a new terminal detector.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Inspects the grid after tiles were placed or rearranged and emits a game
    /// over command when no move remains.
    pub fn handle(&self, events: &[Event], grid: GridView<'_>, out: &mut Vec<Command>) {
        let board_changed = events.iter().any(|event| {
            matches!(event, Event::TileSpawned { .. } | Event::TilesArranged)
        });
        if board_changed && !moves_available(grid) {
            out.push(Command::DeclareGameOver);
        }
    }
}
