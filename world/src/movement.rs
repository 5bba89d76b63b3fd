//! Slide-and-merge algorithm applied to the grid for a single move.

use tile_merge_core::{positions, Direction, Position, Tile, TileId};

use crate::Grid;

/// Tile that slid without merging during a move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Relocation {
    /// Identifier of the tile that slid.
    pub tile: TileId,
    /// Cell the tile occupied before the move.
    pub from: Position,
    /// Cell the tile occupies after the move.
    pub to: Position,
}

/// Result of sliding the grid in one direction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MoveOutcome {
    /// Whether any tile ended the move on a different cell.
    pub moved: bool,
    /// Tiles produced by merges, in traversal order.
    pub merged: Vec<Tile>,
    /// Tiles that slid without merging, in traversal order.
    pub relocations: Vec<Relocation>,
}

impl MoveOutcome {
    /// Sum of the values of every merge-produced tile.
    #[must_use]
    pub fn points(&self) -> u64 {
        self.merged
            .iter()
            .map(|tile| u64::from(tile.value().get()))
            .sum()
    }
}

/// Slides every tile of `grid` toward `direction`.
///
/// Cells are visited starting from the edge the direction points toward so
/// that no tile moves twice. A tile produced by a merge during this call never
/// takes part in a second merge. `allocate` supplies identifiers for merged
/// tiles.
pub fn slide<F>(grid: &mut Grid, direction: Direction, mut allocate: F) -> MoveOutcome
where
    F: FnMut() -> TileId,
{
    grid.settle_tiles();

    let mut merged_this_turn = vec![false; grid.cell_count()];
    let mut outcome = MoveOutcome::default();

    for origin in traversal_order(grid.size(), direction) {
        let Some(tile) = grid.remove(origin) else {
            continue;
        };

        let (farthest, blocker) = find_farthest(grid, origin, direction);
        let merge_target = blocker.filter(|position| {
            let already_merged = grid
                .index(*position)
                .and_then(|index| merged_this_turn.get(index).copied())
                .unwrap_or(true);
            !already_merged
                && grid
                    .get(*position)
                    .map_or(false, |occupant| occupant.value() == tile.value())
        });

        let Some(target) = merge_target else {
            relocate(grid, tile, origin, farthest, &mut outcome);
            continue;
        };

        let Some(blocker_tile) = grid.remove(target) else {
            relocate(grid, tile, origin, farthest, &mut outcome);
            continue;
        };

        match Tile::merged(allocate(), tile, blocker_tile) {
            Ok(merged) => {
                if let Some(marker) = grid
                    .index(target)
                    .and_then(|index| merged_this_turn.get_mut(index))
                {
                    *marker = true;
                }
                let _ = grid.insert(merged.clone());
                outcome.merged.push(merged);
                outcome.moved = true;
            }
            Err((traveler, blocker_tile)) => {
                let _ = grid.insert(blocker_tile);
                relocate(grid, traveler, origin, farthest, &mut outcome);
            }
        }
    }

    outcome
}

/// Enumerates every cell, rows reversed when sliding down and columns
/// reversed when sliding right.
pub(crate) fn traversal_order(size: u32, direction: Direction) -> Vec<Position> {
    let (row_delta, col_delta) = direction.vector();
    positions(size)
        .map(|position| {
            let row = if row_delta == 1 {
                size - 1 - position.row()
            } else {
                position.row()
            };
            let col = if col_delta == 1 {
                size - 1 - position.col()
            } else {
                position.col()
            };
            Position::new(row, col)
        })
        .collect()
}

/// Walks from `origin` along `direction` across empty cells.
///
/// Returns the last empty cell reached and the first occupied cell beyond it,
/// or `None` when the walk stopped at the grid edge.
fn find_farthest(
    grid: &Grid,
    origin: Position,
    direction: Direction,
) -> (Position, Option<Position>) {
    let mut farthest = origin;
    loop {
        match farthest.step(direction, grid.size()) {
            Some(next) if grid.get(next).is_none() => farthest = next,
            blocker => return (farthest, blocker),
        }
    }
}

fn relocate(
    grid: &mut Grid,
    tile: Tile,
    origin: Position,
    destination: Position,
    outcome: &mut MoveOutcome,
) {
    let tile_id = tile.id();
    let _ = grid.set(destination, Some(tile));
    if destination != origin {
        outcome.moved = true;
        outcome.relocations.push(Relocation {
            tile: tile_id,
            from: origin,
            to: destination,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tile_merge_core::TileValue;

    fn grid_from_rows(rows: &[&[u32]]) -> (Grid, u64) {
        let size = u32::try_from(rows.len()).expect("size fits");
        let mut grid = Grid::new(size);
        let mut next_id = 0;
        for (row, values) in rows.iter().enumerate() {
            for (col, value) in values.iter().enumerate() {
                let Some(value) = TileValue::new(*value) else {
                    continue;
                };
                next_id += 1;
                let position = Position::new(row as u32, col as u32);
                let _ = grid.insert(Tile::spawned(TileId::new(next_id), value, position));
            }
        }
        (grid, next_id)
    }

    fn values(grid: &Grid) -> Vec<Vec<u32>> {
        grid.to_rows()
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| cell.map_or(0, |tile| tile.value().get()))
                    .collect()
            })
            .collect()
    }

    fn slide_values(rows: &[&[u32]], direction: Direction) -> (Vec<Vec<u32>>, MoveOutcome) {
        let (mut grid, mut next_id) = grid_from_rows(rows);
        let outcome = slide(&mut grid, direction, || {
            next_id += 1;
            TileId::new(next_id)
        });
        (values(&grid), outcome)
    }

    #[test]
    fn traversal_starts_from_far_edge() {
        let order = traversal_order(2, Direction::Right);
        assert_eq!(
            order,
            vec![
                Position::new(0, 1),
                Position::new(0, 0),
                Position::new(1, 1),
                Position::new(1, 0),
            ]
        );

        let order = traversal_order(2, Direction::Down);
        assert_eq!(order[0], Position::new(1, 0));
        assert_eq!(order[3], Position::new(0, 1));

        let order = traversal_order(2, Direction::Up);
        assert_eq!(order[0], Position::new(0, 0));
    }

    #[test]
    fn pairs_merge_independently_in_one_move() {
        let (after, outcome) = slide_values(
            &[&[2, 2, 4, 4], &[0, 0, 0, 0], &[0, 0, 0, 0], &[0, 0, 0, 0]],
            Direction::Left,
        );

        assert_eq!(after[0], vec![4, 8, 0, 0]);
        assert!(outcome.moved);
        assert_eq!(outcome.points(), 12);
        let merged: Vec<u32> = outcome.merged.iter().map(|t| t.value().get()).collect();
        assert_eq!(merged, vec![4, 8]);
    }

    #[test]
    fn three_equal_tiles_merge_only_once() {
        let (after, outcome) = slide_values(
            &[&[2, 2, 2, 0], &[0, 0, 0, 0], &[0, 0, 0, 0], &[0, 0, 0, 0]],
            Direction::Left,
        );
        assert_eq!(after[0], vec![4, 2, 0, 0]);
        assert_eq!(outcome.merged.len(), 1);

        let (after, _) = slide_values(
            &[&[2, 2, 2, 0], &[0, 0, 0, 0], &[0, 0, 0, 0], &[0, 0, 0, 0]],
            Direction::Right,
        );
        assert_eq!(after[0], vec![0, 0, 2, 4]);
    }

    #[test]
    fn four_equal_tiles_form_two_pairs() {
        let (after, outcome) = slide_values(
            &[&[2, 0, 0, 0], &[2, 0, 0, 0], &[2, 0, 0, 0], &[2, 0, 0, 0]],
            Direction::Down,
        );
        let column: Vec<u32> = after.iter().map(|row| row[0]).collect();
        assert_eq!(column, vec![0, 0, 4, 4]);
        assert_eq!(outcome.merged.len(), 2);
    }

    #[test]
    fn merged_tile_does_not_absorb_its_own_sum() {
        let (after, outcome) = slide_values(
            &[&[4, 2, 2, 0], &[0, 0, 0, 0], &[0, 0, 0, 0], &[0, 0, 0, 0]],
            Direction::Left,
        );
        assert_eq!(after[0], vec![4, 4, 0, 0]);
        assert_eq!(outcome.points(), 4);
    }

    #[test]
    fn blocked_grid_reports_no_movement() {
        let (after, outcome) = slide_values(
            &[&[2, 4, 0, 0], &[8, 0, 0, 0], &[0, 0, 0, 0], &[0, 0, 0, 0]],
            Direction::Left,
        );
        assert!(!outcome.moved);
        assert!(outcome.merged.is_empty());
        assert!(outcome.relocations.is_empty());
        assert_eq!(after[0], vec![2, 4, 0, 0]);
    }

    #[test]
    fn relocations_record_start_and_end() {
        let (_, outcome) = slide_values(&[&[0, 0], &[0, 8]], Direction::Up);
        assert_eq!(outcome.relocations.len(), 1);
        assert_eq!(outcome.relocations[0].from, Position::new(1, 1));
        assert_eq!(outcome.relocations[0].to, Position::new(0, 1));
    }

    #[test]
    fn merge_records_both_sources() {
        let (mut grid, _) = grid_from_rows(&[&[0, 16], &[0, 16]]);
        let outcome = slide(&mut grid, Direction::Up, || TileId::new(99));

        let merged = &outcome.merged[0];
        assert_eq!(merged.id(), TileId::new(99));
        assert_eq!(merged.position(), Position::new(0, 1));
        assert!(merged.is_new());
        let sources = merged.merged_from().expect("sources recorded");
        assert!(sources.iter().all(|source| source.value().get() == 16));
    }

    #[test]
    fn previous_merge_markers_are_cleared() {
        let (mut grid, _) = grid_from_rows(&[&[2, 2], &[0, 0]]);
        let first = slide(&mut grid, Direction::Left, || TileId::new(10));
        assert_eq!(first.merged.len(), 1);

        let second = slide(&mut grid, Direction::Right, || TileId::new(11));
        assert!(second.moved);
        let tile = grid.get(Position::new(0, 1)).expect("tile slid right");
        assert!(tile.merged_from().is_none());
        assert!(!tile.is_new());
    }
}
