//! Dense square grid holding at most one tile per cell.

use tile_merge_core::{positions, GridView, Position, Tile};

/// Fixed N×N container of optional tiles addressed by [`Position`].
///
/// A tile's recorded position always equals the cell that stores it. Cloning
/// produces a fully independent copy, which is what history snapshots rely on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    size: u32,
    cells: Vec<Option<Tile>>,
}

impl Grid {
    /// Creates an empty grid with the provided side length.
    #[must_use]
    pub fn new(size: u32) -> Self {
        let side = usize::try_from(size).unwrap_or(0);
        Self {
            size,
            cells: vec![None; side * side],
        }
    }

    /// Side length of the grid.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Returns the tile occupying the provided cell, if any.
    #[must_use]
    pub fn get(&self, position: Position) -> Option<&Tile> {
        self.index(position)
            .and_then(|index| self.cells.get(index))
            .and_then(Option::as_ref)
    }

    /// Stores `cell` at `position`, returning the previous occupant.
    ///
    /// A stored tile is relocated so that its recorded position matches the
    /// cell. Positions outside the grid are ignored.
    pub fn set(&mut self, position: Position, cell: Option<Tile>) -> Option<Tile> {
        let index = self.index(position)?;
        let slot = self.cells.get_mut(index)?;
        std::mem::replace(slot, cell.map(|tile| tile.relocated(position)))
    }

    /// Stores `tile` at the cell it records as its position.
    pub fn insert(&mut self, tile: Tile) -> Option<Tile> {
        let position = tile.position();
        self.set(position, Some(tile))
    }

    /// Empties the provided cell, returning the tile it held.
    pub fn remove(&mut self, position: Position) -> Option<Tile> {
        let index = self.index(position)?;
        self.cells.get_mut(index).and_then(Option::take)
    }

    /// Every empty cell in row-major order.
    #[must_use]
    pub fn available_cells(&self) -> Vec<Position> {
        self.view().available_cells()
    }

    /// Reports whether every cell holds a tile.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    /// Iterator over all tiles in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.cells.iter().filter_map(Option::as_ref)
    }

    /// Captures a read-only view for systems.
    #[must_use]
    pub fn view(&self) -> GridView<'_> {
        GridView::new(&self.cells, self.size)
    }

    /// Copies the cells into a row-major matrix.
    #[must_use]
    pub fn to_rows(&self) -> Vec<Vec<Option<Tile>>> {
        let width = usize::try_from(self.size).unwrap_or(0).max(1);
        self.cells.chunks(width).map(<[Option<Tile>]>::to_vec).collect()
    }

    /// Clears per-turn bookkeeping on every tile.
    pub(crate) fn settle_tiles(&mut self) {
        for cell in &mut self.cells {
            if let Some(tile) = cell.take() {
                *cell = Some(tile.settled());
            }
        }
    }

    /// Occupied positions in row-major order.
    pub(crate) fn occupied_positions(&self) -> Vec<Position> {
        positions(self.size)
            .filter(|position| self.get(*position).is_some())
            .collect()
    }

    pub(crate) fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub(crate) fn index(&self, position: Position) -> Option<usize> {
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
