//! Bounded undo history of grid and score snapshots.

use std::collections::VecDeque;

use crate::Grid;

/// Value copy of the state restored by an undo.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Snapshot {
    grid: Grid,
    score: u64,
}

impl Snapshot {
    pub(crate) fn capture(grid: &Grid, score: u64) -> Self {
        Self {
            grid: grid.clone(),
            score,
        }
    }

    pub(crate) fn into_parts(self) -> (Grid, u64) {
        (self.grid, self.score)
    }
}

/// Ring of snapshots that evicts the oldest entry once full.
#[derive(Debug)]
pub(crate) struct History {
    capacity: usize,
    entries: VecDeque<Snapshot>,
}

impl History {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, snapshot: Snapshot) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            let _ = self.entries.pop_front();
        }
        self.entries.push_back(snapshot);
    }

    pub(crate) fn pop(&mut self) -> Option<Snapshot> {
        self.entries.pop_back()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
