//! The falling three-block piece and its preview queue.

use crate::grid::{Cell, Grid};
use rand::Rng;

/// Spawn anchor: the piece occupies row 1, columns 3..=5.
pub const SPAWN_ROW: usize = 1;
pub const SPAWN_COL: usize = 4;

/// Three kinds, left to right.
pub type Triplet = [Cell; 3];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    fn step(self) -> isize {
        match self {
            Self::Left => -1,
            Self::Right => 1,
        }
    }
}

/// Result of one drop step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fall {
    Moved,
    Locked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivePiece {
    pub current: Triplet,
    pub next: Triplet,
    pub anchor_row: usize,
    pub anchor_col: usize,
}

impl ActivePiece {
    /// Fresh piece and preview at the spawn anchor.
    pub fn spawn<R: Rng>(rng: &mut R, pool: u8) -> Self {
        Self {
            current: random_triplet(rng, pool),
            next: random_triplet(rng, pool),
            anchor_row: SPAWN_ROW,
            anchor_col: SPAWN_COL,
        }
    }

    /// Columns covered by the piece.
    pub fn columns(&self) -> [usize; 3] {
        [self.anchor_col - 1, self.anchor_col, self.anchor_col + 1]
    }

    pub fn reset_anchor(&mut self) {
        self.anchor_row = SPAWN_ROW;
        self.anchor_col = SPAWN_COL;
    }

    /// Promote the preview and queue a new one.
    pub fn advance<R: Rng>(&mut self, rng: &mut R, pool: u8) {
        self.current = self.next;
        self.next = random_triplet(rng, pool);
    }

    /// A one-column move frees the trailing edge and needs the slot beyond the
    /// leading edge, two columns from the anchor.
    pub fn can_move_to(&self, grid: &Grid, direction: Direction) -> bool {
        let target = self.anchor_col.wrapping_add_signed(2 * direction.step());
        grid.is_empty(self.anchor_row, target)
    }

    /// Returns whether the piece moved.
    pub fn shift(&mut self, grid: &Grid, direction: Direction) -> bool {
        if !self.can_move_to(grid, direction) {
            return false;
        }
        self.anchor_col = self.anchor_col.wrapping_add_signed(direction.step());
        true
    }

    /// Cycle the kinds one slot to the right; the last wraps to the first.
    pub fn rotate(&mut self) {
        self.current.rotate_right(1);
    }

    /// Spawn cells already occupied means the next piece has nowhere to go.
    pub fn spawn_blocked(grid: &Grid) -> bool {
        (SPAWN_COL - 1..=SPAWN_COL + 1).any(|col| !grid.is_empty(SPAWN_ROW, col))
    }

    pub fn can_fall(&self, grid: &Grid) -> bool {
        self.columns()
            .iter()
            .all(|&col| grid.is_empty(self.anchor_row + 1, col))
    }

    /// Move down one row, or write the kinds into the grid when the row below is
    /// not clear.
    pub fn drop_or_lock(&mut self, grid: &mut Grid) -> Fall {
        if self.can_fall(grid) {
            self.anchor_row += 1;
            return Fall::Moved;
        }
        for (col, kind) in self.columns().into_iter().zip(self.current) {
            grid.set(self.anchor_row, col, kind);
        }
        Fall::Locked
    }
}

pub fn random_triplet<R: Rng>(rng: &mut R, pool: u8) -> Triplet {
    let top = pool as Cell;
    [
        rng.random_range(1..=top),
        rng.random_range(1..=top),
        rng.random_range(1..=top),
    ]
}
