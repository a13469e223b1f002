//! Playfield: walled 13×9 grid, clear mask, gravity scan and line matching.

/// Rows including the top and bottom wall rows.
pub const ROWS: usize = 13;
/// Columns including the left and right wall columns.
pub const COLS: usize = 9;

/// Cell value. `WALL` and `EMPTY` are sentinels; 1..=6 are block kinds.
pub type Cell = i8;

pub const WALL: Cell = -1;
pub const EMPTY: Cell = 0;

/// Highest block kind id.
pub const MAX_KIND: Cell = 6;

/// Neighbour offset pairs (before, after) for the four line directions:
/// vertical, horizontal, "/" and "\".
const LINES: [((isize, isize), (isize, isize)); 4] = [
    ((-1, 0), (1, 0)),
    ((0, -1), (0, 1)),
    ((1, -1), (-1, 1)),
    ((-1, -1), (1, 1)),
];

/// Grid store. `cells[row][col]`, row 0 is the top wall.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    cells: [[Cell; COLS]; ROWS],
    mask: [[bool; COLS]; ROWS],
}

impl Default for Grid {
    fn default() -> Self {
        Self::new()
    }
}

impl Grid {
    pub fn new() -> Self {
        let mut grid = Self {
            cells: [[EMPTY; COLS]; ROWS],
            mask: [[false; COLS]; ROWS],
        };
        for col in 0..COLS {
            grid.cells[0][col] = WALL;
            grid.cells[ROWS - 1][col] = WALL;
        }
        for row in 0..ROWS {
            grid.cells[row][0] = WALL;
            grid.cells[row][COLS - 1] = WALL;
        }
        grid
    }

    /// Zero the interior and the mask; walls are untouched.
    pub fn reset(&mut self) {
        for (row, col) in interior() {
            self.cells[row][col] = EMPTY;
            self.mask[row][col] = false;
        }
    }

    /// Panics when out of range.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Cell {
        self.cells[row][col]
    }

    /// Panics when out of range or when asked to touch a wall.
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: Cell) {
        assert!(
            self.cells[row][col] != WALL,
            "wall cell ({row}, {col}) is immutable"
        );
        assert!(
            (EMPTY..=MAX_KIND).contains(&value),
            "invalid cell value {value}"
        );
        self.cells[row][col] = value;
    }

    #[inline]
    pub fn is_empty(&self, row: usize, col: usize) -> bool {
        self.get(row, col) == EMPTY
    }

    #[inline]
    pub fn is_marked(&self, row: usize, col: usize) -> bool {
        self.mask[row][col]
    }

    /// One bottom-up, left-to-right gravity scan. Every block with an empty cell
    /// directly below moves down one row. Returns whether anything moved.
    pub fn settle_step(&mut self) -> bool {
        let mut moved = false;
        // The bottom interior row rests on the wall, so start one above it.
        for row in (1..ROWS - 2).rev() {
            for col in 1..COLS - 1 {
                let value = self.cells[row][col];
                if value > EMPTY && self.cells[row + 1][col] == EMPTY {
                    self.cells[row + 1][col] = value;
                    self.cells[row][col] = EMPTY;
                    moved = true;
                }
            }
        }
        moved
    }

    /// True when no block rests above an empty cell.
    #[cfg(test)]
    pub fn is_settled(&self) -> bool {
        interior().all(|(row, col)| {
            row + 1 >= ROWS - 1 || self.cells[row][col] <= EMPTY || self.cells[row + 1][col] != EMPTY
        })
    }

    /// Mark every block that is the centre or an end of a run of three equal kinds in
    /// any of the four directions. Returns the number of marked cells. Marks are OR-ed
    /// into the mask, so running this twice on an unchanged grid changes nothing.
    pub fn mark_matches(&mut self) -> usize {
        for (row, col) in interior() {
            let value = self.cells[row][col];
            if value <= EMPTY {
                continue;
            }
            for (before, after) in LINES {
                let (br, bc) = offset(row, col, before);
                let (ar, ac) = offset(row, col, after);
                if self.cells[br][bc] == value && self.cells[ar][ac] == value {
                    self.mask[row][col] = true;
                    self.mask[br][bc] = true;
                    self.mask[ar][ac] = true;
                }
            }
        }
        self.marked_count()
    }

    pub fn marked_count(&self) -> usize {
        self.mask.iter().flatten().filter(|&&m| m).count()
    }

    /// Marked cells in row-major order.
    pub fn marked_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        interior().filter(|&(row, col)| self.mask[row][col])
    }

    /// Empty every marked cell and clear its mark.
    pub fn clear_marked(&mut self) {
        for (row, col) in interior() {
            if self.mask[row][col] {
                self.cells[row][col] = EMPTY;
                self.mask[row][col] = false;
            }
        }
    }
}

/// Interior coordinates, row-major.
fn interior() -> impl Iterator<Item = (usize, usize)> {
    (1..ROWS - 1).flat_map(|row| (1..COLS - 1).map(move |col| (row, col)))
}

/// Neighbour of an interior cell; the walls guarantee it stays in range.
#[inline]
fn offset(row: usize, col: usize, (dr, dc): (isize, isize)) -> (usize, usize) {
    (row.wrapping_add_signed(dr), col.wrapping_add_signed(dc))
}
