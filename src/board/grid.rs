//! Board storage and geometry.

use serde::{Deserialize, Serialize};

use super::bubble::Bubble;
use super::coord::{Axial, CellCoord};
use super::traverse::VisitResult;
use super::{BoardError, MAX_COLS, MAX_ROWS};
use crate::core::fixed::{Fixed, BUBBLE_DIAMETER, BUBBLE_RADIUS, ROW_HEIGHT};
use crate::core::vec2::FixedVec2;

/// Furthest a snap target may be from the contact point (two diameters).
const SNAP_REACH_SQ: i64 = (2 * BUBBLE_DIAMETER as i64) * (2 * BUBBLE_DIAMETER as i64);

/// Fixed-capacity hex grid.
///
/// Rows alternate between full rows (`cols` cells) and shifted rows
/// (`cols - 1` cells, offset half a bubble right). Whether row 0 is
/// shifted flips on every pressure-row insertion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    cells: [[Bubble; MAX_COLS]; MAX_ROWS],
    rows: u8,
    cols: u8,
    top_shifted: bool,
    ceiling: u32,
}

impl Board {
    /// Create an empty board.
    ///
    /// `rows` must be in `1..=MAX_ROWS` and `cols` in `2..=MAX_COLS`.
    pub fn new(rows: u8, cols: u8) -> Result<Self, BoardError> {
        if rows == 0 || rows as usize > MAX_ROWS || cols < 2 || cols as usize > MAX_COLS {
            return Err(BoardError::InvalidDimensions { rows, cols });
        }
        Ok(Self {
            cells: [[Bubble::Empty; MAX_COLS]; MAX_ROWS],
            rows,
            cols,
            top_shifted: false,
            ceiling: 0,
        })
    }

    /// Number of rows.
    #[inline]
    pub fn rows(&self) -> i32 {
        self.rows as i32
    }

    /// Cells in a full row.
    #[inline]
    pub fn cols(&self) -> i32 {
        self.cols as i32
    }

    /// Whether row 0 is currently a shifted row.
    #[inline]
    pub fn top_shifted(&self) -> bool {
        self.top_shifted
    }

    /// Whether `row` is a shifted row.
    #[inline]
    pub fn is_shifted(&self, row: i32) -> bool {
        (row & 1 == 1) ^ self.top_shifted
    }

    /// Number of pressure rows inserted so far.
    #[inline]
    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }

    /// Number of cells in `row` (0 for rows outside the board).
    #[inline]
    pub fn row_width(&self, row: i32) -> i32 {
        if row < 0 || row >= self.rows() {
            return 0;
        }
        self.cols() - self.is_shifted(row) as i32
    }

    /// True if `coord` addresses a cell of this board.
    #[inline]
    pub fn is_valid(&self, coord: CellCoord) -> bool {
        coord.col >= 0 && coord.col < self.row_width(coord.row)
    }

    #[inline]
    fn check(&self, coord: CellCoord) -> Result<(usize, usize), BoardError> {
        if self.is_valid(coord) {
            Ok((coord.row as usize, coord.col as usize))
        } else {
            Err(BoardError::OutOfBounds(coord))
        }
    }

    /// Contents of a cell.
    pub fn get(&self, coord: CellCoord) -> Result<Bubble, BoardError> {
        let (r, c) = self.check(coord)?;
        Ok(self.cells[r][c])
    }

    /// Contents of a cell, `Empty` when out of bounds.
    #[inline]
    pub fn bubble_at(&self, coord: CellCoord) -> Bubble {
        self.get(coord).unwrap_or(Bubble::Empty)
    }

    /// True if the cell is valid and holds a bubble.
    #[inline]
    pub fn is_occupied(&self, coord: CellCoord) -> bool {
        self.bubble_at(coord).is_occupied()
    }

    /// Put a bubble into an empty cell.
    pub fn place(&mut self, coord: CellCoord, bubble: Bubble) -> Result<(), BoardError> {
        let (r, c) = self.check(coord)?;
        if self.cells[r][c].is_occupied() {
            return Err(BoardError::Occupied(coord));
        }
        self.cells[r][c] = bubble;
        Ok(())
    }

    /// Overwrite a cell, returning what was there.
    pub fn set(&mut self, coord: CellCoord, bubble: Bubble) -> Result<Bubble, BoardError> {
        let (r, c) = self.check(coord)?;
        Ok(std::mem::replace(&mut self.cells[r][c], bubble))
    }

    /// Empty a cell, returning what was there.
    pub fn clear_cell(&mut self, coord: CellCoord) -> Result<Bubble, BoardError> {
        self.set(coord, Bubble::Empty)
    }

    /// Empty every cell in `cells`. Returns how many were occupied.
    pub fn remove_cells(&mut self, cells: &VisitResult) -> Result<usize, BoardError> {
        // Validate first so a bad coordinate leaves the board untouched
        for &coord in cells.iter() {
            self.check(coord)?;
        }
        let mut removed = 0;
        for &coord in cells.iter() {
            if self.clear_cell(coord)?.is_occupied() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Occupied cells in row-major order.
    pub fn occupied_cells(&self) -> impl Iterator<Item = (CellCoord, Bubble)> + '_ {
        (0..self.rows()).flat_map(move |row| {
            (0..self.row_width(row)).filter_map(move |col| {
                let bubble = self.cells[row as usize][col as usize];
                bubble.is_occupied().then_some((CellCoord::new(row, col), bubble))
            })
        })
    }

    /// Number of occupied cells.
    pub fn occupied_count(&self) -> usize {
        self.occupied_cells().count()
    }

    /// True when no cell holds a bubble.
    pub fn is_empty(&self) -> bool {
        self.occupied_cells().next().is_none()
    }

    /// Bit mask of colors present (bit `n` = color `n`).
    pub fn colors_present(&self) -> u8 {
        self.occupied_cells()
            .filter_map(|(_, b)| b.color())
            .fold(0u8, |mask, color| mask | (1u8 << (color & 7)))
    }

    /// Deepest row holding any bubble.
    pub fn lowest_occupied_row(&self) -> Option<i32> {
        self.occupied_cells().map(|(coord, _)| coord.row).max()
    }

    /// In-bounds neighbors of `coord`, in [`Direction::ALL`](super::Direction::ALL) order.
    pub fn neighbors(&self, coord: CellCoord) -> impl Iterator<Item = CellCoord> + '_ {
        coord
            .neighbors(self.is_shifted(coord.row))
            .into_iter()
            .filter(move |n| self.is_valid(*n))
    }

    /// Axial form of a coordinate under the current stagger.
    pub fn to_axial(&self, coord: CellCoord) -> Axial {
        coord.to_axial(self.is_shifted(coord.row), self.top_shifted)
    }

    /// Hex distance between two cells.
    pub fn distance(&self, a: CellCoord, b: CellCoord) -> i32 {
        self.to_axial(a).distance(self.to_axial(b))
    }

    /// Right wall x position (left wall is 0).
    pub fn width(&self) -> Fixed {
        BUBBLE_DIAMETER * self.cols()
    }

    /// Y position of the lowest row's center line plus one row: where the
    /// cannon sits.
    pub fn launch_y(&self) -> Fixed {
        BUBBLE_RADIUS + ROW_HEIGHT * (self.rows() + 1)
    }

    /// Center of a cell in board pixels.
    pub fn cell_center(&self, coord: CellCoord) -> FixedVec2 {
        let half_steps = 2 * coord.col + 1 + self.is_shifted(coord.row) as i32;
        FixedVec2::new(BUBBLE_RADIUS * half_steps, BUBBLE_RADIUS + ROW_HEIGHT * coord.row)
    }

    /// Nearest row index for a y position (may be outside the board).
    pub fn nearest_row(y: Fixed) -> i32 {
        (y - BUBBLE_RADIUS + ROW_HEIGHT / 2).div_euclid(ROW_HEIGHT)
    }

    /// Cell containing a position, if any.
    pub fn cell_at_position(&self, position: FixedVec2) -> Option<CellCoord> {
        let row = Self::nearest_row(position.y);
        if row < 0 || row >= self.rows() {
            return None;
        }
        let offset = if self.is_shifted(row) { BUBBLE_RADIUS } else { 0 };
        let col = (position.x - offset).div_euclid(BUBBLE_DIAMETER);
        let coord = CellCoord::new(row, col);
        self.is_valid(coord).then_some(coord)
    }

    /// Empty cell where a shot stopping at `position` comes to rest.
    ///
    /// Picks the nearest empty cell among the rows around the contact
    /// point; ties resolve to the first candidate in row-major order.
    /// Fails with `Overflow` when the shot would rest below the last row.
    pub fn find_snap_cell(&self, position: FixedVec2) -> Result<CellCoord, BoardError> {
        let center_row = Self::nearest_row(position.y).max(0);
        if center_row >= self.rows() {
            return Err(BoardError::Overflow);
        }

        let mut best: Option<(i64, CellCoord)> = None;
        for row in (center_row - 1).max(0)..=(center_row + 1).min(self.rows() - 1) {
            for col in 0..self.row_width(row) {
                let coord = CellCoord::new(row, col);
                if self.is_occupied(coord) {
                    continue;
                }
                let dist = self.cell_center(coord).distance_squared_wide(position);
                if dist > SNAP_REACH_SQ {
                    continue;
                }
                if best.map_or(true, |(d, _)| dist < d) {
                    best = Some((dist, coord));
                }
            }
        }

        best.map(|(_, coord)| coord).ok_or(BoardError::Overflow)
    }

    /// Push every row down one and fill a new top row.
    ///
    /// The new top row takes the opposite stagger so rows keep alternating.
    /// Fails with `Overflow`, leaving the board unchanged, if the last row
    /// holds any bubble.
    pub fn insert_row<F>(&mut self, mut fill: F) -> Result<(), BoardError>
    where
        F: FnMut(CellCoord) -> Bubble,
    {
        let last = self.rows() - 1;
        if (0..self.row_width(last)).any(|col| self.is_occupied(CellCoord::new(last, col))) {
            return Err(BoardError::Overflow);
        }

        let rows = self.rows as usize;
        self.cells.copy_within(0..rows - 1, 1);
        self.cells[0] = [Bubble::Empty; MAX_COLS];
        self.top_shifted = !self.top_shifted;
        self.ceiling += 1;

        for col in 0..self.row_width(0) {
            self.cells[0][col as usize] = fill(CellCoord::new(0, col));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::bubble::BubbleFlags;
    use crate::core::fixed::to_fixed;

    fn board() -> Board {
        Board::new(10, 8).unwrap()
    }

    #[test]
    fn test_dimensions_validated() {
        assert!(Board::new(0, 8).is_err());
        assert!(Board::new(21, 8).is_err());
        assert!(Board::new(10, 1).is_err());
        assert!(Board::new(10, 17).is_err());
        assert!(Board::new(20, 16).is_ok());
    }

    #[test]
    fn test_row_widths_alternate() {
        let b = board();
        assert_eq!(b.row_width(0), 8);
        assert_eq!(b.row_width(1), 7);
        assert_eq!(b.row_width(2), 8);
        assert_eq!(b.row_width(-1), 0);
        assert_eq!(b.row_width(10), 0);
        assert!(b.is_valid(CellCoord::new(0, 7)));
        assert!(!b.is_valid(CellCoord::new(1, 7)));
    }

    #[test]
    fn test_place_and_get() {
        let mut b = board();
        let at = CellCoord::new(2, 3);
        b.place(at, Bubble::colored(1)).unwrap();
        assert_eq!(b.get(at).unwrap(), Bubble::colored(1));
        assert_eq!(b.place(at, Bubble::colored(2)), Err(BoardError::Occupied(at)));
        assert_eq!(b.occupied_count(), 1);

        let bad = CellCoord::new(1, 7);
        assert_eq!(b.get(bad), Err(BoardError::OutOfBounds(bad)));
        assert_eq!(b.place(bad, Bubble::colored(0)), Err(BoardError::OutOfBounds(bad)));

        assert_eq!(b.clear_cell(at).unwrap(), Bubble::colored(1));
        assert!(b.is_empty());
    }

    #[test]
    fn test_colors_and_lowest_row() {
        let mut b = board();
        b.place(CellCoord::new(0, 0), Bubble::colored(0)).unwrap();
        b.place(CellCoord::new(3, 2), Bubble::colored(5)).unwrap();
        b.place(CellCoord::new(1, 1), Bubble::Blocker { flags: BubbleFlags::NONE }).unwrap();
        assert_eq!(b.colors_present(), 0b10_0001);
        assert_eq!(b.lowest_occupied_row(), Some(3));
    }

    #[test]
    fn test_neighbors_clipped_at_edges() {
        let b = board();
        let corner: Vec<_> = b.neighbors(CellCoord::new(0, 0)).collect();
        assert_eq!(corner, vec![CellCoord::new(0, 1), CellCoord::new(1, 0)]);
        assert_eq!(b.neighbors(CellCoord::new(4, 4)).count(), 6);
    }

    #[test]
    fn test_cell_center_round_trip() {
        let b = board();
        for row in 0..b.rows() {
            for col in 0..b.row_width(row) {
                let coord = CellCoord::new(row, col);
                assert_eq!(b.cell_at_position(b.cell_center(coord)), Some(coord));
            }
        }
        assert_eq!(b.cell_at_position(FixedVec2::new(to_fixed(-5.0), 0)), None);
    }

    #[test]
    fn test_snap_to_ceiling() {
        let b = board();
        let pos = FixedVec2::new(to_fixed(40.0), to_fixed(16.0));
        assert_eq!(b.find_snap_cell(pos).unwrap(), CellCoord::new(0, 1));
    }

    #[test]
    fn test_snap_below_bubble() {
        let mut b = board();
        b.place(CellCoord::new(0, 3), Bubble::colored(1)).unwrap();
        let above = b.cell_center(CellCoord::new(0, 3));
        // Contact point just under the bubble
        let pos = FixedVec2::new(above.x, above.y + to_fixed(27.0));
        let snapped = b.find_snap_cell(pos).unwrap();
        assert_eq!(snapped.row, 1);
        assert!(b.neighbors(snapped).any(|n| n == CellCoord::new(0, 3)));
    }

    #[test]
    fn test_snap_overflow_below_board() {
        let b = board();
        let pos = FixedVec2::new(to_fixed(40.0), b.cell_center(CellCoord::new(9, 0)).y + ROW_HEIGHT);
        assert_eq!(b.find_snap_cell(pos), Err(BoardError::Overflow));
    }

    #[test]
    fn test_insert_row_flips_stagger() {
        let mut b = board();
        b.place(CellCoord::new(0, 2), Bubble::colored(3)).unwrap();
        let before = b.cell_center(CellCoord::new(0, 2));

        b.insert_row(|_| Bubble::colored(1)).unwrap();

        assert!(b.top_shifted());
        assert_eq!(b.ceiling(), 1);
        assert_eq!(b.row_width(0), 7);
        assert_eq!(b.get(CellCoord::new(1, 2)).unwrap(), Bubble::colored(3));
        // Horizontal position unchanged, one row lower
        let after = b.cell_center(CellCoord::new(1, 2));
        assert_eq!(after.x, before.x);
        assert_eq!(after.y, before.y + ROW_HEIGHT);
        assert_eq!(b.occupied_count(), 8);
    }

    #[test]
    fn test_insert_row_overflow() {
        let mut b = board();
        b.place(CellCoord::new(9, 0), Bubble::colored(3)).unwrap();
        let snapshot = b.clone();
        assert_eq!(b.insert_row(|_| Bubble::colored(1)), Err(BoardError::Overflow));
        assert_eq!(b, snapshot);
    }
}
