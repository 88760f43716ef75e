//! Staggered-row hex coordinates.
//!
//! Cells are addressed by `(row, col)`. Rows alternate between *full* rows
//! and *shifted* rows; a shifted row sits half a bubble to the right and
//! holds one cell fewer. Which rows are shifted depends on the board's
//! stagger, so every helper that needs it takes the `shifted` flag of the
//! row being inspected.
//!
//! Axial coordinates are only used transiently (for distances). With the
//! doubled column `dcol = 2 * col + shifted`, the axial pair is
//! `q = (dcol - row - parity) / 2, r = row` where `parity` is the stagger of
//! the top row, which keeps the division exact.

use std::fmt;
use serde::{Deserialize, Serialize};

/// Position of a cell on the board.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct CellCoord {
    /// Row index, 0 at the ceiling.
    pub row: i32,
    /// Column index within the row.
    pub col: i32,
}

/// Neighbor order used everywhere traversal order matters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Same row, left
    West,
    /// Same row, right
    East,
    /// Row above, left
    NorthWest,
    /// Row above, right
    NorthEast,
    /// Row below, left
    SouthWest,
    /// Row below, right
    SouthEast,
}

impl Direction {
    /// All directions in traversal order.
    pub const ALL: [Direction; 6] = [
        Direction::West,
        Direction::East,
        Direction::NorthWest,
        Direction::NorthEast,
        Direction::SouthWest,
        Direction::SouthEast,
    ];
}

impl CellCoord {
    /// Create a coordinate.
    #[inline]
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Step one cell in `dir`. `shifted` is the stagger of this cell's row.
    ///
    /// The result may be out of bounds; callers filter.
    #[inline]
    pub fn step(self, dir: Direction, shifted: bool) -> CellCoord {
        // Diagonal neighbors of a shifted row sit at col and col+1,
        // those of a full row at col-1 and col.
        let left = if shifted { self.col } else { self.col - 1 };
        let right = left + 1;
        match dir {
            Direction::West => CellCoord::new(self.row, self.col - 1),
            Direction::East => CellCoord::new(self.row, self.col + 1),
            Direction::NorthWest => CellCoord::new(self.row - 1, left),
            Direction::NorthEast => CellCoord::new(self.row - 1, right),
            Direction::SouthWest => CellCoord::new(self.row + 1, left),
            Direction::SouthEast => CellCoord::new(self.row + 1, right),
        }
    }

    /// All six neighbor positions in [`Direction::ALL`] order, unfiltered.
    pub fn neighbors(self, shifted: bool) -> [CellCoord; 6] {
        Direction::ALL.map(|dir| self.step(dir, shifted))
    }

    /// Doubled column: horizontal position in half-bubble units.
    #[inline]
    pub fn doubled_col(self, shifted: bool) -> i32 {
        2 * self.col + shifted as i32
    }

    /// Convert to axial coordinates given this row's and the top row's stagger.
    pub fn to_axial(self, shifted: bool, top_shifted: bool) -> Axial {
        let q = (self.doubled_col(shifted) - self.row - top_shifted as i32).div_euclid(2);
        Axial { q, r: self.row }
    }
}

impl fmt::Debug for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Axial hex coordinate (pointy-top).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Axial {
    /// Column axis
    pub q: i32,
    /// Row axis
    pub r: i32,
}

impl Axial {
    /// Cube distance: `max(|dq|, |dr|, |dq + dr|)`.
    #[inline]
    pub fn distance(self, other: Axial) -> i32 {
        let dq = self.q - other.q;
        let dr = self.r - other.r;
        dq.abs().max(dr.abs()).max((dq + dr).abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neighbors_full_row() {
        let n = CellCoord::new(2, 3).neighbors(false);
        assert_eq!(
            n,
            [
                CellCoord::new(2, 2),
                CellCoord::new(2, 4),
                CellCoord::new(1, 2),
                CellCoord::new(1, 3),
                CellCoord::new(3, 2),
                CellCoord::new(3, 3),
            ]
        );
    }

    #[test]
    fn test_neighbors_shifted_row() {
        let n = CellCoord::new(1, 3).neighbors(true);
        assert_eq!(n[2], CellCoord::new(0, 3));
        assert_eq!(n[3], CellCoord::new(0, 4));
        assert_eq!(n[4], CellCoord::new(2, 3));
        assert_eq!(n[5], CellCoord::new(2, 4));
    }

    #[test]
    fn test_every_neighbor_is_distance_one() {
        for top_shifted in [false, true] {
            let shifted_of = |row: i32| (row % 2 == 1) ^ top_shifted;
            let center = CellCoord::new(4, 5);
            let a = center.to_axial(shifted_of(4), top_shifted);
            for n in center.neighbors(shifted_of(4)) {
                let b = n.to_axial(shifted_of(n.row), top_shifted);
                assert_eq!(a.distance(b), 1, "{n} from {center}");
            }
        }
    }

    #[test]
    fn test_cube_distance() {
        let shifted_of = |row: i32| row % 2 == 1;
        let a = CellCoord::new(0, 0).to_axial(shifted_of(0), false);
        let b = CellCoord::new(0, 4).to_axial(shifted_of(0), false);
        let c = CellCoord::new(2, 1).to_axial(shifted_of(2), false);
        assert_eq!(a.distance(b), 4);
        assert_eq!(a.distance(c), 2);
        assert_eq!(a.distance(a), 0);
    }

    #[test]
    fn test_neighbor_symmetry() {
        let shifted_of = |row: i32| row % 2 == 1;
        let center = CellCoord::new(3, 3);
        for n in center.neighbors(shifted_of(3)) {
            assert!(n.neighbors(shifted_of(n.row)).contains(&center));
        }
    }
}
