//! Predicate-driven breadth-first traversal.
//!
//! Every connectivity question the game asks (which cells form a match,
//! which cells still hang from the ceiling) is one call to [`Board::visit`]
//! with a different predicate. The result list doubles as the BFS queue,
//! so a traversal never allocates.

use super::bubble::{Bubble, BubbleFlags};
use super::coord::CellCoord;
use super::grid::Board;
use super::{BoardError, BOARD_CAPACITY, MAX_COLS, MAX_ROWS};

/// Ordered, capacity-bounded set of cells produced by a traversal.
#[derive(Clone)]
pub struct VisitResult {
    cells: [CellCoord; BOARD_CAPACITY],
    len: usize,
}

impl Default for VisitResult {
    fn default() -> Self {
        Self::new()
    }
}

impl VisitResult {
    /// Empty result.
    pub fn new() -> Self {
        Self {
            cells: [CellCoord::default(); BOARD_CAPACITY],
            len: 0,
        }
    }

    /// Append a cell. Fails once the capacity is reached.
    pub fn push(&mut self, coord: CellCoord) -> Result<(), BoardError> {
        let slot = self
            .cells
            .get_mut(self.len)
            .ok_or(BoardError::CapacityExceeded(BOARD_CAPACITY))?;
        *slot = coord;
        self.len += 1;
        Ok(())
    }

    /// Number of cells.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if no cell was visited.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Cells in visit order.
    #[inline]
    pub fn as_slice(&self) -> &[CellCoord] {
        &self.cells[..self.len]
    }

    /// Iterate cells in visit order.
    pub fn iter(&self) -> std::slice::Iter<'_, CellCoord> {
        self.as_slice().iter()
    }

    /// Linear membership test.
    pub fn contains(&self, coord: CellCoord) -> bool {
        self.as_slice().contains(&coord)
    }

    /// Cell at `index` in visit order.
    pub fn get(&self, index: usize) -> Option<CellCoord> {
        self.as_slice().get(index).copied()
    }
}

impl std::fmt::Debug for VisitResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

impl PartialEq for VisitResult {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<'a> IntoIterator for &'a VisitResult {
    type Item = &'a CellCoord;
    type IntoIter = std::slice::Iter<'a, CellCoord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Visited bitmap sized for the largest board.
struct Visited([[bool; MAX_COLS]; MAX_ROWS]);

impl Visited {
    fn new() -> Self {
        Self([[false; MAX_COLS]; MAX_ROWS])
    }

    /// Marks `coord`; returns false if it was already marked.
    /// `coord` must be valid on the board.
    fn mark(&mut self, coord: CellCoord) -> bool {
        let slot = &mut self.0[coord.row as usize][coord.col as usize];
        !std::mem::replace(slot, true)
    }
}

impl Board {
    /// Breadth-first traversal from `seeds` over cells accepted by `predicate`.
    ///
    /// Seeds are admitted only if they are on the board and accepted by the
    /// predicate. Neighbors are expanded in [`Direction::ALL`] order, so the
    /// result order is fully determined by the board and the seeds.
    ///
    /// [`Direction::ALL`]: super::Direction::ALL
    pub fn visit<F>(&self, seeds: &[CellCoord], predicate: F) -> Result<VisitResult, BoardError>
    where
        F: Fn(CellCoord, Bubble) -> bool,
    {
        let mut result = VisitResult::new();
        let mut visited = Visited::new();

        for &seed in seeds {
            let Ok(bubble) = self.get(seed) else { continue };
            if predicate(seed, bubble) && visited.mark(seed) {
                result.push(seed)?;
            }
        }

        let mut head = 0;
        while let Some(current) = result.get(head) {
            head += 1;
            for next in self.neighbors(current) {
                if predicate(next, self.bubble_at(next)) && visited.mark(next) {
                    result.push(next)?;
                }
            }
        }

        Ok(result)
    }

    /// Color a match starting at `origin` is made of.
    ///
    /// Wildcards adopt the color of their first colored neighbor.
    fn match_color(&self, origin: CellCoord, seed: Bubble) -> Option<u8> {
        if seed.has_flag(BubbleFlags::FROZEN) {
            return None;
        }
        match seed {
            Bubble::Colored { color, .. } | Bubble::Special { color, .. } => Some(color),
            Bubble::Wildcard { .. } => self.neighbors(origin).find_map(|n| {
                let neighbor = self.bubble_at(n);
                if neighbor.has_flag(BubbleFlags::FROZEN) {
                    None
                } else {
                    neighbor.color()
                }
            }),
            Bubble::Empty | Bubble::Blocker { .. } => None,
        }
    }

    /// Connected same-color cluster containing `origin`.
    ///
    /// Empty, blocker and frozen origins give an empty result. A wildcard
    /// with no colored neighbor forms a cluster of wildcards only.
    pub fn find_matches(&self, origin: CellCoord) -> Result<VisitResult, BoardError> {
        let seed = self.get(origin)?;
        match self.match_color(origin, seed) {
            Some(color) => self.visit(&[origin], |_, b| b.matches_color(color)),
            None => self.visit(&[origin], |_, b| {
                matches!(b, Bubble::Wildcard { .. }) && !b.has_flag(BubbleFlags::FROZEN)
            }),
        }
    }

    /// True if the cluster at `origin` has at least `threshold` cells.
    pub fn has_match(&self, origin: CellCoord, threshold: usize) -> Result<bool, BoardError> {
        Ok(self.find_matches(origin)?.len() >= threshold)
    }

    /// Cells connected to the ceiling or to an anchor bubble.
    pub fn find_anchored(&self) -> Result<VisitResult, BoardError> {
        let mut seeds = VisitResult::new();
        for (coord, bubble) in self.occupied_cells() {
            if coord.row == 0 || bubble.has_flag(BubbleFlags::ANCHOR) {
                seeds.push(coord)?;
            }
        }
        self.visit(seeds.as_slice(), |_, b| b.is_occupied())
    }

    /// Occupied cells not connected to the ceiling or any anchor,
    /// in row-major order.
    pub fn find_orphans(&self) -> Result<VisitResult, BoardError> {
        let anchored = self.find_anchored()?;
        let mut held = Visited::new();
        for &coord in &anchored {
            held.mark(coord);
        }

        let mut orphans = VisitResult::new();
        for (coord, _) in self.occupied_cells() {
            if held.mark(coord) {
                orphans.push(coord)?;
            }
        }
        Ok(orphans)
    }
}
