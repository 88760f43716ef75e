//! Hex board storage and traversal.
//!
//! The board is a fixed-capacity grid of [`Bubble`]s addressed by
//! staggered-row [`CellCoord`]s. Every query is bounds-checked and every
//! traversal result is capacity-bounded, so malformed coordinates surface
//! as [`BoardError`]s instead of corrupting state.

pub mod coord;
pub mod bubble;
pub mod grid;
pub mod traverse;

pub use bubble::{Bubble, BubbleFlags, SpecialEffect, MAX_COLORS};
pub use coord::{Axial, CellCoord, Direction};
pub use grid::Board;
pub use traverse::VisitResult;

/// Maximum number of rows a board can have.
pub const MAX_ROWS: usize = 20;

/// Maximum number of columns in a full row.
pub const MAX_COLS: usize = 16;

/// Upper bound on the number of cells any traversal can return.
pub const BOARD_CAPACITY: usize = MAX_ROWS * MAX_COLS;

/// Errors raised by board operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    /// Coordinate outside the board.
    #[error("Cell {0} is out of bounds")]
    OutOfBounds(CellCoord),

    /// Tried to place onto a filled cell.
    #[error("Cell {0} is already occupied")]
    Occupied(CellCoord),

    /// A traversal result would exceed its fixed capacity.
    #[error("Traversal exceeded capacity of {0} cells")]
    CapacityExceeded(usize),

    /// Requested dimensions outside the supported range.
    #[error("Invalid board dimensions {rows}x{cols}")]
    InvalidDimensions {
        /// Requested rows
        rows: u8,
        /// Requested columns
        cols: u8,
    },

    /// A bubble would leave the bottom of the board.
    #[error("Board overflow")]
    Overflow,
}
