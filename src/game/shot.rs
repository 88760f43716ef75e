//! Shot physics.
//!
//! The game state machine advances a moving shot through the
//! [`ShotPhysics`] contract only. [`StandardPhysics`] is the implementation
//! every replay is recorded against; swapping it changes every checksum.

use serde::{Deserialize, Serialize};

use crate::board::{Board, Bubble, BubbleFlags, CellCoord};
use crate::core::fixed::{Fixed, BUBBLE_DIAMETER, BUBBLE_RADIUS};
use crate::core::vec2::FixedVec2;

/// Contact distance against a normal bubble: 28px, slightly under a diameter
/// so shots can slip through narrow gaps.
pub const CONTACT_DISTANCE: Fixed = BUBBLE_DIAMETER - BUBBLE_RADIUS / 4;

/// Contact distance against a sticky bubble: 40px.
pub const STICKY_CONTACT_DISTANCE: Fixed = BUBBLE_DIAMETER + BUBBLE_RADIUS / 2;

/// Lifecycle of a shot within one firing cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShotPhase {
    /// Nothing loaded (before play starts, after game over)
    #[default]
    Idle,
    /// Loaded and waiting to fire
    Aiming,
    /// In flight
    Moving,
    /// Hit something this tick
    Collided,
    /// Resolving its resting cell
    Snapping,
}

/// The bubble in flight.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shot {
    /// Lifecycle phase
    pub phase: ShotPhase,
    /// Center position in board pixels
    pub position: FixedVec2,
    /// Displacement per tick
    pub velocity: FixedVec2,
    /// Wall bounces so far
    pub bounces: u8,
    /// What is being fired
    pub bubble: Bubble,
}

impl Shot {
    /// Shot waiting at the cannon.
    pub fn aiming() -> Self {
        Self {
            phase: ShotPhase::Aiming,
            ..Self::default()
        }
    }

    /// Shot leaving the cannon.
    pub fn launch(position: FixedVec2, velocity: FixedVec2, bubble: Bubble) -> Self {
        Self {
            phase: ShotPhase::Moving,
            position,
            velocity,
            bounces: 0,
            bubble,
        }
    }

    /// True while the shot is in flight or resolving.
    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(
            self.phase,
            ShotPhase::Moving | ShotPhase::Collided | ShotPhase::Snapping
        )
    }
}

/// Play-field bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Walls {
    /// Left wall x
    pub left: Fixed,
    /// Right wall x
    pub right: Fixed,
    /// Ceiling y
    pub ceiling: Fixed,
}

impl Walls {
    /// Bounds of a board.
    pub fn of(board: &Board) -> Self {
        Self {
            left: 0,
            right: board.width(),
            ceiling: 0,
        }
    }
}

/// What a step ran into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Collision {
    /// Free flight
    None,
    /// Bounced off a side wall
    Wall,
    /// Reached the ceiling
    Ceiling,
    /// Touched a bubble
    Bubble(CellCoord),
}

/// Result of one physics step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepOutcome {
    /// Shot after the step
    pub shot: Shot,
    /// What it hit
    pub collision: Collision,
}

/// Advances a moving shot by one tick.
///
/// Implementations must be pure: same inputs, same outcome.
pub trait ShotPhysics {
    /// Move `shot` one tick over `board` within `walls`.
    fn step(&self, shot: &Shot, board: &Board, radius: Fixed, walls: Walls) -> StepOutcome;
}

/// Straight-line motion with mirror bounces and circle contact tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardPhysics;

impl StandardPhysics {
    /// Closest bubble in contact with `position`, scanning the 3x3 cell
    /// neighborhood around it. Ghost bubbles are ignored.
    fn touching(board: &Board, position: FixedVec2) -> Option<CellCoord> {
        let center_row = Board::nearest_row(position.y);
        let center_col = position.x.div_euclid(BUBBLE_DIAMETER);
        let mut best: Option<(i64, CellCoord)> = None;

        for row in center_row - 1..=center_row + 1 {
            for col in center_col - 1..=center_col + 1 {
                let coord = CellCoord::new(row, col);
                let bubble = board.bubble_at(coord);
                if bubble.is_empty() || bubble.has_flag(BubbleFlags::GHOST) {
                    continue;
                }
                let reach = if bubble.has_flag(BubbleFlags::STICKY) {
                    STICKY_CONTACT_DISTANCE
                } else {
                    CONTACT_DISTANCE
                } as i64;
                let dist = board.cell_center(coord).distance_squared_wide(position);
                if dist <= reach * reach && best.map_or(true, |(d, _)| dist < d) {
                    best = Some((dist, coord));
                }
            }
        }

        best.map(|(_, coord)| coord)
    }
}

impl ShotPhysics for StandardPhysics {
    fn step(&self, shot: &Shot, board: &Board, radius: Fixed, walls: Walls) -> StepOutcome {
        let mut next = *shot;
        next.position = shot.position + shot.velocity;
        let mut collision = Collision::None;

        // Mirror across whichever wall was crossed
        if next.position.x - radius < walls.left {
            next.position.x = 2 * (walls.left + radius) - next.position.x;
            next.velocity = next.velocity.reflect_x();
            next.bounces = next.bounces.saturating_add(1);
            collision = Collision::Wall;
        } else if next.position.x + radius > walls.right {
            next.position.x = 2 * (walls.right - radius) - next.position.x;
            next.velocity = next.velocity.reflect_x();
            next.bounces = next.bounces.saturating_add(1);
            collision = Collision::Wall;
        }

        if let Some(cell) = Self::touching(board, next.position) {
            next.phase = ShotPhase::Collided;
            return StepOutcome { shot: next, collision: Collision::Bubble(cell) };
        }

        if next.position.y - radius <= walls.ceiling {
            next.position.y = walls.ceiling + radius;
            next.phase = ShotPhase::Collided;
            collision = Collision::Ceiling;
        }

        StepOutcome { shot: next, collision }
    }
}
