//! Special effect resolution.
//!
//! Resolvers only *describe* an effect: which cells it touches and how.
//! Applying the outcome (skipping indestructible cells, chaining into other
//! specials, scoring) is the tick's job.

use crate::board::{Board, BoardError, CellCoord, SpecialEffect, VisitResult};

/// What happens to the cells an effect selects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EffectAction {
    /// Clear them
    Remove,
    /// Set their FROZEN flag
    Freeze,
}

/// Description of an effect's result.
#[derive(Clone, Debug, PartialEq)]
pub struct EffectOutcome {
    /// What to do with `cells`
    pub action: EffectAction,
    /// Occupied cells selected, in traversal order
    pub cells: VisitResult,
    /// Bonus points
    pub bonus: u32,
    /// Frames to wait before resolving again (0 = apply now)
    pub delay: u32,
}

/// Maps a triggered special onto the board cells it affects.
///
/// Implementations must be pure functions of their arguments.
pub trait EffectResolver {
    /// Resolve `effect` fired from `origin`.
    ///
    /// `color` is the special's own color; `payload` its opaque byte.
    fn resolve(
        &self,
        board: &Board,
        origin: CellCoord,
        effect: SpecialEffect,
        payload: u8,
        color: u8,
    ) -> Result<EffectOutcome, BoardError>;
}

/// Points for each effect kind.
pub const BOMB_BONUS: u32 = 50;
/// Points for lightning.
pub const LIGHTNING_BONUS: u32 = 40;
/// Points for color bombs.
pub const COLOR_BOMB_BONUS: u32 = 60;
/// Points for freezes.
pub const FREEZE_BONUS: u32 = 10;

/// The effect rules replays are recorded against.
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardEffects;

impl StandardEffects {
    fn within_radius(board: &Board, origin: CellCoord, radius: u8) -> Result<VisitResult, BoardError> {
        let radius = radius as i32;
        let area = board.visit(&[origin], |cell, _| board.distance(origin, cell) <= radius)?;
        occupied_only(board, area.iter().copied())
    }
}

fn occupied_only(
    board: &Board,
    cells: impl Iterator<Item = CellCoord>,
) -> Result<VisitResult, BoardError> {
    let mut result = VisitResult::new();
    for cell in cells {
        if board.is_occupied(cell) {
            result.push(cell)?;
        }
    }
    Ok(result)
}

impl EffectResolver for StandardEffects {
    fn resolve(
        &self,
        board: &Board,
        origin: CellCoord,
        effect: SpecialEffect,
        payload: u8,
        color: u8,
    ) -> Result<EffectOutcome, BoardError> {
        let outcome = |action, cells, bonus| EffectOutcome { action, cells, bonus, delay: 0 };

        match effect {
            SpecialEffect::Bomb => Ok(outcome(
                EffectAction::Remove,
                Self::within_radius(board, origin, payload)?,
                BOMB_BONUS,
            )),
            SpecialEffect::Lightning => {
                let row = (0..board.row_width(origin.row)).map(|col| CellCoord::new(origin.row, col));
                Ok(outcome(EffectAction::Remove, occupied_only(board, row)?, LIGHTNING_BONUS))
            }
            SpecialEffect::ColorBomb => {
                // Payload n > 0 targets color n - 1
                let target = payload.checked_sub(1).unwrap_or(color);
                let cells = board
                    .occupied_cells()
                    .filter(|(_, b)| b.color() == Some(target))
                    .map(|(cell, _)| cell);
                Ok(outcome(EffectAction::Remove, occupied_only(board, cells)?, COLOR_BOMB_BONUS))
            }
            SpecialEffect::TimedBomb => Ok(EffectOutcome {
                action: EffectAction::Remove,
                cells: VisitResult::new(),
                bonus: 0,
                delay: payload.max(1) as u32,
            }),
            SpecialEffect::Freeze => Ok(outcome(
                EffectAction::Freeze,
                Self::within_radius(board, origin, payload)?,
                FREEZE_BONUS,
            )),
        }
    }
}
