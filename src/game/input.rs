//! Input Events and Angle Quantization
//!
//! Inputs are the only gameplay data a replay persists. Each one is tagged
//! with the frame it applies to; the frame is stored separately from the
//! kind so the replay codec can delta-encode it.

use serde::{Deserialize, Serialize};

use crate::core::fixed::{Fixed, FIXED_TWO_PI};

// =============================================================================
// ANGLE QUANTIZATION (Critical for Determinism)
// =============================================================================

/// Quantize an angle to a u16 in units of 2π/65536.
///
/// Rounds to nearest. Angles are wrapped into `[0, 2π)` first.
#[inline]
pub fn quantize_angle(angle: Fixed) -> u16 {
    let two_pi = FIXED_TWO_PI as i64;
    let wrapped = (angle as i64).rem_euclid(two_pi);
    (((wrapped << 16) + two_pi / 2) / two_pi) as u16
}

/// Expand a quantized angle back to Q16.16 radians.
#[inline]
pub fn dequantize_angle(units: u16) -> Fixed {
    ((units as i64 * FIXED_TWO_PI as i64 + 0x8000) >> 16) as Fixed
}

/// Snap an angle onto the quantized grid.
///
/// A recording that stores compact angles must feed the game this value,
/// not the raw one, or playback would diverge.
#[inline]
pub fn snap_angle(angle: Fixed) -> Fixed {
    dequantize_angle(quantize_angle(angle))
}

// =============================================================================
// INPUT TYPES
// =============================================================================

/// What the player did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputKind {
    /// Rotate the cannon one step counter-clockwise
    RotateLeft,
    /// Rotate the cannon one step clockwise
    RotateRight,
    /// Fire the loaded bubble at `angle` (Q16.16 radians)
    Fire {
        /// Aim angle
        angle: Fixed,
    },
    /// Swap loaded and next bubble
    Switch,
    /// Pause the game
    Pause,
    /// Resume a paused game
    Unpause,
}

impl InputKind {
    /// Replay type code (1..=6).
    pub const fn type_code(self) -> u8 {
        match self {
            InputKind::RotateLeft => 1,
            InputKind::RotateRight => 2,
            InputKind::Fire { .. } => 3,
            InputKind::Switch => 4,
            InputKind::Pause => 5,
            InputKind::Unpause => 6,
        }
    }

    /// Rebuild from a type code; `angle` is only read for `Fire`.
    pub fn from_code(code: u8, angle: Fixed) -> Option<Self> {
        match code {
            1 => Some(InputKind::RotateLeft),
            2 => Some(InputKind::RotateRight),
            3 => Some(InputKind::Fire { angle }),
            4 => Some(InputKind::Switch),
            5 => Some(InputKind::Pause),
            6 => Some(InputKind::Unpause),
            _ => None,
        }
    }

    /// Same input with its angle snapped to the compact grid.
    pub fn quantized(self) -> Self {
        match self {
            InputKind::Fire { angle } => InputKind::Fire { angle: snap_angle(angle) },
            other => other,
        }
    }
}

/// An input applied before the tick that advances `frame` to `frame + 1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputEvent {
    /// Frame the input applies at
    pub frame: u32,
    /// What happened
    pub kind: InputKind,
}

impl InputEvent {
    /// Create an input event.
    pub const fn new(frame: u32, kind: InputKind) -> Self {
        Self { frame, kind }
    }

    /// Fire event helper.
    pub const fn fire(frame: u32, angle: Fixed) -> Self {
        Self::new(frame, InputKind::Fire { angle })
    }
}

// =============================================================================
// TESTS
// =============================================================================
