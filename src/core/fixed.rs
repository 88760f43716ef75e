//! Q16.16 Fixed-Point Arithmetic
//!
//! This module provides the deterministic scalar every layer of the simulation
//! is built on. All operations use integer arithmetic only - no floats in
//! gameplay logic, so a replay recorded on one machine reproduces bit-exactly
//! on any other.
//!
//! ## Format: Q16.16
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Bit Layout: Q16.16 (32-bit signed integer)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  [S][IIIIIIIIIIIIIIII][FFFFFFFFFFFFFFFF]                    │
//! │   │  └──── 16 bits ────┘└──── 16 bits ────┘                 │
//! │   └─ Sign bit                                               │
//! │                                                             │
//! │  Range: -32768.0 to +32767.99998 (approx)                   │
//! │  Precision: 1/65536 ≈ 0.000015 units                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Board geometry is expressed in pixels (a bubble is 32px wide), which keeps
//! every position comfortably inside the Q16.16 range. Products of two
//! pixel-scale values can exceed it, so distance checks widen to `i64`.

/// Q16.16 fixed-point number stored as i32.
/// 16 bits integer, 16 bits fractional.
pub type Fixed = i32;

/// Number of fractional bits (16)
pub const FIXED_SCALE: i32 = 16;

/// 1.0 in fixed-point (65536)
pub const FIXED_ONE: Fixed = 1 << FIXED_SCALE; // 65536

/// 0.5 in fixed-point (32768)
pub const FIXED_HALF: Fixed = FIXED_ONE >> 1; // 32768

/// π = round(3.14159265 * 65536)
pub const FIXED_PI: Fixed = 205887;

/// π/2 = round(1.57079633 * 65536)
pub const FIXED_HALF_PI: Fixed = 102944;

/// 2π = round(6.28318531 * 65536)
pub const FIXED_TWO_PI: Fixed = 411775;

// =============================================================================
// GAME CONSTANTS (All as integer literals - NO float conversion!)
// =============================================================================

/// Bubble radius: 16px = 16 * 65536
pub const BUBBLE_RADIUS: Fixed = 1048576;

/// Bubble diameter: 32px
pub const BUBBLE_DIAMETER: Fixed = BUBBLE_RADIUS * 2;

/// Vertical distance between row centers: R * sqrt(3) = 27.7128px
pub const ROW_HEIGHT: Fixed = 1816193;

/// Shot travel per tick: 8px (a quarter diameter, so shots never tunnel)
pub const SHOT_SPEED: Fixed = 524288;

/// Shallowest allowed aim: ~0.15 rad above the horizontal.
///
/// Compact angle unit 1565, so snapping never leaves the aim range.
pub const AIM_MIN: Fixed = 9833;

/// Steepest allowed aim on the other side: π - AIM_MIN (compact unit 31203)
pub const AIM_MAX: Fixed = FIXED_PI - AIM_MIN;

/// Cannon rotation per rotate input: ~2 degrees (0.035 rad)
pub const ROTATE_STEP: Fixed = 2294;

/// Initial cannon angle: straight up
pub const AIM_DEFAULT: Fixed = FIXED_HALF_PI;

// =============================================================================
// CORE OPERATIONS (All deterministic, wrapping semantics)
// =============================================================================

/// Convert a compile-time float to fixed-point.
///
/// # Warning
/// Only use at compile-time, in tests, or at the input boundary. NEVER in
/// the tick loop.
///
/// # Example
/// ```
/// use hexpop::core::fixed::{to_fixed, FIXED_ONE};
/// const MY_VALUE: i32 = to_fixed(2.5);
/// assert_eq!(MY_VALUE, FIXED_ONE * 2 + FIXED_ONE / 2);
/// ```
#[inline]
pub const fn to_fixed(f: f64) -> Fixed {
    (f * (FIXED_ONE as f64)) as Fixed
}

/// Multiply two fixed-point numbers.
///
/// Uses i64 intermediate to prevent overflow, then truncates.
#[inline]
pub fn fixed_mul(a: Fixed, b: Fixed) -> Fixed {
    let wide = (a as i64) * (b as i64);
    (wide >> FIXED_SCALE) as Fixed
}

/// Clamp a fixed-point number to a range.
#[inline]
pub fn fixed_clamp(value: Fixed, min: Fixed, max: Fixed) -> Fixed {
    value.max(min).min(max)
}

/// Wrap an angle into `[-π, π)`.
#[inline]
pub fn normalize_angle(angle: Fixed) -> Fixed {
    let shifted = angle as i64 + FIXED_PI as i64;
    (shifted.rem_euclid(FIXED_TWO_PI as i64) - FIXED_PI as i64) as Fixed
}

/// Sine of an angle in radians.
///
/// The angle is folded into `[-π/2, π/2]` and evaluated with a 7th order
/// Taylor polynomial in Horner form. Worst-case error is about 1.6e-4,
/// identical on every platform because only integer ops are involved.
pub fn fixed_sin(angle: Fixed) -> Fixed {
    let mut x = normalize_angle(angle);
    if x > FIXED_HALF_PI {
        x = FIXED_PI - x;
    } else if x < -FIXED_HALF_PI {
        x = -FIXED_PI - x;
    }

    let x = x as i64;
    let one = FIXED_ONE as i64;
    let x2 = (x * x) >> FIXED_SCALE;

    // x * (1 - x²/6 * (1 - x²/20 * (1 - x²/42)))
    let t = one - x2 / 42;
    let t = one - ((x2 * t) >> FIXED_SCALE) / 20;
    let t = one - ((x2 * t) >> FIXED_SCALE) / 6;
    ((x * t) >> FIXED_SCALE) as Fixed
}

/// Cosine of an angle in radians.
#[inline]
pub fn fixed_cos(angle: Fixed) -> Fixed {
    fixed_sin(angle.wrapping_add(FIXED_HALF_PI))
}

// =============================================================================
// TESTS
// =============================================================================
