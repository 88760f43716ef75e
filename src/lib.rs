//! # Hexpop Simulation
//!
//! Deterministic hex bubble-shooter simulation with binary replays and
//! checksum-based desync detection.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      HEXPOP SIMULATION                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── fixed.rs    - Q16.16 fixed-point arithmetic             │
//! │  ├── vec2.rs     - 2D vector with fixed-point                │
//! │  └── rng.rs      - Deterministic xoshiro128** PRNG           │
//! │                                                              │
//! │  board/          - Hex grid                                  │
//! │  ├── coord.rs    - Staggered-row coordinates, neighbors      │
//! │  ├── bubble.rs   - Bubble kinds, flags, special effects      │
//! │  ├── grid.rs     - Fixed-capacity board storage              │
//! │  └── traverse.rs - Predicate BFS, matches, anchors, orphans  │
//! │                                                              │
//! │  game/           - Game logic (deterministic)                │
//! │  ├── ruleset.rs  - Rules and setup                           │
//! │  ├── input.rs    - Input events, angle quantization          │
//! │  ├── state.rs    - Game state and input handlers             │
//! │  ├── tick.rs     - Authoritative simulation step             │
//! │  ├── shot.rs     - Shot physics contract                     │
//! │  └── effect.rs   - Special effect contract                   │
//! │                                                              │
//! │  checksum/       - CRC32, fingerprints, history, desync      │
//! │  replay/         - Binary replay format and playback         │
//! │  session/        - Live/record/playback/verify, twin, golden │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/`, `board/` and `game/` modules are **100% deterministic**:
//! - No floating-point arithmetic in game logic
//! - No HashMap (row-major iteration everywhere)
//! - No system time dependencies
//! - All randomness from the seeded xoshiro128**
//!
//! Given identical inputs and seed, the simulation produces **identical
//! results** on any platform, which is what lets a replay store only the
//! inputs.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod board;
pub mod game;
pub mod checksum;
pub mod replay;
pub mod session;

// Re-export commonly used types
pub use core::fixed::{Fixed, FIXED_ONE, FIXED_HALF, FIXED_SCALE};
pub use core::vec2::FixedVec2;
pub use core::rng::DeterministicRng;
pub use board::{Board, Bubble, CellCoord, SpecialEffect};
pub use game::{GameSetup, GameState, InputEvent, InputKind, Ruleset};
pub use replay::{Playback, Replay};
pub use session::{Session, SessionConfig, SessionMode};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Simulation tick rate (Hz)
pub const TICK_RATE: u32 = 60;
