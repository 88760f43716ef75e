//! Game Logic Module
//!
//! All game simulation code. 100% deterministic.
//!
//! ## Module Structure
//!
//! - `ruleset`: Rules and setup configuration
//! - `input`: Input events and angle quantization
//! - `state`: Game state aggregate and input handlers
//! - `tick`: Authoritative per-frame simulation step
//! - `shot`: Shot physics contract and standard implementation
//! - `effect`: Special effect contract and standard implementation
//! - `events`: Telemetry events and the bounded event log

pub mod ruleset;
pub mod input;
pub mod state;
pub mod tick;
pub mod shot;
pub mod effect;
pub mod events;

use crate::board::BoardError;

// Re-export key types
pub use effect::{EffectAction, EffectOutcome, EffectResolver, StandardEffects};
pub use events::{EventLog, GameEvent, GameEventData};
pub use input::{InputEvent, InputKind};
pub use ruleset::{GameSetup, LoseCondition, Ruleset};
pub use shot::{Collision, Shot, ShotPhase, ShotPhysics, StandardPhysics, StepOutcome, Walls};
pub use state::{GamePhase, GameState, Outcome, PendingEffect};
pub use tick::{tick, TickResult};

/// Errors raised by game construction and input handlers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// An input argument is outside its valid range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// The input is not allowed in the current state.
    #[error("Invalid state: {0}")]
    InvalidState(&'static str),

    /// The ruleset failed validation.
    #[error("Invalid ruleset: {0}")]
    InvalidRuleset(&'static str),

    /// A board operation failed.
    #[error("Board error: {0}")]
    Board(#[from] BoardError),
}
