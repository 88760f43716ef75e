//! Session Module
//!
//! Orchestrates a game around the deterministic core: live play,
//! recording, playback and verification of replays.
//!
//! ## Module Structure
//!
//! - `driver`: The [`Session`] type and its four modes
//! - `twin`: Two sessions over one replay in lock step
//! - `golden`: Checksum fixtures pinned to a replay

pub mod driver;
pub mod twin;
pub mod golden;

pub use driver::{Session, SessionConfig, SessionError, SessionMode};
pub use golden::{generate_golden, verify_golden, GoldenChecksums, GoldenFrame, GoldenMismatch};
pub use twin::{run_twin_simulation, TwinReport};
