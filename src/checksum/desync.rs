//! Desync detection.
//!
//! A desync is a reported condition, never an error: comparisons return
//! the first mismatching component and the caller decides what to do.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::checksum::fingerprint::{board_checksum, rng_checksum, rng_state_checksum, Fingerprint};
use crate::game::state::GameState;
use crate::replay::Checkpoint;

/// Which part of the state diverged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DesyncComponent {
    /// RNG state words
    Rng,
    /// Board contents
    Board,
    /// Score
    Score,
    /// Phase
    Phase,
    /// Frame counter
    Frame,
    /// Full state checksum
    State,
    /// Per-frame checksum from a reference history
    FrameChecksum,
}

impl fmt::Display for DesyncComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DesyncComponent::Rng => "rng",
            DesyncComponent::Board => "board",
            DesyncComponent::Score => "score",
            DesyncComponent::Phase => "phase",
            DesyncComponent::Frame => "frame",
            DesyncComponent::State => "state",
            DesyncComponent::FrameChecksum => "frame checksum",
        };
        f.write_str(name)
    }
}

/// Diagnostic record of a detected divergence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesyncInfo {
    /// Frame the divergence was detected on
    pub frame: u32,
    /// First component found to differ
    pub component: DesyncComponent,
    /// Recorded value
    pub expected: u32,
    /// Value this run produced
    pub actual: u32,
}

impl fmt::Display for DesyncInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "desync at frame {}: {} expected {:08x}, got {:08x}",
            self.frame, self.component, self.expected, self.actual
        )
    }
}

fn first_mismatch(frame: u32, checks: &[(DesyncComponent, u32, u32)]) -> Option<DesyncInfo> {
    checks
        .iter()
        .find(|(_, expected, actual)| expected != actual)
        .map(|&(component, expected, actual)| DesyncInfo { frame, component, expected, actual })
}

/// Compare two fingerprints: RNG, board, score, phase, then frame.
pub fn compare_fingerprints(expected: &Fingerprint, actual: &Fingerprint) -> Option<DesyncInfo> {
    first_mismatch(
        expected.frame,
        &[
            (DesyncComponent::Rng, expected.rng, actual.rng),
            (DesyncComponent::Board, expected.board, actual.board),
            (DesyncComponent::Score, expected.score, actual.score),
            (DesyncComponent::Phase, expected.phase as u32, actual.phase as u32),
            (DesyncComponent::Frame, expected.frame, actual.frame),
        ],
    )
}

/// Compare a recorded checkpoint with a live state: RNG, board, score,
/// then the full state checksum.
pub fn compare_checkpoint(checkpoint: &Checkpoint, state: &GameState) -> Option<DesyncInfo> {
    first_mismatch(
        checkpoint.frame,
        &[
            (
                DesyncComponent::Rng,
                rng_state_checksum(checkpoint.rng_state),
                rng_checksum(state.rng()),
            ),
            (DesyncComponent::Board, checkpoint.board_checksum, board_checksum(state.board())),
            (DesyncComponent::Score, checkpoint.score, state.score()),
            (DesyncComponent::State, checkpoint.state_checksum, state.checksum()),
        ],
    )
}
