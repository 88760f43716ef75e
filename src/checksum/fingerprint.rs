//! Content checksums of game state.
//!
//! All functions here are pure functions of content: two states built
//! independently from the same seed and inputs produce identical values.

use serde::{Deserialize, Serialize};

use crate::board::{Board, Bubble};
use crate::checksum::crc::{compute_checksum, StateHasher};
use crate::core::rng::DeterministicRng;
use crate::game::state::GameState;

fn update_bubble(hasher: &mut StateHasher, bubble: Bubble) {
    let (effect, payload) = bubble.effect_parts();
    hasher.update_u8(bubble.kind_tag());
    hasher.update_u8(bubble.color().unwrap_or(0xFF));
    hasher.update_u8(bubble.flags().bits());
    hasher.update_u8(effect);
    hasher.update_u8(payload);
}

/// Checksum of every occupied cell, row-major.
///
/// Each cell folds its coordinate along with its contents, so two boards
/// holding the same bubbles in swapped cells never collide.
pub fn board_checksum(board: &Board) -> u32 {
    compute_checksum(|h| {
        for (coord, bubble) in board.occupied_cells() {
            h.update_u8(coord.row as u8);
            h.update_u8(coord.col as u8);
            update_bubble(h, bubble);
        }
    })
}

/// Checksum of the four RNG state words.
pub fn rng_checksum(rng: &DeterministicRng) -> u32 {
    rng_state_checksum(rng.state())
}

/// Checksum of raw RNG state words, as stored in checkpoints.
pub fn rng_state_checksum(words: [u32; 4]) -> u32 {
    compute_checksum(|h| {
        for word in words {
            h.update_u32(word);
        }
    })
}

/// Checksum of everything that decides future ticks.
pub fn state_checksum(state: &GameState) -> u32 {
    compute_checksum(|h| {
        h.update_u8(state.phase().code());
        h.update_u32(state.frame());
        h.update_u32(board_checksum(state.board()));
        h.update_u32(rng_checksum(state.rng()));
        h.update_u32(state.score());
        h.update_u32(state.shots_fired());
        h.update_fixed(state.cannon_angle());
        for bubble in state.queue() {
            update_bubble(h, bubble);
        }

        let shot = state.shot();
        h.update_bool(shot.is_active());
        if shot.is_active() {
            h.update_vec2(shot.position);
            h.update_vec2(shot.velocity);
            h.update_u8(shot.bounces);
            update_bubble(h, shot.bubble);
        }
    })
}

/// Light per-frame checksum: board ^ rng, score and frame.
pub fn frame_checksum(state: &GameState) -> u32 {
    compute_checksum(|h| {
        h.update_u32(board_checksum(state.board()) ^ rng_checksum(state.rng()));
        h.update_u32(state.score());
        h.update_u32(state.frame());
    })
}

/// Component checksums of one state, compared field by field to locate a
/// divergence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    /// Frame counter
    pub frame: u32,
    /// Phase code
    pub phase: u8,
    /// RNG checksum
    pub rng: u32,
    /// Board checksum
    pub board: u32,
    /// Score
    pub score: u32,
    /// Full state checksum
    pub state: u32,
}

impl Fingerprint {
    /// Capture the fingerprint of `state`.
    pub fn capture(state: &GameState) -> Self {
        Self {
            frame: state.frame(),
            phase: state.phase().code(),
            rng: rng_checksum(state.rng()),
            board: board_checksum(state.board()),
            score: state.score(),
            state: state.checksum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::CellCoord;
    use crate::game::ruleset::Ruleset;

    #[test]
    fn test_board_checksum_folds_coordinates() {
        let mut a = Board::new(6, 6).unwrap();
        a.place(CellCoord::new(0, 0), Bubble::colored(1)).unwrap();
        a.place(CellCoord::new(0, 1), Bubble::colored(2)).unwrap();

        let mut b = Board::new(6, 6).unwrap();
        b.place(CellCoord::new(0, 0), Bubble::colored(2)).unwrap();
        b.place(CellCoord::new(0, 1), Bubble::colored(1)).unwrap();

        assert_ne!(board_checksum(&a), board_checksum(&b));
    }

    #[test]
    fn test_rng_checksum_tracks_state() {
        let mut rng = DeterministicRng::new(42);
        let before = rng_checksum(&rng);
        rng.next_u32();
        assert_ne!(before, rng_checksum(&rng));
        assert_eq!(rng_checksum(&DeterministicRng::new(42)), before);
    }

    #[test]
    fn test_state_checksum_is_content_only() {
        let a = GameState::init(5, Ruleset::default()).unwrap();
        let b = a.clone();
        assert_eq!(state_checksum(&a), state_checksum(&b));
        assert_eq!(state_checksum(&a), a.checksum());
        assert_eq!(frame_checksum(&a), frame_checksum(&b));
    }

    #[test]
    fn test_fingerprint_capture() {
        let mut state = GameState::init(5, Ruleset::default()).unwrap();
        let before = Fingerprint::capture(&state);
        state.step().unwrap();
        let after = Fingerprint::capture(&state);
        assert_eq!(after.frame, before.frame + 1);
        assert_eq!(after.board, before.board);
        assert_ne!(after.state, before.state);
    }
}
